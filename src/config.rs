// Configuration Management
//
// Command line flags (with environment fallbacks) for a load generation run,
// plus the one-shot validation that turns them into immutable run settings.

use std::{fmt, net::SocketAddr, str::FromStr};

use clap::Parser;
use thiserror::Error;

use crate::models::EventKind;

/// Largest accepted worker pool size
pub const MAX_CONCURRENCY: i64 = 299;

const STAGE_URL: &str = "https://api.segment.build/v1/track";
const PRODUCTION_URL: &str = "https://api.segment.io/v1/track";

/// Command line and environment variable configuration for a load run
#[derive(Parser, Debug, Clone)]
#[command(name = "tracking-loadgen", version)]
#[command(about = "Send synthetic identify/track events to a tracking API at a fixed concurrency")]
pub struct Config {
    /// The write key of the source you are sending events to
    #[arg(long = "writeKey", env = "WRITE_KEY", default_value = "")]
    pub write_key: String,

    /// The number of users (events) to send
    #[arg(
        long = "numUsers",
        env = "NUM_USERS",
        default_value = "0",
        allow_negative_numbers = true
    )]
    pub num_users: i64,

    /// The number of concurrent workers making API calls
    #[arg(
        long = "maxConcurrent",
        env = "MAX_CONCURRENT",
        default_value = "20",
        allow_negative_numbers = true
    )]
    pub max_concurrent: i64,

    /// The environment to send events to [stage | production]
    #[arg(long = "env", env = "TRACKING_ENV", default_value = "production")]
    pub env: String,

    /// The type of event to send to the tracking API [identify | track]
    #[arg(long = "eventType", env = "EVENT_TYPE", default_value = "identify")]
    pub event_type: String,

    /// Turn on debug messages for every request
    #[arg(long, env = "LOADGEN_DEBUG")]
    pub debug: bool,

    /// Serve Prometheus metrics on this address while the run is in progress
    #[arg(long = "metricsAddress", env = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,
}

/// Reasons a configuration is refused before any traffic is sent
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("writeKey is required")]
    MissingWriteKey,

    #[error("numUsers is required and must be greater than 0")]
    InvalidUserCount,

    #[error("maxConcurrent should be greater than 0 but less than 300 (got {0})")]
    InvalidConcurrency(i64),

    #[error("Environment must be set to stage or production (got {0:?})")]
    UnknownEnvironment(String),

    #[error("eventType must be identify or track (got {0:?})")]
    UnknownEventType(String),

    #[error("metricsAddress {0:?} is not a valid socket address")]
    InvalidMetricsAddress(String),
}

/// Target deployment of the tracking API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Stage,
    Production,
}

impl Environment {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Environment::Stage => STAGE_URL,
            Environment::Production => PRODUCTION_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Stage => "stage",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stage" => Ok(Environment::Stage),
            "production" => Ok(Environment::Production),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, immutable snapshot of everything a run needs
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub write_key: String,
    pub users: u64,
    pub concurrency: usize,
    pub environment: Environment,
    pub event_kind: EventKind,
    pub debug: bool,
    pub metrics_address: Option<SocketAddr>,
}

impl Config {
    /// Check every flag once, in the order a user would fix them.
    pub fn validate(&self) -> Result<RunSettings, ConfigError> {
        if self.write_key.is_empty() {
            return Err(ConfigError::MissingWriteKey);
        }

        if self.num_users < 1 {
            return Err(ConfigError::InvalidUserCount);
        }

        if self.max_concurrent < 1 || self.max_concurrent > MAX_CONCURRENCY {
            return Err(ConfigError::InvalidConcurrency(self.max_concurrent));
        }

        let environment: Environment = self.env.parse()?;
        let event_kind = EventKind::from_str(&self.event_type)
            .ok_or_else(|| ConfigError::UnknownEventType(self.event_type.clone()))?;

        let metrics_address = self
            .metrics_address
            .as_deref()
            .map(|addr| {
                addr.parse::<SocketAddr>()
                    .map_err(|_| ConfigError::InvalidMetricsAddress(addr.to_string()))
            })
            .transpose()?;

        Ok(RunSettings {
            write_key: self.write_key.clone(),
            users: self.num_users as u64,
            concurrency: self.max_concurrent as usize,
            environment,
            event_kind,
            debug: self.debug,
            metrics_address,
        })
    }
}

impl RunSettings {
    pub fn endpoint(&self) -> &'static str {
        self.environment.endpoint()
    }

    /// Default tracing directive for this run; `RUST_LOG` still wins when set.
    pub fn log_directive(&self) -> &'static str {
        if self.debug {
            "tracking_loadgen=debug"
        } else {
            "tracking_loadgen=info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Config {
        let mut args = vec!["tracking-loadgen"];
        args.extend_from_slice(extra);
        Config::try_parse_from(args).expect("flags should parse")
    }

    fn valid() -> Vec<&'static str> {
        vec!["--writeKey", "wk_test", "--numUsers", "10"]
    }

    #[test]
    fn defaults_match_documented_flags() {
        let config = parse(&[]);
        assert_eq!(config.write_key, "");
        assert_eq!(config.num_users, 0);
        assert_eq!(config.max_concurrent, 20);
        assert_eq!(config.env, "production");
        assert_eq!(config.event_type, "identify");
        assert!(!config.debug);
        assert!(config.metrics_address.is_none());
    }

    #[test]
    fn accepts_minimal_valid_flags() {
        let settings = parse(&valid()).validate().unwrap();
        assert_eq!(settings.write_key, "wk_test");
        assert_eq!(settings.users, 10);
        assert_eq!(settings.concurrency, 20);
        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.event_kind, EventKind::Identify);
        assert_eq!(settings.endpoint(), "https://api.segment.io/v1/track");
    }

    #[test]
    fn rejects_empty_write_key() {
        let err = parse(&["--numUsers", "10"]).validate().unwrap_err();
        assert_eq!(err, ConfigError::MissingWriteKey);
    }

    #[test]
    fn rejects_zero_users() {
        let err = parse(&["--writeKey", "wk_test"]).validate().unwrap_err();
        assert_eq!(err, ConfigError::InvalidUserCount);
    }

    #[test]
    fn concurrency_bounds() {
        for (value, ok) in [("0", false), ("1", true), ("299", true), ("300", false)] {
            let mut args = valid();
            args.extend_from_slice(&["--maxConcurrent", value]);
            let result = parse(&args).validate();
            assert_eq!(result.is_ok(), ok, "maxConcurrent={}", value);
        }
    }

    #[test]
    fn negative_counts_reach_validation() {
        let err = parse(&["--writeKey", "wk_test", "--numUsers", "-1"])
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidUserCount);

        let mut args = valid();
        args.extend_from_slice(&["--maxConcurrent", "-1"]);
        let err = parse(&args).validate().unwrap_err();
        assert_eq!(err, ConfigError::InvalidConcurrency(-1));
        assert_eq!(
            err.to_string(),
            "maxConcurrent should be greater than 0 but less than 300 (got -1)"
        );
    }

    #[test]
    fn environment_selection() {
        let mut args = valid();
        args.extend_from_slice(&["--env", "stage"]);
        let settings = parse(&args).validate().unwrap();
        assert_eq!(settings.environment, Environment::Stage);
        assert_eq!(settings.endpoint(), "https://api.segment.build/v1/track");

        let mut args = valid();
        args.extend_from_slice(&["--env", "dev"]);
        let err = parse(&args).validate().unwrap_err();
        assert_eq!(err, ConfigError::UnknownEnvironment("dev".to_string()));
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let mut args = valid();
        args.extend_from_slice(&["--eventType", "bogus"]);
        let err = parse(&args).validate().unwrap_err();
        assert_eq!(err, ConfigError::UnknownEventType("bogus".to_string()));

        let mut args = valid();
        args.extend_from_slice(&["--eventType", "track"]);
        assert_eq!(parse(&args).validate().unwrap().event_kind, EventKind::Track);
    }

    #[test]
    fn metrics_address_must_parse() {
        let mut args = valid();
        args.extend_from_slice(&["--metricsAddress", "127.0.0.1:9464"]);
        let settings = parse(&args).validate().unwrap();
        assert_eq!(settings.metrics_address, Some("127.0.0.1:9464".parse().unwrap()));

        let mut args = valid();
        args.extend_from_slice(&["--metricsAddress", "not-an-address"]);
        assert!(matches!(
            parse(&args).validate(),
            Err(ConfigError::InvalidMetricsAddress(_))
        ));
    }

    #[test]
    fn debug_flag_raises_log_level() {
        let mut args = valid();
        args.push("--debug");
        let settings = parse(&args).validate().unwrap();
        assert!(settings.debug);
        assert_eq!(settings.log_directive(), "tracking_loadgen=debug");
    }
}
