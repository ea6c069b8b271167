// Tracking Load Generator Library
//
// Everything the binary needs to fan synthetic identify/track events out to a
// tracking API: configuration, generators, payloads, the HTTP sender, the
// bounded worker pool, metrics and the final report.

pub mod config;
pub mod generators;
pub mod metrics;
pub mod models;
pub mod payload;
pub mod report;
pub mod sender;
pub mod workers;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, Environment, RunSettings};
pub use generators::IdentityGenerator;
pub use metrics::AppMetrics;
pub use models::*;
pub use report::RunReport;
pub use sender::{EventJobRunner, EventSender, SendError};
pub use workers::{Job, Outcome, Tally, WorkerPool};
