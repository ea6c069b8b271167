// Tracking API Sender
//
// `EventSender` issues exactly one POST per call over a shared reqwest client
// and classifies the response. `EventJobRunner` is the per-job action handed
// to the worker pool: generate an identity, build its body, send it.

use std::{sync::Arc, time::{Duration, Instant}};

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

use crate::{
    generators::IdentityGenerator,
    metrics::AppMetrics,
    models::EventKind,
    payload::build_body,
    workers::Job,
};

/// Absolute per-request timeout applied by the shared client
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to build request body: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to create http request: {0}")]
    Build(#[source] reqwest::Error),

    #[error("error during http request: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to read response body: {0}")]
    ReadBody(#[source] reqwest::Error),

    #[error("request failed with status code {status}: {body}")]
    Status { status: u16, body: String },
}

/// Posts serialized events to one tracking endpoint
#[derive(Debug, Clone)]
pub struct EventSender {
    client: reqwest::Client,
    endpoint: String,
    write_key: String,
}

impl EventSender {
    pub fn new(endpoint: impl Into<String>, write_key: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, endpoint, write_key))
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        write_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            write_key: write_key.into(),
        }
    }

    /// Send one body. The write key is the basic-auth username with an empty password.
    pub async fn send(&self, body: String) -> Result<(), SendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.write_key, Some(""))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    SendError::Build(e)
                } else {
                    SendError::Transport(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(SendError::ReadBody)?;

        if !status.is_success() {
            return Err(SendError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(())
    }
}

/// The "send one event" action run by each worker for every job
pub struct EventJobRunner {
    sender: EventSender,
    generator: IdentityGenerator,
    kind: EventKind,
    metrics: Option<Arc<AppMetrics>>,
}

impl EventJobRunner {
    pub fn new(sender: EventSender, kind: EventKind) -> Self {
        Self {
            sender,
            generator: IdentityGenerator::default(),
            kind,
            metrics: None,
        }
    }

    pub fn with_generator(mut self, generator: IdentityGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn run(&self, job: Job) -> Result<(), SendError> {
        let event = self.generator.generate(self.kind);
        let body = build_body(&event)?;

        let start = Instant::now();
        let result = self.sender.send(body).await;
        if let Some(metrics) = &self.metrics {
            metrics.observe_request(start.elapsed().as_secs_f64());
        }

        if result.is_ok() {
            debug!(job = job.index, user_id = event.user_id(), kind = %self.kind, "Successfully sent event");
        }
        result
    }
}
