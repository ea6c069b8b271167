// Tracking Load Generator
//
// Sends a fixed number of synthetic identify/track events to the tracking API
// through a bounded worker pool, then prints how many succeeded and how long
// the run took.

use std::{net::SocketAddr, sync::Arc, time::Instant};

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tracking_loadgen::{
    report::{banner, started_line},
    AppMetrics, Config, EventJobRunner, EventSender, RunReport, WorkerPool,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // Bad flags end the run before any traffic is sent.
    let settings = match config.validate() {
        Ok(settings) => settings,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Configuration:");
    info!("  - Environment: {} ({})", settings.environment, settings.endpoint());
    info!("  - Event type: {}", settings.event_kind);
    info!("  - Users: {}", settings.users);
    info!("  - Max concurrent: {}", settings.concurrency);

    let metrics = Arc::new(AppMetrics::new().context("Failed to create metrics registry")?);

    if let Some(addr) = settings.metrics_address {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind metrics endpoint on {}", addr))?;
        tokio::spawn(serve_metrics(listener, addr, metrics.clone()));
    }

    let sender = EventSender::new(settings.endpoint(), settings.write_key.as_str())
        .context("Failed to build HTTP client")?;
    let runner = Arc::new(EventJobRunner::new(sender, settings.event_kind).with_metrics(metrics.clone()));
    let pool = WorkerPool::new(settings.concurrency).with_metrics(metrics.clone());

    println!("{}", banner(settings.users, settings.event_kind));
    let started_at = Utc::now();
    let clock = Instant::now();
    println!("{}", started_line(settings.event_kind, started_at));

    let tally = pool
        .run(settings.users, move |job| {
            let runner = runner.clone();
            async move { runner.run(job).await }
        })
        .await?;

    let report = RunReport::new(started_at, Utc::now(), clock.elapsed(), tally);
    println!("{}", report);

    Ok(())
}

async fn serve_metrics(listener: TcpListener, addr: SocketAddr, metrics: Arc<AppMetrics>) {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(metrics);

    info!("Metrics endpoint: http://{}/metrics", addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Metrics endpoint failed: {}", e);
    }
}

async fn metrics_handler(State(metrics): State<Arc<AppMetrics>>) -> impl IntoResponse {
    match metrics.render() {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            output,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                String::new(),
            )
        }
    }
}

async fn health_handler() -> &'static str {
    "OK"
}
