// Prometheus Metrics Collection
//
// Counters for dispatched jobs and their outcomes, request latency, and how
// many workers are still draining the queue. Rendered on `/metrics` when the
// run is started with a metrics address.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::workers::Outcome;

/// AppMetrics contains all Prometheus metrics for a load run
pub struct AppMetrics {
    pub registry: Registry,

    pub jobs_dispatched_total: IntCounter,
    pub events_total: IntCounterVec,
    pub request_duration: Histogram,
    pub workers_active: IntGauge,
}

impl AppMetrics {
    /// Create a registry with every metric registered
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let jobs_dispatched_total = IntCounter::new(
            "loadgen_jobs_dispatched_total",
            "Jobs handed to the worker queue",
        )?;

        let events_total = IntCounterVec::new(
            Opts::new("loadgen_events_total", "Events sent, by outcome"),
            &["outcome"],
        )?;

        let request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "loadgen_request_duration_seconds",
                "Latency of a single tracking API request",
            )
            .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        let workers_active = IntGauge::new(
            "loadgen_workers_active",
            "Workers still pulling jobs from the queue",
        )?;

        registry.register(Box::new(jobs_dispatched_total.clone()))?;
        registry.register(Box::new(events_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(workers_active.clone()))?;

        Ok(Self {
            registry,
            jobs_dispatched_total,
            events_total,
            request_duration,
            workers_active,
        })
    }

    pub fn record_outcome(&self, outcome: Outcome) {
        self.events_total.with_label_values(&[outcome.as_str()]).inc();
    }

    pub fn observe_request(&self, seconds: f64) {
        self.request_duration.observe(seconds);
    }

    /// Text exposition format for the `/metrics` endpoint
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
