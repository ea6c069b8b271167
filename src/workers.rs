// Bounded Worker Pool
//
// Fans a fixed number of jobs out across a fixed number of tokio tasks.
// Jobs travel through a bounded MPMC queue sized to the pool, so the producer
// never runs more than one pool's worth ahead of the workers. Outcomes travel
// back through a bounded channel to a single aggregator task, which is the only
// writer of the success/failure counters.

use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{debug, error, info};

use crate::metrics::AppMetrics;

/// Pause each worker takes after every job, successful or not
pub const THROTTLE_INTERVAL: Duration = Duration::from_secs(5);

/// One "send a synthetic event" unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    /// Position in enqueue order; only used for diagnostics
    pub index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Final success/failure counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub successes: u64,
    pub failures: u64,
}

impl Tally {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.successes += 1,
            Outcome::Failure => self.failures += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }
}

/// Fixed-size pool that drains exactly `total_jobs` jobs per run
pub struct WorkerPool {
    workers: usize,
    throttle: Duration,
    metrics: Option<Arc<AppMetrics>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            throttle: THROTTLE_INTERVAL,
            metrics: None,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `action` once per job and return the drained tally.
    ///
    /// Returns only after every worker has seen the queue close and the
    /// aggregator has counted every outcome they pushed. Action errors become
    /// `Outcome::Failure`; they never stop the run.
    pub async fn run<F, Fut, E>(&self, total_jobs: u64, action: F) -> Result<Tally>
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let (job_tx, job_rx) = flume::bounded::<Job>(self.workers);
        let (result_tx, result_rx) = mpsc::channel::<Outcome>(self.workers);
        let action = Arc::new(action);

        info!(workers = self.workers, jobs = total_jobs, "Starting worker pool");

        // Workers first, so the producer never fills the queue with nobody listening.
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let worker = Worker {
                id: worker_id,
                jobs: job_rx.clone(),
                results: result_tx.clone(),
                throttle: self.throttle,
                metrics: self.metrics.clone(),
            };
            handles.push(tokio::spawn(worker.run(action.clone())));
        }
        drop(job_rx);
        drop(result_tx);

        let producer = tokio::spawn(produce(job_tx, total_jobs, self.metrics.clone()));
        let aggregator = tokio::spawn(aggregate(result_rx, self.metrics.clone()));

        for (worker_id, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker_id, error = %e, "Worker task failed");
            }
        }

        // Every result sender is gone once the workers have exited, so the
        // aggregator sees the channel close after the last outcome.
        producer.await.context("job producer task failed")?;
        let tally = aggregator.await.context("result aggregator task failed")?;

        info!(
            successes = tally.successes,
            failures = tally.failures,
            "Worker pool drained"
        );
        Ok(tally)
    }
}

struct Worker {
    id: usize,
    jobs: flume::Receiver<Job>,
    results: mpsc::Sender<Outcome>,
    throttle: Duration,
    metrics: Option<Arc<AppMetrics>>,
}

impl Worker {
    async fn run<F, Fut, E>(self, action: Arc<F>)
    where
        F: Fn(Job) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: fmt::Display,
    {
        let _active = ActiveWorker::enter(self.metrics.clone());
        debug!(worker_id = self.id, "Worker started");

        // recv fails only once the producer is gone and the queue is empty
        while let Ok(job) = self.jobs.recv_async().await {
            // The action is called inside the async block so a panic while
            // building its future is caught too.
            let attempt = AssertUnwindSafe(async { action(job).await }).catch_unwind().await;
            let outcome = match attempt {
                Ok(Ok(())) => Outcome::Success,
                Ok(Err(e)) => {
                    debug!(worker_id = self.id, job = job.index, error = %e, "Failed to send event");
                    Outcome::Failure
                }
                Err(panic) => {
                    error!(
                        worker_id = self.id,
                        job = job.index,
                        panic = panic_message(panic.as_ref()),
                        "Job panicked"
                    );
                    Outcome::Failure
                }
            };

            if self.results.send(outcome).await.is_err() {
                error!(worker_id = self.id, "Result channel closed; dropping outcome");
                break;
            }

            if !self.throttle.is_zero() {
                sleep(self.throttle).await;
            }
        }

        debug!(worker_id = self.id, "Worker finished");
    }
}

/// Holds one slot of the `workers_active` gauge for as long as a worker runs
struct ActiveWorker(Option<Arc<AppMetrics>>);

impl ActiveWorker {
    fn enter(metrics: Option<Arc<AppMetrics>>) -> Self {
        if let Some(metrics) = &metrics {
            metrics.workers_active.inc();
        }
        Self(metrics)
    }
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        if let Some(metrics) = &self.0 {
            metrics.workers_active.dec();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

async fn produce(jobs: flume::Sender<Job>, total_jobs: u64, metrics: Option<Arc<AppMetrics>>) {
    for index in 0..total_jobs {
        if jobs.send_async(Job { index }).await.is_err() {
            // All workers are gone; nothing left to drain the queue.
            error!(enqueued = index, total_jobs, "Job queue closed before all jobs were enqueued");
            return;
        }
        if let Some(metrics) = &metrics {
            metrics.jobs_dispatched_total.inc();
        }
    }
    // Dropping `jobs` closes the queue.
}

async fn aggregate(mut results: mpsc::Receiver<Outcome>, metrics: Option<Arc<AppMetrics>>) -> Tally {
    let mut tally = Tally::default();
    while let Some(outcome) = results.recv().await {
        tally.record(outcome);
        if let Some(metrics) = &metrics {
            metrics.record_outcome(outcome);
        }
        debug!(
            outcome = outcome.as_str(),
            completed = tally.total(),
            successes = tally.successes,
            failures = tally.failures,
            "Recorded outcome"
        );
    }
    tally
}
