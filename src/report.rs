// Console Report
//
// What gets printed around a run: the banner before the first job and the
// summary once the pool has drained.

use std::{fmt, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{models::EventKind, workers::Tally};

pub fn banner(users: u64, kind: EventKind) -> String {
    format!(
        "Hi there! I'm going to attempt to send {} {} events to a workspace.",
        users, kind
    )
}

pub fn started_line(kind: EventKind, started_at: DateTime<Utc>) -> String {
    format!("Began sending {} events at: {}", kind, rfc3339(started_at))
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub tally: Tally,
}

impl RunReport {
    pub fn new(started_at: DateTime<Utc>, finished_at: DateTime<Utc>, elapsed: Duration, tally: Tally) -> Self {
        Self {
            started_at,
            finished_at,
            elapsed,
            tally,
        }
    }

    /// Completed calls per second of wall time
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.tally.total() as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Completed sending events at: {}", rfc3339(self.finished_at))?;
        writeln!(f, "Number of successful calls: {}", self.tally.successes)?;
        writeln!(f, "Number of failed calls: {}", self.tally.failures)?;
        writeln!(f, "Time duration: {:?}", self.elapsed)?;
        write!(f, "Throughput: {:.2} events/s", self.throughput())
    }
}
