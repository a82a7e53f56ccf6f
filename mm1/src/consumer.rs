//! Consumers of the completed-job stream.
//!
//! - [`JsonLinesWriter`] writes one JSON object per job per line.
//! - [`SummaryConsumer`] accumulates a [`RunSummary`] of counts and means.
//!
//! Both implement [`JobConsumer`] and are driven by [`drive`].

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::job::{seconds, Job};
use crate::runtime::JobStream;
use crate::stats::QueueStats;

/// Receives completed jobs in FIFO order.
#[async_trait]
pub trait JobConsumer: Send {
    /// Handle one completed job.
    async fn consume(&mut self, job: Job) -> anyhow::Result<()>;

    /// Called once after the stream ends.
    async fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Feed every job from `stream` into `consumer` until the stream ends.
///
/// Returns the number of jobs consumed.
pub async fn drive<C>(stream: &mut JobStream, consumer: &mut C) -> anyhow::Result<u64>
where
    C: JobConsumer + ?Sized,
{
    let mut consumed = 0u64;
    while let Some(job) = stream.next().await {
        consumer.consume(job).await?;
        consumed += 1;
    }
    consumer.finish().await?;
    Ok(consumed)
}

/// Serializes each job as a JSON line.
#[derive(Debug)]
pub struct JsonLinesWriter<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> JobConsumer for JsonLinesWriter<W> {
    async fn consume(&mut self, job: Job) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, &job)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    async fn finish(&mut self) -> anyhow::Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Running totals over the completed-job stream.
///
/// Interarrival gaps are measured between consecutive `enter_queue`
/// timestamps; the first gap is measured from the queue's start time.
#[derive(Clone, Debug)]
pub struct RunSummary {
    started_at: DateTime<Utc>,
    last_arrival: Option<DateTime<Utc>>,
    jobs: u64,
    total_interarrival_secs: f64,
    total_service_secs: f64,
    total_wait_secs: f64,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            last_arrival: None,
            jobs: 0,
            total_interarrival_secs: 0.0,
            total_service_secs: 0.0,
            total_wait_secs: 0.0,
        }
    }

    pub fn record(&mut self, job: &Job) {
        let previous = self.last_arrival.unwrap_or(self.started_at);
        self.total_interarrival_secs += seconds(job.enter_queue - previous);
        self.last_arrival = Some(job.enter_queue);

        let (wait, service) = match job.metrics {
            Some(metrics) => (metrics.wait_secs, metrics.service_secs),
            None => (
                job.wait_duration().map(seconds).unwrap_or_default(),
                job.service_duration().map(seconds).unwrap_or_default(),
            ),
        };
        self.total_wait_secs += wait;
        self.total_service_secs += service;
        self.jobs += 1;
    }

    pub fn jobs(&self) -> u64 {
        self.jobs
    }

    /// Snapshot the means, alongside theoretical values when `stats` is given.
    pub fn report(&self, stats: Option<&QueueStats>) -> SummaryReport {
        let mean = |total: f64| (self.jobs > 0).then(|| total / self.jobs as f64);
        SummaryReport {
            jobs: self.jobs,
            mean_interarrival_secs: mean(self.total_interarrival_secs),
            mean_service_secs: mean(self.total_service_secs),
            mean_wait_secs: mean(self.total_wait_secs),
            expected: stats.map(|stats| ExpectedMeans {
                interarrival_secs: stats.mean_interarrival_secs(),
                service_secs: stats.mean_service_secs(),
                wait_secs: stats.mean_wait_secs(),
            }),
        }
    }
}

/// Theoretical steady-state means.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpectedMeans {
    pub interarrival_secs: f64,
    pub service_secs: f64,
    pub wait_secs: f64,
}

/// Observed means over a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub jobs: u64,
    pub mean_interarrival_secs: Option<f64>,
    pub mean_service_secs: Option<f64>,
    pub mean_wait_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<ExpectedMeans>,
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn observed(value: Option<f64>) -> String {
            value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.6}"))
        }

        writeln!(f, "jobs:                  {}", self.jobs)?;
        let rows = [
            ("mean interarrival (s)", self.mean_interarrival_secs, self.expected.map(|e| e.interarrival_secs)),
            ("mean service (s)", self.mean_service_secs, self.expected.map(|e| e.service_secs)),
            ("mean wait (s)", self.mean_wait_secs, self.expected.map(|e| e.wait_secs)),
        ];
        for (label, value, expected) in rows {
            match expected {
                Some(expected) => writeln!(f, "{label:<22} {} (expected {expected:.6})", observed(value))?,
                None => writeln!(f, "{label:<22} {}", observed(value))?,
            }
        }
        Ok(())
    }
}

/// Consumer that folds every job into a shared [`RunSummary`].
///
/// The summary sits behind a lock so the caller can read it after the
/// consumer has been moved into a task.
#[derive(Clone, Debug)]
pub struct SummaryConsumer {
    summary: Arc<Mutex<RunSummary>>,
}

impl SummaryConsumer {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            summary: Arc::new(Mutex::new(RunSummary::new(started_at))),
        }
    }

    pub fn snapshot(&self) -> RunSummary {
        self.summary.lock().clone()
    }
}

#[async_trait]
impl JobConsumer for SummaryConsumer {
    async fn consume(&mut self, job: Job) -> anyhow::Result<()> {
        self.summary.lock().record(&job);
        Ok(())
    }
}
