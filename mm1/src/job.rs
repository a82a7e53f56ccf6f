use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Unique identifier of a job, time-ordered (UUIDv7).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl JobId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a job is in its lifecycle, judged by which timestamps are set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum JobState {
    /// Arrived, waiting for the server.
    Queued,
    /// Picked up by the server, service not finished.
    InService,
    /// Service finished, metrics not yet attached.
    Completed,
    /// Service finished and [`JobMetrics`] attached.
    Annotated,
}

/// Derived durations, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    /// Time spent queued before service, `start_service - enter_queue`.
    pub wait_secs: f64,
    /// Time spent in service, `end_service - start_service`.
    pub service_secs: f64,
}

/// One unit of work traversing the queue.
///
/// A job is moved from stage to stage and never shared: the arrival
/// generator creates it, the server stamps it, the annotator fills in
/// [`JobMetrics`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    /// Unique id assigned on arrival.
    pub id: JobId,
    /// Arrival order, starting at 0.
    pub sequence: u64,
    /// When the job arrived.
    pub enter_queue: DateTime<Utc>,
    /// When the server picked the job up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_service: Option<DateTime<Utc>>,
    /// When service finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_service: Option<DateTime<Utc>>,
    /// Wait and service durations, set by the annotator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<JobMetrics>,
}

impl Job {
    /// A freshly arrived job.
    pub fn arrived(sequence: u64, enter_queue: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            sequence,
            enter_queue,
            start_service: None,
            end_service: None,
            metrics: None,
        }
    }

    /// Lifecycle state implied by the timestamps and metrics present.
    pub fn state(&self) -> JobState {
        match (self.start_service, self.end_service, self.metrics) {
            (_, Some(_), Some(_)) => JobState::Annotated,
            (_, Some(_), None) => JobState::Completed,
            (Some(_), None, _) => JobState::InService,
            (None, None, _) => JobState::Queued,
        }
    }

    /// Record the moment the server picked the job up.
    pub fn begin_service(&mut self, at: DateTime<Utc>) {
        self.start_service = Some(at);
    }

    /// Record the moment service finished.
    pub fn finish_service(&mut self, at: DateTime<Utc>) {
        self.end_service = Some(at);
    }

    /// Time spent queued, once service has started.
    pub fn wait_duration(&self) -> Option<chrono::Duration> {
        self.start_service.map(|start| start - self.enter_queue)
    }

    /// Time spent in service, once service has finished.
    pub fn service_duration(&self) -> Option<chrono::Duration> {
        match (self.start_service, self.end_service) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Compute and attach [`JobMetrics`]. Returns `None` and leaves the job
    /// untouched if it has not completed service.
    pub fn annotate(&mut self) -> Option<JobMetrics> {
        let wait = self.wait_duration()?;
        let service = self.service_duration()?;
        let metrics = JobMetrics {
            wait_secs: seconds(wait),
            service_secs: seconds(service),
        };
        self.metrics = Some(metrics);
        Some(metrics)
    }

    /// Whether `enter_queue <= start_service <= end_service` holds for every
    /// timestamp that is set.
    pub fn timestamps_ordered(&self) -> bool {
        let start_ok = self
            .start_service
            .is_none_or(|start| self.enter_queue <= start);
        let end_ok = match (self.start_service, self.end_service) {
            (Some(start), Some(end)) => start <= end,
            (None, Some(_)) => false,
            _ => true,
        };
        start_ok && end_ok
    }
}

/// Fractional seconds of a chrono duration.
pub fn seconds(duration: chrono::Duration) -> f64 {
    duration
        .num_nanoseconds()
        .map(|nanos| nanos as f64 / 1e9)
        .unwrap_or_else(|| duration.num_milliseconds() as f64 / 1e3)
}
