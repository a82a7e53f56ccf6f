use chrono::{DateTime, Duration, TimeZone, Utc};
use mm1::Job;

/// Fixed origin used by fixtures so assertions can use literal offsets.
pub fn fixture_origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Builds jobs with timestamps given as millisecond offsets from
/// [`fixture_origin`].
#[derive(Clone, Debug)]
pub struct JobFixture {
    origin: DateTime<Utc>,
    next_sequence: u64,
}

impl JobFixture {
    pub fn new() -> Self {
        Self {
            origin: fixture_origin(),
            next_sequence: 0,
        }
    }

    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    pub fn at(&self, offset_ms: i64) -> DateTime<Utc> {
        self.origin + Duration::milliseconds(offset_ms)
    }

    /// A job that has arrived but not been served.
    pub fn queued(&mut self, enter_ms: i64) -> Job {
        let job = Job::arrived(self.next_sequence, self.at(enter_ms));
        self.next_sequence += 1;
        job
    }

    /// A job that completed service, without metrics.
    pub fn completed(&mut self, enter_ms: i64, start_ms: i64, end_ms: i64) -> Job {
        let mut job = self.queued(enter_ms);
        job.begin_service(self.at(start_ms));
        job.finish_service(self.at(end_ms));
        job
    }

    /// A completed job with metrics attached, as the annotator emits it.
    pub fn annotated(&mut self, enter_ms: i64, start_ms: i64, end_ms: i64) -> Job {
        let mut job = self.completed(enter_ms, start_ms, end_ms);
        job.annotate();
        job
    }
}

impl Default for JobFixture {
    fn default() -> Self {
        Self::new()
    }
}
