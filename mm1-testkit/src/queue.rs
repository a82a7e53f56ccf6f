use chrono::{DateTime, Utc};
use mm1::job::seconds;
use mm1::{Job, JobStream};
use std::time::Duration;

/// Read exactly `count` jobs from `stream`, panicking if the stream ends or
/// `within` elapses first.
pub async fn collect_jobs(stream: &mut JobStream, count: usize, within: Duration) -> Vec<Job> {
    let collect = async {
        let mut jobs = Vec::with_capacity(count);
        while jobs.len() < count {
            match stream.next().await {
                Some(job) => jobs.push(job),
                None => panic!("stream ended after {} of {} jobs", jobs.len(), count),
            }
        }
        jobs
    };
    tokio::time::timeout(within, collect)
        .await
        .unwrap_or_else(|_| panic!("timed out collecting {count} jobs"))
}

/// Every job satisfies `enter_queue <= start_service <= end_service` and has
/// been served.
pub fn assert_timestamps_ordered(jobs: &[Job]) {
    for job in jobs {
        assert!(job.start_service.is_some(), "job {} was not served", job.sequence);
        assert!(job.end_service.is_some(), "job {} did not finish", job.sequence);
        assert!(job.timestamps_ordered(), "job {} timestamps out of order: {job:?}", job.sequence);
    }
}

/// Jobs appear in arrival order and are served in that order.
pub fn assert_fifo(jobs: &[Job]) {
    for pair in jobs.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.sequence < b.sequence, "sequence {} before {}", a.sequence, b.sequence);
        assert!(a.enter_queue <= b.enter_queue, "arrival of {} after {}", a.sequence, b.sequence);
        assert!(a.start_service <= b.start_service, "service of {} began after {}", a.sequence, b.sequence);
        assert!(a.end_service <= b.end_service, "service of {} ended after {}", a.sequence, b.sequence);
    }
}

/// No two jobs were in service at the same time.
pub fn assert_single_server(jobs: &[Job]) {
    for pair in jobs.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.end_service <= b.start_service,
            "jobs {} and {} overlap in service",
            a.sequence,
            b.sequence
        );
    }
}

/// Sequence numbers run `0, 1, 2, ...` with no gaps.
pub fn assert_contiguous_from_zero(jobs: &[Job]) {
    for (expected, job) in jobs.iter().enumerate() {
        assert_eq!(job.sequence, expected as u64, "gap in job sequence");
    }
}

/// Mean gap between consecutive arrivals, the first measured from `origin`.
pub fn mean_interarrival_secs(jobs: &[Job], origin: DateTime<Utc>) -> f64 {
    let mut previous = origin;
    let mut total = 0.0;
    for job in jobs {
        total += seconds(job.enter_queue - previous);
        previous = job.enter_queue;
    }
    total / jobs.len().max(1) as f64
}

/// Mean time in service.
pub fn mean_service_secs(jobs: &[Job]) -> f64 {
    let total: f64 = jobs
        .iter()
        .filter_map(|job| job.service_duration())
        .map(seconds)
        .sum();
    total / jobs.len().max(1) as f64
}
