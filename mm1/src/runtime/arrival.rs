use tokio::sync::mpsc;

use crate::clock::SimClock;
use crate::config::ShutdownPolicy;
use crate::dist::ExpSampler;
use crate::job::Job;
use crate::telemetry;

use super::shutdown::ShutdownToken;
use super::stage::{forward, timer_wait, Forward, StageKind, StageReport};

/// Single producer emitting jobs at Poisson-process intervals.
pub(crate) struct ArrivalGenerator {
    pub(crate) interarrival: ExpSampler,
    pub(crate) clock: SimClock,
    pub(crate) jobs: mpsc::Sender<Job>,
    pub(crate) shutdown: ShutdownToken,
    pub(crate) policy: ShutdownPolicy,
}

impl ArrivalGenerator {
    pub(crate) async fn run(mut self) -> StageReport {
        let mut report = StageReport::new(StageKind::Arrival);
        let mut sequence = 0u64;

        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!("Arrival generator shutting down");
                break;
            }

            let gap = self.interarrival.sample();
            if !timer_wait(gap, &self.shutdown, self.policy).await {
                tracing::info!("Arrival generator interrupted");
                break;
            }

            let job = Job::arrived(sequence, self.clock.now());
            telemetry::record_job_arrived(sequence);

            match forward(&self.jobs, job, &self.shutdown).await {
                Forward::Sent => {
                    report.forwarded += 1;
                    sequence += 1;
                }
                Forward::Cancelled(job) => {
                    telemetry::record_job_dropped("arrival", job.sequence);
                    report.dropped += 1;
                    break;
                }
                Forward::Closed(job) => {
                    tracing::warn!(sequence = job.sequence, "job queue closed, arrival generator exiting");
                    report.dropped += 1;
                    break;
                }
            }
        }

        report
    }
}
