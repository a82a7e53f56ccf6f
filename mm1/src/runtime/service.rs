use tokio::sync::mpsc;

use crate::clock::SimClock;
use crate::config::ShutdownPolicy;
use crate::dist::ExpSampler;
use crate::job::{seconds, Job};
use crate::telemetry;

use super::shutdown::ShutdownToken;
use super::stage::{forward, next_job, timer_wait, Forward, StageKind, StageReport};

/// The single server.
///
/// Jobs are taken strictly in buffer order and served one at a time: the next
/// job is not dequeued until the current one has been handed downstream, so
/// service intervals never overlap.
pub(crate) struct ServiceProcessor {
    pub(crate) service: ExpSampler,
    pub(crate) clock: SimClock,
    pub(crate) jobs: mpsc::Receiver<Job>,
    pub(crate) completed: mpsc::Sender<Job>,
    pub(crate) shutdown: ShutdownToken,
    pub(crate) policy: ShutdownPolicy,
}

impl ServiceProcessor {
    pub(crate) async fn run(mut self) -> StageReport {
        let mut report = StageReport::new(StageKind::Service);

        loop {
            let Some(mut job) = next_job(&mut self.jobs, &self.shutdown).await else {
                tracing::info!("Service processor shutting down");
                break;
            };

            let started = self.clock.now();
            job.begin_service(started);
            telemetry::record_service_started(job.sequence, seconds(started - job.enter_queue));

            let duration = self.service.sample();
            if !timer_wait(duration, &self.shutdown, self.policy).await {
                telemetry::record_job_dropped("service", job.sequence);
                report.dropped += 1;
                tracing::info!("Service processor interrupted");
                break;
            }

            let finished = self.clock.now();
            job.finish_service(finished);
            telemetry::record_job_completed(
                job.sequence,
                seconds(started - job.enter_queue),
                seconds(finished - started),
            );

            match forward(&self.completed, job, &self.shutdown).await {
                Forward::Sent => report.forwarded += 1,
                Forward::Cancelled(job) => {
                    telemetry::record_job_dropped("service", job.sequence);
                    report.dropped += 1;
                    break;
                }
                Forward::Closed(job) => {
                    tracing::warn!(sequence = job.sequence, "completion queue closed, service processor exiting");
                    report.dropped += 1;
                    break;
                }
            }
        }

        report
    }
}
