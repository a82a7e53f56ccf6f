use tokio::sync::mpsc;

use crate::job::Job;

use super::shutdown::ShutdownToken;
use super::stage::{forward, next_job, Forward, StageKind, StageReport};

/// Derives wait and service durations for completed jobs and publishes them
/// on the output buffer.
pub(crate) struct CompletionAnnotator {
    pub(crate) completed: mpsc::Receiver<Job>,
    pub(crate) output: mpsc::Sender<Job>,
    pub(crate) shutdown: ShutdownToken,
}

impl CompletionAnnotator {
    pub(crate) async fn run(mut self) -> StageReport {
        let mut report = StageReport::new(StageKind::Annotate);

        while let Some(mut job) = next_job(&mut self.completed, &self.shutdown).await {
            if job.annotate().is_none() {
                tracing::warn!(sequence = job.sequence, "received job without service timestamps");
            }

            match forward(&self.output, job, &self.shutdown).await {
                Forward::Sent => report.forwarded += 1,
                Forward::Cancelled(job) => {
                    crate::telemetry::record_job_dropped("annotate", job.sequence);
                    report.dropped += 1;
                    break;
                }
                Forward::Closed(_) => {
                    tracing::debug!("output stream released, annotator exiting");
                    report.dropped += 1;
                    break;
                }
            }
        }

        tracing::info!("Completion annotator shutting down");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_annotates_and_preserves_order() {
        let (done_tx, done_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let shutdown = ShutdownToken::new();

        let t0 = Utc::now();
        for sequence in 0..3u64 {
            let offset = sequence as i64;
            let mut job = Job::arrived(sequence, t0 + Duration::seconds(offset));
            job.begin_service(t0 + Duration::seconds(offset + 1));
            job.finish_service(t0 + Duration::seconds(offset + 3));
            done_tx.send(job).await.unwrap();
        }
        drop(done_tx);

        let annotator = CompletionAnnotator {
            completed: done_rx,
            output: out_tx,
            shutdown,
        };
        let report = annotator.run().await;
        assert_eq!(report.forwarded, 3);

        for expected in 0..3 {
            let job = out_rx.recv().await.expect("annotated job");
            assert_eq!(job.sequence, expected);
            let metrics = job.metrics.expect("metrics attached");
            assert_eq!(metrics.wait_secs, 1.0);
            assert_eq!(metrics.service_secs, 2.0);
        }
        assert!(out_rx.recv().await.is_none());
    }
}
