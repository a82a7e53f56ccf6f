use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::ShutdownPolicy;
use crate::job::Job;

use super::shutdown::ShutdownToken;

/// The concurrent tasks making up the pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// The arrival generator.
    Arrival,
    /// The single server.
    Service,
    /// The completion annotator.
    Annotate,
}

impl StageKind {
    /// Stable lowercase name, used for spans and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Arrival => "arrival",
            StageKind::Service => "service",
            StageKind::Annotate => "annotate",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage task reports when it exits.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// The stage that produced the report.
    pub stage: StageKind,
    /// Jobs this stage handed downstream.
    pub forwarded: u64,
    /// Jobs this stage was holding when shutdown began.
    pub dropped: u64,
}

impl StageReport {
    pub(crate) fn new(stage: StageKind) -> Self {
        Self {
            stage,
            forwarded: 0,
            dropped: 0,
        }
    }
}

/// Outcome of handing a job to the next buffer.
pub(crate) enum Forward {
    Sent,
    /// Shutdown began while waiting for room; the job is handed back.
    Cancelled(Job),
    /// The receiving half is gone.
    Closed(Job),
}

/// Send `job` downstream, waiting for room unless shutdown begins first.
pub(crate) async fn forward(tx: &mpsc::Sender<Job>, job: Job, shutdown: &ShutdownToken) -> Forward {
    if shutdown.is_cancelled() {
        return Forward::Cancelled(job);
    }
    let permit = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return Forward::Cancelled(job),
        permit = tx.reserve() => permit,
    };
    match permit {
        Ok(permit) => {
            permit.send(job);
            Forward::Sent
        }
        Err(_) => Forward::Closed(job),
    }
}

/// Receive the next job, or `None` once shutdown begins or the sender is gone.
pub(crate) async fn next_job(rx: &mut mpsc::Receiver<Job>, shutdown: &ShutdownToken) -> Option<Job> {
    if shutdown.is_cancelled() {
        return None;
    }
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        job = rx.recv() => job,
    }
}

/// Wait out a drawn duration. Returns `false` if the wait was cut short by
/// shutdown under [`ShutdownPolicy::Interrupt`].
pub(crate) async fn timer_wait(duration: Duration, shutdown: &ShutdownToken, policy: ShutdownPolicy) -> bool {
    match policy {
        ShutdownPolicy::CompleteInFlight => {
            tokio::time::sleep(duration).await;
            true
        }
        ShutdownPolicy::Interrupt => {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => false,
                _ = tokio::time::sleep(duration) => true,
            }
        }
    }
}

/// Counts live stage tasks. Each task holds a guard; the count drops when
/// the task returns or is aborted.
#[derive(Clone, Debug, Default)]
pub(crate) struct LiveTasks(Arc<AtomicUsize>);

impl LiveTasks {
    pub(crate) fn enter(&self) -> LiveTaskGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        LiveTaskGuard(Arc::clone(&self.0))
    }

    pub(crate) fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub(crate) struct LiveTaskGuard(Arc<AtomicUsize>);

impl Drop for LiveTaskGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_forward_cancelled_on_full_buffer() {
        let (tx, _rx) = mpsc::channel(1);
        let shutdown = ShutdownToken::new();
        assert!(matches!(
            forward(&tx, Job::arrived(0, Utc::now()), &shutdown).await,
            Forward::Sent
        ));

        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        match forward(&tx, Job::arrived(1, Utc::now()), &shutdown).await {
            Forward::Cancelled(job) => assert_eq!(job.sequence, 1),
            _ => panic!("expected cancellation"),
        }
    }

    #[tokio::test]
    async fn test_forward_reports_closed_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let shutdown = ShutdownToken::new();
        assert!(matches!(
            forward(&tx, Job::arrived(0, Utc::now()), &shutdown).await,
            Forward::Closed(_)
        ));
    }

    #[tokio::test]
    async fn test_next_job_stops_on_shutdown() {
        let (_tx, mut rx) = mpsc::channel::<Job>(1);
        let shutdown = ShutdownToken::new();
        shutdown.cancel();
        assert!(next_job(&mut rx, &shutdown).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_wait_policies() {
        let shutdown = ShutdownToken::new();
        shutdown.cancel();

        let before = tokio::time::Instant::now();
        assert!(!timer_wait(Duration::from_secs(60), &shutdown, ShutdownPolicy::Interrupt).await);
        assert_eq!(before.elapsed(), Duration::ZERO);

        assert!(timer_wait(Duration::from_secs(60), &shutdown, ShutdownPolicy::CompleteInFlight).await);
        assert!(before.elapsed() >= Duration::from_secs(60));
    }

    #[test]
    fn test_live_task_guard() {
        let live = LiveTasks::default();
        let a = live.enter();
        let b = live.enter();
        assert_eq!(live.count(), 2);
        drop(a);
        assert_eq!(live.count(), 1);
        drop(b);
        assert_eq!(live.count(), 0);
    }
}
