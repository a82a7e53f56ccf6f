//! Lifecycle and shutdown behaviour of the mm1 queue.

use std::time::Duration;

use mm1::{LifecycleState, Mm1Queue, QueueConfig, QueueError, ShutdownPolicy, StageKind};
use mm1_testkit::collect_jobs;
use tokio::time::Instant;

const GENEROUS: Duration = Duration::from_secs(24 * 3600);

/// Let freshly spawned stage tasks run up to their first wait.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_terminates_all_tasks() {
    let queue = Mm1Queue::with_config(QueueConfig::new(2.0, 4.0).with_seed(21)).unwrap();
    let mut stream = queue.take_output().unwrap();
    queue.start().unwrap();
    collect_jobs(&mut stream, 20, GENEROUS).await;
    assert_eq!(queue.live_tasks(), 3);

    queue.stop().await;

    assert_eq!(queue.state(), LifecycleState::Stopped);
    assert_eq!(queue.live_tasks(), 0);
    assert_eq!(queue.stage_reports().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_no_output_after_stop() {
    let queue = Mm1Queue::with_config(QueueConfig::new(50.0, 100.0).with_seed(8)).unwrap();
    let mut stream = queue.take_output().unwrap();
    queue.start().unwrap();

    // Let jobs pile up in the output buffer without reading them.
    tokio::time::sleep(Duration::from_secs(1)).await;
    queue.stop().await;

    assert!(stream.next().await.is_none());
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let queue = Mm1Queue::with_config(QueueConfig::new(1.0, 2.0).with_seed(1)).unwrap();
    queue.start().unwrap();
    settle().await;

    queue.stop().await;
    queue.stop().await;
    assert_eq!(queue.state(), LifecycleState::Stopped);
    assert_eq!(queue.live_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_stop_calls() {
    let queue = Mm1Queue::with_config(
        QueueConfig::new(1.0, 2.0)
            .with_seed(2)
            .with_shutdown_policy(ShutdownPolicy::Interrupt),
    )
    .unwrap();
    queue.start().unwrap();
    settle().await;

    tokio::join!(queue.stop(), queue.stop(), queue.stop());

    assert_eq!(queue.state(), LifecycleState::Stopped);
    assert_eq!(queue.live_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_twice_rejected() {
    let queue = Mm1Queue::new(1.0, 2.0).unwrap();
    queue.start().unwrap();
    assert_eq!(queue.start().unwrap_err(), QueueError::AlreadyStarted);
    assert_eq!(queue.live_tasks(), 3);
    queue.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_after_stop_rejected() {
    let queue = Mm1Queue::new(1.0, 2.0).unwrap();
    queue.start().unwrap();
    queue.stop().await;
    assert_eq!(queue.start().unwrap_err(), QueueError::AlreadyStopped);
    assert_eq!(queue.state(), LifecycleState::Stopped);
    assert_eq!(queue.live_tasks(), 0);
}

#[tokio::test]
async fn test_stop_before_start() {
    let queue = Mm1Queue::new(1.0, 2.0).unwrap();
    let mut stream = queue.take_output().unwrap();

    queue.stop().await;

    assert_eq!(queue.state(), LifecycleState::Stopped);
    assert_eq!(queue.live_tasks(), 0);
    assert!(queue.started_at().is_none());
    assert!(stream.next().await.is_none());
    assert_eq!(queue.start().unwrap_err(), QueueError::AlreadyStopped);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_policy_cancels_waits() {
    // Mean interarrival of 1000s: the generator is parked in a long wait.
    let queue = Mm1Queue::with_config(
        QueueConfig::new(0.001, 1.0)
            .with_seed(13)
            .with_shutdown_policy(ShutdownPolicy::Interrupt),
    )
    .unwrap();
    queue.start().unwrap();
    settle().await;

    let before = Instant::now();
    queue.stop().await;

    assert_eq!(before.elapsed(), Duration::ZERO);
    assert_eq!(queue.live_tasks(), 0);
    let arrival = queue
        .stage_reports()
        .into_iter()
        .find(|report| report.stage == StageKind::Arrival)
        .expect("arrival report");
    assert_eq!(arrival.forwarded, 0);
    assert_eq!(arrival.dropped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_complete_in_flight_finishes_wait_then_drops() {
    let queue = Mm1Queue::with_config(
        QueueConfig::new(0.01, 1.0)
            .with_seed(17)
            .with_shutdown_timeout(3_600_000),
    )
    .unwrap();
    assert_eq!(queue.config().shutdown_policy, ShutdownPolicy::CompleteInFlight);
    queue.start().unwrap();
    settle().await;

    let before = Instant::now();
    queue.stop().await;

    // The generator sat out its interarrival wait before noticing shutdown.
    assert!(before.elapsed() > Duration::ZERO);
    assert_eq!(queue.live_tasks(), 0);

    let arrival = queue
        .stage_reports()
        .into_iter()
        .find(|report| report.stage == StageKind::Arrival)
        .expect("arrival report");
    assert_eq!(arrival.forwarded, 0);
    assert_eq!(arrival.dropped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_timeout_aborts_stragglers() {
    // Mean interarrival of 10000s against a one second shutdown budget.
    let queue = Mm1Queue::with_config(
        QueueConfig::new(0.0001, 1.0)
            .with_seed(19)
            .with_shutdown_timeout(1_000),
    )
    .unwrap();
    queue.start().unwrap();
    settle().await;

    let before = Instant::now();
    queue.stop().await;

    assert!(before.elapsed() >= Duration::from_secs(1));
    assert!(before.elapsed() < Duration::from_secs(2));
    assert_eq!(queue.live_tasks(), 0);

    let reports = queue.stage_reports();
    assert!(reports.iter().all(|report| report.stage != StageKind::Arrival));
    assert!(reports.iter().any(|report| report.stage == StageKind::Service));
}

#[tokio::test(start_paused = true)]
async fn test_drop_signals_shutdown() {
    let queue = Mm1Queue::with_config(QueueConfig::new(5.0, 10.0).with_seed(23)).unwrap();
    let mut stream = queue.take_output().unwrap();
    queue.start().unwrap();
    collect_jobs(&mut stream, 5, GENEROUS).await;

    drop(queue);

    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_tiny_rates_keep_every_stage_alive() {
    // Draws far beyond what a Duration can hold.
    let queue = Mm1Queue::with_config(
        QueueConfig::new(1e-20, 2e-20)
            .with_seed(1)
            .with_shutdown_policy(ShutdownPolicy::Interrupt),
    )
    .unwrap();
    queue.start().unwrap();
    settle().await;
    assert_eq!(queue.live_tasks(), 3);

    queue.stop().await;

    let mut stages: Vec<StageKind> = queue.stage_reports().iter().map(|r| r.stage).collect();
    stages.sort_by_key(|stage| stage.as_str());
    assert_eq!(
        stages,
        vec![StageKind::Annotate, StageKind::Arrival, StageKind::Service]
    );
    assert_eq!(queue.live_tasks(), 0);
}
