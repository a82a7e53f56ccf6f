use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::clock::SimClock;
use crate::config::QueueConfig;
use crate::dist::{ExpSampler, SeedStreams};
use crate::error::QueueError;
use crate::job::Job;
use crate::stats::QueueStats;
use crate::telemetry;

use super::annotate::CompletionAnnotator;
use super::arrival::ArrivalGenerator;
use super::service::ServiceProcessor;
use super::shutdown::ShutdownToken;
use super::stage::{LiveTasks, StageKind, StageReport};
use super::stream::JobStream;

/// Lifecycle of a queue instance. Transitions are one-way.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum LifecycleState {
    Created,
    Running,
    Stopped,
}

/// Buffers created at construction, consumed by `start`.
struct Pipeline {
    job_tx: mpsc::Sender<Job>,
    job_rx: mpsc::Receiver<Job>,
    completions: Option<(mpsc::Sender<Job>, mpsc::Receiver<Job>)>,
    output_tx: mpsc::Sender<Job>,
}

enum Lifecycle {
    Created(Pipeline),
    Running,
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> LifecycleState {
        match self {
            Lifecycle::Created(_) => LifecycleState::Created,
            Lifecycle::Running => LifecycleState::Running,
            Lifecycle::Stopped => LifecycleState::Stopped,
        }
    }
}

/// An M/M/1 queue: Poisson arrivals, exponential service, one server.
///
/// The queue runs as a pipeline of tokio tasks joined by bounded buffers:
/// arrival generator → job queue → service processor → completion queue →
/// annotator → output. Completed jobs are read from the [`JobStream`]
/// returned by [`take_output`](Self::take_output).
pub struct Mm1Queue {
    config: QueueConfig,
    stats: QueueStats,
    capacity: usize,
    shutdown_token: ShutdownToken,
    lifecycle: Mutex<Lifecycle>,
    output: Mutex<Option<JobStream>>,
    task_handles: Mutex<Vec<(StageKind, JoinHandle<StageReport>)>>,
    live_tasks: LiveTasks,
    started_at: Mutex<Option<DateTime<Utc>>>,
    reports: Mutex<Vec<StageReport>>,
}

impl fmt::Debug for Mm1Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mm1Queue")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .field("capacity", &self.capacity)
            .field("state", &self.state())
            .field("live_tasks", &self.live_tasks.count())
            .field("shutdown_cancelled", &self.shutdown_token.is_cancelled())
            .finish()
    }
}

impl Mm1Queue {
    /// Create a queue with arrival rate `lambda` and service rate `mu`, using
    /// default settings.
    ///
    /// # Errors
    ///
    /// - [`QueueError::InvalidArrivalRate`] if `lambda <= 0`.
    /// - [`QueueError::UnstableQueue`] if `mu <= lambda`.
    pub fn new(arrival_rate: f64, service_rate: f64) -> Result<Self, QueueError> {
        Self::with_config(QueueConfig::new(arrival_rate, service_rate))
    }

    /// Create a queue from a full configuration.
    ///
    /// Validates the rates, sizes the buffers and allocates them. No task is
    /// started.
    pub fn with_config(config: QueueConfig) -> Result<Self, QueueError> {
        let stats = QueueStats::new(config.arrival_rate, config.service_rate)?;
        let capacity = stats.buffer_capacity(config.safety_multiplier)?;
        telemetry::set_buffer_capacity(capacity);

        let shutdown_token = ShutdownToken::new();
        let (job_tx, job_rx) = mpsc::channel(capacity);
        let completions = config.annotate.then(|| mpsc::channel(capacity));
        let (output_tx, output_rx) = mpsc::channel(capacity);

        tracing::debug!(
            arrival_rate = config.arrival_rate,
            service_rate = config.service_rate,
            utilization = stats.utilization,
            capacity,
            "M/M/1 queue created"
        );

        Ok(Self {
            stats,
            capacity,
            lifecycle: Mutex::new(Lifecycle::Created(Pipeline {
                job_tx,
                job_rx,
                completions,
                output_tx,
            })),
            output: Mutex::new(Some(JobStream::new(output_rx, shutdown_token.clone()))),
            shutdown_token,
            task_handles: Mutex::new(Vec::new()),
            live_tasks: LiveTasks::default(),
            started_at: Mutex::new(None),
            reports: Mutex::new(Vec::new()),
            config,
        })
    }

    /// Get the queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Steady-state statistics the buffers were sized from.
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Capacity of each bounded buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.lock().state()
    }

    /// Wall-clock time returned by `start`, if the queue has been started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        *self.started_at.lock()
    }

    /// Number of pipeline tasks still alive.
    pub fn live_tasks(&self) -> usize {
        self.live_tasks.count()
    }

    /// Reports from stages that exited cleanly during `stop`. Stages aborted
    /// after the shutdown timeout have no report.
    pub fn stage_reports(&self) -> Vec<StageReport> {
        self.reports.lock().clone()
    }

    /// Take the stream of completed jobs. Returns `None` after the first call.
    pub fn take_output(&self) -> Option<JobStream> {
        self.output.lock().take()
    }

    /// Launch the pipeline tasks and return the wall-clock start time.
    ///
    /// # Errors
    ///
    /// [`QueueError::AlreadyStarted`] or [`QueueError::AlreadyStopped`] if the
    /// queue is not in the `Created` state.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(&self) -> Result<DateTime<Utc>, QueueError> {
        let mut seeds = SeedStreams::new(self.config.seed);
        let interarrival = ExpSampler::new(self.stats.arrival_rate, seeds.next_seed())
            .ok_or(QueueError::InvalidArrivalRate(self.stats.arrival_rate))?;
        let service_time = ExpSampler::new(self.stats.service_rate, seeds.next_seed()).ok_or(
            QueueError::UnstableQueue {
                arrival_rate: self.stats.arrival_rate,
                service_rate: self.stats.service_rate,
            },
        )?;

        // Held until every handle is registered, so a concurrent `stop` that
        // observes `Running` also observes all the tasks it must join.
        let mut lifecycle = self.lifecycle.lock();
        let pipeline = match std::mem::replace(&mut *lifecycle, Lifecycle::Running) {
            Lifecycle::Created(pipeline) => pipeline,
            Lifecycle::Running => return Err(QueueError::AlreadyStarted),
            Lifecycle::Stopped => {
                *lifecycle = Lifecycle::Stopped;
                return Err(QueueError::AlreadyStopped);
            }
        };

        let clock = SimClock::start();
        let started_at = clock.origin();
        *self.started_at.lock() = Some(started_at);

        tracing::info!(
            arrival_rate = self.stats.arrival_rate,
            service_rate = self.stats.service_rate,
            seed = seeds.master(),
            capacity = self.capacity,
            "Starting M/M/1 queue"
        );

        let Pipeline {
            job_tx,
            job_rx,
            completions,
            output_tx,
        } = pipeline;

        let (service_tx, annotator) = match completions {
            Some((done_tx, done_rx)) => (
                done_tx,
                Some(CompletionAnnotator {
                    completed: done_rx,
                    output: output_tx,
                    shutdown: self.shutdown_token.clone(),
                }),
            ),
            None => (output_tx, None),
        };

        let arrival = ArrivalGenerator {
            interarrival,
            clock,
            jobs: job_tx,
            shutdown: self.shutdown_token.clone(),
            policy: self.config.shutdown_policy,
        };
        let service = ServiceProcessor {
            service: service_time,
            clock,
            jobs: job_rx,
            completed: service_tx,
            shutdown: self.shutdown_token.clone(),
            policy: self.config.shutdown_policy,
        };

        self.spawn_stage(StageKind::Arrival, arrival.run());
        self.spawn_stage(StageKind::Service, service.run());
        if let Some(annotator) = annotator {
            self.spawn_stage(StageKind::Annotate, annotator.run());
        }
        drop(lifecycle);

        Ok(started_at)
    }

    /// Stop the pipeline.
    ///
    /// Broadcasts the shutdown signal, then waits for every task to exit,
    /// aborting any still running `shutdown_timeout_ms` after shutdown
    /// began. The budget is shared by all tasks. Buffers close as
    /// their owning tasks exit. Only the first call does any work; later or
    /// concurrent calls return immediately.
    pub async fn stop(&self) {
        let previous = {
            let mut lifecycle = self.lifecycle.lock();
            std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        };

        match previous {
            Lifecycle::Stopped => {
                tracing::debug!("M/M/1 queue already stopped");
                return;
            }
            Lifecycle::Created(pipeline) => {
                self.shutdown_token.cancel();
                drop(pipeline);
                tracing::info!("M/M/1 queue stopped before start");
                return;
            }
            Lifecycle::Running => {}
        }

        tracing::info!("Initiating graceful shutdown of M/M/1 queue");
        self.shutdown_token.cancel();

        let handles = std::mem::take(&mut *self.task_handles.lock());
        let timeout = std::time::Duration::from_millis(self.config.shutdown_timeout_ms);
        let reports = join_stages(handles, timeout).await;
        self.reports.lock().extend(reports);

        tracing::info!("M/M/1 queue shutdown complete");
    }

    fn spawn_stage<F>(&self, stage: StageKind, future: F)
    where
        F: std::future::Future<Output = StageReport> + Send + 'static,
    {
        let guard = self.live_tasks.enter();
        let handle = tokio::spawn(telemetry::instrument_stage(stage.as_str(), async move {
            let _guard = guard;
            future.await
        }));
        self.task_handles.lock().push((stage, handle));
    }
}

/// Join every stage against one shared deadline, aborting any still running
/// when it passes. Returns the reports of stages that exited on their own.
async fn join_stages(
    handles: Vec<(StageKind, JoinHandle<StageReport>)>,
    timeout: std::time::Duration,
) -> Vec<StageReport> {
    // `None` when the timeout is too large to express as an instant.
    let deadline = tokio::time::Instant::now().checked_add(timeout);
    let mut reports = Vec::with_capacity(handles.len());

    for (stage, mut handle) in handles {
        let joined = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, &mut handle).await,
            None => Ok((&mut handle).await),
        };
        match joined {
            Ok(Ok(report)) => {
                tracing::debug!(
                    stage = %report.stage,
                    forwarded = report.forwarded,
                    dropped = report.dropped,
                    "stage stopped"
                );
                reports.push(report);
            }
            Ok(Err(e)) => tracing::warn!("{stage} task failed: {e:?}"),
            Err(_) => {
                tracing::warn!("{stage} task timed out during shutdown, aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
    }

    reports
}

impl Drop for Mm1Queue {
    fn drop(&mut self) {
        // Tasks still running observe this and exit on their own.
        self.shutdown_token.cancel();
    }
}
