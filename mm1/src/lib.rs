//! mm1 - M/M/1 queue simulation on tokio.
//!
//! Simulates a single-server queue with Poisson arrivals and exponentially
//! distributed service times, in real (or tokio-virtual) time, producing a
//! stream of completed jobs with lifecycle timestamps.
//!
//! # Core Concepts
//!
//! - **Validation**: [`QueueStats`] checks that `lambda > 0` and `mu > lambda`
//!   and derives the buffer capacity `ceil(1 + L + k * sigma)` from the
//!   expected queue length `L` and its standard deviation `sigma`.
//!
//! - **Job**: the [`Job`] record moved through the pipeline, stamped on
//!   arrival, service start and service end.
//!
//! - **Runtime**: [`Mm1Queue`] owns the bounded buffers and runs three tokio
//!   tasks (arrival generator, single server, completion annotator) joined by
//!   them. A single [`ShutdownToken`] stops all of them.
//!
//! - **Consumers**: [`consumer::JsonLinesWriter`] and
//!   [`consumer::SummaryConsumer`] read the output [`JobStream`].
//!
//! # Feature Flags
//!
//! - `metrics` - Prometheus metrics support
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> Result<(), mm1::QueueError> {
//! let queue = mm1::Mm1Queue::new(1.0, 2.0)?;
//! let mut jobs = queue.take_output().expect("output not yet taken");
//! let started_at = queue.start()?;
//!
//! while let Some(job) = jobs.next().await {
//!     println!("{} waited {:?}", job.sequence, job.wait_duration());
//!     # break;
//! }
//! queue.stop().await;
//! # let _ = started_at;
//! # Ok(())
//! # }
//! ```

/// Monotonic, wall-anchored clock used to stamp jobs.
pub mod clock;

/// Configuration for queue instances.
///
/// The `config` module defines [`QueueConfig`] and [`ShutdownPolicy`].
pub mod config;

/// Consumers of the completed-job stream.
pub mod consumer;

/// Exponential samplers and per-task seed derivation.
pub mod dist;

/// Error types.
pub mod error;

/// The job record and its derived metrics.
pub mod job;

#[cfg(feature = "metrics")]
/// Prometheus metrics, enabled by the `metrics` feature.
pub mod metrics;

/// Runtime orchestration of the pipeline tasks.
///
/// The `runtime` module provides [`Mm1Queue`] and its lifecycle, the
/// [`ShutdownToken`] broadcast to every task, and the output [`JobStream`].
pub mod runtime;

/// Steady-state M/M/1 statistics and buffer sizing.
pub mod stats;

/// Tracing spans and metric recording helpers.
pub mod telemetry;

pub use config::{QueueConfig, ShutdownPolicy};
pub use error::QueueError;
pub use job::{Job, JobId, JobMetrics, JobState};
pub use runtime::{JobStream, LifecycleState, Mm1Queue, ShutdownToken, StageKind, StageReport};
pub use stats::{QueueStats, DEFAULT_SAFETY_MULTIPLIER};
