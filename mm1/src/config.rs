use serde::{Deserialize, Serialize};

use crate::stats::DEFAULT_SAFETY_MULTIPLIER;

/// How running tasks react to a stop request while suspended on a timer.
///
/// Waits on a buffer (full send, empty receive) are always abandoned on
/// shutdown; this only governs the drawn interarrival and service waits.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Let an in-progress timer wait run to completion, then observe the stop
    /// request. The job produced by that wait is dropped.
    #[default]
    CompleteInFlight,
    /// Abandon the timer wait as soon as the stop request arrives.
    Interrupt,
}

/// Configuration for an M/M/1 queue instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Arrival rate (lambda), jobs per second.
    pub arrival_rate: f64,
    /// Service rate (mu), jobs per second.
    pub service_rate: f64,
    /// Standard deviations of queue length added when sizing buffers.
    pub safety_multiplier: f64,
    /// Master seed for the per-task random sources. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Whether the completion annotator stage runs.
    pub annotate: bool,
    /// Reaction to a stop request during a timer wait.
    pub shutdown_policy: ShutdownPolicy,
    /// How long `stop` waits for each task before aborting it, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl QueueConfig {
    /// Create a configuration for the given rates with default settings.
    pub fn new(arrival_rate: f64, service_rate: f64) -> Self {
        Self {
            arrival_rate,
            service_rate,
            safety_multiplier: DEFAULT_SAFETY_MULTIPLIER,
            seed: None,
            annotate: true,
            shutdown_policy: ShutdownPolicy::default(),
            shutdown_timeout_ms: 30_000,
        }
    }

    /// Set the buffer safety multiplier.
    pub fn with_safety_multiplier(mut self, k: f64) -> Self {
        self.safety_multiplier = k;
        self
    }

    /// Seed the random sources for a reproducible run.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable the completion annotator.
    pub fn with_annotator(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Set the shutdown policy.
    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }

    /// Set the per-task shutdown timeout.
    pub fn with_shutdown_timeout(mut self, ms: u64) -> Self {
        self.shutdown_timeout_ms = ms;
        self
    }
}
