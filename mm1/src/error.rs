use thiserror::Error;

/// Errors surfaced by queue construction and lifecycle control.
///
/// Validation errors are terminal: they describe a malformed configuration
/// and are returned before any task is spawned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    /// Arrival rate (lambda) is zero, negative or not finite.
    #[error("arrival rate (lambda) must be positive, got {0}")]
    InvalidArrivalRate(f64),

    /// Service rate (mu) does not exceed the arrival rate, so the queue
    /// length would diverge.
    #[error(
        "service rate (mu) must be greater than arrival rate (lambda): mu={service_rate}, lambda={arrival_rate}"
    )]
    UnstableQueue {
        arrival_rate: f64,
        service_rate: f64,
    },

    /// Buffer safety multiplier is negative or not finite.
    #[error("safety multiplier must be finite and non-negative, got {0}")]
    InvalidSafetyMultiplier(f64),

    /// `start` was called on a queue that is already running.
    #[error("queue is already running")]
    AlreadyStarted,

    /// `start` was called on a queue that has been stopped.
    #[error("queue has been stopped and cannot be restarted")]
    AlreadyStopped,
}

impl QueueError {
    /// Whether this error came from parameter validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            QueueError::InvalidArrivalRate(_)
                | QueueError::UnstableQueue { .. }
                | QueueError::InvalidSafetyMultiplier(_)
        )
    }
}
