use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Default number of standard deviations of queue length added on top of the
/// expected length when sizing buffers.
pub const DEFAULT_SAFETY_MULTIPLIER: f64 = 10.0;

/// Upper bound on any single buffer's capacity.
///
/// Utilization arbitrarily close to 1 drives the derived capacity towards
/// infinity; the channel allocator needs a finite bound.
pub const MAX_BUFFER_CAPACITY: usize = 1 << 20;

/// Steady-state statistics of a stable M/M/1 queue.
///
/// Constructing one is the parameter validation step: it only exists for
/// `lambda > 0` and `mu > lambda`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Arrival rate (lambda), jobs per second.
    pub arrival_rate: f64,
    /// Service rate (mu), jobs per second.
    pub service_rate: f64,
    /// Utilization, `lambda / mu`.
    pub utilization: f64,
    /// Expected number of jobs in the system, `rho / (1 - rho)`.
    pub expected_length: f64,
    /// Standard deviation of the number of jobs, `sqrt(rho / (1 - rho)^2)`.
    pub length_std_dev: f64,
}

impl QueueStats {
    /// Validate the rate pair and derive the steady-state statistics.
    ///
    /// # Errors
    ///
    /// - [`QueueError::InvalidArrivalRate`] if `arrival_rate <= 0` or is not finite.
    /// - [`QueueError::UnstableQueue`] if `service_rate <= arrival_rate` or is not finite.
    pub fn new(arrival_rate: f64, service_rate: f64) -> Result<Self, QueueError> {
        if !arrival_rate.is_finite() || arrival_rate <= 0.0 {
            return Err(QueueError::InvalidArrivalRate(arrival_rate));
        }
        if !service_rate.is_finite() || service_rate <= arrival_rate {
            return Err(QueueError::UnstableQueue {
                arrival_rate,
                service_rate,
            });
        }

        let utilization = arrival_rate / service_rate;
        let idle = 1.0 - utilization;
        let expected_length = utilization / idle;
        let length_std_dev = (utilization / (idle * idle)).sqrt();

        Ok(Self {
            arrival_rate,
            service_rate,
            utilization,
            expected_length,
            length_std_dev,
        })
    }

    /// Buffer capacity `ceil(1 + L + k * sigma)`, clamped to
    /// `[1, MAX_BUFFER_CAPACITY]`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidSafetyMultiplier`] for a negative or
    /// non-finite `safety_multiplier`.
    pub fn buffer_capacity(&self, safety_multiplier: f64) -> Result<usize, QueueError> {
        if !safety_multiplier.is_finite() || safety_multiplier < 0.0 {
            return Err(QueueError::InvalidSafetyMultiplier(safety_multiplier));
        }

        let raw = (1.0 + self.expected_length + safety_multiplier * self.length_std_dev).ceil();
        if raw >= MAX_BUFFER_CAPACITY as f64 {
            return Ok(MAX_BUFFER_CAPACITY);
        }
        Ok((raw as usize).max(1))
    }

    /// Mean time between arrivals, `1 / lambda`, in seconds.
    pub fn mean_interarrival_secs(&self) -> f64 {
        1.0 / self.arrival_rate
    }

    /// Mean service time, `1 / mu`, in seconds.
    pub fn mean_service_secs(&self) -> f64 {
        1.0 / self.service_rate
    }

    /// Mean time spent waiting before service, `rho / (mu - lambda)`.
    pub fn mean_wait_secs(&self) -> f64 {
        self.utilization / (self.service_rate - self.arrival_rate)
    }

    /// Mean time in the system (wait + service), `1 / (mu - lambda)`.
    pub fn mean_sojourn_secs(&self) -> f64 {
        1.0 / (self.service_rate - self.arrival_rate)
    }
}
