//! Tracing and telemetry instrumentation for mm1.
//!
//! This module provides helper functions for creating tracing spans and recording
//! metrics as jobs move through the pipeline. All functions work both with and
//! without the `metrics` feature flag.
//!
//! # Features
//!
//! - A tracing span per pipeline stage: arrival, service, annotate
//! - Integration with the `metrics` module for Prometheus metrics
//! - Helper functions that only log when the `metrics` feature is disabled
//!
//! # Example
//!
//! ```ignore
//! use mm1::telemetry::{instrument_stage, record_job_arrived};
//!
//! tokio::spawn(instrument_stage("arrival", async move {
//!     record_job_arrived(0);
//! }));
//! ```

use std::future::Future;
use tracing::{info_span, Instrument, Span};

/// Create a tracing span for a pipeline stage task.
///
/// # Arguments
/// * `stage` - The stage name (`arrival`, `service`, `annotate`)
#[must_use]
pub fn stage_span(stage: &'static str) -> Span {
    match stage {
        "arrival" => info_span!("mm1.arrival"),
        "service" => info_span!("mm1.service"),
        "annotate" => info_span!("mm1.annotate"),
        other => info_span!("mm1.stage", stage = other),
    }
}

/// Instrument a stage task's future with its span.
pub fn instrument_stage<F>(stage: &'static str, future: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    future.instrument(stage_span(stage))
}

/// Record the arrival of a job.
pub fn record_job_arrived(sequence: u64) {
    tracing::trace!(sequence, "job arrived");

    #[cfg(feature = "metrics")]
    crate::metrics::record_job_arrived();
}

/// Record that the server picked up a job.
pub fn record_service_started(sequence: u64, wait_secs: f64) {
    tracing::trace!(sequence, wait_secs, "service started");
}

/// Record a job leaving the server.
///
/// # Arguments
/// * `sequence` - Arrival order of the job
/// * `wait_secs` - Time the job spent queued
/// * `service_secs` - Time the job spent in service
pub fn record_job_completed(sequence: u64, wait_secs: f64, service_secs: f64) {
    tracing::debug!(sequence, wait_secs, service_secs, "job completed");

    #[cfg(feature = "metrics")]
    crate::metrics::record_job_completed(wait_secs, service_secs);
}

/// Record a job discarded because shutdown began while a stage held it.
///
/// # Arguments
/// * `stage` - The stage that dropped the job
/// * `sequence` - Arrival order of the job
pub fn record_job_dropped(stage: &'static str, sequence: u64) {
    tracing::debug!(stage, sequence, "job dropped on shutdown");

    #[cfg(feature = "metrics")]
    crate::metrics::record_job_dropped(stage);
}

/// Record the buffer capacity derived at construction.
pub fn set_buffer_capacity(capacity: usize) {
    tracing::debug!(capacity, "buffer capacity derived");

    #[cfg(feature = "metrics")]
    crate::metrics::set_buffer_capacity(capacity as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_spans() {
        assert_eq!(stage_span("arrival").metadata().unwrap().name(), "mm1.arrival");
        assert_eq!(stage_span("service").metadata().unwrap().name(), "mm1.service");
        assert_eq!(stage_span("annotate").metadata().unwrap().name(), "mm1.annotate");
        assert_eq!(stage_span("other").metadata().unwrap().name(), "mm1.stage");
    }

    #[tokio::test]
    async fn test_instrument_stage_passes_output_through() {
        let value = instrument_stage("service", async { 41 + 1 }).await;
        assert_eq!(value, 42);
    }

    #[test]
    fn test_record_helpers_do_not_panic() {
        record_job_arrived(0);
        record_service_started(0, 0.0);
        record_job_completed(0, 0.1, 0.2);
        record_job_dropped("service", 0);
        set_buffer_capacity(17);
    }
}
