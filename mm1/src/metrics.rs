//! Prometheus metrics instrumentation for mm1.
//!
//! All metrics are conditionally compiled behind the `metrics` feature flag.
//!
//! # Metrics
//!
//! ## Counters
//! - `mm1_jobs_arrived_total` - Jobs created by the arrival generator
//! - `mm1_jobs_completed_total` - Jobs that finished service
//! - `mm1_jobs_dropped_total` - Jobs discarded on shutdown, by stage
//!
//! ## Gauges
//! - `mm1_buffer_capacity` - Capacity of each pipeline buffer
//!
//! ## Histograms
//! - `mm1_wait_seconds` - Time jobs spent queued before service
//! - `mm1_service_seconds` - Time jobs spent in service
#![cfg(feature = "metrics")]

use prometheus::{exponential_buckets, Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry};
use std::sync::LazyLock;

/// Global Prometheus registry for mm1 metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static JOBS_ARRIVED_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    Counter::new("mm1_jobs_arrived_total", "Total number of jobs arrived")
        .expect("mm1_jobs_arrived_total metric creation failed")
});

pub static JOBS_COMPLETED_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    Counter::new("mm1_jobs_completed_total", "Total number of jobs completed")
        .expect("mm1_jobs_completed_total metric creation failed")
});

/// Labels:
/// - `stage`: The stage holding the job when shutdown began
pub static JOBS_DROPPED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new("mm1_jobs_dropped_total", "Total number of jobs dropped on shutdown");
    CounterVec::new(opts, &["stage"]).expect("mm1_jobs_dropped_total metric creation failed")
});

pub static BUFFER_CAPACITY: LazyLock<Gauge> = LazyLock::new(|| {
    Gauge::new("mm1_buffer_capacity", "Capacity of each pipeline buffer")
        .expect("mm1_buffer_capacity metric creation failed")
});

pub static WAIT_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let buckets = exponential_buckets(0.001, 2.0, 18).expect("bucket creation failed");
    Histogram::with_opts(
        HistogramOpts::new("mm1_wait_seconds", "Time jobs spent queued before service")
            .buckets(buckets),
    )
    .expect("mm1_wait_seconds metric creation failed")
});

pub static SERVICE_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let buckets = exponential_buckets(0.001, 2.0, 18).expect("bucket creation failed");
    Histogram::with_opts(
        HistogramOpts::new("mm1_service_seconds", "Time jobs spent in service").buckets(buckets),
    )
    .expect("mm1_service_seconds metric creation failed")
});

/// Initialize all metrics by registering them with the global registry.
///
/// This function is idempotent - calling it multiple times is safe.
pub fn init_metrics() -> anyhow::Result<()> {
    let registry = &*REGISTRY;

    for metric in [
        Box::new(JOBS_ARRIVED_TOTAL.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(JOBS_COMPLETED_TOTAL.clone()),
        Box::new(JOBS_DROPPED_TOTAL.clone()),
        Box::new(BUFFER_CAPACITY.clone()),
        Box::new(WAIT_SECONDS.clone()),
        Box::new(SERVICE_SECONDS.clone()),
    ] {
        if let Err(e) = registry.register(metric) {
            let msg = e.to_string();
            if !msg.contains("Duplicate metrics collector registration attempted") {
                return Err(e.into());
            }
        }
    }

    Ok(())
}

pub fn record_job_arrived() {
    JOBS_ARRIVED_TOTAL.inc();
}

pub fn record_job_completed(wait_secs: f64, service_secs: f64) {
    JOBS_COMPLETED_TOTAL.inc();
    WAIT_SECONDS.observe(wait_secs);
    SERVICE_SECONDS.observe(service_secs);
}

pub fn record_job_dropped(stage: &str) {
    JOBS_DROPPED_TOTAL.with_label_values(&[stage]).inc();
}

pub fn set_buffer_capacity(capacity: f64) {
    BUFFER_CAPACITY.set(capacity);
}

/// Gather all registered metrics in Prometheus text format.
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode_to_string(&metric_families)
        .map_err(Into::into)
}
