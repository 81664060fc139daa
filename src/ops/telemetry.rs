// * Telemetry - JSON Logging and Prometheus Metrics
// * Structured logging setup plus per-gatherer counters and timings

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    Encoder, HistogramVec, TextEncoder,
};
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

lazy_static! {
    // * Wall time of one gather task
    pub static ref GATHER_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "insights_gather_duration_seconds",
        "Gather task duration in seconds",
        &["gatherer"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    ).expect("Invalid gather duration histogram");

    // * Records emitted per gather task
    pub static ref GATHER_RECORDS_TOTAL: CounterVec = register_counter_vec!(
        "insights_gather_records_total",
        "Total records emitted by gatherer",
        &["gatherer"]
    ).expect("Invalid gather records counter");

    // * Errors returned per gather task
    pub static ref GATHER_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "insights_gather_errors_total",
        "Total errors returned by gatherer",
        &["gatherer"]
    ).expect("Invalid gather errors counter");

    // * Raw container log bytes kept in records
    pub static ref LOG_BYTES_TOTAL: Counter = register_counter!(
        "insights_log_bytes_total",
        "Total container log bytes recorded"
    ).expect("Invalid log bytes counter");
}

/// Initializes the tracing subscriber with JSON formatting
///
/// # Example
/// ```ignore
/// use cluster_insights::ops::telemetry;
///
/// telemetry::init_tracing();
/// tracing::info!(namespace = "openshift-etcd", "Gathering events");
/// ```
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Initializes tracing with custom log level
pub fn init_tracing_with_level(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    // * try_init: a subscriber may already be installed by a test harness
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .try_init();
}

/// Initializes tracing with pretty formatting (for development)
pub fn init_tracing_pretty() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().pretty())
        .try_init();
}

/// Returns the current metrics in the Prometheus text format
pub fn get_metrics_string() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Records the outcome of one gather task
pub fn record_gather(gatherer: &str, elapsed: Duration, records: usize, errors: usize) {
    GATHER_DURATION_SECONDS
        .with_label_values(&[gatherer])
        .observe(elapsed.as_secs_f64());
    GATHER_RECORDS_TOTAL
        .with_label_values(&[gatherer])
        .inc_by(records as f64);
    GATHER_ERRORS_TOTAL
        .with_label_values(&[gatherer])
        .inc_by(errors as f64);
}

/// Records bytes of container log kept in a record
pub fn record_log_bytes(bytes: usize) {
    LOG_BYTES_TOTAL.inc_by(bytes as f64);
}
