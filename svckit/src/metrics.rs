use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref DATABASE_OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "database_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "status"]
    ).unwrap();

    pub static ref OPERATION_COUNTER: IntCounterVec = register_int_counter_vec!(
        "operations_total",
        "Total number of operations",
        &["operation", "status"]
    ).unwrap();

    pub static ref RETRY_COUNTER: IntCounterVec = register_int_counter_vec!(
        "operation_retries_total",
        "Total number of operation resubmissions",
        &["operation"]
    ).unwrap();
}

pub fn record_operation(operation: &str, success: bool, duration: f64) {
    let status = if success { "success" } else { "failure" };
    DATABASE_OPERATION_DURATION
        .with_label_values(&[operation, status])
        .observe(duration);
    OPERATION_COUNTER
        .with_label_values(&[operation, status])
        .inc();
}

pub fn record_retry(operation: &str) {
    RETRY_COUNTER.with_label_values(&[operation]).inc();
}

/// Text exposition of everything registered in the default registry.
pub fn render() -> String {
    let mut buffer = Vec::new();
    if TextEncoder::new().encode(&prometheus::gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
