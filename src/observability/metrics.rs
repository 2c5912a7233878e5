//! Metrics collection and exposition.
//!
//! # Metrics
//! - `telemetry_log_entries_total` (counter): emitted entries by level
//! - `telemetry_log_queue_depth` (gauge): entries awaiting remote delivery
//! - `telemetry_log_flushes_total` (counter): flush attempts by outcome
//! - `telemetry_errors_handled_total` (counter): by category and severity
//! - `telemetry_errors_suppressed_total` (counter): dropped by the rate limiter
//! - `telemetry_recoveries_total` (counter): recovery attempts by outcome
//! - `telemetry_performance_metric` (histogram): recorded values by unit
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with an HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_log_entry(level: &'static str) {
    counter!("telemetry_log_entries_total", "level" => level).increment(1);
}

pub fn record_queue_depth(depth: usize) {
    gauge!("telemetry_log_queue_depth").set(depth as f64);
}

pub fn record_flush(outcome: &'static str, entries: usize) {
    counter!("telemetry_log_flushes_total", "outcome" => outcome).increment(1);
    histogram!("telemetry_log_flush_batch_size").record(entries as f64);
}

pub fn record_error_handled(category: &'static str, severity: &'static str) {
    counter!(
        "telemetry_errors_handled_total",
        "category" => category,
        "severity" => severity
    )
    .increment(1);
}

pub fn record_error_suppressed() {
    counter!("telemetry_errors_suppressed_total").increment(1);
}

pub fn record_recovery(outcome: &'static str) {
    counter!("telemetry_recoveries_total", "outcome" => outcome).increment(1);
}

pub fn record_performance_metric(unit: &'static str, value: f64) {
    histogram!("telemetry_performance_metric", "unit" => unit).record(value);
}
