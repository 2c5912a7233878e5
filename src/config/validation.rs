//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and endpoint URLs.
//! Every problem is reported, not just the first.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::schema::{TelemetryConfig, MAX_TICK_INTERVAL};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} is not a valid http(s) URL: {reason}")]
    InvalidEndpoint { field: &'static str, reason: String },

    #[error("{field} must be between 0 and 100 (got {value})")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("{field} must not exceed {max_secs}s")]
    TooLarge { field: &'static str, max_secs: u64 },
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &TelemetryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    positive(&mut errors, "logger.batch_size", config.logger.batch_size as u64);
    positive(&mut errors, "logger.flush_interval_ms", config.logger.flush_interval_ms);
    positive(&mut errors, "remote.request_timeout_ms", config.remote.request_timeout_ms);
    positive(
        &mut errors,
        "errors.max_errors_per_minute",
        config.errors.max_errors_per_minute as u64,
    );
    positive(&mut errors, "errors.window_secs", config.errors.window_secs);
    positive(
        &mut errors,
        "performance.metrics_capacity",
        config.performance.metrics_capacity as u64,
    );
    positive(
        &mut errors,
        "performance.memory_sample_interval_secs",
        config.performance.memory_sample_interval_secs,
    );
    at_most(&mut errors, "logger.flush_interval_ms", config.logger.flush_interval());
    at_most(
        &mut errors,
        "performance.memory_sample_interval_secs",
        config.performance.memory_sample_interval(),
    );

    endpoint(&mut errors, "remote.logging_endpoint", config.remote.logging_endpoint.as_deref());
    endpoint(
        &mut errors,
        "remote.error_monitoring_endpoint",
        config.remote.error_monitoring_endpoint.as_deref(),
    );

    let perf = &config.performance;
    non_negative(&mut errors, "performance.slow_operation_threshold_ms", perf.slow_operation_threshold_ms);
    percentage(&mut errors, "performance.memory_warning_percentage", perf.memory_warning_percentage);

    let t = &perf.thresholds;
    non_negative(&mut errors, "performance.thresholds.lcp_ms", t.lcp_ms);
    non_negative(&mut errors, "performance.thresholds.fcp_ms", t.fcp_ms);
    non_negative(&mut errors, "performance.thresholds.cls", t.cls);
    non_negative(&mut errors, "performance.thresholds.ttfb_ms", t.ttfb_ms);
    non_negative(&mut errors, "performance.thresholds.fid_ms", t.fid_ms);
    non_negative(&mut errors, "performance.thresholds.inp_ms", t.inp_ms);
    percentage(&mut errors, "performance.thresholds.memory_percentage", t.memory_percentage);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse an endpoint string, accepting only http and https.
pub fn parse_endpoint(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}

fn positive(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::NotPositive { field });
    }
}

fn at_most(errors: &mut Vec<ValidationError>, field: &'static str, value: Duration) {
    if value > MAX_TICK_INTERVAL {
        errors.push(ValidationError::TooLarge {
            field,
            max_secs: MAX_TICK_INTERVAL.as_secs(),
        });
    }
}

fn non_negative(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    if value.is_nan() || value < 0.0 {
        errors.push(ValidationError::Negative { field, value });
    }
}

fn percentage(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    if !(0.0..=100.0).contains(&value) {
        errors.push(ValidationError::OutOfRange { field, value });
    }
}

fn endpoint(errors: &mut Vec<ValidationError>, field: &'static str, value: Option<&str>) {
    if let Some(raw) = value {
        if let Err(reason) = parse_endpoint(raw) {
            errors.push(ValidationError::InvalidEndpoint { field, reason });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TelemetryConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = TelemetryConfig::default();
        config.logger.batch_size = 0;
        config.remote.logging_endpoint = Some("ftp://logs.example".into());
        config.remote.error_monitoring_endpoint = Some("not a url".into());
        config.performance.thresholds.cls = -0.5;
        config.performance.memory_warning_percentage = 120.0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::NotPositive { field: "logger.batch_size" }));
        assert!(errors
            .iter()
            .any(|e| e.to_string().contains("remote.logging_endpoint")));
    }

    #[test]
    fn test_tick_intervals_are_bounded() {
        let mut config = TelemetryConfig::default();
        config.logger.flush_interval_ms = 86_400_000;
        config.performance.memory_sample_interval_secs = 86_400;
        assert!(validate_config(&config).is_ok());

        config.logger.flush_interval_ms = u64::MAX;
        config.performance.memory_sample_interval_secs = u64::MAX;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::TooLarge {
                    field: "logger.flush_interval_ms",
                    max_secs: 86_400
                },
                ValidationError::TooLarge {
                    field: "performance.memory_sample_interval_secs",
                    max_secs: 86_400
                },
            ]
        );
    }

    #[test]
    fn test_parse_endpoint() {
        assert!(parse_endpoint("https://collector.example/logs").is_ok());
        assert!(parse_endpoint("http://127.0.0.1:4318").is_ok());
        assert!(parse_endpoint("mailto:ops@example.com").is_err());
    }
}
