//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the telemetry
//! layer. All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Source tag attached to every remote payload.
pub const DEFAULT_SOURCE: &str = "octomatic-frontend";

/// Longest period accepted for the background flush and memory tickers.
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(86_400);

/// Root configuration for the telemetry layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Deployment environment the process runs in.
    pub environment: Environment,

    /// Source tag sent with remote payloads.
    pub source: Source,

    /// Logger settings.
    pub logger: LoggerConfig,

    /// Remote delivery endpoints.
    pub remote: RemoteConfig,

    /// Error intake settings.
    pub errors: ErrorHandlingConfig,

    /// Performance monitor settings.
    pub performance: PerformanceConfig,

    /// Settings for the crate's own tracing and metrics output.
    pub observability: ObservabilityConfig,
}

impl TelemetryConfig {
    /// Defaults tuned for the given environment.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            logger: LoggerConfig::for_environment(environment),
            observability: ObservabilityConfig::for_environment(environment),
            ..Self::default()
        }
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    /// Staging and production report to remote monitoring.
    pub fn is_production_like(self) -> bool {
        matches!(self, Environment::Staging | Environment::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Source tag wrapper so the default can live in one place.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Source(pub String);

impl Default for Source {
    fn default() -> Self {
        Self(DEFAULT_SOURCE.to_string())
    }
}

impl Source {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Logger configuration.
///
/// Set once at construction. Only the retry budget changes afterwards, and
/// that lives on the logger rather than here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Least severe level that is emitted.
    pub level: LogLevel,

    /// Queue WARN/ERROR entries for remote delivery.
    pub enable_remote_logging: bool,

    /// Mirror every emitted entry to the console (tracing).
    pub enable_console_output: bool,

    /// Failed flushes that may requeue their batch.
    pub max_retries: u32,

    /// Queue length that triggers an eager flush.
    pub batch_size: usize,

    /// Periodic flush interval in milliseconds.
    pub flush_interval_ms: u64,
}

impl LoggerConfig {
    pub fn for_environment(environment: Environment) -> Self {
        let production = environment == Environment::Production;
        Self {
            level: if production { LogLevel::Warn } else { LogLevel::Debug },
            enable_remote_logging: production,
            enable_console_output: !production,
            ..Self::default()
        }
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            enable_remote_logging: false,
            enable_console_output: true,
            max_retries: 3,
            batch_size: 10,
            flush_interval_ms: 30_000,
        }
    }
}

/// Remote delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Log batch endpoint (`NEXT_PUBLIC_LOGGING_ENDPOINT`).
    pub logging_endpoint: Option<String>,

    /// Error report endpoint (`NEXT_PUBLIC_ERROR_MONITORING_ENDPOINT`).
    pub error_monitoring_endpoint: Option<String>,

    /// Deadline for a single outbound POST in milliseconds.
    pub request_timeout_ms: u64,
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            logging_endpoint: None,
            error_monitoring_endpoint: None,
            request_timeout_ms: 5_000,
        }
    }
}

/// Error intake configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorHandlingConfig {
    /// Errors processed per rolling window before suppression kicks in.
    pub max_errors_per_minute: usize,

    /// Rolling window length in seconds.
    pub window_secs: u64,

    /// Default attempts for `handle_async_error`.
    pub default_max_retries: u32,

    /// Default base delay for `handle_async_error` in milliseconds.
    pub default_retry_delay_ms: u64,
}

impl ErrorHandlingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn default_retry_delay(&self) -> Duration {
        Duration::from_millis(self.default_retry_delay_ms)
    }
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            max_errors_per_minute: 10,
            window_secs: 60,
            default_max_retries: 3,
            default_retry_delay_ms: 1_000,
        }
    }
}

/// Performance monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Ring buffer capacity for recorded metrics.
    pub metrics_capacity: usize,

    /// Millisecond metrics above this value are logged as slow.
    pub slow_operation_threshold_ms: f64,

    /// Memory sampling interval in seconds.
    pub memory_sample_interval_secs: u64,

    /// Heap usage percentage that triggers a warning.
    pub memory_warning_percentage: f64,

    /// Thresholds used when synthesizing recommendations.
    pub thresholds: RecommendationThresholds,
}

impl PerformanceConfig {
    pub fn memory_sample_interval(&self) -> Duration {
        Duration::from_secs(self.memory_sample_interval_secs)
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            metrics_capacity: 100,
            slow_operation_threshold_ms: 1_000.0,
            memory_sample_interval_secs: 30,
            memory_warning_percentage: 80.0,
            thresholds: RecommendationThresholds::default(),
        }
    }
}

/// Limits beyond which the summary suggests an improvement.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub lcp_ms: f64,
    pub fcp_ms: f64,
    pub cls: f64,
    pub memory_percentage: f64,
    pub ttfb_ms: f64,
    pub fid_ms: f64,
    pub inp_ms: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            lcp_ms: 2_500.0,
            fcp_ms: 1_800.0,
            cls: 0.1,
            memory_percentage: 70.0,
            ttfb_ms: 600.0,
            fid_ms: 100.0,
            inp_ms: 200.0,
        }
    }
}

/// Settings for the crate's own diagnostics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing filter directive (overridden by `RUST_LOG`).
    pub log_filter: String,

    /// Emit JSON lines instead of the pretty formatter.
    pub json_output: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl ObservabilityConfig {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            json_output: environment == Environment::Production,
            ..Self::default()
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "octomatic_telemetry=debug".to_string(),
            json_output: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults() {
        let prod = LoggerConfig::for_environment(Environment::Production);
        assert_eq!(prod.level, LogLevel::Warn);
        assert!(prod.enable_remote_logging);
        assert!(!prod.enable_console_output);

        let dev = LoggerConfig::for_environment(Environment::Development);
        assert_eq!(dev.level, LogLevel::Debug);
        assert!(!dev.enable_remote_logging);
        assert!(dev.enable_console_output);
        assert_eq!(dev.batch_size, 10);
        assert_eq!(dev.flush_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_production_like() {
        assert!(Environment::Production.is_production_like());
        assert!(Environment::Staging.is_production_like());
        assert!(!Environment::Development.is_production_like());
        assert!(!Environment::Test.is_production_like());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("PROD".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(" staging ".parse::<Environment>(), Ok(Environment::Staging));
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TelemetryConfig = toml::from_str(
            r#"
            environment = "production"

            [logger]
            batch_size = 25
            "#,
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.logger.batch_size, 25);
        assert_eq!(config.logger.max_retries, 3);
        assert_eq!(config.source.as_str(), DEFAULT_SOURCE);
        assert_eq!(config.errors.max_errors_per_minute, 10);
        assert_eq!(config.performance.metrics_capacity, 100);
    }
}
