//! Service bundle built once at startup.
//!
//! # Responsibilities
//! - Validate configuration and build transports for configured endpoints
//! - Construct Logger, ErrorHandler and PerformanceMonitor around one
//!   platform
//! - Start background tasks (periodic flush, memory sampling)
//! - Fan lifecycle events out and flush the tail on shutdown
//!
//! Services are handed to consumers by reference or clone; there are no
//! globals.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::{validate_config, ConfigError, TelemetryConfig, ValidationError};
use crate::errors::ErrorHandler;
use crate::lifecycle::{LifecycleEvent, Shutdown};
use crate::logging::{FlushOutcome, Logger};
use crate::performance::PerformanceMonitor;
use crate::platform::Platform;
use crate::transport::{HttpTransport, Transport, TransportError};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {}", format_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

fn http_transport(
    endpoint: Option<&str>,
    config: &TelemetryConfig,
) -> Result<Option<Arc<dyn Transport>>, TransportError> {
    let Some(endpoint) = endpoint else {
        return Ok(None);
    };
    let transport = HttpTransport::from_endpoint(endpoint, config.remote.request_timeout())?;
    Ok(Some(Arc::new(transport)))
}

/// Logger, error handler and performance monitor sharing one configuration.
pub struct Telemetry {
    config: TelemetryConfig,
    logger: Logger,
    errors: ErrorHandler,
    performance: PerformanceMonitor,
    shutdown: Shutdown,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Telemetry {
    /// Validate `config` and post to its configured endpoints over HTTP.
    pub fn from_config(
        config: TelemetryConfig,
        platform: Arc<dyn Platform>,
    ) -> Result<Self, TelemetryError> {
        validate_config(&config).map_err(TelemetryError::Invalid)?;

        let logging = http_transport(config.remote.logging_endpoint.as_deref(), &config)?;
        let monitoring = http_transport(config.remote.error_monitoring_endpoint.as_deref(), &config)?;
        Ok(Self::with_transports(config, platform, logging, monitoring))
    }

    /// Assemble services around caller-supplied transports.
    pub fn with_transports(
        config: TelemetryConfig,
        platform: Arc<dyn Platform>,
        logging: Option<Arc<dyn Transport>>,
        monitoring: Option<Arc<dyn Transport>>,
    ) -> Self {
        let logger = Logger::builder(config.logger.clone())
            .environment(config.environment)
            .source(config.source.as_str())
            .platform(platform.clone())
            .transport(logging)
            .build();

        let errors = ErrorHandler::builder(config.errors.clone(), logger.clone())
            .environment(config.environment)
            .source(config.source.as_str())
            .platform(platform.clone())
            .transport(monitoring)
            .build();

        let performance = PerformanceMonitor::new(config.performance.clone(), logger.clone(), platform);

        tracing::info!(
            environment = %config.environment,
            level = %config.logger.level,
            remote_logging = config.logger.enable_remote_logging,
            "Telemetry services constructed"
        );

        Self {
            config,
            logger,
            errors,
            performance,
            shutdown: Shutdown::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn error_handler(&self) -> &ErrorHandler {
        &self.errors
    }

    pub fn performance(&self) -> &PerformanceMonitor {
        &self.performance
    }

    /// Initialize the monitor and spawn background tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        self.performance.initialize();

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if !tasks.is_empty() {
            return;
        }
        tasks.push(self.logger.spawn_flush_task(self.shutdown.subscribe()));
        tasks.push(self.performance.spawn_memory_sampler(self.shutdown.subscribe()));

        tracing::debug!(tasks = tasks.len(), "Telemetry background tasks started");
    }

    /// Forward a lifecycle event to every service.
    pub async fn dispatch(&self, event: LifecycleEvent) -> Option<FlushOutcome> {
        self.performance.on_lifecycle(event);
        self.logger.on_lifecycle(event).await
    }

    /// Treat shutdown as unload: record session time, stop background tasks
    /// and wait for the final flush.
    pub async fn shutdown(&self) {
        self.performance.on_lifecycle(LifecycleEvent::Unload);

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        if tasks.is_empty() {
            self.logger.flush().await;
            return;
        }

        self.shutdown.trigger();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Telemetry task ended abnormally");
            }
        }
        tracing::info!("Telemetry shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::platform::NoopPlatform;
    use crate::transport::MemoryTransport;

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = TelemetryConfig::default();
        config.logger.batch_size = 0;
        config.remote.logging_endpoint = Some("ftp://collector".into());

        match Telemetry::from_config(config, Arc::new(NoopPlatform)) {
            Err(TelemetryError::Invalid(errors)) => assert_eq!(errors.len(), 2),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("invalid config accepted"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_flushes_queued_entries() {
        let mut config = TelemetryConfig::for_environment(Environment::Production);
        config.logger.enable_console_output = false;
        let transport = Arc::new(MemoryTransport::new());
        let telemetry =
            Telemetry::with_transports(config, Arc::new(NoopPlatform), Some(transport.clone()), None);

        telemetry.start();
        telemetry.logger().error("checkout failed", Some("Checkout"), None);
        telemetry.shutdown().await;

        let delivered = transport.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0]["logs"][0]["message"], "checkout failed");
        assert!(telemetry
            .performance()
            .metrics()
            .iter()
            .any(|m| m.name == "session_time"));
    }

    #[tokio::test]
    async fn test_dispatch_hidden_flushes() {
        let config = TelemetryConfig::for_environment(Environment::Production);
        let transport = Arc::new(MemoryTransport::new());
        let telemetry =
            Telemetry::with_transports(config, Arc::new(NoopPlatform), Some(transport.clone()), None);

        telemetry.logger().warn("tab hidden soon", None, None);
        let outcome = telemetry
            .dispatch(LifecycleEvent::Visibility(crate::lifecycle::Visibility::Hidden))
            .await;
        assert_eq!(outcome, Some(FlushOutcome::Delivered(1)));
    }
}
