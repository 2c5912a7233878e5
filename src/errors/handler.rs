//! Central error intake.
//!
//! # Flow
//! ```text
//! error ──▶ classify ──▶ rate limit ──▶ log (severity → level)
//!                            │                 │
//!                            ▼                 ▼
//!                       suppressed      report (production-like only)
//!                   (one warning/storm)        │
//!                                              ▼
//!                                first matching recovery strategy
//! ```
//!
//! # Failure postures
//! - [`ErrorHandler::handle_error`]: swallow and report, never propagates
//! - [`ErrorHandler::handle_async_error`]: retry with backoff, then surface
//!   the last error
//! - [`ErrorHandler::create_safe_wrapper`] and friends: silent, substitute a
//!   fallback value

use std::error::Error as StdError;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::time::Instant;

use crate::config::{Environment, ErrorHandlingConfig, Source};
use crate::errors::rate_limit::{Admission, ErrorWindow};
use crate::errors::recovery::{RecoveryError, RecoveryStrategy};
use crate::errors::AppError;
use crate::logging::{LogValue, Logger};
use crate::observability::metrics;
use crate::platform::{NoopPlatform, Platform};
use crate::resilience::calculate_backoff;
use crate::transport::Transport;

const HANDLER_CONTEXT: &str = "ErrorHandler";

struct HandlerInner {
    config: ErrorHandlingConfig,
    environment: Environment,
    source: String,
    logger: Logger,
    platform: Arc<dyn Platform>,
    transport: Option<Arc<dyn Transport>>,
    window: Mutex<ErrorWindow>,
    strategies: RwLock<Vec<Arc<dyn RecoveryStrategy>>>,
}

/// Turns errors into structured telemetry and optional recovery.
///
/// Cheap to clone; clones share the rate-limit window and strategy list.
#[derive(Clone)]
pub struct ErrorHandler {
    inner: Arc<HandlerInner>,
}

pub struct ErrorHandlerBuilder {
    config: ErrorHandlingConfig,
    logger: Logger,
    environment: Environment,
    source: String,
    platform: Arc<dyn Platform>,
    transport: Option<Arc<dyn Transport>>,
}

impl ErrorHandlerBuilder {
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = platform;
        self
    }

    /// Monitoring sink. Reports are only sent in production-like
    /// environments.
    pub fn transport(mut self, transport: Option<Arc<dyn Transport>>) -> Self {
        self.transport = transport;
        self
    }

    pub fn build(self) -> ErrorHandler {
        let window = ErrorWindow::new(self.config.max_errors_per_minute, self.config.window());
        ErrorHandler {
            inner: Arc::new(HandlerInner {
                config: self.config,
                environment: self.environment,
                source: self.source,
                logger: self.logger,
                platform: self.platform,
                transport: self.transport,
                window: Mutex::new(window),
                strategies: RwLock::new(Vec::new()),
            }),
        }
    }
}

impl ErrorHandler {
    pub fn builder(config: ErrorHandlingConfig, logger: Logger) -> ErrorHandlerBuilder {
        ErrorHandlerBuilder {
            config,
            environment: logger.environment(),
            logger,
            source: Source::default().0,
            platform: Arc::new(NoopPlatform),
            transport: None,
        }
    }

    pub fn new(config: ErrorHandlingConfig, logger: Logger) -> Self {
        Self::builder(config, logger).build()
    }

    pub fn config(&self) -> &ErrorHandlingConfig {
        &self.inner.config
    }

    fn lock_window(&self) -> MutexGuard<'_, ErrorWindow> {
        self.inner.window.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a strategy. Earlier registrations take priority.
    pub fn register_recovery_strategy<S>(&self, strategy: S)
    where
        S: RecoveryStrategy + 'static,
    {
        let mut strategies = self.inner.strategies.write().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(strategy = strategy.name(), position = strategies.len(), "Recovery strategy registered");
        strategies.push(Arc::new(strategy));
    }

    pub fn strategy_count(&self) -> usize {
        self.inner.strategies.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Errors admitted within the current window.
    pub fn recent_error_count(&self) -> usize {
        self.lock_window().recent(Instant::now())
    }

    /// Handle any error. Never propagates.
    ///
    /// Returns the matching recovery strategy's result, or `None` when the
    /// error was suppressed, nothing matched or recovery failed.
    pub fn handle_error(
        &self,
        error: &(dyn StdError + 'static),
        context: Option<&str>,
        attempt_recovery: bool,
    ) -> impl Future<Output = Option<LogValue>> + Send {
        let handler = self.clone();
        let error = AppError::classify(error);
        let context = context.map(str::to_owned);
        async move {
            handler
                .handle_app_error(error, context.as_deref(), attempt_recovery)
                .await
        }
    }

    /// Handle an already-classified error.
    pub async fn handle_app_error(
        &self,
        error: AppError,
        context: Option<&str>,
        attempt_recovery: bool,
    ) -> Option<LogValue> {
        let error = self.intake(error, context)?;
        self.report(&error).await;

        if attempt_recovery {
            self.attempt_recovery(&error).await
        } else {
            None
        }
    }

    /// Rate-limit, enrich and log. `None` when suppressed.
    fn intake(&self, mut error: AppError, context: Option<&str>) -> Option<AppError> {
        let admission = self.lock_window().admit(Instant::now());
        if let Admission::Suppressed { first } = admission {
            metrics::record_error_suppressed();
            if first {
                tracing::warn!(
                    limit = self.inner.config.max_errors_per_minute,
                    window_secs = self.inner.config.window_secs,
                    "Error rate limit exceeded, suppressing further errors"
                );
            }
            return None;
        }

        if error.metadata.url.is_none() {
            error.metadata.url = self.inner.platform.page_url();
        }
        if error.metadata.user_agent.is_none() {
            error.metadata.user_agent = self.inner.platform.user_agent();
        }
        if error.context.is_none() {
            error.context = context.map(str::to_owned);
        }

        metrics::record_error_handled(error.category.as_str(), error.severity.as_str());
        self.inner.logger.log(
            error.severity.log_level(),
            error.message.clone(),
            context.or(error.context.as_deref()),
            Some(error.log_data()),
        );
        Some(error)
    }

    async fn report(&self, error: &AppError) {
        if !self.inner.environment.is_production_like() {
            return;
        }
        let Some(transport) = &self.inner.transport else {
            return;
        };

        let payload = serde_json::json!({
            "error": error.report(),
            "source": self.inner.source,
            "environment": self.inner.environment,
        });
        if let Err(e) = transport.send(&payload).await {
            tracing::warn!(error = %e, category = %error.category, "Failed to report error to monitoring");
        }
    }

    async fn attempt_recovery(&self, error: &AppError) -> Option<LogValue> {
        let strategy = {
            let strategies = self.inner.strategies.read().unwrap_or_else(|e| e.into_inner());
            strategies.iter().find(|s| s.can_recover(error)).cloned()
        }?;

        let attempts = strategy.max_retries().max(1);
        for attempt in 1..=attempts {
            let outcome = match AssertUnwindSafe(strategy.recover(error)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(RecoveryError::Panicked(AppError::from_panic(payload.as_ref()).message)),
            };

            match outcome {
                Ok(value) => {
                    metrics::record_recovery("recovered");
                    self.inner.logger.info(
                        format!("Recovered from error using {}", strategy.name()),
                        Some(HANDLER_CONTEXT),
                        Some(LogValue::record([
                            ("strategy", LogValue::from(strategy.name())),
                            ("attempt", attempt.into()),
                        ])),
                    );
                    return Some(value);
                }
                Err(e) => {
                    self.inner.logger.warn(
                        format!("Recovery strategy {} failed", strategy.name()),
                        Some(HANDLER_CONTEXT),
                        Some(LogValue::record([
                            ("error", LogValue::from(e.to_string())),
                            ("attempt", attempt.into()),
                            ("maxRetries", attempts.into()),
                        ])),
                    );
                    if attempt < attempts {
                        tokio::time::sleep(strategy.retry_delay()).await;
                    }
                }
            }
        }

        metrics::record_recovery("failed");
        None
    }

    /// Retry `operation` with exponential backoff
    /// (`retry_delay * 2^(attempt-1)` plus jitter).
    ///
    /// After `max_retries` failed calls the last error is reported without
    /// recovery and returned to the caller.
    pub async fn handle_async_error<T, E, F, Fut>(
        &self,
        mut operation: F,
        context: Option<&str>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: StdError + 'static,
    {
        let attempts = max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= attempts {
                let classified = AppError::classify(&error);
                self.handle_app_error(classified, context, false).await;
                return Err(error);
            }

            let delay = calculate_backoff(attempt, retry_delay, Duration::MAX);
            tracing::debug!(
                attempt,
                max_retries = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Operation failed, retrying"
            );
            drop(error);
            tokio::time::sleep(delay).await;
        }
    }

    /// [`Self::handle_async_error`] with the configured retry defaults.
    pub async fn retry_with_defaults<T, E, F, Fut>(&self, operation: F, context: Option<&str>) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: StdError + 'static,
    {
        let config = &self.inner.config;
        self.handle_async_error(
            operation,
            context,
            config.default_max_retries,
            config.default_retry_delay(),
        )
        .await
    }

    /// Log synchronously, then report and recover in the background when a
    /// runtime is available.
    fn handle_detached(&self, error: AppError, context: Option<&str>) {
        let Some(error) = self.intake(error, context) else {
            return;
        };

        if let Ok(runtime) = Handle::try_current() {
            let handler = self.clone();
            runtime.spawn(async move {
                handler.report(&error).await;
                handler.attempt_recovery(&error).await;
            });
        }
    }

    /// Wrap a fallible function so errors and panics become `fallback`.
    pub fn create_safe_wrapper<A, T, E, F>(
        &self,
        f: F,
        context: Option<&str>,
        fallback: T,
    ) -> impl Fn(A) -> T
    where
        F: Fn(A) -> Result<T, E>,
        T: Clone,
        E: StdError + 'static,
    {
        let handler = self.clone();
        let context = context.map(str::to_owned);

        move |arg| {
            let error = match panic::catch_unwind(AssertUnwindSafe(|| f(arg))) {
                Ok(Ok(value)) => return value,
                Ok(Err(error)) => AppError::classify(&error),
                Err(payload) => AppError::from_panic(payload.as_ref()),
            };
            handler.handle_detached(error, context.as_deref());
            fallback.clone()
        }
    }

    /// Async counterpart of [`Self::create_safe_wrapper`].
    pub fn create_safe_async_wrapper<A, T, E, F, Fut>(
        &self,
        f: F,
        context: Option<&str>,
        fallback: T,
    ) -> impl Fn(A) -> BoxFuture<'static, T>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Clone + Send + 'static,
        E: StdError + 'static,
    {
        let handler = self.clone();
        let context = context.map(str::to_owned);

        move |arg| {
            let handler = handler.clone();
            let context = context.clone();
            let fallback = fallback.clone();

            match panic::catch_unwind(AssertUnwindSafe(|| f(arg))) {
                Ok(future) => Box::pin(async move {
                    handler.safe_async(future, context.as_deref(), fallback).await
                }),
                Err(payload) => {
                    let error = AppError::from_panic(payload.as_ref());
                    Box::pin(async move {
                        handler.handle_app_error(error, context.as_deref(), true).await;
                        fallback
                    })
                }
            }
        }
    }

    /// Await `future`; on error or panic handle it and return `fallback`.
    pub async fn safe_async<T, E, Fut>(&self, future: Fut, context: Option<&str>, fallback: T) -> T
    where
        Fut: Future<Output = Result<T, E>>,
        E: StdError + 'static,
    {
        let error = match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(value)) => return value,
            Ok(Err(error)) => AppError::classify(&error),
            Err(payload) => AppError::from_panic(payload.as_ref()),
        };
        self.handle_app_error(error, context, true).await;
        fallback
    }
}
