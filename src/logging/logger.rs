//! The batching logger.
//!
//! # Flow
//! ```text
//! log call ──▶ level filter ──▶ LogEntry ──┬──▶ console mirror (if enabled)
//!                                          └──▶ remote queue (WARN/ERROR only)
//!                                                  │
//!           queue reaches batch_size ──────────────┤
//!           flush interval elapses ────────────────┤
//!           tab hidden / unload ───────────────────┤
//!                                                  ▼
//!                                           POST { logs, source, environment }
//!                                                  │ failure
//!                                                  ▼
//!                               requeue at front while retry budget lasts
//! ```
//!
//! Logging calls never block and never fail. Remote delivery is best effort:
//! a reload or crash may lose whatever is still queued.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::config::{Environment, LoggerConfig, Source, MAX_TICK_INTERVAL};
use crate::lifecycle::LifecycleEvent;
use crate::logging::console::{Console, TracingConsole};
use crate::logging::entry::{LogBatch, LogEntry};
use crate::logging::{LogLevel, LogValue};
use crate::observability::metrics;
use crate::platform::{NoopPlatform, Platform};
use crate::transport::{Transport, TransportError};

/// Result of a single flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Remote logging is off or has no endpoint.
    Disabled,
    /// Nothing was queued.
    Empty,
    /// The batch reached the collector.
    Delivered(usize),
    /// Delivery failed and the batch went back to the front of the queue.
    Requeued(usize),
    /// Delivery failed with no retry budget left; the batch is gone.
    Dropped(usize),
}

struct LoggerInner {
    config: LoggerConfig,
    environment: Environment,
    source: String,
    session_id: String,
    platform: Arc<dyn Platform>,
    console: Arc<dyn Console>,
    transport: Option<Arc<dyn Transport>>,
    queue: Mutex<VecDeque<LogEntry>>,
    retries_remaining: AtomicU32,
    flush_scheduled: AtomicBool,
}

/// Structured, levelled logger with batched remote delivery.
///
/// Cheap to clone; clones share the queue and session.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

/// Builder for [`Logger`].
pub struct LoggerBuilder {
    config: LoggerConfig,
    environment: Environment,
    source: String,
    session_id: Option<String>,
    platform: Arc<dyn Platform>,
    console: Arc<dyn Console>,
    transport: Option<Arc<dyn Transport>>,
}

impl LoggerBuilder {
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = platform;
        self
    }

    pub fn console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    /// Remote sink for WARN/ERROR batches. Without one nothing is queued.
    pub fn transport(mut self, transport: Option<Arc<dyn Transport>>) -> Self {
        self.transport = transport;
        self
    }

    pub fn build(self) -> Logger {
        let session_id = self
            .session_id
            .unwrap_or_else(|| format!("session_{}", Uuid::new_v4().simple()));

        if self.config.enable_remote_logging && self.transport.is_none() {
            tracing::debug!("Remote logging enabled without an endpoint; entries stay local");
        }

        Logger {
            inner: Arc::new(LoggerInner {
                retries_remaining: AtomicU32::new(self.config.max_retries),
                config: self.config,
                environment: self.environment,
                source: self.source,
                session_id,
                platform: self.platform,
                console: self.console,
                transport: self.transport,
                queue: Mutex::new(VecDeque::new()),
                flush_scheduled: AtomicBool::new(false),
            }),
        }
    }
}

impl Logger {
    pub fn builder(config: LoggerConfig) -> LoggerBuilder {
        LoggerBuilder {
            config,
            environment: Environment::default(),
            source: Source::default().0,
            session_id: None,
            platform: Arc::new(NoopPlatform),
            console: Arc::new(TracingConsole),
            transport: None,
        }
    }

    /// A console-only logger.
    pub fn new(config: LoggerConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.inner.config
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    fn remote_enabled(&self) -> bool {
        self.inner.config.enable_remote_logging && self.inner.transport.is_some()
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.inner.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn error(&self, message: impl Into<String>, context: Option<&str>, data: Option<LogValue>) {
        self.log(LogLevel::Error, message, context, data);
    }

    pub fn warn(&self, message: impl Into<String>, context: Option<&str>, data: Option<LogValue>) {
        self.log(LogLevel::Warn, message, context, data);
    }

    pub fn info(&self, message: impl Into<String>, context: Option<&str>, data: Option<LogValue>) {
        self.log(LogLevel::Info, message, context, data);
    }

    pub fn debug(&self, message: impl Into<String>, context: Option<&str>, data: Option<LogValue>) {
        self.log(LogLevel::Debug, message, context, data);
    }

    /// Emit one entry. Never blocks, never fails.
    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<&str>,
        data: Option<LogValue>,
    ) {
        let inner = &self.inner;
        if !inner.config.level.allows(level) {
            return;
        }

        let entry = LogEntry {
            level,
            message: message.into(),
            context: context.map(str::to_owned),
            data,
            timestamp: Utc::now(),
            session_id: inner.session_id.clone(),
            url: inner.platform.page_url(),
            user_agent: inner.platform.user_agent(),
        };
        metrics::record_log_entry(level.as_str());

        if inner.config.enable_console_output {
            inner.console.write(&entry);
        }

        if self.remote_enabled() && level.is_remote_eligible() {
            let depth = {
                let mut queue = self.lock_queue();
                queue.push_back(entry);
                queue.len()
            };
            metrics::record_queue_depth(depth);

            if depth >= inner.config.batch_size {
                self.schedule_flush();
            }
        }
    }

    /// INFO entry describing how long an operation took.
    pub fn performance(
        &self,
        operation: &str,
        duration_ms: f64,
        context: Option<&str>,
        data: Option<LogValue>,
    ) {
        let payload = LogValue::record([
            ("type", LogValue::from("performance")),
            ("operation", operation.into()),
            ("duration", duration_ms.into()),
        ])
        .merge(data);
        self.info(
            format!("Performance: {} took {:.2}ms", operation, duration_ms),
            context,
            Some(payload),
        );
    }

    /// INFO entry for something the user did.
    pub fn user_action(&self, action: &str, context: Option<&str>, data: Option<LogValue>) {
        let payload = LogValue::record([
            ("type", LogValue::from("user_action")),
            ("action", action.into()),
        ])
        .merge(data);
        self.info(format!("User action: {}", action), context, Some(payload));
    }

    /// Entry for an outbound API call; ERROR when `status >= 400`.
    pub fn api_call(
        &self,
        method: &str,
        url: &str,
        status: u16,
        duration_ms: f64,
        context: Option<&str>,
    ) {
        let level = if status >= 400 { LogLevel::Error } else { LogLevel::Info };
        let payload = LogValue::record([
            ("type", LogValue::from("api_call")),
            ("method", method.into()),
            ("url", url.into()),
            ("status", status.into()),
            ("duration", duration_ms.into()),
        ]);
        self.log(
            level,
            format!("API {} {} - {} ({:.2}ms)", method, url, status, duration_ms),
            context,
            Some(payload),
        );
    }

    /// Entries waiting for remote delivery.
    pub fn queued_len(&self) -> usize {
        self.lock_queue().len()
    }

    /// Snapshot of the remote queue, oldest first.
    pub fn queued_entries(&self) -> Vec<LogEntry> {
        self.lock_queue().iter().cloned().collect()
    }

    /// Failed flushes that may still requeue their batch.
    pub fn retries_remaining(&self) -> u32 {
        self.inner.retries_remaining.load(Ordering::SeqCst)
    }

    fn schedule_flush(&self) {
        if self.inner.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let logger = self.clone();
                handle.spawn(async move {
                    logger.inner.flush_scheduled.store(false, Ordering::SeqCst);
                    logger.flush().await;
                });
            }
            Err(_) => {
                self.inner.flush_scheduled.store(false, Ordering::SeqCst);
                tracing::debug!("No async runtime for an eager flush; batch waits for the next flush");
            }
        }
    }

    /// Send everything queued as one batch.
    pub async fn flush(&self) -> FlushOutcome {
        let transport = match &self.inner.transport {
            Some(transport) if self.inner.config.enable_remote_logging => transport.clone(),
            _ => return FlushOutcome::Disabled,
        };

        let batch: Vec<LogEntry> = self.lock_queue().drain(..).collect();
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }
        metrics::record_queue_depth(0);

        let payload = LogBatch {
            logs: &batch,
            source: &self.inner.source,
            environment: self.inner.environment,
        };
        let payload = match serde_json::to_value(&payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, entries = batch.len(), "Failed to encode log batch");
                metrics::record_flush("dropped", batch.len());
                return FlushOutcome::Dropped(batch.len());
            }
        };

        match transport.send(&payload).await {
            Ok(()) => {
                tracing::trace!(entries = batch.len(), "Log batch delivered");
                metrics::record_flush("delivered", batch.len());
                FlushOutcome::Delivered(batch.len())
            }
            Err(e) => self.on_flush_failure(batch, e),
        }
    }

    fn on_flush_failure(&self, batch: Vec<LogEntry>, error: TransportError) -> FlushOutcome {
        let count = batch.len();
        let budget = self
            .inner
            .retries_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));

        match budget {
            Ok(previous) => {
                let depth = {
                    let mut queue = self.lock_queue();
                    for entry in batch.into_iter().rev() {
                        queue.push_front(entry);
                    }
                    queue.len()
                };
                metrics::record_queue_depth(depth);
                metrics::record_flush("requeued", count);
                if self.inner.config.enable_console_output {
                    tracing::warn!(
                        error = %error,
                        entries = count,
                        retries_remaining = previous - 1,
                        "Failed to send logs; batch requeued"
                    );
                }
                FlushOutcome::Requeued(count)
            }
            Err(_) => {
                metrics::record_flush("dropped", count);
                if self.inner.config.enable_console_output {
                    tracing::warn!(error = %error, entries = count, "Failed to send logs; retry budget exhausted");
                }
                FlushOutcome::Dropped(count)
            }
        }
    }

    /// Flush on events that may end the session.
    pub async fn on_lifecycle(&self, event: LifecycleEvent) -> Option<FlushOutcome> {
        if event.forces_flush() {
            Some(self.flush().await)
        } else {
            None
        }
    }

    /// Flush every `flush_interval` until shutdown, then flush once more.
    pub fn spawn_flush_task(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let logger = self.clone();
        let period = logger
            .inner
            .config
            .flush_interval()
            .clamp(Duration::from_millis(1), MAX_TICK_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        logger.flush().await;
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Flush task received shutdown signal, flushing tail");
                        logger.flush().await;
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Visibility;
    use crate::logging::console::MemoryConsole;
    use crate::transport::MemoryTransport;

    fn remote_config(batch_size: usize) -> LoggerConfig {
        LoggerConfig {
            level: LogLevel::Debug,
            enable_remote_logging: true,
            enable_console_output: true,
            max_retries: 3,
            batch_size,
            flush_interval_ms: 30_000,
        }
    }

    fn logger_with(
        config: LoggerConfig,
    ) -> (Logger, Arc<MemoryConsole>, Arc<MemoryTransport>) {
        let console = Arc::new(MemoryConsole::new());
        let transport = Arc::new(MemoryTransport::new());
        let logger = Logger::builder(config)
            .environment(Environment::Production)
            .console(console.clone())
            .transport(Some(transport.clone()))
            .build();
        (logger, console, transport)
    }

    fn messages(entries: &[LogEntry]) -> Vec<String> {
        entries.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn test_level_filter_drops_less_severe_calls() {
        let mut config = remote_config(100);
        config.level = LogLevel::Warn;
        let (logger, console, _) = logger_with(config);

        logger.debug("debug", None, None);
        logger.info("info", None, None);
        logger.warn("warn", None, None);
        logger.error("error", None, None);

        assert_eq!(messages(&console.entries()), vec!["warn", "error"]);
        assert_eq!(messages(&logger.queued_entries()), vec!["warn", "error"]);
    }

    #[test]
    fn test_only_warn_and_error_are_queued_in_order() {
        let (logger, console, _) = logger_with(remote_config(100));

        logger.info("i1", None, None);
        logger.error("e1", None, None);
        logger.debug("d1", None, None);
        logger.warn("w1", None, None);
        logger.error("e2", None, None);

        assert_eq!(console.len(), 5);
        assert_eq!(messages(&logger.queued_entries()), vec!["e1", "w1", "e2"]);
    }

    #[test]
    fn test_no_transport_means_nothing_queued() {
        let logger = Logger::builder(remote_config(10))
            .console(Arc::new(MemoryConsole::new()))
            .build();
        logger.error("boom", None, None);
        assert_eq!(logger.queued_len(), 0);
    }

    #[test]
    fn test_console_disabled_still_queues() {
        let mut config = remote_config(100);
        config.enable_console_output = false;
        let (logger, console, _) = logger_with(config);

        logger.warn("quiet", None, None);
        assert!(console.is_empty());
        assert_eq!(logger.queued_len(), 1);
    }

    #[tokio::test]
    async fn test_disk_low_waits_for_batch() {
        let (logger, _, transport) = logger_with(remote_config(10));

        logger.warn(
            "disk low",
            Some("StorageService"),
            Some(LogValue::record([("pct", LogValue::from(92))])),
        );
        tokio::task::yield_now().await;

        assert_eq!(logger.queued_len(), 1);
        assert_eq!(transport.attempts(), 0);

        let entry = &logger.queued_entries()[0];
        assert_eq!(entry.context.as_deref(), Some("StorageService"));
        assert_eq!(entry.session_id, logger.session_id());
    }

    #[tokio::test]
    async fn test_batch_size_triggers_eager_flush() {
        let (logger, _, transport) = logger_with(remote_config(3));

        logger.warn("a", None, None);
        logger.warn("b", None, None);
        tokio::task::yield_now().await;
        assert_eq!(transport.attempts(), 0);

        logger.error("c", None, None);
        tokio::time::timeout(Duration::from_secs(5), transport.wait_for_attempts(1))
            .await
            .unwrap();

        let delivered = transport.delivered();
        assert_eq!(delivered.len(), 1);
        let logs = delivered[0]["logs"].as_array().unwrap();
        let names: Vec<_> = logs.iter().map(|l| l["message"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(delivered[0]["source"], "octomatic-frontend");
        assert_eq!(delivered[0]["environment"], "production");
        assert_eq!(logger.queued_len(), 0);
    }

    #[tokio::test]
    async fn test_failed_flush_requeues_at_front() {
        let (logger, _, transport) = logger_with(remote_config(100));
        transport.fail_next(1);

        logger.warn("a", None, None);
        logger.warn("b", None, None);
        assert_eq!(logger.flush().await, FlushOutcome::Requeued(2));
        assert_eq!(logger.retries_remaining(), 2);

        logger.warn("c", None, None);
        assert_eq!(messages(&logger.queued_entries()), vec!["a", "b", "c"]);

        assert_eq!(logger.flush().await, FlushOutcome::Delivered(3));
        assert_eq!(logger.retries_remaining(), 2);
        let logs = transport.delivered()[0]["logs"].as_array().unwrap().len();
        assert_eq!(logs, 3);
    }

    #[tokio::test]
    async fn test_exhausted_budget_drops_batch() {
        let mut config = remote_config(100);
        config.max_retries = 1;
        let (logger, _, transport) = logger_with(config);
        transport.fail_next(2);

        logger.error("lost", None, None);
        assert_eq!(logger.flush().await, FlushOutcome::Requeued(1));
        assert_eq!(logger.flush().await, FlushOutcome::Dropped(1));
        assert_eq!(logger.retries_remaining(), 0);
        assert_eq!(logger.queued_len(), 0);
        assert_eq!(logger.flush().await, FlushOutcome::Empty);
    }

    #[tokio::test]
    async fn test_flush_without_remote_is_disabled() {
        let mut config = remote_config(100);
        config.enable_remote_logging = false;
        let (logger, _, transport) = logger_with(config);

        logger.error("local only", None, None);
        assert_eq!(logger.flush().await, FlushOutcome::Disabled);
        assert_eq!(transport.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_after_interval() {
        let (logger, _, transport) = logger_with(remote_config(10));
        let (tx, rx) = broadcast::channel(1);
        let task = logger.spawn_flush_task(rx);

        logger.warn("tick", None, None);
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(transport.attempts(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        transport.wait_for_attempts(1).await;
        assert_eq!(transport.delivered().len(), 1);

        let _ = tx.send(());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_flushes_tail() {
        let (logger, _, transport) = logger_with(remote_config(10));
        let (tx, rx) = broadcast::channel(1);
        let task = logger.spawn_flush_task(rx);

        logger.error("tail", None, None);
        let _ = tx.send(());
        task.await.unwrap();

        assert_eq!(transport.delivered().len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_interval_keeps_flush_task_alive() {
        let mut config = remote_config(10);
        config.flush_interval_ms = u64::MAX;
        let (logger, _, transport) = logger_with(config);
        let (tx, rx) = broadcast::channel(1);
        let task = logger.spawn_flush_task(rx);
        tokio::task::yield_now().await;

        logger.error("tail", None, None);
        let _ = tx.send(());
        task.await.unwrap();

        assert_eq!(transport.delivered().len(), 1);
    }

    #[tokio::test]
    async fn test_hidden_and_unload_force_flush() {
        let (logger, _, _) = logger_with(remote_config(10));

        logger.warn("one", None, None);
        assert_eq!(
            logger.on_lifecycle(LifecycleEvent::Visibility(Visibility::Visible)).await,
            None
        );
        assert_eq!(logger.queued_len(), 1);

        assert_eq!(
            logger.on_lifecycle(LifecycleEvent::Visibility(Visibility::Hidden)).await,
            Some(FlushOutcome::Delivered(1))
        );

        logger.warn("two", None, None);
        assert_eq!(
            logger.on_lifecycle(LifecycleEvent::Unload).await,
            Some(FlushOutcome::Delivered(1))
        );
    }

    #[test]
    fn test_api_call_escalates_on_client_and_server_errors() {
        let (logger, console, _) = logger_with(remote_config(100));

        logger.api_call("GET", "/api/pricing", 200, 12.5, Some("Pricing"));
        logger.api_call("POST", "/api/contact", 422, 40.0, Some("Contact"));

        let entries = console.entries();
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(entries[1].level, LogLevel::Error);
        let data = entries[1].data.as_ref().unwrap();
        assert_eq!(data.get("type").and_then(LogValue::as_str), Some("api_call"));
        assert_eq!(data.get("status"), Some(&LogValue::Int(422)));
        assert_eq!(logger.queued_len(), 1);
    }

    #[test]
    fn test_semantic_wrappers_tag_their_payloads() {
        let (logger, console, _) = logger_with(remote_config(100));

        logger.performance(
            "render",
            12.0,
            Some("Hero"),
            Some(LogValue::record([("success", LogValue::from(true))])),
        );
        logger.user_action("book_call", Some("Cta"), None);

        let entries = console.entries();
        let perf = entries[0].data.as_ref().unwrap();
        assert_eq!(entries[0].level, LogLevel::Info);
        assert_eq!(perf.get("type").and_then(LogValue::as_str), Some("performance"));
        assert_eq!(perf.get("duration").and_then(LogValue::as_f64), Some(12.0));
        assert_eq!(perf.get("success").and_then(LogValue::as_bool), Some(true));

        let action = entries[1].data.as_ref().unwrap();
        assert_eq!(action.get("action").and_then(LogValue::as_str), Some("book_call"));
        assert_eq!(logger.queued_len(), 0);
    }
}
