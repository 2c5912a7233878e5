//! Passive performance collection.
//!
//! # Inputs
//! ```text
//! start_timing / end_timing / measure_* ──▶ metric ring buffer ──▶ logger.performance
//! observe(PerformanceEntry) ─────────────▶ Core Web Vitals (ArcSwap snapshot)
//! on_load ───────────────────────────────▶ TTFB
//! memory sampler (interval) ─────────────▶ memory_usage metric, high-usage warning
//! on_network_change ─────────────────────▶ INFO log with new conditions
//! on_lifecycle ──────────────────────────▶ page_visible_time / session_time
//! ```
//!
//! Nothing here is on the caller's critical path. Missing platform
//! capabilities read as `None` and never fail.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use dashmap::DashMap;
use futures_util::FutureExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::{PerformanceConfig, MAX_TICK_INTERVAL};
use crate::errors::AppError;
use crate::lifecycle::{LifecycleEvent, Visibility};
use crate::logging::{LogValue, Logger};
use crate::observability::metrics;
use crate::performance::buffer::RingBuffer;
use crate::performance::entries::{PerformanceEntry, FIRST_CONTENTFUL_PAINT};
use crate::performance::metric::{MetricUnit, PerformanceMetric};
use crate::performance::vitals::{
    recommendations, CoreWebVitals, MemoryMetrics, NetworkMetrics, PerformanceSummary,
};
use crate::platform::Platform;

const MONITOR_CONTEXT: &str = "PerformanceMonitor";
const SUMMARY_RECENT: usize = 10;

struct MonitorInner {
    config: PerformanceConfig,
    logger: Logger,
    platform: Arc<dyn Platform>,
    timings: DashMap<String, Instant>,
    metrics: Mutex<RingBuffer<PerformanceMetric>>,
    vitals: ArcSwap<CoreWebVitals>,
    initialized: AtomicBool,
    visible_since: Mutex<Instant>,
    session_start: Instant,
}

/// Timing, Web Vitals and resource-usage collection.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct PerformanceMonitor {
    inner: Arc<MonitorInner>,
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1_000.0
}

fn outcome_metadata(metadata: Option<LogValue>, failure: Option<String>) -> LogValue {
    let mut outcome = metadata.unwrap_or_else(LogValue::empty_record);
    outcome.insert("success", failure.is_none().into());
    if let Some(message) = failure {
        outcome.insert("error", message.into());
    }
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    AppError::from_panic(payload).message
}

impl PerformanceMonitor {
    pub fn new(config: PerformanceConfig, logger: Logger, platform: Arc<dyn Platform>) -> Self {
        let now = Instant::now();
        Self {
            inner: Arc::new(MonitorInner {
                metrics: Mutex::new(RingBuffer::new(config.metrics_capacity)),
                config,
                logger,
                platform,
                timings: DashMap::new(),
                vitals: ArcSwap::from_pointee(CoreWebVitals::default()),
                initialized: AtomicBool::new(false),
                visible_since: Mutex::new(now),
                session_start: now,
            }),
        }
    }

    pub fn config(&self) -> &PerformanceConfig {
        &self.inner.config
    }

    fn lock_metrics(&self) -> MutexGuard<'_, RingBuffer<PerformanceMetric>> {
        self.inner.metrics.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_visible_since(&self) -> MutexGuard<'_, Instant> {
        self.inner.visible_since.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update_vitals(&self, update: impl Fn(&mut CoreWebVitals)) {
        self.inner.vitals.rcu(|current| {
            let mut next = CoreWebVitals::clone(current);
            update(&mut next);
            next
        });
    }

    /// Start observing. Calling it again has no effect.
    pub fn initialize(&self) -> bool {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return false;
        }

        *self.lock_visible_since() = Instant::now();
        let supported: Vec<LogValue> = crate::performance::EntryType::ALL
            .iter()
            .filter(|t| self.inner.platform.supports(**t))
            .map(|t| LogValue::from(t.as_str()))
            .collect();
        self.inner.logger.debug(
            "Performance monitoring initialized",
            Some(MONITOR_CONTEXT),
            Some(LogValue::record([("entryTypes", LogValue::Array(supported))])),
        );
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    pub fn start_timing(&self, label: &str, context: Option<&str>) {
        self.inner.timings.insert(label.to_owned(), Instant::now());
        self.inner
            .logger
            .debug(format!("Started timing: {}", label), context, None);
    }

    /// Stop the stopwatch for `label` and record the elapsed milliseconds.
    ///
    /// Returns `0.0` with a warning when `label` was never started.
    pub fn end_timing(&self, label: &str, context: Option<&str>, metadata: Option<LogValue>) -> f64 {
        let Some((_, started)) = self.inner.timings.remove(label) else {
            self.inner.logger.warn(
                format!("No start time found for timing: {}", label),
                context,
                None,
            );
            return 0.0;
        };

        let duration = elapsed_ms(started);
        self.finish(label, duration, context, metadata);
        duration
    }

    fn finish(&self, label: &str, duration: f64, context: Option<&str>, metadata: Option<LogValue>) {
        self.record_metric(
            PerformanceMetric::new(label, duration, MetricUnit::Ms)
                .with_context(context)
                .with_metadata(metadata.clone()),
        );
        self.inner.logger.performance(label, duration, context, metadata);
    }

    /// Time a fallible async operation. The outcome is tagged in the metric
    /// metadata; errors and panics are passed through unchanged.
    pub async fn measure_async<T, E, F, Fut>(
        &self,
        label: &str,
        operation: F,
        context: Option<&str>,
        metadata: Option<LogValue>,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(async move { operation().await })
            .catch_unwind()
            .await;
        let duration = elapsed_ms(started);

        match outcome {
            Ok(Ok(value)) => {
                self.finish(label, duration, context, Some(outcome_metadata(metadata, None)));
                Ok(value)
            }
            Ok(Err(error)) => {
                let failure = Some(error.to_string());
                self.finish(label, duration, context, Some(outcome_metadata(metadata, failure)));
                Err(error)
            }
            Err(payload) => {
                let failure = Some(panic_message(payload.as_ref()));
                self.finish(label, duration, context, Some(outcome_metadata(metadata, failure)));
                panic::resume_unwind(payload)
            }
        }
    }

    /// Synchronous counterpart of [`Self::measure_async`].
    pub fn measure_sync<T, E, F>(
        &self,
        label: &str,
        operation: F,
        context: Option<&str>,
        metadata: Option<LogValue>,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::fmt::Display,
    {
        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(operation));
        let duration = elapsed_ms(started);

        match outcome {
            Ok(Ok(value)) => {
                self.finish(label, duration, context, Some(outcome_metadata(metadata, None)));
                Ok(value)
            }
            Ok(Err(error)) => {
                let failure = Some(error.to_string());
                self.finish(label, duration, context, Some(outcome_metadata(metadata, failure)));
                Err(error)
            }
            Err(payload) => {
                let failure = Some(panic_message(payload.as_ref()));
                self.finish(label, duration, context, Some(outcome_metadata(metadata, failure)));
                panic::resume_unwind(payload)
            }
        }
    }

    /// Append to the ring buffer; slow millisecond metrics log a warning.
    pub fn record_metric(&self, metric: PerformanceMetric) {
        metrics::record_performance_metric(metric.unit.as_str(), metric.value);

        let threshold = self.inner.config.slow_operation_threshold_ms;
        if metric.unit == MetricUnit::Ms && metric.value > threshold {
            self.inner.logger.warn(
                format!("Slow operation detected: {} took {:.2}ms", metric.name, metric.value),
                metric.context.as_deref(),
                Some(LogValue::record([
                    ("metric", LogValue::from(metric.name.as_str())),
                    ("duration", metric.value.into()),
                    ("threshold", threshold.into()),
                ])),
            );
        }

        self.lock_metrics().push(metric);
    }

    fn record_ms(&self, name: &str, value: f64, metadata: Option<LogValue>) {
        self.record_metric(
            PerformanceMetric::new(name, value, MetricUnit::Ms)
                .with_context(Some(MONITOR_CONTEXT))
                .with_metadata(metadata),
        );
    }

    /// Feed one observer entry. Ignored before [`Self::initialize`] or when
    /// the platform does not support the entry's type.
    pub fn observe(&self, entry: PerformanceEntry) {
        if !self.is_initialized() || !self.inner.platform.supports(entry.entry_type()) {
            return;
        }

        match entry {
            PerformanceEntry::Navigation(timing) => {
                self.record_ms(
                    "dom_content_loaded",
                    timing.dom_content_loaded_event_end - timing.start_time,
                    None,
                );
                self.record_ms("page_load_time", timing.load_event_end - timing.start_time, None);
            }
            PerformanceEntry::Resource {
                name,
                duration,
                transfer_size,
                ..
            } => {
                let metadata = LogValue::record([
                    ("resource", LogValue::from(name)),
                    ("transferSize", transfer_size.into()),
                ]);
                self.record_ms("resource_load", duration, Some(metadata));
            }
            PerformanceEntry::Paint { name, start_time } => {
                if name == FIRST_CONTENTFUL_PAINT {
                    self.update_vitals(|v| v.fcp = Some(start_time));
                }
                self.record_ms(&name.replace('-', "_"), start_time, None);
            }
            PerformanceEntry::Measure { name, duration, .. } => {
                self.record_ms(&name, duration, None);
            }
            PerformanceEntry::LayoutShift {
                value,
                had_recent_input,
            } => {
                if !had_recent_input {
                    self.update_vitals(|v| v.cls = Some(v.cls.unwrap_or(0.0) + value));
                }
            }
            PerformanceEntry::LargestContentfulPaint { start_time, .. } => {
                self.update_vitals(|v| v.lcp = Some(start_time));
            }
            PerformanceEntry::FirstInput {
                start_time,
                processing_start,
            } => {
                let delay = (processing_start - start_time).max(0.0);
                self.update_vitals(|v| {
                    if v.fid.is_none() {
                        v.fid = Some(delay);
                    }
                });
            }
            PerformanceEntry::Event { duration, .. } => {
                self.update_vitals(|v| v.inp = Some(v.inp.map_or(duration, |inp| inp.max(duration))));
            }
        }
    }

    /// Page finished loading: derive TTFB from navigation timing.
    pub fn on_load(&self) -> Option<f64> {
        let timing = self.inner.platform.navigation_timing()?;
        let ttfb = timing.ttfb();
        self.update_vitals(|v| v.ttfb = Some(ttfb));
        self.record_ms("time_to_first_byte", ttfb, None);
        Some(ttfb)
    }

    /// Connection conditions changed: log the new ones.
    pub fn on_network_change(&self) -> Option<NetworkMetrics> {
        let network = NetworkMetrics::from(self.inner.platform.network()?);
        self.inner.logger.info(
            "Network conditions changed",
            Some(MONITOR_CONTEXT),
            Some(LogValue::record([
                ("effectiveType", LogValue::from(network.effective_type.as_str())),
                ("downlink", network.downlink.into()),
                ("rtt", network.rtt.into()),
                ("saveData", network.save_data.into()),
            ])),
        );
        Some(network)
    }

    pub fn on_lifecycle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Visibility(Visibility::Visible) => {
                *self.lock_visible_since() = Instant::now();
            }
            LifecycleEvent::Visibility(Visibility::Hidden) => {
                let since = *self.lock_visible_since();
                self.record_ms("page_visible_time", elapsed_ms(since), None);
            }
            LifecycleEvent::Unload => {
                self.record_ms("session_time", elapsed_ms(self.inner.session_start), None);
            }
        }
    }

    /// Read heap usage, record it and warn when above the configured limit.
    pub fn sample_memory(&self) -> Option<MemoryMetrics> {
        let memory = MemoryMetrics::from(self.inner.platform.memory()?);

        self.record_metric(
            PerformanceMetric::new("memory_usage", memory.usage_percentage, MetricUnit::Percentage)
                .with_context(Some(MONITOR_CONTEXT)),
        );

        if memory.usage_percentage > self.inner.config.memory_warning_percentage {
            self.inner.logger.warn(
                "High memory usage detected",
                Some(MONITOR_CONTEXT),
                Some(LogValue::record([
                    ("usagePercentage", LogValue::from(memory.usage_percentage)),
                    ("usedJSHeapSize", memory.used_js_heap_size.into()),
                    ("jsHeapSizeLimit", memory.js_heap_size_limit.into()),
                ])),
            );
        }
        Some(memory)
    }

    /// Sample memory every `memory_sample_interval` until shutdown.
    pub fn spawn_memory_sampler(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let monitor = self.clone();
        let period = monitor
            .inner
            .config
            .memory_sample_interval()
            .clamp(Duration::from_millis(1), MAX_TICK_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.sample_memory();
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Memory sampler received shutdown signal");
                        break;
                    }
                }
            }
        })
    }

    pub fn core_web_vitals(&self) -> CoreWebVitals {
        CoreWebVitals::clone(&self.inner.vitals.load_full())
    }

    pub fn memory_metrics(&self) -> Option<MemoryMetrics> {
        self.inner.platform.memory().map(MemoryMetrics::from)
    }

    pub fn network_metrics(&self) -> Option<NetworkMetrics> {
        self.inner.platform.network().map(NetworkMetrics::from)
    }

    /// All buffered metrics, oldest first.
    pub fn metrics(&self) -> Vec<PerformanceMetric> {
        self.lock_metrics().iter().cloned().collect()
    }

    pub fn metric_count(&self) -> usize {
        self.lock_metrics().len()
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        let core_web_vitals = self.core_web_vitals();
        let memory = self.memory_metrics();
        let (recent_metrics, metric_count) = {
            let buffer = self.lock_metrics();
            (buffer.recent(SUMMARY_RECENT).cloned().collect(), buffer.len())
        };
        let recommendations = recommendations(
            &core_web_vitals,
            memory.as_ref(),
            &self.inner.config.thresholds,
        );

        PerformanceSummary {
            core_web_vitals,
            memory,
            network: self.network_metrics(),
            recent_metrics,
            metric_count,
            recommendations,
            timestamp: Utc::now(),
        }
    }
}
