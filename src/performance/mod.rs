//! Timing, Core Web Vitals and resource-usage collection.
//!
//! # Components
//! - [`PerformanceMonitor`]: stopwatch, observer intake, samplers, summary
//! - [`RingBuffer`]: bounded metric history
//! - [`PerformanceEntry`]: observer entries forwarded by the host
//! - [`CoreWebVitals`], [`PerformanceSummary`]: read-only snapshots

pub mod buffer;
pub mod entries;
pub mod metric;
pub mod monitor;
pub mod vitals;

pub use buffer::RingBuffer;
pub use entries::{EntryType, PerformanceEntry, FIRST_CONTENTFUL_PAINT};
pub use metric::{MetricUnit, PerformanceMetric};
pub use monitor::PerformanceMonitor;
pub use vitals::{recommendations, CoreWebVitals, MemoryMetrics, NetworkMetrics, PerformanceSummary};
