//! Point-in-time snapshots and threshold recommendations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RecommendationThresholds;
use crate::performance::PerformanceMetric;
use crate::platform::{MemorySample, NetworkInfo};

/// Core Web Vitals; `None` until observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreWebVitals {
    pub lcp: Option<f64>,
    pub fid: Option<f64>,
    pub cls: Option<f64>,
    pub inp: Option<f64>,
    pub ttfb: Option<f64>,
    pub fcp: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetrics {
    pub used_js_heap_size: u64,
    pub total_js_heap_size: u64,
    pub js_heap_size_limit: u64,
    pub usage_percentage: f64,
}

impl From<MemorySample> for MemoryMetrics {
    fn from(sample: MemorySample) -> Self {
        Self {
            used_js_heap_size: sample.used_js_heap_size,
            total_js_heap_size: sample.total_js_heap_size,
            js_heap_size_limit: sample.js_heap_size_limit,
            usage_percentage: sample.usage_percentage(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetrics {
    pub effective_type: String,
    pub downlink: f64,
    pub rtt: f64,
    pub save_data: bool,
}

impl From<NetworkInfo> for NetworkMetrics {
    fn from(info: NetworkInfo) -> Self {
        Self {
            effective_type: info.effective_type,
            downlink: info.downlink,
            rtt: info.rtt,
            save_data: info.save_data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub core_web_vitals: CoreWebVitals,
    pub memory: Option<MemoryMetrics>,
    pub network: Option<NetworkMetrics>,
    /// Newest ten recorded metrics, oldest first.
    pub recent_metrics: Vec<PerformanceMetric>,
    pub metric_count: usize,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Human-readable suggestions for every reading above its threshold.
pub fn recommendations(
    vitals: &CoreWebVitals,
    memory: Option<&MemoryMetrics>,
    thresholds: &RecommendationThresholds,
) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(lcp) = vitals.lcp.filter(|v| *v > thresholds.lcp_ms) {
        out.push(format!(
            "Largest Contentful Paint is {:.0}ms (target {:.0}ms): optimize images and critical resources",
            lcp, thresholds.lcp_ms
        ));
    }
    if let Some(fcp) = vitals.fcp.filter(|v| *v > thresholds.fcp_ms) {
        out.push(format!(
            "First Contentful Paint is {:.0}ms (target {:.0}ms): reduce render-blocking resources",
            fcp, thresholds.fcp_ms
        ));
    }
    if let Some(cls) = vitals.cls.filter(|v| *v > thresholds.cls) {
        out.push(format!(
            "Cumulative Layout Shift is {:.3} (target {}): reserve space for images and embeds",
            cls, thresholds.cls
        ));
    }
    if let Some(fid) = vitals.fid.filter(|v| *v > thresholds.fid_ms) {
        out.push(format!(
            "First Input Delay is {:.0}ms (target {:.0}ms): break up long main-thread tasks",
            fid, thresholds.fid_ms
        ));
    }
    if let Some(inp) = vitals.inp.filter(|v| *v > thresholds.inp_ms) {
        out.push(format!(
            "Interaction to Next Paint is {:.0}ms (target {:.0}ms): trim event handler work",
            inp, thresholds.inp_ms
        ));
    }
    if let Some(memory) = memory.filter(|m| m.usage_percentage > thresholds.memory_percentage) {
        out.push(format!(
            "Memory usage is {:.1}% of the heap limit (target {:.0}%): check for leaks and large caches",
            memory.usage_percentage, thresholds.memory_percentage
        ));
    }
    if let Some(ttfb) = vitals.ttfb.filter(|v| *v > thresholds.ttfb_ms) {
        out.push(format!(
            "Time to First Byte is {:.0}ms (target {:.0}ms): improve server response or caching",
            ttfb, thresholds.ttfb_ms
        ));
    }

    out
}
