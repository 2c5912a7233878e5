//! Host capability provider.
//!
//! The telemetry core never talks to a browser or OS directly. Everything it
//! would feature-detect (page URL, user agent, heap usage, connection info,
//! navigation timing, observer entry types) comes through [`Platform`].
//! Missing capabilities read as `None`; nothing here can fail.
//!
//! # Implementations
//! - [`NoopPlatform`]: nothing available, no entry types supported
//! - [`HostPlatform`]: values pushed in by the embedding host at runtime

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::performance::EntryType;

/// Heap usage snapshot (`performance.memory` shape).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySample {
    pub used_js_heap_size: u64,
    pub total_js_heap_size: u64,
    pub js_heap_size_limit: u64,
}

impl MemorySample {
    /// Used heap as a percentage of the limit, `0.0` when the limit is unknown.
    pub fn usage_percentage(&self) -> f64 {
        if self.js_heap_size_limit == 0 {
            return 0.0;
        }
        self.used_js_heap_size as f64 / self.js_heap_size_limit as f64 * 100.0
    }
}

/// Connection conditions (`navigator.connection` shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub effective_type: String,
    pub downlink: f64,
    pub rtt: f64,
    pub save_data: bool,
}

/// Navigation timing marks in milliseconds since time origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub start_time: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub dom_content_loaded_event_end: f64,
    pub load_event_end: f64,
}

impl NavigationTiming {
    /// Time to first byte.
    pub fn ttfb(&self) -> f64 {
        (self.response_start - self.request_start).max(0.0)
    }
}

/// Capabilities the telemetry layer may use when present.
pub trait Platform: Send + Sync {
    fn page_url(&self) -> Option<String> {
        None
    }

    fn user_agent(&self) -> Option<String> {
        None
    }

    fn memory(&self) -> Option<MemorySample> {
        None
    }

    fn network(&self) -> Option<NetworkInfo> {
        None
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        None
    }

    /// Whether observer entries of this type can be delivered.
    fn supports(&self, _entry_type: EntryType) -> bool {
        false
    }
}

/// A platform with no capabilities, for non-browser or unsupported targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPlatform;

impl Platform for NoopPlatform {}

#[derive(Debug, Default)]
struct HostState {
    page_url: Option<String>,
    user_agent: Option<String>,
    memory: Option<MemorySample>,
    network: Option<NetworkInfo>,
    navigation: Option<NavigationTiming>,
    supported: HashSet<EntryType>,
}

/// Capabilities supplied by the embedding host.
///
/// The host updates values as its environment changes; readers always see
/// the latest snapshot.
#[derive(Debug, Default)]
pub struct HostPlatform {
    state: Mutex<HostState>,
}

impl HostPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that supports every observer entry type.
    pub fn with_all_entry_types() -> Self {
        let platform = Self::new();
        platform.lock().supported = EntryType::ALL.iter().copied().collect();
        platform
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_page_url(&self, url: impl Into<String>) {
        self.lock().page_url = Some(url.into());
    }

    pub fn set_user_agent(&self, user_agent: impl Into<String>) {
        self.lock().user_agent = Some(user_agent.into());
    }

    pub fn set_memory(&self, sample: Option<MemorySample>) {
        self.lock().memory = sample;
    }

    pub fn set_network(&self, info: Option<NetworkInfo>) {
        self.lock().network = info;
    }

    pub fn set_navigation_timing(&self, timing: Option<NavigationTiming>) {
        self.lock().navigation = timing;
    }

    pub fn support(&self, entry_type: EntryType) {
        self.lock().supported.insert(entry_type);
    }
}

impl Platform for HostPlatform {
    fn page_url(&self) -> Option<String> {
        self.lock().page_url.clone()
    }

    fn user_agent(&self) -> Option<String> {
        self.lock().user_agent.clone()
    }

    fn memory(&self) -> Option<MemorySample> {
        self.lock().memory
    }

    fn network(&self) -> Option<NetworkInfo> {
        self.lock().network.clone()
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.lock().navigation
    }

    fn supports(&self, entry_type: EntryType) -> bool {
        self.lock().supported.contains(&entry_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_reports_nothing() {
        let platform = NoopPlatform;
        assert!(platform.page_url().is_none());
        assert!(platform.memory().is_none());
        assert!(!platform.supports(EntryType::LayoutShift));
    }

    #[test]
    fn test_host_updates_are_visible() {
        let platform = HostPlatform::new();
        assert!(platform.user_agent().is_none());

        platform.set_user_agent("Mozilla/5.0");
        platform.set_memory(Some(MemorySample {
            used_js_heap_size: 40,
            total_js_heap_size: 60,
            js_heap_size_limit: 100,
        }));
        platform.support(EntryType::Paint);

        assert_eq!(platform.user_agent().as_deref(), Some("Mozilla/5.0"));
        assert_eq!(platform.memory().map(|m| m.usage_percentage()), Some(40.0));
        assert!(platform.supports(EntryType::Paint));
        assert!(!platform.supports(EntryType::LayoutShift));
    }

    #[test]
    fn test_ttfb_never_negative() {
        let timing = NavigationTiming {
            request_start: 50.0,
            response_start: 20.0,
            ..Default::default()
        };
        assert_eq!(timing.ttfb(), 0.0);
    }
}
