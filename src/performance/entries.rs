//! Observer entries delivered by the host.
//!
//! Mirrors the `PerformanceObserver` entry types the monitor subscribes to.
//! The host forwards each entry to [`crate::PerformanceMonitor::observe`];
//! entries of types the platform does not support are ignored.

use serde::{Deserialize, Serialize};

use crate::platform::NavigationTiming;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryType {
    Navigation,
    Resource,
    Paint,
    Measure,
    LayoutShift,
    LargestContentfulPaint,
    FirstInput,
    Event,
}

impl EntryType {
    pub const ALL: [EntryType; 8] = [
        EntryType::Navigation,
        EntryType::Resource,
        EntryType::Paint,
        EntryType::Measure,
        EntryType::LayoutShift,
        EntryType::LargestContentfulPaint,
        EntryType::FirstInput,
        EntryType::Event,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Navigation => "navigation",
            EntryType::Resource => "resource",
            EntryType::Paint => "paint",
            EntryType::Measure => "measure",
            EntryType::LayoutShift => "layout-shift",
            EntryType::LargestContentfulPaint => "largest-contentful-paint",
            EntryType::FirstInput => "first-input",
            EntryType::Event => "event",
        }
    }
}

/// Paint entry name that carries First Contentful Paint.
pub const FIRST_CONTENTFUL_PAINT: &str = "first-contentful-paint";

/// A single observer entry. Times are milliseconds since time origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entryType", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum PerformanceEntry {
    Navigation(NavigationTiming),
    Resource {
        name: String,
        start_time: f64,
        duration: f64,
        #[serde(default)]
        transfer_size: Option<u64>,
    },
    Paint {
        name: String,
        start_time: f64,
    },
    Measure {
        name: String,
        start_time: f64,
        duration: f64,
    },
    LayoutShift {
        value: f64,
        had_recent_input: bool,
    },
    LargestContentfulPaint {
        start_time: f64,
        #[serde(default)]
        size: Option<u64>,
    },
    FirstInput {
        start_time: f64,
        processing_start: f64,
    },
    Event {
        name: String,
        duration: f64,
    },
}

impl PerformanceEntry {
    pub fn entry_type(&self) -> EntryType {
        match self {
            PerformanceEntry::Navigation(_) => EntryType::Navigation,
            PerformanceEntry::Resource { .. } => EntryType::Resource,
            PerformanceEntry::Paint { .. } => EntryType::Paint,
            PerformanceEntry::Measure { .. } => EntryType::Measure,
            PerformanceEntry::LayoutShift { .. } => EntryType::LayoutShift,
            PerformanceEntry::LargestContentfulPaint { .. } => EntryType::LargestContentfulPaint,
            PerformanceEntry::FirstInput { .. } => EntryType::FirstInput,
            PerformanceEntry::Event { .. } => EntryType::Event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_parse_from_observer_json() {
        let raw = r#"[
            {"entryType": "layout-shift", "value": 0.05, "hadRecentInput": false},
            {"entryType": "paint", "name": "first-contentful-paint", "startTime": 900.5},
            {"entryType": "navigation", "startTime": 0, "requestStart": 20, "responseStart": 180,
             "domContentLoadedEventEnd": 1200, "loadEventEnd": 2100}
        ]"#;
        let entries: Vec<PerformanceEntry> = serde_json::from_str(raw).unwrap();

        assert_eq!(entries[0].entry_type(), EntryType::LayoutShift);
        assert_eq!(
            entries[1],
            PerformanceEntry::Paint {
                name: FIRST_CONTENTFUL_PAINT.into(),
                start_time: 900.5
            }
        );
        match &entries[2] {
            PerformanceEntry::Navigation(timing) => assert_eq!(timing.ttfb(), 160.0),
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn test_type_names_match_serde() {
        for entry_type in EntryType::ALL {
            let json = serde_json::to_value(entry_type).unwrap();
            assert_eq!(json, entry_type.as_str());
        }
    }
}
