//! Console mirror for log entries.
//!
//! In the browser this was `console.*` with level-coloured styling. Here the
//! default mirror re-emits entries as `tracing` events, and the installed
//! subscriber handles formatting and colour.

use std::sync::{Mutex, MutexGuard};

use crate::logging::{LogEntry, LogLevel};

/// Destination for console-mirrored entries.
pub trait Console: Send + Sync {
    fn write(&self, entry: &LogEntry);
}

/// Mirrors entries into the active `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn write(&self, entry: &LogEntry) {
        let context = entry.context.as_deref().unwrap_or("-");
        let data = entry
            .data
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();

        match entry.level {
            LogLevel::Error => tracing::error!(
                target: "octomatic",
                context,
                session_id = %entry.session_id,
                data = %data,
                "{}",
                entry.message
            ),
            LogLevel::Warn => tracing::warn!(
                target: "octomatic",
                context,
                session_id = %entry.session_id,
                data = %data,
                "{}",
                entry.message
            ),
            LogLevel::Info => tracing::info!(
                target: "octomatic",
                context,
                session_id = %entry.session_id,
                data = %data,
                "{}",
                entry.message
            ),
            LogLevel::Debug => tracing::debug!(
                target: "octomatic",
                context,
                session_id = %entry.session_id,
                data = %data,
                "{}",
                entry.message
            ),
        }
    }
}

/// Keeps mirrored entries in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryConsole {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Console for MemoryConsole {
    fn write(&self, entry: &LogEntry) {
        self.lock().push(entry.clone());
    }
}
