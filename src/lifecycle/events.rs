//! Page lifecycle events delivered by the host.
//!
//! Stand-ins for `visibilitychange` and `beforeunload`. The host forwards
//! them through [`crate::Telemetry::dispatch`] or directly to a service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "state")]
pub enum LifecycleEvent {
    /// Tab visibility changed.
    Visibility(Visibility),
    /// Page (or process) is going away.
    Unload,
}

impl LifecycleEvent {
    /// Events after which queued telemetry may never get another chance.
    pub fn forces_flush(self) -> bool {
        matches!(
            self,
            LifecycleEvent::Unload | LifecycleEvent::Visibility(Visibility::Hidden)
        )
    }
}
