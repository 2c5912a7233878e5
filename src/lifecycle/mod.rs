//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Host page events (events.rs):
//!     Visibility(Hidden) / Unload → Logger flush, PerformanceMonitor timing metrics
//!
//! Process lifetime (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger → background loops flush and exit
//! ```

pub mod events;
pub mod shutdown;
pub mod signals;

pub use events::{LifecycleEvent, Visibility};
pub use shutdown::Shutdown;
