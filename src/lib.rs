//! Octomatic client telemetry library.
//!
//! Structured logging with batched remote delivery, error intake with rate
//! limiting and recovery, and passive performance monitoring.

// Configuration
pub mod config;

// Core services
pub mod errors;
pub mod logging;
pub mod performance;
pub mod telemetry;

// Seams
pub mod platform;
pub mod transport;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::TelemetryConfig;
pub use errors::{AppError, ErrorHandler};
pub use lifecycle::{LifecycleEvent, Shutdown};
pub use logging::{LogLevel, LogValue, Logger};
pub use performance::PerformanceMonitor;
pub use telemetry::{Telemetry, TelemetryError};
