//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) or process environment
//!     → loader.rs (environment defaults, parse, env overrides)
//!     → validation.rs (semantic checks)
//!     → TelemetryConfig (validated, immutable)
//!     → handed to Logger / ErrorHandler / PerformanceMonitor at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - `NEXT_PUBLIC_*` variables override file values so deployments can
//!   point at collectors without editing files

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{from_env, load_config, ConfigError};
pub use schema::{
    Environment, ErrorHandlingConfig, LoggerConfig, ObservabilityConfig, PerformanceConfig,
    RecommendationThresholds, RemoteConfig, Source, TelemetryConfig, MAX_TICK_INTERVAL,
};
pub use validation::{validate_config, ValidationError};
