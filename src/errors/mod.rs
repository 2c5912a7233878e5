//! Error taxonomy, intake and recovery.
//!
//! # Components
//! - [`AppError`]: classified operational errors
//! - [`ErrorWindow`]: sliding-window rate limit on intake
//! - [`RecoveryStrategy`]: pluggable remediation policies
//! - [`ErrorHandler`]: logging, monitoring reports, retries, safe wrappers

pub mod handler;
pub mod rate_limit;
pub mod recovery;
pub mod types;

pub use handler::{ErrorHandler, ErrorHandlerBuilder};
pub use rate_limit::{Admission, ErrorWindow};
pub use recovery::{FnStrategy, RecoveryError, RecoveryStrategy};
pub use types::{AppError, ErrorCategory, ErrorKind, ErrorMetadata, ErrorReport, ErrorSeverity};
