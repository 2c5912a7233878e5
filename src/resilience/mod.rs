//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Outbound POST (log flush, error report):
//!     → timeouts.rs (race against a deadline)
//! Retried application work (ErrorHandler::handle_async_error):
//!     → backoff.rs (exponential delay with jitter between attempts)
//! ```

pub mod backoff;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use timeouts::with_deadline;
