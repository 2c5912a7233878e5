//! Remote delivery.
//!
//! # Data Flow
//! ```text
//! Logger::flush          → { logs, source, environment }  → logging endpoint
//! ErrorHandler::report   → { error, source, environment } → monitoring endpoint
//! ```
//!
//! # Design Decisions
//! - Best effort: the only response handling is the status check
//! - Every POST races a deadline so a hung collector cannot pin a flush
//! - No endpoint means no transport; callers skip remote work entirely

use futures_util::future::BoxFuture;
use thiserror::Error;

pub mod http;
pub mod memory;

pub use http::HttpTransport;
pub use memory::MemoryTransport;

/// Errors from a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Request did not complete before the deadline.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Collector answered with a non-success status.
    #[error("collector responded with status {0}")]
    Status(u16),

    /// Connection or protocol failure.
    #[error("request failed: {0}")]
    Request(String),

    /// Endpoint could not be used.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

/// Sends one JSON payload to a remote collector.
pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, payload: &'a serde_json::Value) -> BoxFuture<'a, Result<(), TransportError>>;
}
