//! Structured, levelled logging with batched remote delivery.
//!
//! # Components
//! - [`LogLevel`]: severity ordering and filtering
//! - [`LogValue`]: serializable structured payloads
//! - [`LogEntry`]: one immutable logged event
//! - [`Console`]: local mirror (tracing by default)
//! - [`Logger`]: level filter, remote queue, flush scheduling

pub mod console;
pub mod entry;
pub mod level;
pub mod logger;
pub mod value;

pub use console::{Console, MemoryConsole, TracingConsole};
pub use entry::{LogBatch, LogEntry};
pub use level::LogLevel;
pub use logger::{FlushOutcome, Logger, LoggerBuilder};
pub use value::LogValue;
