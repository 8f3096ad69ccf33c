//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, stderr)
//!
//! Request pipeline produces:
//!     → sink.rs (access lines, request body dumps, stdout)
//! ```
//!
//! # Design Decisions
//! - Two channels: `tracing` for diagnostics, a `Sink` for the access log
//! - Sinks are trait objects so tests can capture output in memory

pub mod logging;
pub mod sink;

pub use logging::init_logging;
pub use sink::{MemorySink, SharedSink, Sink, StdoutSink};
