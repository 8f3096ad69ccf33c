//! Request pipeline stages wrapped around the dispatch table.
//!
//! # Data Flow
//! ```text
//! TraceLayer
//!     → Server header (overriding)
//!     → Cache-Control: no-cache (overriding)
//!     → compress.rs (optional)
//!     → basic_auth.rs (optional)
//!     → request_log.rs (optional)
//!     → tee_body.rs: tee + flush (optional)
//!     → Dispatch
//! ```
//!
//! Each stage is an `axum::middleware::from_fn_with_state` function; the
//! header stages are tower-http `SetResponseHeaderLayer`s.

pub mod basic_auth;
pub mod compress;
pub mod request_log;
pub mod tee_body;

pub use basic_auth::{basic_auth, BasicAuth};
pub use compress::{compress, Compress};
pub use request_log::{format_access_line, request_log, RequestLog};
pub use tee_body::{flush_body, tee_body, TeeBody};
