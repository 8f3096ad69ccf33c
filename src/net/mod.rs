//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ListenerConfig
//!     → listener.rs (parse address, bind)
//!     → tls.rs (optional: load PEM certificate and key)
//!     → Listener::Plain | Listener::Tls
//!     → Hand off to HTTP layer (HttpServer::run)
//! ```
//!
//! # Design Decisions
//! - Binding happens before the server starts, so port 0 can be resolved
//!   and printed (and tests can pick free ports)
//! - TLS is optional and handled transparently by axum-server

pub mod listener;
pub mod tls;

pub use listener::{Listener, ListenerError};
