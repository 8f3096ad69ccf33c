//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, pipeline assembly)
//!     → middleware/ (server id, no-cache, compression, auth, log, tee)
//!     → routing::Dispatch → adapter
//!     → request.rs / response.rs helpers used along the way
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use server::{HttpServer, Outputs};
