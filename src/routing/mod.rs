//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (exact lookup, then longest subtree)
//!     → matcher.rs (evaluate endpoint patterns)
//!     → Return: adapter, redirect onto subtree, or 404
//!
//! Table construction (at startup):
//!     resolved mappings
//!     → EndpointPattern per endpoint
//!     → Freeze as immutable Dispatch
//! ```
//!
//! # Design Decisions
//! - Table built at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: most specific endpoint always wins

pub mod matcher;
pub mod router;

pub use matcher::{normalize_endpoint, EndpointPattern};
pub use router::{Dispatch, RouteMatch};
