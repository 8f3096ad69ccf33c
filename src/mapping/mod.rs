//! Mapping resolution subsystem.
//!
//! # Data Flow
//! ```text
//! "endpoint:source" (CLI argument or config entry)
//!     → parser.rs (split, bare filename shorthand)
//!     → source.rs (endpoint sigils, literal marker)
//!     → registry.rs (URI scheme → Source variant)
//!     → adapters::build (construct handler)
//!     → resolve.rs (bind into the dispatch table, report)
//! ```
//!
//! # Design Decisions
//! - Runs once at startup; nothing is re-resolved at runtime
//! - A bad mapping is skipped with a warning, never fatal on its own
//! - Schemes are data (a registry), not a hard-coded match

pub mod parser;
pub mod registry;
pub mod resolve;
pub mod source;

pub use parser::{parse_mapping, Mapping, MappingError};
pub use registry::SchemeRegistry;
pub use resolve::{resolve_mappings, Resolved};
pub use source::{classify, AsnLookup, Classified, ClassifyError, Source};
