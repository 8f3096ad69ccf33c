//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)          command line (clap)
//!     → loader.rs (parse)         → cli.rs (Cli::apply overlays values,
//!                                   mappings appended after the file's)
//!     → validation.rs (semantic checks, all errors collected)
//!     → ServerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load, load_config, ConfigError};
pub use schema::{ListenerConfig, PipelineConfig, ServerConfig, TlsConfig};
pub use validation::{parse_bind_address, validate_config, ValidationError};
