//! Diagnostic logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber once at startup
//! - Pick the level from `RUST_LOG` when set, else from configuration
//!
//! # Design Decisions
//! - Diagnostics go to stderr so stdout stays free for access lines
//! - `tower_http` spans follow the same level as the crate itself

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(level: &str) -> String {
    format!("mapserve={level},tower_http={level}")
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(level).into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
