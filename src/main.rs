//! mapserve
//!
//! Binds every `endpoint:source` mapping given on the command line (or in
//! the config file) to a handler and serves them over HTTP or HTTPS.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net::Listener ──▶ http::server ──▶ middleware stack
//!                                                            │
//!                                      ┌─────────────────────┘
//!                                      ▼
//!                              routing::Dispatch ──▶ adapters::* ──▶ files, archives,
//!                                      ▲                              uploads, proxy, cgi
//!                                      │
//!     mapping::resolve ────────────────┘  (startup: parse → classify → build → bind)
//!
//!     Cross-cutting: config (file + CLI), observability (stderr diagnostics,
//!     stdout access log), compression pools, lifecycle (signals, shutdown)
//! ```

use clap::Parser;

use mapserve::config::{self, Cli};
use mapserve::lifecycle;
use mapserve::observability::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mapserve: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.observability.log_level);
    tracing::info!("mapserve v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        mappings = config.mappings.len(),
        "Configuration loaded"
    );

    lifecycle::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
