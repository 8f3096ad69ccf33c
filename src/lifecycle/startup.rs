//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve mappings into a dispatch table
//! - Bind the optional index page
//! - Bind the listener and print the optional QR code
//! - Assemble the server and run it until shutdown
//!
//! # Design Decisions
//! - Fail fast: configuration and listener errors are fatal
//! - Individual bad mappings are not; zero usable mappings is
//! - Listeners bind last (traffic only when ready)

use std::sync::Arc;

use thiserror::Error;

use crate::adapters::index::IndexAdapter;
use crate::adapters::qr::render_terminal;
use crate::adapters::BuildContext;
use crate::compression::CompressionPools;
use crate::config::{ConfigError, ServerConfig};
use crate::http::{HttpServer, Outputs};
use crate::lifecycle::signals::spawn_signal_listener;
use crate::lifecycle::Shutdown;
use crate::mapping::{resolve_mappings, SchemeRegistry};
use crate::net::{Listener, ListenerError};
use crate::routing::Dispatch;

/// Errors that stop the server from starting (or keep running).
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no mappings given")]
    NoMappings,

    #[error("none of the {0} mappings could be bound")]
    NoValidMapping(usize),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Everything needed to start serving.
pub struct Prepared {
    pub server: HttpServer,
    pub listener: Listener,
    /// Bound endpoints, sorted.
    pub endpoints: Vec<String>,
}

/// Resolve the mappings of `config` into a dispatch table, including the
/// index page when asked for.
pub fn build_dispatch(config: &ServerConfig, pools: Arc<CompressionPools>) -> Result<Dispatch, StartupError> {
    if config.mappings.is_empty() {
        return Err(StartupError::NoMappings);
    }

    let ctx = BuildContext::new(config.uploads.max_size, pools);
    let registry = SchemeRegistry::default();
    let resolved = resolve_mappings(&config.mappings, &registry, &ctx);
    if resolved.dispatch.is_empty() {
        return Err(StartupError::NoValidMapping(config.mappings.len()));
    }
    if resolved.skipped > 0 {
        tracing::warn!(skipped = resolved.skipped, bound = resolved.endpoints.len(), "some mappings were skipped");
    }

    let mut dispatch = resolved.dispatch;
    if config.serve_index {
        bind_index(&mut dispatch);
    }
    Ok(dispatch)
}

fn bind_index(dispatch: &mut Dispatch) {
    if dispatch.contains("/") {
        tracing::warn!("\"/\" is already mapped, not serving the index page");
        return;
    }
    let index = IndexAdapter::new(&dispatch.endpoints());
    dispatch.bind("/", Arc::new(index));
    tracing::info!("mapserve serves the index page through \"/\"");
}

/// Resolve mappings, bind the listener and assemble the server.
pub async fn prepare(config: &ServerConfig, outputs: Outputs) -> Result<Prepared, StartupError> {
    let pools = Arc::new(CompressionPools::default());
    let dispatch = build_dispatch(config, pools.clone())?;
    let endpoints = dispatch.endpoints();

    let listener = Listener::bind(&config.listener).await?;
    if config.show_qr {
        show_qr(&listener);
    }

    let server = HttpServer::new(config, dispatch, pools, outputs);
    Ok(Prepared {
        server,
        listener,
        endpoints,
    })
}

fn show_qr(listener: &Listener) {
    let url = match listener.url() {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!(error = %e, "cannot determine listener url for qr code");
            return;
        }
    };
    match render_terminal(&url) {
        Ok(art) => println!("{}\n{}", art, url),
        Err(e) => tracing::warn!(error = %e, "cannot render qr code"),
    }
}

/// Run the server described by `config` until a stop signal arrives.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    let prepared = prepare(&config, Outputs::default()).await?;
    tracing::info!(endpoints = prepared.endpoints.len(), "mapserve ready");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());
    prepared.server.run(prepared.listener, &shutdown).await?;
    Ok(())
}
