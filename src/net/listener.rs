//! Listening socket, plain or TLS.
//!
//! # Responsibilities
//! - Bind to the configured address (`:port` means all interfaces)
//! - Load certificates when TLS is configured
//! - Report the bound address (port 0 resolves here)

use std::net::SocketAddr;

use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;

use crate::config::{parse_bind_address, ListenerConfig};
use crate::net::tls::load_tls_config;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Address did not parse.
    Address(String),
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Certificate or key could not be loaded.
    Tls(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address(a) => write!(f, "Invalid bind address: {}", a),
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Tls(e) => write!(f, "Failed to load TLS material: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// A bound listener, ready to be served.
pub enum Listener {
    Plain(TcpListener),
    /// axum-server drives TLS from a std listener.
    Tls(std::net::TcpListener, RustlsConfig),
}

impl Listener {
    /// Bind according to `config`.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr = parse_bind_address(&config.bind_address)
            .ok_or_else(|| ListenerError::Address(config.bind_address.clone()))?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        let listener = match &config.tls {
            None => Listener::Plain(listener),
            Some(tls) => {
                let rustls = load_tls_config(tls).await.map_err(ListenerError::Tls)?;
                let std_listener = listener.into_std().map_err(ListenerError::Bind)?;
                std_listener.set_nonblocking(true).map_err(ListenerError::Bind)?;
                Listener::Tls(std_listener, rustls)
            }
        };

        tracing::info!(address = %local_addr, tls = listener.is_tls(), "Listener bound");
        Ok(listener)
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        match self {
            Listener::Plain(l) => l.local_addr(),
            Listener::Tls(l, _) => l.local_addr(),
        }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Listener::Tls(..))
    }

    /// URL clients can use to reach this listener.
    pub fn url(&self) -> std::io::Result<String> {
        let addr = self.local_addr()?;
        let scheme = if self.is_tls() { "https" } else { "http" };
        Ok(format!("{}://{}/", scheme, addr))
    }
}
