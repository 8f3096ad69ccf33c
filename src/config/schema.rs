//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default cap on one upload's multipart stream (512 MiB).
pub const DEFAULT_UPLOAD_LIMIT: u64 = 512 * 1024 * 1024;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Mappings in `[endpoint:]source` form, resolved in order.
    pub mappings: Vec<String>,

    /// Bind an index page listing every endpoint at `/`.
    pub serve_index: bool,

    /// Print a QR code pointing at the server on startup.
    pub show_qr: bool,

    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Middleware pipeline toggles.
    pub pipeline: PipelineConfig,

    pub uploads: UploadConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address; `:port` means all interfaces.
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: ":8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Which pipeline stages run, and how.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Value of the `Server` response header.
    pub server_id: String,

    /// Honor `Accept-Encoding`.
    pub compress: bool,

    /// Write one access line per request to stdout.
    pub log_requests: bool,

    /// Dump request bodies to stdout.
    pub tee_body: bool,

    /// `user:password` required via basic auth.
    pub auth: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            server_id: default_server_id(),
            compress: true,
            log_requests: true,
            tee_body: false,
            auth: None,
        }
    }
}

pub fn default_server_id() -> String {
    concat!("mapserve/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum size of one multipart upload stream in bytes.
    pub max_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_UPLOAD_LIMIT,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Diagnostic log level when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
