//! TLS certificate loading.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

/// Load the PEM certificate chain and private key named in `config`.
pub async fn load_tls_config(config: &TlsConfig) -> io::Result<RustlsConfig> {
    require_file(&config.cert_path, "certificate")?;
    require_file(&config.key_path, "private key")?;
    RustlsConfig::from_pem_file(&config.cert_path, &config.key_path).await
}

fn require_file(path: &Path, what: &str) -> io::Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} file not found: {}", what, path.display()),
        ))
    }
}
