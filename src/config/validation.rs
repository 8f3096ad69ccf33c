//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Normalize the bind address (`:port` means all interfaces)
//! - Validate value ranges and header values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BindAddress(String),
    Auth,
    ServerId(String),
    UploadLimit,
    TlsPath(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::BindAddress(addr) => write!(f, "invalid bind address {:?}", addr),
            ValidationError::Auth => write!(f, "auth must have the form user:password"),
            ValidationError::ServerId(id) => write!(f, "server id {:?} is not a valid header value", id),
            ValidationError::UploadLimit => write!(f, "upload limit must be greater than zero"),
            ValidationError::TlsPath(which) => write!(f, "tls {} path is empty", which),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Parse a bind address; `:8080` and `8080` listen on all interfaces.
pub fn parse_bind_address(addr: &str) -> Option<SocketAddr> {
    let addr = addr.trim();
    if let Ok(parsed) = addr.parse() {
        return Some(parsed);
    }
    let port = addr.strip_prefix(':').unwrap_or(addr);
    port.parse::<u16>()
        .ok()
        .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if parse_bind_address(&config.listener.bind_address).is_none() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.as_os_str().is_empty() {
            errors.push(ValidationError::TlsPath("cert".to_string()));
        }
        if tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::TlsPath("key".to_string()));
        }
    }
    if let Some(auth) = &config.pipeline.auth {
        if !auth.contains(':') {
            errors.push(ValidationError::Auth);
        }
    }
    if HeaderValue::from_str(&config.pipeline.server_id).is_err() {
        errors.push(ValidationError::ServerId(config.pipeline.server_id.clone()));
    }
    if config.uploads.max_size == 0 {
        errors.push(ValidationError::UploadLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bind_address() {
        assert_eq!(parse_bind_address(":8080"), Some("0.0.0.0:8080".parse().unwrap()));
        assert_eq!(parse_bind_address("9000"), Some("0.0.0.0:9000".parse().unwrap()));
        assert_eq!(parse_bind_address("127.0.0.1:1"), Some("127.0.0.1:1".parse().unwrap()));
        assert_eq!(parse_bind_address("[::1]:80"), Some("[::1]:80".parse().unwrap()));
        assert_eq!(parse_bind_address("localhost:x"), None);
    }

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        config.pipeline.auth = Some("nopassword".to_string());
        config.pipeline.server_id = "bad\nid".to_string();
        config.uploads.max_size = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Auth));
        assert!(errors.contains(&ValidationError::UploadLimit));
    }
}
