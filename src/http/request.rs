//! Request inspection helpers.
//!
//! # Responsibilities
//! - Recover the peer address injected by the serve loop
//! - Extract host and request URI for logging and templates
//! - Compute paths relative to the endpoint an adapter is bound to

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request};

/// Remote peer address, if the serve loop attached one.
pub fn peer_addr(req: &Request<Body>) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Host the client addressed, from the `Host` header or the absolute URI.
pub fn host(req: &Request<Body>) -> String {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

/// Split `host[:port]`, understanding bracketed IPv6 literals.
pub fn split_host_port(host: &str) -> (&str, &str) {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some((ip, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').unwrap_or("");
            return (ip, port);
        }
    }
    match host.rsplit_once(':') {
        Some((h, p)) if !h.contains(':') => (h, p),
        _ => (host, ""),
    }
}

/// Path plus query as sent on the request line.
pub fn request_uri(req: &Request<Body>) -> String {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

/// Request path with the endpoint prefix removed, always starting with `/`.
///
/// Subtree endpoints keep their trailing slash as the leading slash of the
/// remainder: endpoint `/docs/` and path `/docs/a/b` give `/a/b`.
pub fn strip_endpoint<'a>(path: &'a str, endpoint: &str) -> &'a str {
    let prefix = endpoint.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('/') => rest,
        Some("") => "/",
        _ => path,
    }
}
