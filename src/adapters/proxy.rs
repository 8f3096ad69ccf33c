//! Single-upstream reverse proxy.
//!
//! # Data Flow
//! ```text
//! Request → target URL (upstream path + request path, queries merged)
//!         → strip hop-by-hop headers and Host, add X-Forwarded-For
//!         → request body streamed as it arrives
//!         → reqwest → streamed upstream response → client
//! ```

use axum::body::{Body, HttpBody};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use url::Url;

use crate::adapters::{Adapter, HandlerFuture};
use crate::http::request::peer_addr;
use crate::http::response::status_page;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Clone)]
pub struct ProxyAdapter {
    upstream: Url,
    client: reqwest::Client,
}

impl ProxyAdapter {
    pub fn new(upstream: Url, client: reqwest::Client) -> Self {
        Self { upstream, client }
    }

    async fn forward(self, request: Request<Body>) -> Response {
        let peer = peer_addr(&request);
        let (parts, body) = request.into_parts();
        let target = target_url(&self.upstream, parts.uri.path(), parts.uri.query());

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        if let Some(peer) = peer {
            append_forwarded_for(&mut headers, &peer.ip().to_string());
        }

        // Bodiless requests stay bodiless upstream instead of turning chunked.
        let body = if body.is_end_stream() {
            reqwest::Body::from(Vec::new())
        } else {
            reqwest::Body::wrap_stream(body.into_data_stream())
        };

        let upstream = self
            .client
            .request(parts.method, target.clone())
            .headers(headers)
            .body(body)
            .send()
            .await;

        match upstream {
            Ok(resp) => {
                let mut builder = Response::builder().status(resp.status());
                if let Some(out) = builder.headers_mut() {
                    out.extend(resp.headers().clone());
                    strip_hop_by_hop(out);
                }
                builder
                    .body(Body::from_stream(resp.bytes_stream()))
                    .unwrap_or_else(|_| status_page(StatusCode::BAD_GATEWAY))
            }
            Err(e) => {
                tracing::error!(target = %target, error = %e, "upstream request failed");
                status_page(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

impl Adapter for ProxyAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        Box::pin(self.clone().forward(request))
    }
}

/// Join the upstream path and the request path with exactly one slash
/// between them and merge both queries.
pub fn target_url(upstream: &Url, path: &str, query: Option<&str>) -> Url {
    let mut target = upstream.clone();
    let base = upstream.path();
    let joined = match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    };
    target.set_path(&joined);

    let merged = match (upstream.query().filter(|q| !q.is_empty()), query.filter(|q| !q.is_empty())) {
        (Some(a), Some(b)) => Some(format!("{}&{}", a, b)),
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    };
    target.set_query(merged.as_deref());
    target
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: &str) {
    let value = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip.to_string(),
    };
    if let Ok(v) = HeaderValue::from_str(&value) {
        headers.insert("x-forwarded-for", v);
    }
}
