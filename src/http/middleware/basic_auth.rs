//! HTTP basic authentication stage.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::http::request::peer_addr;
use crate::http::response::status_page;

const CHALLENGE: &str = "Basic realm=\"mapserve\"";

/// The single accepted user and password.
#[derive(Clone, Debug)]
pub struct BasicAuth {
    user: Arc<str>,
    password: Arc<str>,
}

impl BasicAuth {
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            user: Arc::from(user),
            password: Arc::from(password),
        }
    }

    /// From `user:password`; the password may itself contain `:`.
    pub fn parse(credentials: &str) -> Option<Self> {
        let (user, password) = credentials.split_once(':')?;
        Some(Self::new(user, password))
    }

    /// Whether `headers` carry exactly these credentials.
    pub fn accepts(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let Some((scheme, encoded)) = value.split_once(' ') else {
            return false;
        };
        if !scheme.eq_ignore_ascii_case("basic") {
            return false;
        }
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        match decoded.split_once(':') {
            Some((user, password)) => user == &*self.user && password == &*self.password,
            None => false,
        }
    }
}

pub async fn basic_auth(
    State(auth): State<BasicAuth>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if auth.accepts(request.headers()) {
        return next.run(request).await;
    }

    tracing::warn!(
        remote = ?peer_addr(&request),
        method = %request.method(),
        path = %request.uri().path(),
        "rejected request without valid credentials"
    );
    let mut response = status_page(StatusCode::UNAUTHORIZED);
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(CHALLENGE));
    response
}
