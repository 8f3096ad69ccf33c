//! Fixed-content adapters: literal text and bare status answers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;

use crate::adapters::{Adapter, HandlerFuture};
use crate::http::response::html_page;

/// Serves a fixed string as `text/html`.
#[derive(Debug, Clone)]
pub struct LiteralAdapter {
    text: Bytes,
}

impl LiteralAdapter {
    pub fn new(text: String) -> Self {
        Self { text: Bytes::from(text) }
    }
}

impl Adapter for LiteralAdapter {
    fn serve(&self, _request: Request<Body>) -> HandlerFuture {
        let text = self.text.clone();
        Box::pin(async move { html_page(text) })
    }
}

/// Answers every request with a fixed status and an empty body.
#[derive(Debug, Clone, Copy)]
pub struct StatusAdapter {
    code: StatusCode,
}

impl StatusAdapter {
    pub fn new(code: StatusCode) -> Self {
        Self { code }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl Adapter for StatusAdapter {
    fn serve(&self, _request: Request<Body>) -> HandlerFuture {
        let code = self.code;
        Box::pin(async move { code.into_response() })
    }
}
