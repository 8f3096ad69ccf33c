//! Response construction helpers.
//!
//! # Responsibilities
//! - Plain status pages in the `<code>: <reason>` form
//! - Content type defaults that never override an adapter's own choice
//! - HTML escaping for generated pages

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

pub const HTML_UTF8: &str = "text/html; charset=utf-8";

/// A bare status response with a short text body.
pub fn status_page(code: StatusCode) -> Response {
    let body = format!("{}: {}", code.as_u16(), code.canonical_reason().unwrap_or(""));
    (code, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// The plain 404 answer for unmatched paths and missing content.
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "404 page not found\n",
    )
        .into_response()
}

/// A `text/html` response.
pub fn html_page(body: impl Into<Body>) -> Response {
    ([(header::CONTENT_TYPE, HTML_UTF8)], body.into()).into_response()
}

/// Set `Content-Type` only when the response does not carry one yet.
pub fn default_content_type(mut response: Response, content_type: &'static str) -> Response {
    if !response.headers().contains_key(header::CONTENT_TYPE) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

/// Escape text for inclusion in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
