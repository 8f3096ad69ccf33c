//! Templated permanent redirects.
//!
//! The location may contain `{{.Field}}` tokens filled from the request:
//! `Host`, `HostOnly`, `Port` (defaults to `80`), `Path`, `RawQuery` and
//! `RequestURI`. `30x/old:https://{{.HostOnly}}:8443{{.Path}}` moves a site
//! to another port while keeping the path.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::{Adapter, BuildError, HandlerFuture};
use crate::http::request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Host,
    HostOnly,
    Port,
    Path,
    RawQuery,
    RequestUri,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
}

/// Request values a template can refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectContext {
    pub host: String,
    pub path: String,
    pub raw_query: String,
    pub request_uri: String,
}

impl RedirectContext {
    fn from_request(req: &Request<Body>) -> Self {
        Self {
            host: request::host(req),
            path: req.uri().path().to_string(),
            raw_query: req.uri().query().unwrap_or("").to_string(),
            request_uri: request::request_uri(req),
        }
    }

    fn host_and_port(&self) -> (&str, &str) {
        request::split_host_port(&self.host)
    }
}

/// Answers `301 Moved Permanently` with a location built from a template.
#[derive(Debug, Clone)]
pub struct RedirectAdapter {
    template: Vec<Segment>,
}

impl RedirectAdapter {
    pub fn new(location: &str) -> Result<Self, BuildError> {
        Ok(Self {
            template: parse_template(location)?,
        })
    }

    /// Expand the template for one request.
    pub fn render(&self, ctx: &RedirectContext) -> String {
        let (host_only, port) = ctx.host_and_port();
        let port = if port.is_empty() { "80" } else { port };

        let mut out = String::new();
        for segment in &self.template {
            match segment {
                Segment::Text(t) => out.push_str(t),
                Segment::Field(Field::Host) => out.push_str(&ctx.host),
                Segment::Field(Field::HostOnly) => out.push_str(host_only),
                Segment::Field(Field::Port) => out.push_str(port),
                Segment::Field(Field::Path) => out.push_str(&ctx.path),
                Segment::Field(Field::RawQuery) => out.push_str(&ctx.raw_query),
                Segment::Field(Field::RequestUri) => out.push_str(&ctx.request_uri),
            }
        }
        out
    }
}

fn parse_template(location: &str) -> Result<Vec<Segment>, BuildError> {
    let mut segments = Vec::new();
    let mut rest = location;

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| BuildError::Redirect(location.to_string()))?;
        let field = match after[..end].trim() {
            ".Host" => Field::Host,
            ".HostOnly" => Field::HostOnly,
            ".Port" => Field::Port,
            ".Path" => Field::Path,
            ".RawQuery" => Field::RawQuery,
            ".RequestURI" => Field::RequestUri,
            _ => return Err(BuildError::Redirect(location.to_string())),
        };
        segments.push(Segment::Field(field));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest.to_string()));
    }
    Ok(segments)
}

impl Adapter for RedirectAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        let location = self.render(&RedirectContext::from_request(&request));
        Box::pin(async move {
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(host: &str, uri: &str) -> RedirectContext {
        let req = Request::builder()
            .uri(uri)
            .header("Host", host)
            .body(Body::empty())
            .unwrap();
        RedirectContext::from_request(&req)
    }

    #[test]
    fn test_plain_location() {
        let r = RedirectAdapter::new("https://example.com/new").unwrap();
        assert_eq!(r.render(&ctx("a", "/old")), "https://example.com/new");
    }

    #[test]
    fn test_template_tokens() {
        let r = RedirectAdapter::new("https://{{.HostOnly}}:8443{{ .Path }}?{{.RawQuery}}").unwrap();
        assert_eq!(
            r.render(&ctx("example.com:8080", "/a/b?x=1")),
            "https://example.com:8443/a/b?x=1"
        );

        let r = RedirectAdapter::new("//{{.Host}}/p{{.Port}}{{.RequestURI}}").unwrap();
        assert_eq!(r.render(&ctx("example.com", "/q?y")), "//example.com/p80/q?y");
    }

    #[test]
    fn test_ipv6_host() {
        let r = RedirectAdapter::new("{{.HostOnly}}|{{.Port}}").unwrap();
        assert_eq!(r.render(&ctx("[::1]:9000", "/")), "::1|9000");
    }

    #[test]
    fn test_invalid_templates() {
        assert!(RedirectAdapter::new("{{.Host").is_err());
        assert!(RedirectAdapter::new("{{.Nope}}").is_err());
    }

    #[tokio::test]
    async fn test_serve_moved_permanently() {
        let r = RedirectAdapter::new("/new{{.Path}}").unwrap();
        let req = Request::builder()
            .uri("/old")
            .header("Host", "h")
            .body(Body::empty())
            .unwrap();
        let res = r.serve(req).await;
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(res.headers()[header::LOCATION], "/new/old");
    }
}
