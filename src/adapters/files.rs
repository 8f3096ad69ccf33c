//! Static file and directory serving.
//!
//! # Responsibilities
//! - Serve a single file at its endpoint
//! - Serve a directory tree below a subtree endpoint, prefix stripped
//! - Redirect directory paths lacking a trailing slash
//! - Generate listings for directories without `index.html`
//!
//! # Design Decisions
//! - File bodies, ranges and conditional requests are tower-http's `ServeFile`/`ServeDir`
//! - The root is stat'ed per request so files created later are picked up
//! - `..` segments are rejected before touching the filesystem

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

use crate::adapters::listing::render_listing;
use crate::adapters::{Adapter, HandlerFuture};
use crate::http::request::strip_endpoint;
use crate::http::response::{html_page, not_found, status_page};

#[derive(Debug, Clone)]
pub struct FileOrDirAdapter {
    root: PathBuf,
    endpoint: String,
}

impl FileOrDirAdapter {
    pub fn new(root: PathBuf, endpoint: &str) -> Self {
        Self {
            root,
            endpoint: endpoint.to_string(),
        }
    }

    async fn serve_dir(&self, mut req: Request<Body>) -> Response {
        let raw_path = req.uri().path().to_string();
        let rel_encoded = strip_endpoint(&raw_path, &self.endpoint).to_string();
        let rel = percent_decode_str(&rel_encoded).decode_utf8_lossy().into_owned();
        if rel.split('/').any(|segment| segment == "..") {
            return status_page(StatusCode::BAD_REQUEST);
        }

        let target = self.root.join(rel.trim_start_matches('/'));
        if let Ok(meta) = tokio::fs::metadata(&target).await {
            if meta.is_dir() {
                if !raw_path.ends_with('/') {
                    let mut location = format!("{}/", raw_path);
                    if let Some(q) = req.uri().query() {
                        location.push('?');
                        location.push_str(q);
                    }
                    return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)])
                        .into_response();
                }
                if tokio::fs::metadata(target.join("index.html")).await.is_err() {
                    return listing(&target, rel != "/").await;
                }
            }
        }

        let path_and_query = match req.uri().query() {
            Some(q) => format!("{}?{}", rel_encoded, q),
            None => rel_encoded,
        };
        match path_and_query.parse::<Uri>() {
            Ok(uri) => *req.uri_mut() = uri,
            Err(_) => return status_page(StatusCode::BAD_REQUEST),
        }

        match ServeDir::new(&self.root).oneshot(req).await {
            Ok(res) => res.map(Body::new),
            Err(never) => match never {},
        }
    }
}

impl Adapter for FileOrDirAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        let this = self.clone();
        Box::pin(async move {
            let meta = match tokio::fs::metadata(&this.root).await {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(path = %this.root.display(), error = %e, "source not found");
                    return not_found();
                }
            };
            if meta.is_dir() {
                return this.serve_dir(request).await;
            }
            match ServeFile::new(&this.root).oneshot(request).await {
                Ok(res) => res.map(Body::new),
                Err(never) => match never {},
            }
        })
    }
}

async fn listing(dir: &Path, with_parent: bool) -> Response {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "cannot list directory");
            return status_page(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut names = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if tokio::fs::metadata(entry.path()).await.is_ok_and(|m| m.is_dir()) {
                    name.push('/');
                }
                names.push(name);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "directory listing cut short");
                break;
            }
        }
    }
    names.sort();
    html_page(render_listing(&names, with_parent))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn get(adapter: &FileOrDirAdapter, uri: &str) -> (StatusCode, Option<String>, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let res = adapter.serve(req).await;
        let status = res.status();
        let location = res
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, location, String::from_utf8_lossy(&body).into_owned())
    }

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::create_dir_all(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("sub/inner.txt"), "inner").unwrap();
        std::fs::write(dir.path().join("site/index.html"), "<p>index</p>").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_single_file() {
        let dir = tree();
        let adapter = FileOrDirAdapter::new(dir.path().join("hello.txt"), "/hello.txt");
        let (status, _, body) = get(&adapter, "/hello.txt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_directory_prefix_stripped() {
        let dir = tree();
        let adapter = FileOrDirAdapter::new(dir.path().to_path_buf(), "/files/");
        assert_eq!(get(&adapter, "/files/sub/inner.txt").await.2, "inner");
        assert_eq!(get(&adapter, "/files/site/").await.2, "<p>index</p>");
        assert_eq!(get(&adapter, "/files/nope.txt").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_directory_listing_and_redirect() {
        let dir = tree();
        let adapter = FileOrDirAdapter::new(dir.path().to_path_buf(), "/files/");

        let (status, _, body) = get(&adapter, "/files/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<a href=\"hello.txt\">hello.txt</a>"));
        assert!(body.contains("<a href=\"sub/\">sub/</a>"));
        assert!(!body.contains(".."));

        let (status, location, _) = get(&adapter, "/files/sub").await;
        assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
        assert_eq!(location.as_deref(), Some("/files/sub/"));

        let (_, _, body) = get(&adapter, "/files/sub/").await;
        assert!(body.contains("<a href=\"../\">..</a>"));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let dir = tree();
        let adapter = FileOrDirAdapter::new(dir.path().join("sub"), "/s/");
        assert_eq!(get(&adapter, "/s/../hello.txt").await.0, StatusCode::BAD_REQUEST);
        assert_eq!(get(&adapter, "/s/%2e%2e/hello.txt").await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let adapter = FileOrDirAdapter::new(PathBuf::from("/definitely/not/here"), "/x");
        assert_eq!(get(&adapter, "/x").await.0, StatusCode::NOT_FOUND);
    }
}
