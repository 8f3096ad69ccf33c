//! Landing page linking every bound endpoint.

use axum::body::{Body, Bytes};
use axum::http::Request;

use crate::adapters::{Adapter, HandlerFuture};
use crate::http::response::{escape_html, html_page, not_found};

#[derive(Debug, Clone)]
pub struct IndexAdapter {
    page: Bytes,
}

impl IndexAdapter {
    pub fn new<S: AsRef<str>>(endpoints: &[S]) -> Self {
        let mut page = String::from(
            "<!DOCTYPE html>\n<html>\n\t<head>\n\t\t<title>mapserve</title>\n\t</head>\n\t<body>\n\t\t<h1>mapserve</h1>\n\t\t<ul>\n",
        );
        for endpoint in endpoints {
            let escaped = escape_html(endpoint.as_ref());
            page.push_str(&format!("\t\t\t<li><a href=\".{0}\">{0}</a></li>\n", escaped));
        }
        page.push_str("\t\t</ul>\n\t</body>\n</html>\n");
        Self {
            page: Bytes::from(page),
        }
    }
}

impl Adapter for IndexAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        let page = self.page.clone();
        let exact = request.uri().path() == "/";
        Box::pin(async move {
            if exact {
                html_page(page)
            } else {
                not_found()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_lists_endpoints() {
        let adapter = IndexAdapter::new(&["/docs/", "/up"]);
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = adapter.serve(req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("<li><a href=\"./docs/\">/docs/</a></li>"));
        assert!(html.contains("<li><a href=\"./up\">/up</a></li>"));
    }

    #[tokio::test]
    async fn test_only_root() {
        let adapter = IndexAdapter::new(&["/a"]);
        let req = Request::builder().uri("/other").body(Body::empty()).unwrap();
        assert_eq!(adapter.serve(req).await.status(), StatusCode::NOT_FOUND);
    }
}
