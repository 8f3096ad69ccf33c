//! Multipart upload sink.
//!
//! # Responsibilities
//! - `GET`/`HEAD`: the upload form
//! - `POST`: stream every file part of a `multipart/form-data` body into the
//!   target directory, each under a fresh unique name
//!
//! # Design Decisions
//! - Parts are written chunk by chunk, never held whole in memory
//! - The whole multipart stream is capped; exceeding the cap answers 413
//! - A part that cannot be stored is logged and skipped, the rest still count

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use multer::{Constraints, Multipart, SizeLimit};
use tokio::io::AsyncWriteExt;

use crate::adapters::{Adapter, HandlerFuture};
use crate::http::request::peer_addr;
use crate::http::response::{html_page, status_page, HTML_UTF8};
use crate::mapping::parser::base_name;

const HTML_DOC: &str = r#"<!doctype html>
<head>
	<title>mapserve - file upload</title>
	<style type="text/css">
* { font-family: monospace }
input[type="submit"] { margin-top: 1em }
	</style>
</head>
<h1>mapserve - file upload</h1>"#;

const UPLOAD_FORM: &str = r#"<form method="post" enctype="multipart/form-data">
	<div>
		<div><input type="file" name="upload_file"></div>
	</div>
	<div>
		<input type="submit" value="Upload">
	</div>
</form>
"#;

#[derive(Debug, Clone)]
pub struct UploadAdapter {
    dir: PathBuf,
    limit: u64,
}

impl UploadAdapter {
    /// Creates `dir` (and parents) right away; failure is logged and
    /// surfaces again on the first upload.
    pub fn new(dir: PathBuf, limit: u64) -> Self {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create upload directory");
        }
        Self { dir, limit }
    }

    async fn receive(self, request: Request<Body>) -> Response {
        let started = Instant::now();
        let peer = peer_addr(&request);
        let boundary = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| multer::parse_boundary(ct).ok());
        let Some(boundary) = boundary else {
            return status_page(StatusCode::BAD_REQUEST);
        };

        let constraints =
            Constraints::new().size_limit(SizeLimit::new().whole_stream(self.limit));
        let mut multipart = Multipart::with_constraints(
            request.into_body().into_data_stream(),
            boundary,
            constraints,
        );

        let mut received: u64 = 0;
        loop {
            let mut field = match multipart.next_field().await {
                Ok(Some(f)) => f,
                Ok(None) => break,
                Err(e) => return multipart_failure(e),
            };
            let Some(file_name) = field.file_name().map(str::to_string) else {
                continue;
            };

            let prefix = name_prefix(peer, &file_name);
            let mut file = match self.create(&prefix).await {
                Ok(f) => Some(f),
                Err(e) => {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "cannot store upload");
                    None
                }
            };

            loop {
                let chunk = match field.chunk().await {
                    Ok(Some(c)) => c,
                    Ok(None) => break,
                    Err(e) => return multipart_failure(e),
                };
                let Some(out) = file.as_mut() else { continue };
                match out.write_all(&chunk).await {
                    Ok(()) => received += chunk.len() as u64,
                    Err(e) => {
                        tracing::warn!(file = %file_name, error = %e, "upload write failed");
                        file = None;
                    }
                }
            }
            if let Some(mut out) = file {
                if let Err(e) = out.flush().await {
                    tracing::warn!(file = %file_name, error = %e, "upload flush failed");
                }
            }
        }

        html_page(format!(
            "{}\nok, received {} bytes over {:?}",
            HTML_DOC,
            received,
            started.elapsed()
        ))
    }

    async fn create(&self, prefix: &str) -> std::io::Result<tokio::fs::File> {
        let dir = self.dir.clone();
        let prefix = prefix.to_string();
        let file = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(&prefix)
                .tempfile_in(&dir)
                .and_then(|tmp| tmp.keep().map_err(|e| e.error))
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(tokio::fs::File::from_std(file.0))
    }
}

impl Adapter for UploadAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        let this = self.clone();
        Box::pin(async move {
            match *request.method() {
                Method::POST => this.receive(request).await,
                Method::GET => form_response(Body::from(format!("{}{}", HTML_DOC, UPLOAD_FORM))),
                Method::HEAD => form_response(Body::empty()),
                _ => status_page(StatusCode::METHOD_NOT_ALLOWED),
            }
        })
    }
}

fn form_response(body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, HTML_UTF8.to_string()),
            (header::CONTENT_LENGTH, (HTML_DOC.len() + UPLOAD_FORM.len()).to_string()),
        ],
        body,
    )
        .into_response()
}

fn multipart_failure(err: multer::Error) -> Response {
    tracing::warn!(error = %err, "upload rejected");
    match err {
        multer::Error::StreamSizeExceeded { .. } => status_page(StatusCode::PAYLOAD_TOO_LARGE),
        _ => status_page(StatusCode::BAD_REQUEST),
    }
}

/// `<hex ip>_<port>_<basename>_`; the random tail is appended on creation.
pub fn name_prefix(peer: Option<SocketAddr>, file_name: &str) -> String {
    let (ip_hex, port) = match peer {
        Some(addr) => {
            let octets = match addr.ip() {
                IpAddr::V4(v4) => v4.octets().to_vec(),
                IpAddr::V6(v6) => v6.octets().to_vec(),
            };
            let hex: String = octets.iter().map(|b| format!("{:02x}", b)).collect();
            (hex, addr.port().to_string())
        }
        None => (String::new(), String::new()),
    };
    format!("{}_{}_{}_", ip_hex, port, base_name(file_name))
}
