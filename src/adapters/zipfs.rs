//! Read-only filesystem view into a zip archive.
//!
//! # Responsibilities
//! - Serve regular-file entries below a configurable prefix
//! - List folders (or serve a configured index) for trailing-slash paths
//! - Pick content types by extension, then by sniffing the first bytes
//!
//! # Design Decisions
//! - The archive is reopened on every request: the view always matches the
//!   file on disk, at the cost of a central-directory parse per request
//! - Decompression runs on the blocking pool and streams through a channel
//! - Listings show only entries literally present in the archive

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use percent_encoding::percent_decode_str;
use tokio::sync::oneshot;
use zip::read::ZipFile;
use zip::ZipArchive;

use crate::adapters::listing::render_listing;
use crate::adapters::{Adapter, HandlerFuture};
use crate::archive::{channel_body, ChannelWriter};
use crate::http::request::strip_endpoint;
use crate::http::response::{html_page, not_found, status_page};
use crate::mapping::parser::clean_path;

const SNIFF_LEN: u64 = 512;

#[derive(Debug, Clone)]
pub struct ZipFsAdapter {
    archive: PathBuf,
    prefix: String,
    index: Option<String>,
    endpoint: String,
}

/// What the blocking worker decided before any body bytes flow.
enum Head {
    File { content_type: String, size: u64 },
    Listing(String),
    NotFound,
    Failed,
}

impl ZipFsAdapter {
    pub fn new(archive: PathBuf, prefix: String, index: Option<String>, endpoint: &str) -> Self {
        Self {
            archive,
            prefix,
            index,
            endpoint: endpoint.to_string(),
        }
    }

    fn lookup(&self, rel: String, head_tx: oneshot::Sender<Head>, mut writer: ChannelWriter) {
        let mut archive = match File::open(&self.archive)
            .map_err(zip::result::ZipError::Io)
            .and_then(ZipArchive::new)
        {
            Ok(a) => a,
            Err(e) => {
                tracing::error!(archive = %self.archive.display(), error = %e, "cannot open zip archive");
                let _ = head_tx.send(Head::Failed);
                return;
            }
        };

        let mut rel = rel;
        if rel.ends_with('/') {
            match &self.index {
                None => {
                    let names: Vec<&str> = archive.file_names().collect();
                    let folder = scoped_folder(&self.prefix, &rel);
                    let children = direct_children(&names, &folder);
                    let _ = head_tx.send(Head::Listing(render_listing(&children, rel != "/")));
                    return;
                }
                Some(index) => rel.push_str(index),
            }
        }

        let name = scoped_name(&self.prefix, &rel);
        let mut entry = match archive.by_name(&name) {
            Ok(e) if is_regular(&e) => e,
            _ => {
                let _ = head_tx.send(Head::NotFound);
                return;
            }
        };

        let size = entry.size();
        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        if let Err(e) = (&mut entry).take(SNIFF_LEN).read_to_end(&mut head) {
            tracing::error!(entry = %name, error = %e, "cannot read zip entry");
            let _ = head_tx.send(Head::Failed);
            return;
        }

        let content_type = mime_guess::from_path(&name)
            .first_raw()
            .unwrap_or_else(|| sniff(&head))
            .to_string();
        if head_tx.send(Head::File { content_type, size }).is_err() {
            return;
        }

        let result = writer
            .write_all(&head)
            .and_then(|_| io::copy(&mut entry, &mut writer))
            .and_then(|_| writer.flush());
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!(entry = %name, "zipfs client went away");
            }
            Err(e) => {
                tracing::error!(entry = %name, error = %e, "zip entry stream aborted");
                writer.abort(e);
            }
        }
    }
}

impl Adapter for ZipFsAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        let this = self.clone();
        let raw = strip_endpoint(request.uri().path(), &self.endpoint).to_string();
        Box::pin(async move {
            let rel = percent_decode_str(&raw).decode_utf8_lossy().into_owned();
            let (writer, body) = channel_body();
            let (head_tx, head_rx) = oneshot::channel();
            tokio::task::spawn_blocking(move || this.lookup(rel, head_tx, writer));

            match head_rx.await {
                Ok(Head::File { content_type, size }) => Response::builder()
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CONTENT_LENGTH, size)
                    .body(body)
                    .unwrap_or_else(|_| status_page(StatusCode::INTERNAL_SERVER_ERROR)),
                Ok(Head::Listing(html)) => html_page(html),
                Ok(Head::NotFound) => not_found(),
                Ok(Head::Failed) | Err(_) => status_page(StatusCode::INTERNAL_SERVER_ERROR),
            }
        })
    }
}

fn is_regular<R: std::io::Read>(entry: &ZipFile<'_, R>) -> bool {
    if entry.is_dir() {
        return false;
    }
    match entry.unix_mode() {
        Some(mode) => !matches!(mode & 0o170000, 0o120000 | 0o040000),
        None => true,
    }
}

/// Archive name for a request path below `prefix`.
fn scoped_name(prefix: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    let joined = if prefix.is_empty() {
        rel.to_string()
    } else {
        format!("{}/{}", prefix, rel)
    };
    match clean_path(&joined).as_str() {
        "." | "/" => String::new(),
        cleaned => cleaned.trim_start_matches('/').to_string(),
    }
}

/// Folder name (with trailing `/`, or empty for the root) for a listing.
fn scoped_folder(prefix: &str, rel: &str) -> String {
    let mut name = scoped_name(prefix, rel);
    if !name.is_empty() {
        name.push('/');
    }
    name
}

/// Entries directly inside `folder`, relative to it, sorted.
pub fn direct_children<S: AsRef<str>>(names: &[S], folder: &str) -> Vec<String> {
    let mut children: Vec<String> = names
        .iter()
        .filter_map(|name| {
            let rest = name.as_ref().strip_prefix(folder)?;
            let bare = rest.strip_suffix('/').unwrap_or(rest);
            if bare.is_empty() || bare.contains('/') {
                None
            } else {
                Some(rest.to_string())
            }
        })
        .collect();
    children.sort();
    children.dedup();
    children
}

/// Guess a content type from leading bytes.
pub fn sniff(data: &[u8]) -> &'static str {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(data.len());
    let text = &data[start..];
    let lower: Vec<u8> = text.iter().take(16).map(u8::to_ascii_lowercase).collect();

    const HTML: [&[u8]; 8] = [
        b"<!doctype html",
        b"<html",
        b"<head",
        b"<body",
        b"<script",
        b"<title",
        b"<div",
        b"<p>",
    ];
    if HTML.iter().any(|sig| lower.starts_with(sig)) {
        return "text/html; charset=utf-8";
    }
    if lower.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    let binary: [(&[u8], &'static str); 7] = [
        (b"%PDF-", "application/pdf"),
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b\x08", "application/x-gzip"),
    ];
    if let Some((_, ct)) = binary.iter().find(|(sig, _)| data.starts_with(sig)) {
        return ct;
    }

    let is_binary = data
        .iter()
        .any(|b| matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f));
    if is_binary {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use zip::write::SimpleFileOptions;

    fn build_archive(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("site.zip");
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in [
            ("public/index.html", "<html>home</html>"),
            ("public/a.txt", "plain a"),
            ("public/docs/b.md", "# b"),
            ("public/blob", "\u{1}\u{2}binary"),
            ("top.txt", "outside"),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.add_directory("public/docs/", options).unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    async fn get(adapter: &ZipFsAdapter, uri: &str) -> (StatusCode, String, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let res = adapter.serve(req).await;
        let status = res.status();
        let ct = res
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, ct, String::from_utf8_lossy(&body).into_owned())
    }

    #[test]
    fn test_direct_children() {
        let names = ["a.txt", "b/c.txt", "b/d/e.txt"];
        assert_eq!(direct_children(&names, "b/"), vec!["c.txt"]);
        assert_eq!(direct_children(&names, ""), vec!["a.txt"]);

        let with_dirs = ["b/", "b/d/", "b/d/e.txt", "b/c.txt"];
        assert_eq!(direct_children(&with_dirs, "b/"), vec!["c.txt", "d/"]);
    }

    #[test]
    fn test_scoped_names() {
        assert_eq!(scoped_name("", "/a/b.txt"), "a/b.txt");
        assert_eq!(scoped_name("public/", "/a.txt"), "public/a.txt");
        assert_eq!(scoped_name("public", "/"), "public");
        assert_eq!(scoped_folder("", "/"), "");
        assert_eq!(scoped_folder("public", "/docs/"), "public/docs/");
    }

    #[test]
    fn test_sniff() {
        assert_eq!(sniff(b"  <!DOCTYPE html><html>"), "text/html; charset=utf-8");
        assert_eq!(sniff(b"%PDF-1.7"), "application/pdf");
        assert_eq!(sniff(b"just words"), "text/plain; charset=utf-8");
        assert_eq!(sniff(b"\x00\x01\x02"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_serve_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(dir.path());
        let adapter = ZipFsAdapter::new(archive, "public/".to_string(), None, "/z/");

        let (status, ct, body) = get(&adapter, "/z/a.txt").await;
        assert_eq!(status, StatusCode::OK);
        assert!(ct.starts_with("text/plain"));
        assert_eq!(body, "plain a");

        let (_, ct, _) = get(&adapter, "/z/blob").await;
        assert_eq!(ct, "application/octet-stream");

        assert_eq!(get(&adapter, "/z/top.txt").await.0, StatusCode::NOT_FOUND);
        assert_eq!(get(&adapter, "/z/docs").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_listing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(dir.path());
        let adapter = ZipFsAdapter::new(archive, "public/".to_string(), None, "/z/");

        let (status, ct, body) = get(&adapter, "/z/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ct, "text/html; charset=utf-8");
        assert!(body.contains("<a href=\"a.txt\">a.txt</a>"));
        assert!(body.contains("<a href=\"docs/\">docs/</a>"));
        assert!(!body.contains("b.md"));
        assert!(!body.contains(".."));

        let (_, _, body) = get(&adapter, "/z/docs/").await;
        assert!(body.contains("<a href=\"../\">..</a>"));
        assert!(body.contains("b.md"));
    }

    #[tokio::test]
    async fn test_index() {
        let dir = tempfile::tempdir().unwrap();
        let archive = build_archive(dir.path());
        let adapter = ZipFsAdapter::new(
            archive,
            "public".to_string(),
            Some("index.html".to_string()),
            "/",
        );
        let (status, ct, body) = get(&adapter, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(ct.starts_with("text/html"));
        assert_eq!(body, "<html>home</html>");
    }

    #[tokio::test]
    async fn test_missing_archive() {
        let adapter = ZipFsAdapter::new(PathBuf::from("/no/such.zip"), String::new(), None, "/");
        assert_eq!(get(&adapter, "/x").await.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
