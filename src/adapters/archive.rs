//! Tar, tgz and zip adapters streaming a directory on every request.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::adapters::{Adapter, HandlerFuture};
use crate::archive::{channel_body, tar::write_tar, zip::write_zip, ChannelWriter};
use crate::compression::{CompressorPool, EncoderWriter, StreamEncoder};

/// Streams `dir` as a tar archive, optionally gzip compressed.
#[derive(Debug, Clone)]
pub struct TarAdapter {
    dir: PathBuf,
    prefix: String,
    gzip: Option<Arc<CompressorPool>>,
}

impl TarAdapter {
    pub fn new(dir: PathBuf, prefix: String, gzip: Option<Arc<CompressorPool>>) -> Self {
        Self { dir, prefix, gzip }
    }
}

impl Adapter for TarAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        let this = self.clone();
        Box::pin(async move {
            if request.method() == Method::HEAD {
                return StatusCode::OK.into_response();
            }
            stream_with(move |writer| match &this.gzip {
                None => write_tar(&this.dir, &this.prefix, writer).map(|_| ()),
                Some(pool) => {
                    let mut gz = EncoderWriter::new(StreamEncoder::new(pool.acquire()), writer);
                    write_tar(&this.dir, &this.prefix, &mut gz)?;
                    gz.finish().map(|_| ())
                }
            })
        })
    }
}

/// Streams `dir` as a zip archive.
#[derive(Debug, Clone)]
pub struct ZipAdapter {
    dir: PathBuf,
    prefix: String,
    store: bool,
}

impl ZipAdapter {
    pub fn new(dir: PathBuf, prefix: String, store: bool) -> Self {
        Self { dir, prefix, store }
    }
}

impl Adapter for ZipAdapter {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        let this = self.clone();
        Box::pin(async move {
            if request.method() == Method::HEAD {
                return StatusCode::OK.into_response();
            }
            stream_with(move |writer| {
                write_zip(&this.dir, &this.prefix, this.store, writer).map(|_| ())
            })
        })
    }
}

/// Run `produce` on the blocking pool and stream what it writes.
fn stream_with<F>(produce: F) -> Response
where
    F: FnOnce(&mut ChannelWriter) -> io::Result<()> + Send + 'static,
{
    let (mut writer, body) = channel_body();
    tokio::task::spawn_blocking(move || {
        let result = produce(&mut writer).and_then(|_| writer.flush());
        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("archive client went away");
            }
            Err(e) => {
                tracing::error!(error = %e, "archive stream aborted");
                writer.abort(e);
            }
        }
    });
    Response::new(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::{CompressionPools, Encoding};
    use flate2::read::GzDecoder;
    use std::collections::BTreeSet;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/one.txt"), "1").unwrap();
        std::fs::write(dir.path().join("a/b/two.txt"), "22").unwrap();
        dir
    }

    fn get() -> Request<Body> {
        Request::builder().uri("/x").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_tgz_stream() {
        let dir = tree();
        let pools = CompressionPools::default();
        let pool = pools.gzip_with_level(9);
        assert_eq!(pool.encoding(), Encoding::Gzip);

        let adapter = TarAdapter::new(dir.path().join("a"), String::new(), Some(pool));
        let res = adapter.serve(get()).await;
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();

        let mut archive = tar::Archive::new(GzDecoder::new(&bytes[..]));
        let names: BTreeSet<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        let expected: BTreeSet<String> =
            ["a/b/two.txt", "a/one.txt"].into_iter().map(String::from).collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_zip_stream() {
        let dir = tree();
        let adapter = ZipAdapter::new(dir.path().join("a"), "p/".to_string(), false);
        let res = adapter.serve(get()).await;
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();

        let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
        let names: BTreeSet<&str> = archive.file_names().collect();
        assert_eq!(names, ["p/a/b/two.txt", "p/a/one.txt"].into_iter().collect());
    }
}
