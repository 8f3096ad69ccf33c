//! Content-source adapters.
//!
//! # Data Flow
//! ```text
//! Source (classified mapping)
//!     → build() picks the adapter for the variant
//!     → adapter constructed once at startup (dirs created, QR rendered, ...)
//!     → Arc<dyn Adapter> bound into the dispatch table
//!
//! Per request:
//!     Dispatch → Adapter::serve(request) → Response (possibly streaming)
//! ```
//!
//! # Design Decisions
//! - One trait object per binding; `serve` returns a boxed future so the
//!   dispatch table stays object safe
//! - Adapters own everything they need; no shared mutable state
//! - Runtime failures degrade the response, never the process

pub mod archive;
pub mod cgi;
pub mod files;
pub mod index;
pub mod listing;
pub mod literal;
pub mod myip;
pub mod proxy;
pub mod qr;
pub mod redirect;
pub mod upload;
pub mod zipfs;

use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::compression::CompressionPools;
use crate::mapping::Source;

/// Future returned by [`Adapter::serve`].
pub type HandlerFuture = BoxFuture<'static, Response>;

/// A constructed handler for one content source.
pub trait Adapter: Send + Sync + fmt::Debug {
    /// Produce the response for a request routed to this adapter.
    fn serve(&self, request: Request<Body>) -> HandlerFuture;
}

pub type SharedAdapter = Arc<dyn Adapter>;

/// Failures while constructing an adapter.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot encode qr code: {0}")]
    Qr(String),

    #[error("invalid redirect location {0:?}")]
    Redirect(String),
}

/// Shared resources handed to adapter constructors.
#[derive(Clone)]
pub struct BuildContext {
    /// Client for proxying and informational lookups.
    pub http_client: reqwest::Client,
    /// Cap on the whole multipart stream of one upload.
    pub upload_limit: u64,
    /// Compressor pools, shared with the compression stage.
    pub compression: Arc<CompressionPools>,
}

impl BuildContext {
    pub fn new(upload_limit: u64, compression: Arc<CompressionPools>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            upload_limit,
            compression,
        }
    }
}

/// Wraps an adapter and fills in a content type the adapter left unset.
#[derive(Debug)]
pub struct WithContentType {
    inner: SharedAdapter,
    content_type: &'static str,
}

impl Adapter for WithContentType {
    fn serve(&self, request: Request<Body>) -> HandlerFuture {
        let fut = self.inner.serve(request);
        let content_type = self.content_type;
        Box::pin(async move { crate::http::response::default_content_type(fut.await, content_type) })
    }
}

/// Construct the adapter serving `source` at `endpoint`.
pub fn build(source: &Source, endpoint: &str, ctx: &BuildContext) -> Result<SharedAdapter, BuildError> {
    let adapter: SharedAdapter = match source {
        Source::Upload { dir } => Arc::new(upload::UploadAdapter::new(dir.clone(), ctx.upload_limit)),
        Source::Status => Arc::new(literal::StatusAdapter::ok()),
        Source::Redirect { location } => Arc::new(redirect::RedirectAdapter::new(location)?),
        Source::Literal { text } => Arc::new(literal::LiteralAdapter::new(text.clone())),
        Source::Proxy { upstream } => {
            Arc::new(proxy::ProxyAdapter::new(upstream.clone(), ctx.http_client.clone()))
        }
        Source::FileOrDir { path } => Arc::new(files::FileOrDirAdapter::new(path.clone(), endpoint)),
        Source::MyIp { fuzzy, lookup } => {
            Arc::new(myip::MyIpAdapter::new(*fuzzy, *lookup, ctx.http_client.clone()))
        }
        Source::Qr { content } => Arc::new(qr::QrAdapter::new(content)?),
        Source::Git { root } => Arc::new(cgi::CgiAdapter::git_http_backend(root.clone(), endpoint)),
        Source::Cgit { root } => Arc::new(cgi::CgiAdapter::cgit(root.clone(), endpoint)),
        Source::Tar { dir, prefix, gzip_level } => Arc::new(archive::TarAdapter::new(
            dir.clone(),
            prefix.clone(),
            gzip_level.map(|level| ctx.compression.gzip_with_level(level)),
        )),
        Source::Zip { dir, prefix, store } => {
            Arc::new(archive::ZipAdapter::new(dir.clone(), prefix.clone(), *store))
        }
        Source::ZipFs { archive, prefix, index } => Arc::new(zipfs::ZipFsAdapter::new(
            archive.clone(),
            prefix.clone(),
            index.clone(),
            endpoint,
        )),
    };

    Ok(match source.content_type() {
        Some(content_type) => Arc::new(WithContentType {
            inner: adapter,
            content_type,
        }),
        None => adapter,
    })
}
