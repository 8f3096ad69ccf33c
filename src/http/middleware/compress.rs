//! Response compression stage.
//!
//! # Design Decisions
//! - Negotiation happens before the handler runs; the encoder is drawn from
//!   the pool only once the response is known to be compressible
//! - The encoder lives inside the body stream and returns to its pool when
//!   the stream ends or the client goes away

use std::io;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use futures_util::StreamExt;

use crate::compression::{negotiate, CompressionPools, StreamEncoder};

#[derive(Clone, Debug)]
pub struct Compress {
    pools: Arc<CompressionPools>,
}

impl Compress {
    pub fn new(pools: Arc<CompressionPools>) -> Self {
        Self { pools }
    }
}

pub async fn compress(
    State(compress): State<Compress>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let encoding = if request.method() == Method::HEAD {
        None
    } else {
        request
            .headers()
            .get(header::ACCEPT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .and_then(negotiate)
    };

    let response = next.run(request).await;
    let Some(encoding) = encoding else {
        return response;
    };
    if !compressible(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
    parts
        .headers
        .append(header::VARY, HeaderValue::from_static("Accept-Encoding"));

    let encoder = StreamEncoder::new(compress.pools.for_encoding(encoding).acquire());
    tracing::trace!(encoding = encoding.as_str(), "compressing response");
    Response::from_parts(parts, encoded(body, encoder))
}

fn compressible(response: &Response) -> bool {
    !matches!(response.status(), StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED)
        && !response.headers().contains_key(header::CONTENT_ENCODING)
}

/// Body that runs every chunk of `body` through `encoder`.
pub fn encoded(body: Body, encoder: StreamEncoder) -> Body {
    let stream = body.into_data_stream();
    Body::from_stream(futures_util::stream::unfold(
        Some((stream, encoder)),
        |state| async move {
            let (mut stream, mut encoder) = state?;
            loop {
                match stream.next().await {
                    Some(Ok(chunk)) => match encoder.encode(&chunk) {
                        Ok(out) if out.is_empty() => continue,
                        Ok(out) => return Some((Ok(out), Some((stream, encoder)))),
                        Err(e) => return Some((Err(e), None)),
                    },
                    Some(Err(e)) => return Some((Err(io::Error::other(e)), None)),
                    None => return Some((encoder.finish(), None)),
                }
            }
        },
    ))
}
