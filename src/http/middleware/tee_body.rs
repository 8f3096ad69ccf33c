//! Request body dumping.
//!
//! `tee_body` copies request body chunks to a sink as they are read, framed by
//! a newline before and after. `flush_body` sits right inside it and reads the
//! whole body before the router runs, so every payload is dumped even when the
//! handler never looks at it.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use futures_util::StreamExt;

use crate::http::response::status_page;
use crate::observability::SharedSink;

#[derive(Clone, Debug)]
pub struct TeeBody {
    sink: SharedSink,
}

impl TeeBody {
    pub fn new(sink: SharedSink) -> Self {
        Self { sink }
    }
}

/// Wrap `body` so every chunk also lands in `sink`; a newline follows the end.
fn teed(body: Body, sink: SharedSink) -> Body {
    let stream = body.into_data_stream();
    Body::from_stream(futures_util::stream::unfold(
        Some((stream, sink)),
        |state| async move {
            let (mut stream, sink) = state?;
            match stream.next().await {
                Some(Ok(chunk)) => {
                    sink.write(&chunk);
                    Some((Ok::<Bytes, axum::Error>(chunk), Some((stream, sink))))
                }
                Some(Err(e)) => Some((Err(e), None)),
                None => {
                    sink.write(b"\n");
                    None
                }
            }
        },
    ))
}

pub async fn tee_body(State(tee): State<TeeBody>, request: Request<Body>, next: Next) -> Response {
    tee.sink.write(b"\n");
    let (parts, body) = request.into_parts();
    let request = Request::from_parts(parts, teed(body, tee.sink.clone()));
    next.run(request).await
}

/// Drain the body (up to `limit` bytes) and hand the buffered bytes on.
pub async fn flush_body(State(limit): State<usize>, request: Request<Body>, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => next.run(Request::from_parts(parts, Body::from(bytes))).await,
        Err(e) => {
            tracing::warn!(error = %e, "cannot drain request body");
            status_page(StatusCode::PAYLOAD_TOO_LARGE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemorySink;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_teed_body_passes_through() {
        let sink = Arc::new(MemorySink::new());
        let body = teed(Body::from("payload"), sink.clone());
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"payload");
        assert_eq!(sink.contents(), "payload\n");
    }
}
