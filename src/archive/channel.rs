//! Blocking writer feeding an async response body.
//!
//! Archive producers run on the blocking pool and write through
//! [`ChannelWriter`]; the paired [`Body`] yields the chunks as they arrive.
//! When the client disconnects the body is dropped, the channel closes and
//! the next write fails with `BrokenPipe`, which ends the producer.

use std::io::{self, Write};

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;

/// Size at which buffered output is handed to the body.
const CHUNK: usize = 32 * 1024;

/// Chunks in flight between producer and body.
const DEPTH: usize = 8;

/// `io::Write` end of a response body channel.
///
/// Must only be written from a blocking context (e.g. `spawn_blocking`).
#[derive(Debug)]
pub struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: BytesMut,
}

/// Create a connected writer / streaming body pair.
pub fn channel_body() -> (ChannelWriter, Body) {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(DEPTH);
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    let writer = ChannelWriter {
        tx,
        buf: BytesMut::with_capacity(CHUNK),
    };
    (writer, Body::from_stream(stream))
}

impl ChannelWriter {
    /// Terminate the body with an error so the client sees a truncated response.
    pub fn abort(&mut self, err: io::Error) {
        self.buf.clear();
        let _ = self.tx.blocking_send(Err(err));
    }

    /// Whether the body end has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.tx.is_closed() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"));
        }
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_reach_body() {
        let (mut writer, body) = channel_body();
        let producer = tokio::task::spawn_blocking(move || {
            for _ in 0..100 {
                writer.write_all(&[b'x'; 1000]).unwrap();
            }
            writer.flush().unwrap();
        });

        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        producer.await.unwrap();
        assert_eq!(bytes.len(), 100_000);
    }

    #[tokio::test]
    async fn test_dropped_body_fails_writes() {
        let (mut writer, body) = channel_body();
        drop(body);
        let result = tokio::task::spawn_blocking(move || writer.write_all(b"late"))
            .await
            .unwrap();
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_abort_errors_body() {
        let (mut writer, body) = channel_body();
        tokio::task::spawn_blocking(move || {
            writer.write_all(b"partial").unwrap();
            writer.flush().unwrap();
            writer.abort(io::Error::other("walk failed"));
        });
        assert!(axum::body::to_bytes(body, usize::MAX).await.is_err());
    }
}
