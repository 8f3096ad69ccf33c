//! Output sinks for access lines and request body dumps.
//!
//! Access logging and body teeing write plain text lines that belong on
//! stdout, separate from the diagnostic `tracing` output on stderr.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Destination for raw output produced by the request pipeline.
pub trait Sink: Send + Sync + fmt::Debug {
    fn write(&self, data: &[u8]);
}

pub type SharedSink = Arc<dyn Sink>;

/// Writes to the process stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write(&self, data: &[u8]) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(data).and_then(|_| out.flush()) {
            tracing::debug!(error = %e, "stdout sink write failed");
        }
    }
}

/// Collects everything in memory. Used by tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Mutex<Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let buf = match self.buf.lock() {
            Ok(b) => b,
            Err(poisoned) => poisoned.into_inner(),
        };
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Sink for MemorySink {
    fn write(&self, data: &[u8]) {
        let mut buf = match self.buf.lock() {
            Ok(b) => b,
            Err(poisoned) => poisoned.into_inner(),
        };
        buf.extend_from_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_accumulates() {
        let sink = MemorySink::new();
        sink.write(b"one\n");
        sink.write(b"two\n");
        assert_eq!(sink.contents(), "one\ntwo\n");
    }
}
