//! Bounded pool of raw deflate compressors.
//!
//! # Responsibilities
//! - Hand out a compressor exclusively to one writer
//! - Reset compressors on acquire so no state leaks between streams
//! - Take compressors back when the holder is dropped
//!
//! # Design Decisions
//! - `Mutex<Vec<_>>`: held only for a push or pop, never across I/O
//! - Bounded: surplus compressors are dropped instead of pooled
//! - Framing (gzip/zlib) is the encoder's job; the pool only knows whether
//!   the compressor emits a zlib header

use std::sync::{Arc, Mutex};

use flate2::{Compress, Compression};

use crate::compression::Encoding;

/// Default number of idle compressors kept per pool.
pub const DEFAULT_POOL_CAPACITY: usize = 32;

/// Idle compressors for one encoding at one level.
#[derive(Debug)]
pub struct CompressorPool {
    encoding: Encoding,
    level: Compression,
    capacity: usize,
    idle: Mutex<Vec<Compress>>,
}

impl CompressorPool {
    pub fn new(encoding: Encoding, level: Compression, capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            encoding,
            level,
            capacity,
            idle: Mutex::new(Vec::new()),
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn level(&self) -> Compression {
        self.level
    }

    /// Take a compressor out of the pool, creating one if none is idle.
    pub fn acquire(self: &Arc<Self>) -> PooledCompressor {
        let reused = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        let compress = match reused {
            Some(mut c) => {
                c.reset();
                c
            }
            None => Compress::new(self.level, self.encoding == Encoding::Deflate),
        };
        PooledCompressor {
            pool: Arc::clone(self),
            inner: Some(compress),
        }
    }

    /// Number of compressors currently waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    fn release(&self, compress: Compress) {
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.capacity {
                idle.push(compress);
            }
        }
    }
}

/// A compressor on loan from a [`CompressorPool`]; returned on drop.
#[derive(Debug)]
pub struct PooledCompressor {
    pool: Arc<CompressorPool>,
    inner: Option<Compress>,
}

impl PooledCompressor {
    pub fn encoding(&self) -> Encoding {
        self.pool.encoding
    }

    pub(crate) fn get_mut(&mut self) -> &mut Compress {
        // Only `Drop` takes the compressor out.
        let (level, zlib) = (self.pool.level, self.pool.encoding == Encoding::Deflate);
        self.inner.get_or_insert_with(|| Compress::new(level, zlib))
    }
}

impl Drop for PooledCompressor {
    fn drop(&mut self) {
        if let Some(compress) = self.inner.take() {
            self.pool.release(compress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_released_compressor_is_reused() {
        let pool = CompressorPool::new(Encoding::Gzip, Compression::default(), 2);
        assert_eq!(pool.idle_count(), 0);

        let first = pool.acquire();
        drop(first);
        assert_eq!(pool.idle_count(), 1);

        let _again = pool.acquire();
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = CompressorPool::new(Encoding::Deflate, Compression::fast(), 1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }
}
