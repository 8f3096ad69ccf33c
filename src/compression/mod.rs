//! Response compression subsystem.
//!
//! # Data Flow
//! ```text
//! Accept-Encoding header
//!     → negotiate() (first gzip/deflate token in header order)
//!     → CompressionPools (per-encoding CompressorPool)
//!     → pool.rs (acquire: reuse + reset, or create)
//!     → encoder.rs (gzip / zlib framing around raw deflate)
//!     → response body stream
//!     → drop: compressor back into its pool
//! ```
//!
//! # Design Decisions
//! - `gzip` is RFC 1952, `deflate` is RFC 1950 (zlib), as browsers expect
//! - The tgz adapter draws from the same pools at its configured level
//! - Pools are the only mutable state shared between requests

pub mod encoder;
pub mod pool;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flate2::Compression;

pub use encoder::{EncoderWriter, StreamEncoder};
pub use pool::{CompressorPool, PooledCompressor, DEFAULT_POOL_CAPACITY};

/// Content codings the server can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Gzip => "gzip",
            Encoding::Deflate => "deflate",
        }
    }
}

/// Pick the response encoding from an `Accept-Encoding` value.
///
/// Tokens are examined in header order; parameters are ignored except for
/// an explicit `q=0`, which rules the token out.
pub fn negotiate(accept_encoding: &str) -> Option<Encoding> {
    accept_encoding.split(',').find_map(|token| {
        let mut parts = token.split(';');
        let name = parts.next().unwrap_or("").trim();
        let refused = parts.any(|p| {
            let p = p.trim();
            p.strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        });
        if refused {
            return None;
        }
        if name.eq_ignore_ascii_case("gzip") {
            Some(Encoding::Gzip)
        } else if name.eq_ignore_ascii_case("deflate") {
            Some(Encoding::Deflate)
        } else {
            None
        }
    })
}

/// Map a `-1..=9` level onto flate2's compression level (`-1` = default).
pub fn level(level: i32) -> Compression {
    match u32::try_from(level) {
        Ok(n) => Compression::new(n.min(9)),
        Err(_) => Compression::default(),
    }
}

/// The server-wide set of compressor pools.
#[derive(Debug)]
pub struct CompressionPools {
    gzip: Arc<CompressorPool>,
    deflate: Arc<CompressorPool>,
    leveled_gzip: Mutex<HashMap<i32, Arc<CompressorPool>>>,
}

impl CompressionPools {
    pub fn new(level: Compression) -> Self {
        Self {
            gzip: CompressorPool::new(Encoding::Gzip, level, DEFAULT_POOL_CAPACITY),
            deflate: CompressorPool::new(Encoding::Deflate, level, DEFAULT_POOL_CAPACITY),
            leveled_gzip: Mutex::new(HashMap::new()),
        }
    }

    /// Pool used by the compression stage for `encoding`.
    pub fn for_encoding(&self, encoding: Encoding) -> &Arc<CompressorPool> {
        match encoding {
            Encoding::Gzip => &self.gzip,
            Encoding::Deflate => &self.deflate,
        }
    }

    /// Gzip pool at a specific level, shared by every adapter asking for it.
    pub fn gzip_with_level(&self, level: i32) -> Arc<CompressorPool> {
        let mut pools = match self.leveled_gzip.lock() {
            Ok(pools) => pools,
            Err(poisoned) => poisoned.into_inner(),
        };
        pools
            .entry(level)
            .or_insert_with(|| {
                CompressorPool::new(Encoding::Gzip, self::level(level), DEFAULT_POOL_CAPACITY)
            })
            .clone()
    }
}

impl Default for CompressionPools {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_header_order() {
        assert_eq!(negotiate("gzip, deflate"), Some(Encoding::Gzip));
        assert_eq!(negotiate("deflate, gzip"), Some(Encoding::Deflate));
        assert_eq!(negotiate("identity"), None);
        assert_eq!(negotiate(""), None);
    }

    #[test]
    fn test_negotiate_trims_and_ignores_case() {
        assert_eq!(negotiate("br,   GZip "), Some(Encoding::Gzip));
        assert_eq!(negotiate(" Deflate;q=0.5"), Some(Encoding::Deflate));
        assert_eq!(negotiate("gzip;q=0, deflate"), Some(Encoding::Deflate));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(level(-1), Compression::default());
        assert_eq!(level(0), Compression::none());
        assert_eq!(level(9), Compression::best());
    }

    #[test]
    fn test_leveled_pools_are_shared() {
        let pools = CompressionPools::default();
        let a = pools.gzip_with_level(9);
        let b = pools.gzip_with_level(9);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pools.for_encoding(Encoding::Deflate).encoding(), Encoding::Deflate);
    }
}
