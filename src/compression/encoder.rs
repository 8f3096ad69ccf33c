//! Streaming gzip / zlib encoder on top of a pooled compressor.

use std::io::{self, Write};

use bytes::Bytes;
use flate2::{Crc, FlushCompress, Status};

use crate::compression::pool::PooledCompressor;
use crate::compression::Encoding;

const CHUNK: usize = 16 * 1024;

/// RFC 1952 member header: no name, no mtime, unknown OS.
const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff];

/// Incremental encoder producing gzip or zlib framed output.
///
/// The compressor goes back to its pool when the encoder is dropped.
#[derive(Debug)]
pub struct StreamEncoder {
    compressor: PooledCompressor,
    crc: Crc,
    header_pending: bool,
    finished: bool,
}

impl StreamEncoder {
    pub fn new(compressor: PooledCompressor) -> Self {
        let header_pending = compressor.encoding() == Encoding::Gzip;
        Self {
            compressor,
            crc: Crc::new(),
            header_pending,
            finished: false,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.compressor.encoding()
    }

    /// Compress `input`; may return nothing while the compressor buffers.
    pub fn encode(&mut self, input: &[u8]) -> io::Result<Bytes> {
        let mut out = self.start();
        if self.compressor.encoding() == Encoding::Gzip {
            self.crc.update(input);
        }
        self.run(input, FlushCompress::None, &mut out)?;
        Ok(Bytes::from(out))
    }

    /// Emit everything compressed so far without ending the stream.
    pub fn flush(&mut self) -> io::Result<Bytes> {
        let mut out = self.start();
        self.run(&[], FlushCompress::Sync, &mut out)?;
        Ok(Bytes::from(out))
    }

    /// End the stream, including the gzip trailer. Idempotent.
    pub fn finish(&mut self) -> io::Result<Bytes> {
        if self.finished {
            return Ok(Bytes::new());
        }
        let mut out = self.start();
        self.run(&[], FlushCompress::Finish, &mut out)?;
        if self.compressor.encoding() == Encoding::Gzip {
            out.extend_from_slice(&self.crc.sum().to_le_bytes());
            out.extend_from_slice(&self.crc.amount().to_le_bytes());
        }
        self.finished = true;
        Ok(Bytes::from(out))
    }

    fn start(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CHUNK);
        if self.header_pending {
            out.extend_from_slice(&GZIP_HEADER);
            self.header_pending = false;
        }
        out
    }

    fn run(&mut self, input: &[u8], flush: FlushCompress, out: &mut Vec<u8>) -> io::Result<()> {
        let finishing = matches!(flush, FlushCompress::Finish);
        let compress = self.compressor.get_mut();
        let mut consumed = 0usize;

        loop {
            if out.capacity() - out.len() < 64 {
                out.reserve(CHUNK);
            }
            let before = compress.total_in();
            let status = compress
                .compress_vec(&input[consumed..], out, flush)
                .map_err(io::Error::other)?;
            consumed += (compress.total_in() - before) as usize;
            let out_full = out.len() == out.capacity();

            match status {
                Status::StreamEnd => return Ok(()),
                _ if !finishing && consumed == input.len() && !out_full => return Ok(()),
                Status::BufError if !out_full => return Ok(()),
                _ => {}
            }
        }
    }
}

/// `io::Write` adapter compressing into an inner writer.
pub struct EncoderWriter<W: Write> {
    encoder: StreamEncoder,
    inner: W,
}

impl<W: Write> EncoderWriter<W> {
    pub fn new(encoder: StreamEncoder, inner: W) -> Self {
        Self { encoder, inner }
    }

    /// End the compressed stream and hand back the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        let tail = self.encoder.finish()?;
        self.inner.write_all(&tail)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for EncoderWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let out = self.encoder.encode(buf)?;
        if !out.is_empty() {
            self.inner.write_all(&out)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let out = self.encoder.flush()?;
        self.inner.write_all(&out)?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::pool::CompressorPool;
    use flate2::read::{GzDecoder, ZlibDecoder};
    use flate2::Compression;
    use std::io::Read;

    fn payload() -> Vec<u8> {
        (0..50_000u32).flat_map(|i| (i % 251).to_le_bytes()).collect()
    }

    fn encode_all(encoder: &mut StreamEncoder, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for chunk in data.chunks(7_000) {
            out.extend_from_slice(&encoder.encode(chunk).unwrap());
        }
        out.extend_from_slice(&encoder.finish().unwrap());
        out
    }

    #[test]
    fn test_gzip_stream_decodes() {
        let pool = CompressorPool::new(Encoding::Gzip, Compression::default(), 4);
        let data = payload();
        let out = encode_all(&mut StreamEncoder::new(pool.acquire()), &data);

        let mut decoded = Vec::new();
        GzDecoder::new(&out[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_deflate_is_zlib_framed() {
        let pool = CompressorPool::new(Encoding::Deflate, Compression::fast(), 4);
        let data = b"hello hello hello hello".repeat(100);
        let out = encode_all(&mut StreamEncoder::new(pool.acquire()), &data);

        let mut decoded = Vec::new();
        ZlibDecoder::new(&out[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_reused_compressor_produces_valid_stream() {
        let pool = CompressorPool::new(Encoding::Gzip, Compression::default(), 1);
        let first = encode_all(&mut StreamEncoder::new(pool.acquire()), b"first stream");
        assert_eq!(pool.idle_count(), 1);
        let second = encode_all(&mut StreamEncoder::new(pool.acquire()), b"second stream");

        for (out, expected) in [(first, "first stream"), (second, "second stream")] {
            let mut decoded = String::new();
            GzDecoder::new(&out[..]).read_to_string(&mut decoded).unwrap();
            assert_eq!(decoded, expected);
        }
    }

    #[test]
    fn test_empty_stream_is_valid_gzip() {
        let pool = CompressorPool::new(Encoding::Gzip, Compression::default(), 1);
        let out = encode_all(&mut StreamEncoder::new(pool.acquire()), b"");
        let mut decoded = Vec::new();
        GzDecoder::new(&out[..]).read_to_end(&mut decoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_writer_adapter() {
        let pool = CompressorPool::new(Encoding::Gzip, Compression::best(), 1);
        let mut writer = EncoderWriter::new(StreamEncoder::new(pool.acquire()), Vec::new());
        writer.write_all(b"via io::Write").unwrap();
        writer.flush().unwrap();
        let out = writer.finish().unwrap();

        let mut decoded = String::new();
        GzDecoder::new(&out[..]).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "via io::Write");
    }
}
