//! QR code images.
//!
//! Codes are served as grayscale PNG. The PNG container is small enough to
//! write directly: a zlib stream of filtered scanlines plus CRC-framed chunks,
//! both from flate2.

use std::io::{self, Write};

use axum::body::{Body, Bytes};
use axum::http::{header, Request};
use axum::response::{IntoResponse, Response};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};
use qrcode::render::unicode;
use qrcode::{Color, EcLevel, QrCode};

use crate::adapters::{Adapter, BuildError, HandlerFuture};

const MIN_DIMENSION: usize = 256;

/// Light modules around the symbol.
const QUIET_ZONE: usize = 4;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Serves one QR code, rendered once at construction.
#[derive(Debug, Clone)]
pub struct QrAdapter {
    png: Bytes,
}

impl QrAdapter {
    pub fn new(content: &str) -> Result<Self, BuildError> {
        let code = encode(content)?;
        let (size, pixels) = rasterize(&code);
        let png = encode_png(size, &pixels).map_err(|e| BuildError::Qr(e.to_string()))?;
        Ok(Self { png: Bytes::from(png) })
    }
}

impl Adapter for QrAdapter {
    fn serve(&self, _request: Request<Body>) -> HandlerFuture {
        let png = self.png.clone();
        Box::pin(async move { png_response(png) })
    }
}

fn png_response(png: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], png).into_response()
}

fn encode(content: &str) -> Result<QrCode, BuildError> {
    QrCode::with_error_correction_level(content.as_bytes(), EcLevel::M)
        .map_err(|e| BuildError::Qr(e.to_string()))
}

/// Square grayscale raster (0 dark, 255 light) at least `MIN_DIMENSION` wide,
/// quiet zone included.
fn rasterize(code: &QrCode) -> (usize, Vec<u8>) {
    let width = code.width();
    let colors = code.to_colors();
    let modules = width + 2 * QUIET_ZONE;
    let scale = MIN_DIMENSION.div_ceil(modules).max(1);
    let size = modules * scale;

    let mut pixels = vec![255u8; size * size];
    for y in 0..size {
        let my = y / scale;
        if my < QUIET_ZONE || my >= width + QUIET_ZONE {
            continue;
        }
        for x in 0..size {
            let mx = x / scale;
            if mx < QUIET_ZONE || mx >= width + QUIET_ZONE {
                continue;
            }
            if colors[(my - QUIET_ZONE) * width + (mx - QUIET_ZONE)] == Color::Dark {
                pixels[y * size + x] = 0;
            }
        }
    }
    (size, pixels)
}

/// 8-bit grayscale PNG of a `size` x `size` raster.
fn encode_png(size: usize, pixels: &[u8]) -> io::Result<Vec<u8>> {
    let side = u32::try_from(size).map_err(|_| io::Error::other("qr image too large"))?;

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&side.to_be_bytes());
    ihdr.extend_from_slice(&side.to_be_bytes());
    // bit depth 8, grayscale, deflate, adaptive filtering, no interlace
    ihdr.extend_from_slice(&[8, 0, 0, 0, 0]);

    let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
    for row in pixels.chunks(size) {
        zlib.write_all(&[0])?;
        zlib.write_all(row)?;
    }
    let idat = zlib.finish()?;

    let mut png = Vec::with_capacity(idat.len() + 64);
    png.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut png, b"IHDR", &ihdr);
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc.sum().to_be_bytes());
}

/// Render `content` as block characters for a terminal.
pub fn render_terminal(content: &str) -> Result<String, BuildError> {
    let code = encode(content)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn u32_at(data: &[u8], at: usize) -> u32 {
        u32::from_be_bytes(data[at..at + 4].try_into().unwrap())
    }

    #[tokio::test]
    async fn test_serves_png() {
        let adapter = QrAdapter::new("https://example.com/").unwrap();
        let req = Request::builder().uri("/qr").body(Body::empty()).unwrap();
        let res = adapter.serve(req).await;
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..8], &PNG_SIGNATURE);
        assert_eq!(&body[12..16], b"IHDR");
        assert!(u32_at(&body, 16) >= MIN_DIMENSION as u32);
        assert_eq!(u32_at(&body, 16), u32_at(&body, 20));
        assert_eq!(&body[body.len() - 8..body.len() - 4], b"IEND");
    }

    #[test]
    fn test_png_pixels_decode() {
        let code = encode("mapserve").unwrap();
        let (size, pixels) = rasterize(&code);
        let png = encode_png(size, &pixels).unwrap();

        // IHDR chunk: 8 signature + 4 len + 4 type + 13 data + 4 crc.
        let idat_at = 8 + 25;
        assert_eq!(&png[idat_at + 4..idat_at + 8], b"IDAT");
        let len = u32_at(&png, idat_at) as usize;
        let mut raw = Vec::new();
        flate2::read::ZlibDecoder::new(&png[idat_at + 8..idat_at + 8 + len])
            .read_to_end(&mut raw)
            .unwrap();
        assert_eq!(raw.len(), size * (size + 1));

        let scale = size / (code.width() + 2 * QUIET_ZONE);
        let pixel = |x: usize, y: usize| raw[y * (size + 1) + 1 + x];
        // Quiet zone is light, the finder pattern's corner is dark.
        assert_eq!(pixel(0, 0), 255);
        assert_eq!(pixel(QUIET_ZONE * scale, QUIET_ZONE * scale), 0);
    }

    #[test]
    fn test_chunk_crc() {
        let mut out = Vec::new();
        write_chunk(&mut out, b"IEND", &[]);
        assert_eq!(out, [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xae, 0x42, 0x60, 0x82]);
    }

    #[test]
    fn test_too_long_content() {
        let content = "x".repeat(8000);
        assert!(matches!(QrAdapter::new(&content), Err(BuildError::Qr(_))));
    }

    #[test]
    fn test_terminal_render() {
        let art = render_terminal("http://0.0.0.0:8080/").unwrap();
        assert!(art.lines().count() > 10);
    }
}
