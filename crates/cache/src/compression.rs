//! At-rest body compression for the disk tier.
//!
//! Gzip is the default, matching the `Content-Encoding` browsers
//! negotiate most often on the wire; Brotli is offered as the
//! higher-ratio alternative for entries worth the extra CPU.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;

/// Which at-rest compression, if any, was applied to a stored body.
#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ContentCoding {
    /// Stored uncompressed.
    Identity,
    /// DEFLATE inside a gzip wrapper (RFC 1952).
    Gzip,
    /// Brotli (RFC 7932).
    Brotli,
}

/// Compression/decompression failure.
#[derive(Debug, Error)]
#[error("compression error: {0}")]
pub struct CompressionError(#[from] std::io::Error);

/// Compress `body` with `coding`.
pub fn compress(body: &[u8], coding: ContentCoding) -> Result<Bytes, CompressionError> {
    match coding {
        ContentCoding::Identity => Ok(Bytes::copy_from_slice(body)),
        ContentCoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(body)?;
            Ok(Bytes::from(encoder.finish()?))
        }
        ContentCoding::Brotli => {
            let mut out = Vec::new();
            let params = brotli::enc::BrotliEncoderParams::default();
            brotli::BrotliCompress(&mut std::io::Cursor::new(body), &mut out, &params)?;
            Ok(Bytes::from(out))
        }
    }
}

/// Decompress `body`, previously compressed with `coding`.
pub fn decompress(body: &[u8], coding: ContentCoding) -> Result<Bytes, CompressionError> {
    match coding {
        ContentCoding::Identity => Ok(Bytes::copy_from_slice(body)),
        ContentCoding::Gzip => {
            let mut decoder = GzDecoder::new(body);
            let mut out = Vec::new();
            decoder.read_to_end(&mut out)?;
            Ok(Bytes::from(out))
        }
        ContentCoding::Brotli => {
            let mut out = Vec::new();
            brotli::BrotliDecompress(&mut std::io::Cursor::new(body), &mut out)?;
            Ok(Bytes::from(out))
        }
    }
}
