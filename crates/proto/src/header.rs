//! Opaque header-codec adapter.
//!
//! HPACK (h2, RFC 7541) and QPACK (h3, RFC 9204) are full codecs in their
//! own right and are explicitly out of scope here: this crate treats
//! header compression as a pluggable, stateful black box behind
//! [`HeaderCodec`]. A concrete implementation (vendored HPACK/QPACK, or a
//! binding to an existing crate) is injected by the connection layer.

use bytes::Bytes;
use std::fmt;

/// A single decoded header field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    /// Field name, lowercase per RFC 7540 §8.1.2.
    pub name: Bytes,
    /// Field value.
    pub value: Bytes,
}

impl HeaderField {
    /// Build a header field from borrowed string slices.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: Bytes::copy_from_slice(name.as_bytes()),
            value: Bytes::copy_from_slice(value.as_bytes()),
        }
    }
}

/// An ordered list of header fields, decoded from (or awaiting encoding
/// into) a compressed header block.
pub type HeaderList = Vec<HeaderField>;

/// Error surfaced by a [`HeaderCodec`] implementation.
///
/// The adapter only distinguishes "the compressed representation was
/// invalid" (fatal to the connection, per RFC 7541 §4.3 / RFC 9204 §2.2.1)
/// from "blocked" (h3 QPACK dynamic-table dependency not yet satisfied;
/// the caller should buffer and retry once more encoder-stream data
/// arrives).
#[derive(Debug)]
pub enum HeaderCodecError {
    /// The compressed block could not be decoded; this terminates the
    /// connection that produced it.
    Invalid(Box<dyn std::error::Error + Send + Sync>),
    /// Decoding cannot proceed until more dynamic-table state arrives
    /// (QPACK only; never returned by an HPACK adapter).
    Blocked,
}

impl fmt::Display for HeaderCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "invalid compressed header block: {err}"),
            Self::Blocked => write!(f, "header block blocked on dynamic table state"),
        }
    }
}

impl std::error::Error for HeaderCodecError {}

/// A pluggable compressor/decompressor for header blocks.
///
/// Implementations own whatever dynamic-table state their scheme
/// requires; this crate never inspects or manipulates that state
/// directly, only calls through this trait.
pub trait HeaderCodec: Send {
    /// Compress `headers` into a header block ready to carry in a
    /// HEADERS (or PUSH_PROMISE) frame payload.
    fn encode(&mut self, headers: &[HeaderField]) -> Result<Bytes, HeaderCodecError>;

    /// Decompress a header block back into its header list.
    ///
    /// `stream_id` is threaded through so QPACK implementations can track
    /// per-stream blocking state; HPACK adapters may ignore it.
    fn decode(&mut self, stream_id: u64, block: &[u8]) -> Result<HeaderList, HeaderCodecError>;

    /// Advertised dynamic table capacity, for SETTINGS negotiation.
    fn set_max_table_size(&mut self, max_size: u32);
}

/// A [`HeaderCodec`] that performs no compression at all: header names
/// and values are joined with NUL separators, uncompressed. Used for
/// tests and for protocol conformance checks where HPACK/QPACK behavior
/// itself is out of scope.
#[derive(Debug, Default)]
pub struct PlainHeaderCodec;

impl HeaderCodec for PlainHeaderCodec {
    fn encode(&mut self, headers: &[HeaderField]) -> Result<Bytes, HeaderCodecError> {
        let mut out = Vec::new();
        for field in headers {
            out.extend_from_slice(&field.name);
            out.push(0);
            out.extend_from_slice(&field.value);
            out.push(0);
        }
        Ok(Bytes::from(out))
    }

    fn decode(&mut self, _stream_id: u64, block: &[u8]) -> Result<HeaderList, HeaderCodecError> {
        let mut fields = Vec::new();
        let mut parts = block.split(|&b| b == 0).filter(|s| !s.is_empty() || !block.is_empty());
        loop {
            let Some(name) = parts.next() else { break };
            let Some(value) = parts.next() else {
                return Err(HeaderCodecError::Invalid("unterminated header pair".into()));
            };
            if name.is_empty() && value.is_empty() {
                break;
            }
            fields.push(HeaderField {
                name: Bytes::copy_from_slice(name),
                value: Bytes::copy_from_slice(value),
            });
        }
        Ok(fields)
    }

    fn set_max_table_size(&mut self, _max_size: u32) {}
}
