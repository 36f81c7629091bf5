use thiserror::Error;

/// Protocol-level error codes shared by the frame codec and the layers
/// built on top of it.
///
/// These map directly onto RFC 7540 §7 / RFC 9114 §8 error codes; the
/// exact numeric value is only meaningful on the wire (GOAWAY / RST_STREAM
/// payloads), so it is kept alongside each variant rather than derived.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// A frame's encoded length exceeded the peer-advertised (or hard)
    /// maximum frame size.
    #[error("frame size error")]
    FrameSizeError,
    /// A frame violated a structural rule (bad stream id for a control
    /// frame, SETTINGS ACK with a non-empty payload, out-of-order
    /// CONTINUATION, and so on).
    #[error("protocol error")]
    ProtocolError,
    /// The header-codec adapter reported a decompression failure.
    #[error("compression error")]
    CompressionError,
}

impl Error {
    /// RFC 7540 §7 numeric error code for this variant.
    #[must_use]
    pub fn h2_code(self) -> u32 {
        match self {
            Self::FrameSizeError => 0x6,
            Self::ProtocolError => 0x1,
            Self::CompressionError => 0x9,
        }
    }

    /// RFC 9114 §8.1 numeric error code for this variant.
    #[must_use]
    pub fn h3_code(self) -> u64 {
        match self {
            Self::FrameSizeError => 0x106, // H3_FRAME_ERROR-adjacent: oversized frame
            Self::ProtocolError => 0x101,  // H3_GENERAL_PROTOCOL_ERROR
            Self::CompressionError => 0x200, // QPACK_DECOMPRESSION_FAILED
        }
    }
}
