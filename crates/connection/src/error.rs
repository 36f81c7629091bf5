use thiserror::Error;

use crate::phase::PhaseError;

/// Errors surfaced by the connection engine, composed from the layers it
/// sits on top of.
#[derive(Debug, Error)]
pub enum Error {
    /// A framing or structural violation from the codec layer.
    #[error(transparent)]
    Proto(#[from] nyx_proto::Error),
    /// A stream-level state or flow-control violation.
    #[error(transparent)]
    Stream(#[from] nyx_stream::Error),
    /// An operation attempted in a phase that forbids it.
    #[error(transparent)]
    Phase(#[from] PhaseError),
    /// The peer referenced a stream id this connection has no record of
    /// and is not within the closed-stream grace window.
    #[error("unknown stream {0:?}")]
    UnknownStream(nyx_proto::StreamId),
    /// No SETTINGS frame arrived from the peer within the handshake
    /// timeout; the connection must be closed.
    #[error("no SETTINGS frame received within the handshake timeout")]
    SettingsTimeout,
    /// A stream was opened, or an already-open stream was driven, whose
    /// id exceeds the last stream id announced by GOAWAY. The request is
    /// safe to retry on a new connection.
    #[error("stream {0:?} refused: past the last stream id announced by GOAWAY")]
    RefusedByGoaway(nyx_proto::StreamId),
}

impl Error {
    /// The RFC 7540 §7 / RFC 9114 §8 error code to report on the wire for
    /// this failure, where one applies.
    #[must_use]
    pub fn h2_code(&self) -> u32 {
        match self {
            Self::Proto(err) => err.h2_code(),
            Self::Stream(nyx_stream::Error::WindowOverflow(_)) => 0x3, // FLOW_CONTROL_ERROR
            Self::SettingsTimeout => 0x4,                             // SETTINGS_TIMEOUT
            Self::RefusedByGoaway(_) => 0x7,                          // REFUSED_STREAM
            Self::Stream(_) | Self::Phase(_) | Self::UnknownStream(_) => 0x1, // PROTOCOL_ERROR
        }
    }
}
