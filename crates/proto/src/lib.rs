//! HTTP/2 and HTTP/3 frame codec shared by the rest of the transport
//! core.
//!
//! This crate owns the wire-level `Frame` representation, stream
//! identifiers, SETTINGS parameters, and the pluggable header-codec seam;
//! it does not itself implement a connection or stream state machine
//! (see `nyx-stream` and `nyx-connection`).

mod error;
mod frame;
pub mod header;
mod settings;
mod stream_id;

pub use error::Error;
pub use frame::{Frame, Http2FrameParser, ParseOutcome, PriorityInfo, Protocol};
pub use header::{HeaderCodec, HeaderCodecError, HeaderField, HeaderList};
pub use settings::{
    SettingId, Settings, DEFAULT_HEADER_TABLE_SIZE, DEFAULT_INITIAL_WINDOW_SIZE, FRAME_LENGTH_HARD_CAP, H2_PREFACE,
    MAX_FRAME_SIZE_CEILING, MAX_FRAME_SIZE_FLOOR,
};
pub use stream_id::StreamId;

pub use frame::{parse_one, serialize};
