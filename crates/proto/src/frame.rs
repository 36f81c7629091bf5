//! Frame parsing and serialization for both wire formats this core
//! speaks: HTTP/2 (RFC 7540 §4) and HTTP/3 (RFC 9114 §7.2).
//!
//! A single [`Frame`] enum represents both; [`Protocol`] selects which
//! wire encoding `parse_one`/`serialize` use. Variants that only exist on
//! one wire (`Continuation` is h2-only, `CancelPush`/`MaxPushId` are
//! h3-only) return [`Error::ProtocolError`] if parsed/serialized under the
//! other protocol.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::settings::{SettingId, FRAME_LENGTH_HARD_CAP};
use crate::stream_id::StreamId;
use crate::Error;

/// Which wire encoding a frame is read from or written to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Protocol {
    /// RFC 7540 framing (9-byte fixed header).
    Http2,
    /// RFC 9114 framing (varint type + varint length).
    Http3,
}

/// RFC 7540 §6.3 stream-dependency/weight pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PriorityInfo {
    /// Exclusive dependency bit.
    pub exclusive: bool,
    /// Stream this one depends on (0 = the root).
    pub dependency: StreamId,
    /// Weight in `1..=256`, stored on the wire biased by one.
    pub weight: u16,
}

/// A parsed protocol frame. `stream_id` is `StreamId::CONNECTION` for
/// connection-level (control) frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Request/response body bytes.
    Data {
        /// Owning stream.
        stream_id: StreamId,
        /// Body bytes carried by this frame.
        data: Bytes,
        /// Whether this frame ends the sender's side of the stream.
        end_stream: bool,
    },
    /// A (possibly partial) compressed header block.
    Headers {
        /// Owning stream.
        stream_id: StreamId,
        /// Opaque, codec-compressed header bytes.
        header_block: Bytes,
        /// Whether this frame ends the sender's side of the stream.
        end_stream: bool,
        /// Whether the header block is complete (h2: no CONTINUATION
        /// follows; h3 header blocks are always complete in one frame).
        end_headers: bool,
        /// Inline priority, h2 only.
        priority: Option<PriorityInfo>,
    },
    /// h2-only explicit priority frame.
    Priority {
        /// Owning stream.
        stream_id: StreamId,
        /// The new priority.
        priority: PriorityInfo,
    },
    /// Abrupt stream termination.
    RstStream {
        /// Owning stream.
        stream_id: StreamId,
        /// Protocol error code.
        error_code: u32,
    },
    /// Connection-level settings exchange.
    Settings {
        /// `true` for an acknowledgement (must carry no parameters).
        ack: bool,
        /// Parameter id/value pairs, in wire order.
        params: Vec<(SettingId, u32)>,
    },
    /// Server push announcement, h2 only at the frame-codec level (h3
    /// push uses the same frame type on the request stream).
    PushPromise {
        /// Owning (requesting) stream.
        stream_id: StreamId,
        /// The stream id reserved for the pushed response.
        promised_stream_id: StreamId,
        /// Compressed header block for the promised request.
        header_block: Bytes,
        /// Whether the header block is complete.
        end_headers: bool,
    },
    /// Liveness / RTT probe, h2 only at the frame-codec level.
    Ping {
        /// `true` for an acknowledgement.
        ack: bool,
        /// Opaque payload echoed verbatim.
        opaque: [u8; 8],
    },
    /// Graceful shutdown notice.
    GoAway {
        /// Highest stream id the sender will process.
        last_stream_id: StreamId,
        /// Protocol error code.
        error_code: u32,
        /// Optional diagnostic bytes.
        debug_data: Bytes,
    },
    /// Flow-control credit grant.
    WindowUpdate {
        /// `StreamId::CONNECTION` for a connection-level update.
        stream_id: StreamId,
        /// Credit granted, in bytes.
        increment: u32,
    },
    /// h2-only header-block continuation.
    Continuation {
        /// Owning stream.
        stream_id: StreamId,
        /// Continued compressed header bytes.
        header_block: Bytes,
        /// Whether the header block is now complete.
        end_headers: bool,
    },
    /// h3-only: client gives up on a previously promised push.
    CancelPush {
        /// The push id being cancelled.
        push_id: u64,
    },
    /// h3-only: raises the client's push-id watermark.
    MaxPushId {
        /// The new watermark.
        push_id: u64,
    },
    /// A frame type this codec does not interpret. Forward-compatible
    /// peers MUST ignore these rather than error (RFC 7540 §4.1 / RFC
    /// 9114 §9).
    Unknown {
        /// Raw wire type.
        ty: u64,
        /// Owning stream (0 for connection-level).
        stream_id: StreamId,
        /// h2 flags byte; always 0 for h3.
        flags: u8,
        /// Raw payload, unparsed.
        payload: Bytes,
    },
}

impl Frame {
    /// Name of this frame's wire type, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data { .. } => "DATA",
            Self::Headers { .. } => "HEADERS",
            Self::Priority { .. } => "PRIORITY",
            Self::RstStream { .. } => "RST_STREAM",
            Self::Settings { .. } => "SETTINGS",
            Self::PushPromise { .. } => "PUSH_PROMISE",
            Self::Ping { .. } => "PING",
            Self::GoAway { .. } => "GOAWAY",
            Self::WindowUpdate { .. } => "WINDOW_UPDATE",
            Self::Continuation { .. } => "CONTINUATION",
            Self::CancelPush { .. } => "CANCEL_PUSH",
            Self::MaxPushId { .. } => "MAX_PUSH_ID",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }

    /// The stream this frame belongs to (`StreamId::CONNECTION` for
    /// control frames with no per-stream scope).
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        match self {
            Self::Data { stream_id, .. }
            | Self::Headers { stream_id, .. }
            | Self::Priority { stream_id, .. }
            | Self::RstStream { stream_id, .. }
            | Self::PushPromise { stream_id, .. }
            | Self::WindowUpdate { stream_id, .. }
            | Self::Continuation { stream_id, .. }
            | Self::Unknown { stream_id, .. } => *stream_id,
            Self::Settings { .. } | Self::Ping { .. } | Self::GoAway { .. } | Self::CancelPush { .. } | Self::MaxPushId { .. } => {
                StreamId::CONNECTION
            }
        }
    }
}

const H2_TYPE_DATA: u8 = 0x0;
const H2_TYPE_HEADERS: u8 = 0x1;
const H2_TYPE_PRIORITY: u8 = 0x2;
const H2_TYPE_RST_STREAM: u8 = 0x3;
const H2_TYPE_SETTINGS: u8 = 0x4;
const H2_TYPE_PUSH_PROMISE: u8 = 0x5;
const H2_TYPE_PING: u8 = 0x6;
const H2_TYPE_GOAWAY: u8 = 0x7;
const H2_TYPE_WINDOW_UPDATE: u8 = 0x8;
const H2_TYPE_CONTINUATION: u8 = 0x9;

const FLAG_END_STREAM: u8 = 0x1;
const FLAG_ACK: u8 = 0x1;
const FLAG_END_HEADERS: u8 = 0x4;
const FLAG_PADDED: u8 = 0x8;
const FLAG_PRIORITY: u8 = 0x20;

const H3_TYPE_DATA: u64 = 0x0;
const H3_TYPE_HEADERS: u64 = 0x1;
const H3_TYPE_CANCEL_PUSH: u64 = 0x3;
const H3_TYPE_SETTINGS: u64 = 0x4;
const H3_TYPE_PUSH_PROMISE: u64 = 0x5;
const H3_TYPE_GOAWAY: u64 = 0x7;
const H3_TYPE_MAX_PUSH_ID: u64 = 0xd;

/// Parse one frame starting at `offset` in `buf`.
///
/// Returns the frame and the number of bytes consumed from `offset`. On
/// `Err(Error::FrameSizeError)` or a truncation, the caller should treat
/// this as "not enough data yet" only if it can positively distinguish
/// truncation from a genuine oversized-frame error; this codec reports
/// truncation as `None` via [`ParseOutcome`] to keep that distinction
/// explicit.
pub fn parse_one(protocol: Protocol, buf: &[u8], offset: usize, max_frame_size: u32) -> Result<ParseOutcome, Error> {
    match protocol {
        Protocol::Http2 => parse_one_h2(buf, offset, max_frame_size),
        Protocol::Http3 => parse_one_h3(buf, offset, max_frame_size),
    }
}

/// Result of attempting to parse one frame.
#[derive(Debug)]
pub enum ParseOutcome {
    /// A complete frame was parsed; `consumed` bytes were taken from the
    /// buffer starting at the requested offset.
    Parsed {
        /// The decoded frame.
        frame: Frame,
        /// Bytes consumed.
        consumed: usize,
    },
    /// Not enough bytes were available yet; the caller should read more
    /// and retry.
    Truncated,
}

fn parse_one_h2(buf: &[u8], offset: usize, max_frame_size: u32) -> Result<ParseOutcome, Error> {
    let remaining = &buf[offset.min(buf.len())..];
    if remaining.len() < 9 {
        return Ok(ParseOutcome::Truncated);
    }
    let length = u32::from_be_bytes([0, remaining[0], remaining[1], remaining[2]]);
    let ty = remaining[3];
    let flags = remaining[4];
    let stream_id = StreamId(u64::from(u32::from_be_bytes([remaining[5], remaining[6], remaining[7], remaining[8]]) & 0x7fff_ffff));

    if length > FRAME_LENGTH_HARD_CAP || length > max_frame_size {
        return Err(Error::FrameSizeError);
    }
    let total = 9 + length as usize;
    if remaining.len() < total {
        return Ok(ParseOutcome::Truncated);
    }
    let mut payload = &remaining[9..total];

    let control_frame = matches!(
        ty,
        H2_TYPE_SETTINGS | H2_TYPE_PING | H2_TYPE_GOAWAY
    );
    if control_frame && !stream_id.is_connection() {
        return Err(Error::ProtocolError);
    }

    let frame = match ty {
        H2_TYPE_DATA => {
            let (data, _pad) = strip_padding(flags, payload)?;
            Frame::Data {
                stream_id,
                data: Bytes::copy_from_slice(data),
                end_stream: flags & FLAG_END_STREAM != 0,
            }
        }
        H2_TYPE_HEADERS => {
            let (mut body, _pad) = strip_padding(flags, payload)?;
            let priority = if flags & FLAG_PRIORITY != 0 {
                if body.len() < 5 {
                    return Err(Error::FrameSizeError);
                }
                let (p, rest) = parse_priority(body);
                body = rest;
                Some(p)
            } else {
                None
            };
            Frame::Headers {
                stream_id,
                header_block: Bytes::copy_from_slice(body),
                end_stream: flags & FLAG_END_STREAM != 0,
                end_headers: flags & FLAG_END_HEADERS != 0,
                priority,
            }
        }
        H2_TYPE_PRIORITY => {
            if payload.len() != 5 {
                return Err(Error::FrameSizeError);
            }
            let (priority, _) = parse_priority(payload);
            Frame::Priority { stream_id, priority }
        }
        H2_TYPE_RST_STREAM => {
            if payload.len() != 4 {
                return Err(Error::FrameSizeError);
            }
            Frame::RstStream {
                stream_id,
                error_code: be32(payload),
            }
        }
        H2_TYPE_SETTINGS => {
            let ack = flags & FLAG_ACK != 0;
            if ack && !payload.is_empty() {
                return Err(Error::FrameSizeError);
            }
            if payload.len() % 6 != 0 {
                return Err(Error::FrameSizeError);
            }
            let mut params = Vec::with_capacity(payload.len() / 6);
            while !payload.is_empty() {
                let id = SettingId::from_raw(u64::from(u16::from_be_bytes([payload[0], payload[1]])));
                let value = be32(&payload[2..6]);
                params.push((id, value));
                payload = &payload[6..];
            }
            Frame::Settings { ack, params }
        }
        H2_TYPE_PUSH_PROMISE => {
            let (body, _pad) = strip_padding(flags, payload)?;
            if body.len() < 4 {
                return Err(Error::FrameSizeError);
            }
            let promised = StreamId(u64::from(be32(&body[..4]) & 0x7fff_ffff));
            Frame::PushPromise {
                stream_id,
                promised_stream_id: promised,
                header_block: Bytes::copy_from_slice(&body[4..]),
                end_headers: flags & FLAG_END_HEADERS != 0,
            }
        }
        H2_TYPE_PING => {
            if payload.len() != 8 {
                return Err(Error::FrameSizeError);
            }
            let mut opaque = [0u8; 8];
            opaque.copy_from_slice(payload);
            Frame::Ping {
                ack: flags & FLAG_ACK != 0,
                opaque,
            }
        }
        H2_TYPE_GOAWAY => {
            if payload.len() < 8 {
                return Err(Error::FrameSizeError);
            }
            Frame::GoAway {
                last_stream_id: StreamId(u64::from(be32(&payload[..4]) & 0x7fff_ffff)),
                error_code: be32(&payload[4..8]),
                debug_data: Bytes::copy_from_slice(&payload[8..]),
            }
        }
        H2_TYPE_WINDOW_UPDATE => {
            if payload.len() != 4 {
                return Err(Error::FrameSizeError);
            }
            Frame::WindowUpdate {
                stream_id,
                increment: be32(payload) & 0x7fff_ffff,
            }
        }
        H2_TYPE_CONTINUATION => Frame::Continuation {
            stream_id,
            header_block: Bytes::copy_from_slice(payload),
            end_headers: flags & FLAG_END_HEADERS != 0,
        },
        other => {
            tracing::trace!(ty = other, "ignoring unknown h2 frame type");
            Frame::Unknown {
                ty: u64::from(other),
                stream_id,
                flags,
                payload: Bytes::copy_from_slice(payload),
            }
        }
    };
    Ok(ParseOutcome::Parsed { frame, consumed: total })
}

fn strip_padding(flags: u8, payload: &[u8]) -> Result<(&[u8], usize), Error> {
    if flags & FLAG_PADDED == 0 {
        return Ok((payload, 0));
    }
    let pad_len = *payload.first().ok_or(Error::FrameSizeError)? as usize;
    let body = &payload[1..];
    if pad_len > body.len() {
        return Err(Error::FrameSizeError);
    }
    Ok((&body[..body.len() - pad_len], pad_len))
}

fn parse_priority(buf: &[u8]) -> (PriorityInfo, &[u8]) {
    let raw = be32(&buf[..4]);
    let exclusive = raw & 0x8000_0000 != 0;
    let dependency = StreamId(u64::from(raw & 0x7fff_ffff));
    let weight = u16::from(buf[4]) + 1;
    (
        PriorityInfo {
            exclusive,
            dependency,
            weight,
        },
        &buf[5..],
    )
}

fn be32(buf: &[u8]) -> u32 {
    u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])
}

fn parse_one_h3(buf: &[u8], offset: usize, max_frame_size: u32) -> Result<ParseOutcome, Error> {
    let remaining = &buf[offset.min(buf.len())..];
    let Ok((ty, ty_len)) = nyx_varint::decode(remaining, 0) else {
        return Ok(ParseOutcome::Truncated);
    };
    let Ok((length, len_len)) = nyx_varint::decode(remaining, ty_len) else {
        return Ok(ParseOutcome::Truncated);
    };
    if length > u64::from(FRAME_LENGTH_HARD_CAP) || length > u64::from(max_frame_size) {
        return Err(Error::FrameSizeError);
    }
    let header_len = ty_len + len_len;
    let total = header_len + length as usize;
    if remaining.len() < total {
        return Ok(ParseOutcome::Truncated);
    }
    let payload = &remaining[header_len..total];

    let frame = match ty {
        H3_TYPE_DATA => Frame::Data {
            stream_id: StreamId::CONNECTION,
            data: Bytes::copy_from_slice(payload),
            end_stream: false,
        },
        H3_TYPE_HEADERS => Frame::Headers {
            stream_id: StreamId::CONNECTION,
            header_block: Bytes::copy_from_slice(payload),
            end_stream: false,
            end_headers: true,
            priority: None,
        },
        H3_TYPE_CANCEL_PUSH => {
            let (push_id, _) = nyx_varint::decode(payload, 0).map_err(|_| Error::FrameSizeError)?;
            Frame::CancelPush { push_id }
        }
        H3_TYPE_SETTINGS => {
            let mut params = Vec::new();
            let mut cursor = 0;
            while cursor < payload.len() {
                let (id, id_len) = nyx_varint::decode(payload, cursor).map_err(|_| Error::FrameSizeError)?;
                let (value, value_len) = nyx_varint::decode(payload, cursor + id_len).map_err(|_| Error::FrameSizeError)?;
                params.push((SettingId::from_raw(id), value.min(u64::from(u32::MAX)) as u32));
                cursor += id_len + value_len;
            }
            Frame::Settings { ack: false, params }
        }
        H3_TYPE_PUSH_PROMISE => {
            let (push_id, push_id_len) = nyx_varint::decode(payload, 0).map_err(|_| Error::FrameSizeError)?;
            Frame::PushPromise {
                stream_id: StreamId::CONNECTION,
                promised_stream_id: StreamId(push_id),
                header_block: Bytes::copy_from_slice(&payload[push_id_len..]),
                end_headers: true,
            }
        }
        H3_TYPE_GOAWAY => {
            let (id, _) = nyx_varint::decode(payload, 0).map_err(|_| Error::FrameSizeError)?;
            Frame::GoAway {
                last_stream_id: StreamId(id),
                error_code: 0,
                debug_data: Bytes::new(),
            }
        }
        H3_TYPE_MAX_PUSH_ID => {
            let (push_id, _) = nyx_varint::decode(payload, 0).map_err(|_| Error::FrameSizeError)?;
            Frame::MaxPushId { push_id }
        }
        other => {
            tracing::trace!(ty = other, "ignoring unknown h3 frame type");
            Frame::Unknown {
                ty: other,
                stream_id: StreamId::CONNECTION,
                flags: 0,
                payload: Bytes::copy_from_slice(payload),
            }
        }
    };
    Ok(ParseOutcome::Parsed { frame, consumed: total })
}

/// Walks a byte stream of h2 frames while enforcing RFC 7540 §6.10:
/// once a HEADERS or PUSH_PROMISE frame arrives without `END_HEADERS`
/// set, every following frame on the connection must be a CONTINUATION
/// on that same stream until one of them sets `END_HEADERS`. Any other
/// frame interleaved in that window, or a CONTINUATION on the wrong
/// stream, is a connection error.
///
/// HTTP/3 needs no equivalent: QPACK header blocks are always complete
/// within a single HEADERS frame, so [`parse_one`] can be called
/// directly for that protocol.
#[derive(Debug, Default)]
pub struct Http2FrameParser {
    open_header_block: Option<StreamId>,
}

impl Http2FrameParser {
    /// A fresh parser with no header block in progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the next h2 frame starting at `offset`, updating and
    /// enforcing CONTINUATION-sequencing state.
    pub fn parse_next(&mut self, buf: &[u8], offset: usize, max_frame_size: u32) -> Result<ParseOutcome, Error> {
        let outcome = parse_one_h2(buf, offset, max_frame_size)?;
        if let ParseOutcome::Parsed { frame, .. } = &outcome {
            self.track(frame)?;
        }
        Ok(outcome)
    }

    fn track(&mut self, frame: &Frame) -> Result<(), Error> {
        match (self.open_header_block, frame) {
            (Some(expected), Frame::Continuation { stream_id, end_headers, .. }) => {
                if *stream_id != expected {
                    return Err(Error::ProtocolError);
                }
                if *end_headers {
                    self.open_header_block = None;
                }
                Ok(())
            }
            (Some(_), _) => Err(Error::ProtocolError),
            (None, Frame::Headers { stream_id, end_headers, .. } | Frame::PushPromise { stream_id, end_headers, .. }) => {
                if !end_headers {
                    self.open_header_block = Some(*stream_id);
                }
                Ok(())
            }
            (None, Frame::Continuation { .. }) => Err(Error::ProtocolError),
            (None, _) => Ok(()),
        }
    }
}

/// Serialize `frame` onto `writer` using `protocol`'s wire encoding.
pub fn serialize(protocol: Protocol, frame: &Frame, writer: &mut BytesMut) -> Result<(), Error> {
    match protocol {
        Protocol::Http2 => serialize_h2(frame, writer),
        Protocol::Http3 => serialize_h3(frame, writer),
    }
}

fn serialize_h2(frame: &Frame, writer: &mut BytesMut) -> Result<(), Error> {
    let (ty, flags, stream_id, payload_len_hint) = match frame {
        Frame::Data { end_stream, data, .. } => (
            H2_TYPE_DATA,
            if *end_stream { FLAG_END_STREAM } else { 0 },
            frame.stream_id(),
            data.len(),
        ),
        Frame::Headers { .. } => (H2_TYPE_HEADERS, 0, frame.stream_id(), 0),
        Frame::Priority { .. } => (H2_TYPE_PRIORITY, 0, frame.stream_id(), 5),
        Frame::RstStream { .. } => (H2_TYPE_RST_STREAM, 0, frame.stream_id(), 4),
        Frame::Settings { ack, params } => (
            H2_TYPE_SETTINGS,
            if *ack { FLAG_ACK } else { 0 },
            StreamId::CONNECTION,
            params.len() * 6,
        ),
        Frame::PushPromise { .. } => (H2_TYPE_PUSH_PROMISE, 0, frame.stream_id(), 0),
        Frame::Ping { .. } => (H2_TYPE_PING, 0, StreamId::CONNECTION, 8),
        Frame::GoAway { .. } => (H2_TYPE_GOAWAY, 0, StreamId::CONNECTION, 0),
        Frame::WindowUpdate { .. } => (H2_TYPE_WINDOW_UPDATE, 0, frame.stream_id(), 4),
        Frame::Continuation { .. } => (H2_TYPE_CONTINUATION, 0, frame.stream_id(), 0),
        Frame::CancelPush { .. } | Frame::MaxPushId { .. } => return Err(Error::ProtocolError),
        Frame::Unknown { ty, stream_id, flags, payload } => {
            write_h2_header(writer, payload.len() as u32, *ty as u8, *flags, *stream_id);
            writer.extend_from_slice(payload);
            return Ok(());
        }
    };
    let _ = payload_len_hint;

    // Compute flags that depend on frame content and reserve the header,
    // then patch the length in once the payload is written.
    let mut flags = flags;
    if let Frame::Headers { end_stream, end_headers, .. } = frame {
        if *end_stream {
            flags |= FLAG_END_STREAM;
        }
        if *end_headers {
            flags |= FLAG_END_HEADERS;
        }
    }
    if let Frame::PushPromise { end_headers, .. } = frame {
        if *end_headers {
            flags |= FLAG_END_HEADERS;
        }
    }
    if let Frame::Continuation { end_headers, .. } = frame {
        if *end_headers {
            flags |= FLAG_END_HEADERS;
        }
    }
    if let Frame::Ping { ack, .. } = frame {
        if *ack {
            flags |= FLAG_ACK;
        }
    }

    let header_pos = writer.len();
    write_h2_header(writer, 0, ty, flags, stream_id);
    let body_start = writer.len();

    match frame {
        Frame::Data { data, .. } => writer.extend_from_slice(data),
        Frame::Headers { header_block, priority, .. } => {
            if let Some(p) = priority {
                write_priority(writer, p);
            }
            writer.extend_from_slice(header_block);
        }
        Frame::Priority { priority, .. } => write_priority(writer, priority),
        Frame::RstStream { error_code, .. } => writer.put_u32(*error_code),
        Frame::Settings { params, .. } => {
            for (id, value) in params {
                writer.put_u16(id.to_raw() as u16);
                writer.put_u32(*value);
            }
        }
        Frame::PushPromise {
            promised_stream_id,
            header_block,
            ..
        } => {
            writer.put_u32(promised_stream_id.0 as u32 & 0x7fff_ffff);
            writer.extend_from_slice(header_block);
        }
        Frame::Ping { opaque, .. } => writer.extend_from_slice(opaque),
        Frame::GoAway {
            last_stream_id,
            error_code,
            debug_data,
        } => {
            writer.put_u32(last_stream_id.0 as u32 & 0x7fff_ffff);
            writer.put_u32(*error_code);
            writer.extend_from_slice(debug_data);
        }
        Frame::WindowUpdate { increment, .. } => writer.put_u32(*increment & 0x7fff_ffff),
        Frame::Continuation { header_block, .. } => writer.extend_from_slice(header_block),
        Frame::CancelPush { .. } | Frame::MaxPushId { .. } | Frame::Unknown { .. } => unreachable!("handled above"),
    }

    let length = (writer.len() - body_start) as u32;
    if length > FRAME_LENGTH_HARD_CAP {
        return Err(Error::FrameSizeError);
    }
    let len_bytes = length.to_be_bytes();
    writer[header_pos] = len_bytes[1];
    writer[header_pos + 1] = len_bytes[2];
    writer[header_pos + 2] = len_bytes[3];
    Ok(())
}

fn write_h2_header(writer: &mut BytesMut, length: u32, ty: u8, flags: u8, stream_id: StreamId) {
    let len_bytes = length.to_be_bytes();
    writer.extend_from_slice(&len_bytes[1..]);
    writer.put_u8(ty);
    writer.put_u8(flags);
    writer.put_u32(stream_id.0 as u32 & 0x7fff_ffff);
}

fn write_priority(writer: &mut BytesMut, p: &PriorityInfo) {
    let mut raw = p.dependency.0 as u32 & 0x7fff_ffff;
    if p.exclusive {
        raw |= 0x8000_0000;
    }
    writer.put_u32(raw);
    writer.put_u8((p.weight.saturating_sub(1)) as u8);
}

fn serialize_h3(frame: &Frame, writer: &mut BytesMut) -> Result<(), Error> {
    match frame {
        Frame::Data { data, .. } => write_h3_tlv(writer, H3_TYPE_DATA, data),
        Frame::Headers { header_block, .. } => write_h3_tlv(writer, H3_TYPE_HEADERS, header_block),
        Frame::CancelPush { push_id } => {
            let mut body = BytesMut::new();
            nyx_varint::VarInt::new(*push_id).map_err(|_| Error::ProtocolError)?.encode(&mut body);
            write_h3_tlv(writer, H3_TYPE_CANCEL_PUSH, &body)
        }
        Frame::Settings { params, ack } => {
            if *ack {
                return Err(Error::ProtocolError);
            }
            let mut body = BytesMut::new();
            for (id, value) in params {
                nyx_varint::VarInt::new(id.to_raw()).map_err(|_| Error::ProtocolError)?.encode(&mut body);
                nyx_varint::VarInt::new(u64::from(*value)).map_err(|_| Error::ProtocolError)?.encode(&mut body);
            }
            write_h3_tlv(writer, H3_TYPE_SETTINGS, &body)
        }
        Frame::PushPromise {
            promised_stream_id,
            header_block,
            ..
        } => {
            let mut body = BytesMut::new();
            nyx_varint::VarInt::new(promised_stream_id.0)
                .map_err(|_| Error::ProtocolError)?
                .encode(&mut body);
            body.extend_from_slice(header_block);
            write_h3_tlv(writer, H3_TYPE_PUSH_PROMISE, &body)
        }
        Frame::GoAway { last_stream_id, .. } => {
            let mut body = BytesMut::new();
            nyx_varint::VarInt::new(last_stream_id.0).map_err(|_| Error::ProtocolError)?.encode(&mut body);
            write_h3_tlv(writer, H3_TYPE_GOAWAY, &body)
        }
        Frame::MaxPushId { push_id } => {
            let mut body = BytesMut::new();
            nyx_varint::VarInt::new(*push_id).map_err(|_| Error::ProtocolError)?.encode(&mut body);
            write_h3_tlv(writer, H3_TYPE_MAX_PUSH_ID, &body)
        }
        Frame::Unknown { ty, payload, .. } => write_h3_tlv(writer, *ty, payload),
        Frame::Priority { .. }
        | Frame::RstStream { .. }
        | Frame::Ping { .. }
        | Frame::WindowUpdate { .. }
        | Frame::Continuation { .. } => Err(Error::ProtocolError),
    }
}

fn write_h3_tlv(writer: &mut BytesMut, ty: u64, payload: &[u8]) -> Result<(), Error> {
    if payload.len() > FRAME_LENGTH_HARD_CAP as usize {
        return Err(Error::FrameSizeError);
    }
    nyx_varint::VarInt::new(ty).map_err(|_| Error::ProtocolError)?.encode(writer);
    nyx_varint::VarInt::new(payload.len() as u64)
        .map_err(|_| Error::ProtocolError)?
        .encode(writer);
    writer.extend_from_slice(payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(protocol: Protocol, frame: Frame, max_frame_size: u32) -> Frame {
        let mut buf = BytesMut::new();
        serialize(protocol, &frame, &mut buf).unwrap();
        match parse_one(protocol, &buf, 0, max_frame_size).unwrap() {
            ParseOutcome::Parsed { frame, consumed } => {
                assert_eq!(consumed, buf.len());
                frame
            }
            ParseOutcome::Truncated => panic!("unexpected truncation"),
        }
    }

    #[test]
    fn h2_data_round_trip() {
        let frame = Frame::Data {
            stream_id: StreamId(1),
            data: Bytes::from_static(b"hello"),
            end_stream: true,
        };
        assert_eq!(round_trip(Protocol::Http2, frame.clone(), 16_384), frame);
    }

    #[test]
    fn h2_headers_round_trip_with_priority() {
        let frame = Frame::Headers {
            stream_id: StreamId(3),
            header_block: Bytes::from_static(b"header-block"),
            end_stream: false,
            end_headers: true,
            priority: Some(PriorityInfo {
                exclusive: true,
                dependency: StreamId(1),
                weight: 42,
            }),
        };
        assert_eq!(round_trip(Protocol::Http2, frame.clone(), 16_384), frame);
    }

    #[test]
    fn h2_settings_round_trip() {
        let frame = Frame::Settings {
            ack: false,
            params: vec![(SettingId::InitialWindowSize, 65_535), (SettingId::MaxFrameSize, 20_000)],
        };
        assert_eq!(round_trip(Protocol::Http2, frame.clone(), 16_384), frame);
    }

    #[test]
    fn h2_settings_ack_rejects_payload() {
        let mut buf = BytesMut::new();
        write_h2_header(&mut buf, 6, H2_TYPE_SETTINGS, FLAG_ACK, StreamId::CONNECTION);
        buf.put_u16(1);
        buf.put_u32(100);
        let err = parse_one(Protocol::Http2, &buf, 0, 16_384).unwrap_err();
        assert_eq!(err, Error::FrameSizeError);
    }

    #[test]
    fn h2_goaway_round_trip() {
        let frame = Frame::GoAway {
            last_stream_id: StreamId(7),
            error_code: 0,
            debug_data: Bytes::from_static(b"bye"),
        };
        assert_eq!(round_trip(Protocol::Http2, frame.clone(), 16_384), frame);
    }

    #[test]
    fn h2_ping_round_trip() {
        let frame = Frame::Ping {
            ack: false,
            opaque: *b"abcdefgh",
        };
        assert_eq!(round_trip(Protocol::Http2, frame.clone(), 16_384), frame);
    }

    #[test]
    fn rst_stream_wrong_size_is_frame_size_error() {
        let mut buf = BytesMut::new();
        write_h2_header(&mut buf, 2, H2_TYPE_RST_STREAM, 0, StreamId(1));
        buf.put_u16(1);
        let err = parse_one(Protocol::Http2, &buf, 0, 16_384).unwrap_err();
        assert_eq!(err, Error::FrameSizeError);
    }

    #[test]
    fn control_frame_with_nonzero_stream_is_protocol_error() {
        let mut buf = BytesMut::new();
        write_h2_header(&mut buf, 0, H2_TYPE_SETTINGS, 0, StreamId(1));
        let err = parse_one(Protocol::Http2, &buf, 0, 16_384).unwrap_err();
        assert_eq!(err, Error::ProtocolError);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buf = BytesMut::new();
        write_h2_header(&mut buf, FRAME_LENGTH_HARD_CAP + 1, H2_TYPE_DATA, 0, StreamId(1));
        let err = parse_one(Protocol::Http2, &buf, 0, FRAME_LENGTH_HARD_CAP).unwrap_err();
        assert_eq!(err, Error::FrameSizeError);
    }

    #[test]
    fn unknown_h2_frame_is_forwarded_not_rejected() {
        let mut buf = BytesMut::new();
        write_h2_header(&mut buf, 3, 0xEE, 0, StreamId(1));
        buf.extend_from_slice(b"abc");
        match parse_one(Protocol::Http2, &buf, 0, 16_384).unwrap() {
            ParseOutcome::Parsed { frame: Frame::Unknown { ty, payload, .. }, .. } => {
                assert_eq!(ty, 0xEE);
                assert_eq!(&payload[..], b"abc");
            }
            other => panic!("expected Unknown frame, got {other:?}"),
        }
    }

    #[test]
    fn truncated_header_is_reported_as_truncated() {
        let buf = [0u8; 4];
        matches!(parse_one(Protocol::Http2, &buf, 0, 16_384).unwrap(), ParseOutcome::Truncated);
    }

    #[test]
    fn h3_data_round_trip() {
        let frame = Frame::Data {
            stream_id: StreamId::CONNECTION,
            data: Bytes::from_static(b"payload"),
            end_stream: false,
        };
        assert_eq!(round_trip(Protocol::Http3, frame.clone(), 16_384), frame);
    }

    #[test]
    fn h3_settings_round_trip() {
        let frame = Frame::Settings {
            ack: false,
            params: vec![(SettingId::MaxHeaderListSize, 4096)],
        };
        assert_eq!(round_trip(Protocol::Http3, frame.clone(), 16_384), frame);
    }

    #[test]
    fn h3_goaway_round_trip() {
        let frame = Frame::GoAway {
            last_stream_id: StreamId(4),
            error_code: 0,
            debug_data: Bytes::new(),
        };
        assert_eq!(round_trip(Protocol::Http3, frame.clone(), 16_384), frame);
    }

    #[test]
    fn h3_max_push_id_round_trip() {
        let frame = Frame::MaxPushId { push_id: 9 };
        assert_eq!(round_trip(Protocol::Http3, frame.clone(), 16_384), frame);
    }

    #[test]
    fn h2_only_frame_rejected_under_h3() {
        let frame = Frame::Ping { ack: false, opaque: [0; 8] };
        let mut buf = BytesMut::new();
        assert_eq!(serialize(Protocol::Http3, &frame, &mut buf).unwrap_err(), Error::ProtocolError);
    }

    fn push(buf: &mut BytesMut, frame: &Frame) {
        serialize(Protocol::Http2, frame, buf).unwrap();
    }

    #[test]
    fn continuation_completes_a_split_header_block() {
        let mut buf = BytesMut::new();
        push(
            &mut buf,
            &Frame::Headers {
                stream_id: StreamId(1),
                header_block: Bytes::from_static(b"part-one"),
                end_stream: false,
                end_headers: false,
                priority: None,
            },
        );
        push(
            &mut buf,
            &Frame::Continuation {
                stream_id: StreamId(1),
                header_block: Bytes::from_static(b"part-two"),
                end_headers: true,
            },
        );

        let mut parser = Http2FrameParser::new();
        let mut offset = 0;
        for _ in 0..2 {
            match parser.parse_next(&buf, offset, 16_384).unwrap() {
                ParseOutcome::Parsed { consumed, .. } => offset += consumed,
                ParseOutcome::Truncated => panic!("unexpected truncation"),
            }
        }
    }

    #[test]
    fn non_continuation_between_headers_and_its_continuation_is_protocol_error() {
        let mut buf = BytesMut::new();
        push(
            &mut buf,
            &Frame::Headers {
                stream_id: StreamId(1),
                header_block: Bytes::from_static(b"part-one"),
                end_stream: false,
                end_headers: false,
                priority: None,
            },
        );
        push(
            &mut buf,
            &Frame::Data {
                stream_id: StreamId(1),
                data: Bytes::from_static(b"sneaked in"),
                end_stream: false,
            },
        );

        let mut parser = Http2FrameParser::new();
        let ParseOutcome::Parsed { consumed, .. } = parser.parse_next(&buf, 0, 16_384).unwrap() else {
            panic!("unexpected truncation");
        };
        let err = parser.parse_next(&buf, consumed, 16_384).unwrap_err();
        assert_eq!(err, Error::ProtocolError);
    }

    #[test]
    fn continuation_on_the_wrong_stream_is_protocol_error() {
        let mut buf = BytesMut::new();
        push(
            &mut buf,
            &Frame::Headers {
                stream_id: StreamId(1),
                header_block: Bytes::from_static(b"part-one"),
                end_stream: false,
                end_headers: false,
                priority: None,
            },
        );
        push(
            &mut buf,
            &Frame::Continuation {
                stream_id: StreamId(3),
                header_block: Bytes::from_static(b"part-two"),
                end_headers: true,
            },
        );

        let mut parser = Http2FrameParser::new();
        let ParseOutcome::Parsed { consumed, .. } = parser.parse_next(&buf, 0, 16_384).unwrap() else {
            panic!("unexpected truncation");
        };
        let err = parser.parse_next(&buf, consumed, 16_384).unwrap_err();
        assert_eq!(err, Error::ProtocolError);
    }

    #[test]
    fn unsolicited_continuation_is_protocol_error() {
        let mut buf = BytesMut::new();
        push(
            &mut buf,
            &Frame::Continuation {
                stream_id: StreamId(1),
                header_block: Bytes::from_static(b"orphan"),
                end_headers: true,
            },
        );
        let mut parser = Http2FrameParser::new();
        let err = parser.parse_next(&buf, 0, 16_384).unwrap_err();
        assert_eq!(err, Error::ProtocolError);
    }
}
