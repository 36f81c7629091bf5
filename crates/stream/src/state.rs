//! Per-stream state machine (RFC 7540 §5.1; the h3 request stream
//! lifecycle from RFC 9114 §4.1 collapses onto the same states since it
//! has no PUSH_PROMISE-reservation concept of its own at this layer).

use thiserror::Error;

/// A stream's position in its lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StreamState {
    /// Created but no HEADERS sent or received yet.
    Idle,
    /// Reserved by a PUSH_PROMISE this side sent.
    ReservedLocal,
    /// Reserved by a PUSH_PROMISE this side received.
    ReservedRemote,
    /// Both sides may still send.
    Open,
    /// This side is done sending; the peer may still send.
    HalfClosedLocal,
    /// The peer is done sending; this side may still send.
    HalfClosedRemote,
    /// Terminal. Retained briefly for the grace window (see
    /// [`crate::grace::GraceWindow`]) before being forgotten entirely.
    Closed,
}

/// An event that can drive a stream's state transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Event {
    /// This side sent a HEADERS frame that opens the stream.
    SendHeaders { end_stream: bool },
    /// This side sent a DATA frame.
    SendData { end_stream: bool },
    /// This side sent a PUSH_PROMISE, reserving a stream.
    SendPushPromise,
    /// This side sent RST_STREAM.
    SendRstStream,
    /// The peer sent a HEADERS frame that opens the stream.
    RecvHeaders { end_stream: bool },
    /// The peer sent a DATA frame.
    RecvData { end_stream: bool },
    /// The peer sent a PUSH_PROMISE, reserving a stream.
    RecvPushPromise,
    /// The peer sent RST_STREAM.
    RecvRstStream,
}

/// A transition was attempted that RFC 7540 §5.1 forbids in the current
/// state.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
#[error("illegal stream transition: {event:?} in state {state:?}")]
pub struct IllegalTransition {
    /// The state the stream was in.
    pub state: StreamState,
    /// The event that could not be applied.
    pub event: Event,
}

impl StreamState {
    /// Apply `event`, returning the new state.
    ///
    /// RST_STREAM is legal from (almost) any non-idle state and always
    /// closes the stream; everything else follows the RFC 7540 Figure 2
    /// diagram.
    pub fn apply(self, event: Event) -> Result<StreamState, IllegalTransition> {
        use Event::*;
        use StreamState::*;

        if matches!(event, SendRstStream | RecvRstStream) && self != Idle {
            return Ok(Closed);
        }

        let next = match (self, event) {
            (Idle, SendHeaders { end_stream: false }) => Open,
            (Idle, SendHeaders { end_stream: true }) => HalfClosedLocal,
            (Idle, RecvHeaders { end_stream: false }) => Open,
            (Idle, RecvHeaders { end_stream: true }) => HalfClosedRemote,
            (Idle, SendPushPromise) => ReservedLocal,
            (Idle, RecvPushPromise) => ReservedRemote,

            (ReservedLocal, SendHeaders { end_stream: false }) => HalfClosedRemote,
            (ReservedLocal, SendHeaders { end_stream: true }) => Closed,
            (ReservedRemote, RecvHeaders { end_stream: false }) => HalfClosedLocal,
            (ReservedRemote, RecvHeaders { end_stream: true }) => Closed,

            (Open, SendData { end_stream: true }) | (Open, SendHeaders { end_stream: true }) => HalfClosedLocal,
            (Open, RecvData { end_stream: true }) | (Open, RecvHeaders { end_stream: true }) => HalfClosedRemote,
            (Open, SendData { end_stream: false })
            | (Open, SendHeaders { end_stream: false })
            | (Open, RecvData { end_stream: false })
            | (Open, RecvHeaders { end_stream: false }) => Open,

            (HalfClosedLocal, RecvData { end_stream: true }) | (HalfClosedLocal, RecvHeaders { end_stream: true }) => Closed,
            (HalfClosedLocal, RecvData { end_stream: false }) | (HalfClosedLocal, RecvHeaders { end_stream: false }) => HalfClosedLocal,

            (HalfClosedRemote, SendData { end_stream: true }) | (HalfClosedRemote, SendHeaders { end_stream: true }) => Closed,
            (HalfClosedRemote, SendData { end_stream: false }) | (HalfClosedRemote, SendHeaders { end_stream: false }) => HalfClosedRemote,

            _ => return Err(IllegalTransition { state: self, event }),
        };
        Ok(next)
    }

    /// `true` once the stream is fully closed and only retained for its
    /// grace window.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, StreamState::Closed)
    }

    /// `true` if this side may still send DATA/HEADERS on the stream.
    #[must_use]
    pub fn can_send(self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedRemote | StreamState::ReservedLocal)
    }

    /// `true` if the peer may still send DATA/HEADERS on the stream.
    #[must_use]
    pub fn can_recv(self) -> bool {
        matches!(self, StreamState::Open | StreamState::HalfClosedLocal | StreamState::ReservedRemote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StreamState::*;

    #[test]
    fn request_response_happy_path() {
        let mut state = Idle;
        state = state.apply(Event::SendHeaders { end_stream: true }).unwrap();
        assert_eq!(state, HalfClosedLocal);
        state = state.apply(Event::RecvHeaders { end_stream: false }).unwrap();
        assert_eq!(state, HalfClosedLocal);
        state = state.apply(Event::RecvData { end_stream: true }).unwrap();
        assert_eq!(state, Closed);
    }

    #[test]
    fn bidirectional_streaming() {
        let mut state = Idle;
        state = state.apply(Event::SendHeaders { end_stream: false }).unwrap();
        assert_eq!(state, Open);
        state = state.apply(Event::RecvHeaders { end_stream: false }).unwrap();
        assert_eq!(state, Open);
        state = state.apply(Event::SendData { end_stream: true }).unwrap();
        assert_eq!(state, HalfClosedLocal);
        state = state.apply(Event::RecvData { end_stream: true }).unwrap();
        assert_eq!(state, Closed);
    }

    #[test]
    fn rst_stream_closes_from_any_non_idle_state() {
        let state = Open;
        assert_eq!(state.apply(Event::SendRstStream).unwrap(), Closed);
        let state = HalfClosedRemote;
        assert_eq!(state.apply(Event::RecvRstStream).unwrap(), Closed);
    }

    #[test]
    fn push_promise_reservation() {
        let mut state = Idle;
        state = state.apply(Event::RecvPushPromise).unwrap();
        assert_eq!(state, ReservedRemote);
        state = state.apply(Event::RecvHeaders { end_stream: true }).unwrap();
        assert_eq!(state, Closed);
    }

    #[test]
    fn sending_headers_twice_on_open_is_illegal() {
        let state = HalfClosedLocal;
        let err = state.apply(Event::SendHeaders { end_stream: false }).unwrap_err();
        assert_eq!(err.state, HalfClosedLocal);
    }

    #[test]
    fn can_send_and_can_recv_reflect_half_closed_sides() {
        assert!(Open.can_send() && Open.can_recv());
        assert!(!HalfClosedLocal.can_send() && HalfClosedLocal.can_recv());
        assert!(HalfClosedRemote.can_send() && !HalfClosedRemote.can_recv());
        assert!(!Closed.can_send() && !Closed.can_recv());
    }
}
