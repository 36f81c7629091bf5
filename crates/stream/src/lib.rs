//! Per-stream state: the RFC 7540 §5.1 lifecycle state machine, send/recv
//! flow-control windows, the connection-wide priority tree, and bounded
//! retention of recently closed stream ids.

mod flow_control;
mod grace;
mod priority;
mod state;

pub use flow_control::{FlowWindow, WindowExhausted, WindowOverflow, MAX_WINDOW_SIZE};
pub use grace::GraceWindow;
pub use nyx_proto::PriorityInfo;
pub use priority::PriorityTree;
pub use state::{Event, IllegalTransition, StreamState};

use nyx_proto::StreamId;
use thiserror::Error;

/// Errors raised while driving a [`Stream`].
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    /// The attempted state transition is not legal from the stream's
    /// current state.
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
    /// The operation would exceed the stream's flow-control window.
    #[error(transparent)]
    WindowExhausted(#[from] WindowExhausted),
    /// A WINDOW_UPDATE or retroactive SETTINGS change would push the
    /// window past RFC 7540 §6.9.1's ceiling.
    #[error(transparent)]
    WindowOverflow(#[from] WindowOverflow),
}

/// A single request/response (or pushed) stream: lifecycle state plus its
/// two flow-control windows.
#[derive(Debug, Clone)]
pub struct Stream {
    id: StreamId,
    state: StreamState,
    send_window: FlowWindow,
    recv_window: FlowWindow,
}

impl Stream {
    /// A new, idle stream with both windows seeded from `initial_window`.
    #[must_use]
    pub fn new(id: StreamId, initial_window: u32) -> Self {
        Self {
            id,
            state: StreamState::Idle,
            send_window: FlowWindow::new(initial_window),
            recv_window: FlowWindow::new(initial_window),
        }
    }

    /// This stream's id.
    #[must_use]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Drive the state machine with `event`.
    pub fn apply(&mut self, event: Event) -> Result<(), Error> {
        self.state = self.state.apply(event)?;
        Ok(())
    }

    /// Reserve `n` bytes of send-side flow-control credit before emitting
    /// a DATA frame of that size.
    pub fn reserve_send(&mut self, n: u64) -> Result<(), Error> {
        self.send_window.consume(n)?;
        Ok(())
    }

    /// Account for `n` bytes just received against the recv-side window.
    pub fn account_recv(&mut self, n: u64) -> Result<(), Error> {
        self.recv_window.consume(n)?;
        Ok(())
    }

    /// Apply a WINDOW_UPDATE the peer sent for this stream.
    pub fn grant_send(&mut self, increment: u32) -> Result<(), Error> {
        self.send_window.grant(increment)?;
        Ok(())
    }

    /// Whether a WINDOW_UPDATE should now be sent back to the peer to
    /// replenish their send budget into us.
    #[must_use]
    pub fn should_replenish(&self, initial_window: u32) -> bool {
        self.recv_window.should_replenish(initial_window)
    }

    /// The increment to send when replenishing.
    #[must_use]
    pub fn replenish_amount(&self, target: u32) -> u32 {
        self.recv_window.replenish_amount(target)
    }

    /// Apply a retroactive SETTINGS_INITIAL_WINDOW_SIZE change to the
    /// send-side window (RFC 7540 §6.9.2).
    pub fn adjust_send_initial(&mut self, old_initial: u32, new_initial: u32) -> Result<(), Error> {
        self.send_window.adjust_initial(old_initial, new_initial)?;
        Ok(())
    }

    /// Bytes this side may still send without a WINDOW_UPDATE.
    #[must_use]
    pub fn send_available(&self) -> i64 {
        self.send_window.available()
    }
}
