//! The connection-wide handshake/lifecycle state machine.
//!
//! Modeled as an explicit enum rather than a handful of booleans so that
//! "a request was sent before SETTINGS finished" is a match arm instead
//! of something that quietly works by accident.

use thiserror::Error;

/// Where a connection is in its handshake/shutdown lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConnectionPhase {
    /// The connection preface (h2) or transport handshake (h3) has not
    /// completed yet.
    Preface,
    /// The preface completed; we are waiting for the peer's initial
    /// SETTINGS frame before admitting application streams.
    AwaitingSettings,
    /// Normal operation: streams may be opened and served.
    Active,
    /// A GOAWAY was sent or received; only streams at or below the
    /// announced last-stream-id may continue.
    GoingAway,
    /// The connection is fully torn down.
    Closed,
}

/// An operation was attempted in a phase that forbids it.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
#[error("operation {operation} is not valid in phase {phase:?}")]
pub struct PhaseError {
    /// The phase the connection was in.
    pub phase: ConnectionPhase,
    /// A short name for the attempted operation, for the error message.
    pub operation: &'static str,
}

impl ConnectionPhase {
    /// `true` if a new application stream may be opened right now.
    #[must_use]
    pub fn can_open_stream(self) -> bool {
        matches!(self, ConnectionPhase::Active)
    }

    /// Move to `AwaitingSettings` once the preface/handshake completes.
    pub fn complete_preface(&mut self) -> Result<(), PhaseError> {
        if *self != ConnectionPhase::Preface {
            return Err(PhaseError {
                phase: *self,
                operation: "complete_preface",
            });
        }
        *self = ConnectionPhase::AwaitingSettings;
        Ok(())
    }

    /// Move to `Active` once the peer's initial SETTINGS frame arrives.
    pub fn receive_initial_settings(&mut self) -> Result<(), PhaseError> {
        if *self != ConnectionPhase::AwaitingSettings {
            return Err(PhaseError {
                phase: *self,
                operation: "receive_initial_settings",
            });
        }
        *self = ConnectionPhase::Active;
        Ok(())
    }

    /// Begin graceful shutdown; legal from `Active` or `AwaitingSettings`
    /// (a peer may GOAWAY before its own SETTINGS is acknowledged).
    pub fn begin_going_away(&mut self) -> Result<(), PhaseError> {
        if !matches!(self, ConnectionPhase::Active | ConnectionPhase::AwaitingSettings) {
            return Err(PhaseError {
                phase: *self,
                operation: "begin_going_away",
            });
        }
        *self = ConnectionPhase::GoingAway;
        Ok(())
    }

    /// Tear the connection down fully. Legal from any phase.
    pub fn close(&mut self) {
        *self = ConnectionPhase::Closed;
    }
}

impl Default for ConnectionPhase {
    fn default() -> Self {
        ConnectionPhase::Preface
    }
}
