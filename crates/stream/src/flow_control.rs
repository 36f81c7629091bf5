//! RFC 7540 §5.2 flow-control window bookkeeping, shared by per-stream
//! and connection-level windows (h3 reuses the same credit-based model
//! at the QUIC transport layer, which this type is deliberately generic
//! enough to also represent).

use thiserror::Error;

/// A single flow-control window: a budget of bytes the peer has granted
/// us to send, or that we have granted the peer to send to us.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FlowWindow {
    /// Bytes available to send (or, on the receive side, bytes the peer
    /// is still allowed to send us) right now.
    available: i64,
    /// Total credit granted since the window was created; used to size
    /// WINDOW_UPDATE increments relative to a target.
    granted: u64,
}

/// RFC 7540 §6.9.1: a flow-control window must never exceed this value.
pub const MAX_WINDOW_SIZE: i64 = (1i64 << 31) - 1;

/// A requested consumption exceeded the available window.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
#[error("flow control window exhausted: requested {requested}, available {available}")]
pub struct WindowExhausted {
    /// Bytes the caller attempted to consume.
    pub requested: u64,
    /// Bytes actually available.
    pub available: i64,
}

/// A WINDOW_UPDATE or retroactive SETTINGS change would have pushed the
/// window above RFC 7540 §6.9.1's `2^31 - 1` ceiling.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
#[error("flow control window overflow: {attempted} exceeds the {limit} ceiling")]
pub struct WindowOverflow {
    /// What the window would have become.
    pub attempted: i64,
    /// The RFC 7540 ceiling.
    pub limit: i64,
}

impl FlowWindow {
    /// A new window starting with `initial` bytes of credit.
    #[must_use]
    pub fn new(initial: u32) -> Self {
        Self {
            available: i64::from(initial),
            granted: u64::from(initial),
        }
    }

    /// Bytes currently available.
    #[must_use]
    pub fn available(self) -> i64 {
        self.available
    }

    /// Consume `n` bytes of the window (about to send/have received `n`
    /// bytes of DATA).
    pub fn consume(&mut self, n: u64) -> Result<(), WindowExhausted> {
        let signed = i64::try_from(n).unwrap_or(i64::MAX);
        if signed > self.available {
            return Err(WindowExhausted {
                requested: n,
                available: self.available,
            });
        }
        self.available -= signed;
        Ok(())
    }

    /// Apply a WINDOW_UPDATE increment. Per RFC 7540 §6.9, the window can
    /// legitimately go negative (after a SETTINGS-driven shrink) and an
    /// increment only ever adds credit back.
    ///
    /// # Errors
    ///
    /// Returns [`WindowOverflow`] (the peer violated §6.9.1) without
    /// applying the increment.
    pub fn grant(&mut self, increment: u32) -> Result<(), WindowOverflow> {
        let attempted = self.available + i64::from(increment);
        if attempted > MAX_WINDOW_SIZE {
            return Err(WindowOverflow {
                attempted,
                limit: MAX_WINDOW_SIZE,
            });
        }
        self.available = attempted;
        self.granted += u64::from(increment);
        Ok(())
    }

    /// Apply a SETTINGS_INITIAL_WINDOW_SIZE change that affects this
    /// stream's window retroactively (RFC 7540 §6.9.2): the delta between
    /// old and new initial sizes is added (or subtracted) from the
    /// current available balance.
    ///
    /// # Errors
    ///
    /// Returns [`WindowOverflow`] if the new balance would exceed §6.9.1's
    /// ceiling, without applying the adjustment.
    pub fn adjust_initial(&mut self, old_initial: u32, new_initial: u32) -> Result<(), WindowOverflow> {
        let attempted = self.available + i64::from(new_initial) - i64::from(old_initial);
        if attempted > MAX_WINDOW_SIZE {
            return Err(WindowOverflow {
                attempted,
                limit: MAX_WINDOW_SIZE,
            });
        }
        self.available = attempted;
        Ok(())
    }

    /// Whether a WINDOW_UPDATE should be sent on the receive side: once
    /// more than half of `initial` has been consumed, grant it back.
    #[must_use]
    pub fn should_replenish(self, initial: u32) -> bool {
        self.available <= i64::from(initial) / 2
    }

    /// The increment to send when replenishing back up to `target`.
    #[must_use]
    pub fn replenish_amount(self, target: u32) -> u32 {
        let deficit = i64::from(target) - self.available;
        if deficit <= 0 {
            0
        } else {
            deficit.min(i64::from(u32::MAX)) as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_and_grant() {
        let mut w = FlowWindow::new(100);
        w.consume(60).unwrap();
        assert_eq!(w.available(), 40);
        w.grant(30).unwrap();
        assert_eq!(w.available(), 70);
    }

    #[test]
    fn consume_beyond_window_errors() {
        let mut w = FlowWindow::new(10);
        let err = w.consume(20).unwrap_err();
        assert_eq!(err.requested, 20);
        assert_eq!(err.available, 10);
    }

    #[test]
    fn shrinking_initial_window_can_go_negative() {
        let mut w = FlowWindow::new(100);
        w.adjust_initial(100, 10).unwrap();
        assert_eq!(w.available(), 10);
        w.adjust_initial(10, 0).unwrap();
        assert_eq!(w.available(), 0);
    }

    #[test]
    fn replenish_threshold_and_amount() {
        let mut w = FlowWindow::new(100);
        w.consume(60).unwrap();
        assert!(w.should_replenish(100));
        assert_eq!(w.replenish_amount(100), 60);
        w.grant(60).unwrap();
        assert!(!w.should_replenish(100));
        assert_eq!(w.replenish_amount(100), 0);
    }

    #[test]
    fn grant_beyond_the_2_31_minus_1_ceiling_is_rejected() {
        let mut w = FlowWindow::new(0);
        w.grant(MAX_WINDOW_SIZE as u32).unwrap();
        let err = w.grant(1).unwrap_err();
        assert_eq!(err.limit, MAX_WINDOW_SIZE);
        assert_eq!(w.available(), MAX_WINDOW_SIZE);
    }

    #[test]
    fn growing_initial_window_beyond_the_ceiling_is_rejected() {
        let mut w = FlowWindow::new(0);
        w.grant(MAX_WINDOW_SIZE as u32).unwrap();
        let err = w.adjust_initial(0, 1).unwrap_err();
        assert_eq!(err.limit, MAX_WINDOW_SIZE);
    }
}
