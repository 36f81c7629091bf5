//! Replay defense for single-use 0-RTT tickets.
//!
//! Two independent checks gate ticket reuse: a monotonic per-origin
//! counter (a ticket presented with a counter value at or below one
//! already seen is a replay) and a bounded ring of recently seen nonces
//! (catches replays that race within the same counter tick). Neither
//! structure grows without bound.

use std::collections::VecDeque;

/// Default nonce ring size, matching `ZeroRttSection::replay_window`'s
/// default in the network config.
pub const DEFAULT_NONCE_RING_CAPACITY: usize = 128;

/// Per-origin replay-defense state.
#[derive(Debug)]
pub struct ReplayGuard {
    high_water_counter: u64,
    recent_nonces: VecDeque<[u8; 16]>,
    capacity: usize,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_NONCE_RING_CAPACITY)
    }
}

impl ReplayGuard {
    /// A fresh guard with no history, keeping at most `capacity` recent
    /// nonces.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            high_water_counter: 0,
            recent_nonces: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Check and record a presented `(counter, nonce)` pair. Returns
    /// `true` if this is the first time it has been seen (accept),
    /// `false` if it looks like a replay (reject).
    pub fn check_and_record(&mut self, counter: u64, nonce: [u8; 16]) -> bool {
        if counter <= self.high_water_counter && self.high_water_counter != 0 {
            return false;
        }
        if self.recent_nonces.contains(&nonce) {
            return false;
        }
        if self.recent_nonces.len() == self.capacity {
            self.recent_nonces.pop_front();
        }
        self.recent_nonces.push_back(nonce);
        self.high_water_counter = self.high_water_counter.max(counter);
        true
    }
}
