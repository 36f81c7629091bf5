//! Bounded retention of recently closed streams.
//!
//! A closed stream id is kept around briefly so that frames the peer
//! sends just before it learns of the closure (a race inherent to
//! RST_STREAM and END_STREAM) can be identified as "for a stream we just
//! closed" rather than "for a stream that never existed". A ring buffer
//! bounds memory under connection churn instead of an unbounded map.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use nyx_proto::StreamId;

/// Tracks closed-stream ids for their grace window.
#[derive(Debug)]
pub struct GraceWindow {
    entries: VecDeque<(StreamId, Instant)>,
    capacity: usize,
    lifetime: Duration,
}

impl GraceWindow {
    /// A window retaining at most `capacity` entries, each valid for
    /// `lifetime` after being recorded.
    #[must_use]
    pub fn new(capacity: usize, lifetime: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            lifetime,
        }
    }

    /// Record that `stream_id` just closed, evicting the oldest entry if
    /// the ring is full.
    pub fn record(&mut self, stream_id: StreamId, now: Instant) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((stream_id, now));
    }

    /// `true` if `stream_id` closed recently enough to still be within
    /// its grace window as of `now`.
    #[must_use]
    pub fn contains(&self, stream_id: StreamId, now: Instant) -> bool {
        self.entries
            .iter()
            .any(|&(id, closed_at)| id == stream_id && now.duration_since(closed_at) <= self.lifetime)
    }

    /// Drop entries whose grace window has elapsed as of `now`.
    pub fn sweep(&mut self, now: Instant) {
        while let Some(&(_, closed_at)) = self.entries.front() {
            if now.duration_since(closed_at) > self.lifetime {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Update the grace lifetime, e.g. as the connection's RTT estimate
    /// changes (`lifetime = 2 * rtt_estimate`).
    pub fn set_lifetime(&mut self, lifetime: Duration) {
        self.lifetime = lifetime;
    }
}
