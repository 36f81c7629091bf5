//! PING round-trip sampling and an exponentially-weighted moving average
//! RTT estimate.
//!
//! The estimate feeds the 0-RTT ticket store's ranking and the stream
//! grace window's lifetime (`lifetime = 2 * rtt_estimate`).

use std::time::{Duration, Instant};

/// Smoothing factor applied to each new sample, matching the weight TCP's
/// SRTT estimator (RFC 6298) gives a fresh sample.
const ALPHA: f64 = 0.125;

/// Tracks outstanding PINGs by their opaque payload and maintains a
/// smoothed RTT estimate from the round trips observed.
#[derive(Debug)]
pub struct RttEstimator {
    outstanding: Vec<(u64, Instant)>,
    estimate: Option<Duration>,
}

impl RttEstimator {
    /// A fresh estimator with no samples yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            outstanding: Vec::new(),
            estimate: None,
        }
    }

    /// Record that a PING with `opaque` was just sent at `now`.
    pub fn ping_sent(&mut self, opaque: u64, now: Instant) {
        self.outstanding.push((opaque, now));
    }

    /// Record that a PING ACK with `opaque` arrived at `now`, updating
    /// the smoothed estimate. Returns the sampled RTT, or `None` if
    /// `opaque` does not match any outstanding PING (a spurious or
    /// duplicate ACK).
    pub fn ping_acked(&mut self, opaque: u64, now: Instant) -> Option<Duration> {
        let index = self.outstanding.iter().position(|&(id, _)| id == opaque)?;
        let (_, sent_at) = self.outstanding.remove(index);
        let sample = now.saturating_duration_since(sent_at);
        self.estimate = Some(match self.estimate {
            Some(prev) => prev.mul_f64(1.0 - ALPHA) + sample.mul_f64(ALPHA),
            None => sample,
        });
        Some(sample)
    }

    /// The current smoothed estimate, if at least one sample has landed.
    #[must_use]
    pub fn estimate(&self) -> Option<Duration> {
        self.estimate
    }

    /// A grace-window lifetime derived from the current estimate, falling
    /// back to `default` before any sample has been taken.
    #[must_use]
    pub fn grace_lifetime(&self, default: Duration) -> Duration {
        self.estimate.map_or(default, |rtt| rtt * 2)
    }
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}
