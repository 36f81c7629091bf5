//! Concurrent-stream admission control.
//!
//! `SETTINGS_MAX_CONCURRENT_STREAMS` caps how many streams either side may
//! have open at once (RFC 7540 §6.5.2). Requests that arrive once the cap
//! is reached queue FIFO; the queue is drained in priority-weight order
//! whenever a slot frees, so request order is preserved except when a
//! higher-priority request is waiting behind a lower one at the same
//! queue position.

use std::collections::VecDeque;

use nyx_proto::StreamId;

#[derive(Debug, Clone, Copy)]
struct Queued {
    stream_id: StreamId,
    weight: u16,
}

/// Gatekeeper for how many streams may be concurrently open.
#[derive(Debug)]
pub struct AdmissionControl {
    limit: Option<u32>,
    active: u32,
    queue: VecDeque<Queued>,
}

impl AdmissionControl {
    /// A gate with `limit` concurrent slots (`None` is unbounded).
    #[must_use]
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            limit,
            active: 0,
            queue: VecDeque::new(),
        }
    }

    /// Update the limit, e.g. on a peer SETTINGS change. Does not evict
    /// already-active streams if the new limit is lower than `active`;
    /// it just stops admitting new ones until usage drops back under it.
    pub fn set_limit(&mut self, limit: Option<u32>) {
        self.limit = limit;
    }

    /// Request a slot for `stream_id`. Returns `true` if admitted
    /// immediately; otherwise the request is queued and `false` is
    /// returned. The caller should wait for a `release` to free a slot
    /// and call [`AdmissionControl::drain_ready`].
    pub fn try_admit(&mut self, stream_id: StreamId, weight: u16) -> bool {
        match self.limit {
            Some(limit) if self.active >= limit => {
                self.queue.push_back(Queued { stream_id, weight });
                false
            }
            _ => {
                self.active += 1;
                true
            }
        }
    }

    /// Release a slot when a stream closes, returning the next admitted
    /// stream id from the queue (highest weight among those waiting
    /// longest), if any were waiting.
    pub fn release(&mut self) -> Option<StreamId> {
        self.active = self.active.saturating_sub(1);
        self.drain_ready()
    }

    /// Admit the best-eligible queued request, if capacity allows.
    pub fn drain_ready(&mut self) -> Option<StreamId> {
        if self.queue.is_empty() {
            return None;
        }
        if let Some(limit) = self.limit {
            if self.active >= limit {
                return None;
            }
        }
        let best_index = self
            .queue
            .iter()
            .enumerate()
            .max_by_key(|(idx, q)| (q.weight, std::cmp::Reverse(*idx)))
            .map(|(idx, _)| idx)?;
        let queued = self.queue.remove(best_index)?;
        self.active += 1;
        Some(queued.stream_id)
    }

    /// Currently active stream count.
    #[must_use]
    pub fn active(&self) -> u32 {
        self.active
    }

    /// Number of requests waiting for a slot.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
