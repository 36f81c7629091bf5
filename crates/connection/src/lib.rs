//! Connection-level engine: handshake phase, SETTINGS exchange, GOAWAY,
//! PING/RTT sampling, and admission control over the stream table.
//!
//! A `Connection` owns its `Stream`s in an index map keyed by
//! [`StreamId`] and never hands out owning references to them; the
//! priority tree and admission queue reference streams purely by id, so
//! there is no cyclic ownership between a connection and the streams it
//! drives.

mod admission;
mod error;
mod phase;
mod rtt;

pub use admission::AdmissionControl;
pub use error::Error;
pub use phase::{ConnectionPhase, PhaseError};
pub use rtt::RttEstimator;

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use nyx_proto::{Settings, StreamId};
use nyx_stream::{Event, GraceWindow, PriorityInfo, PriorityTree, Stream};
use tracing::{debug, trace, warn};

const DEFAULT_GRACE_LIFETIME: Duration = Duration::from_secs(10);
const GRACE_WINDOW_CAPACITY: usize = 256;
/// RFC 7540 §6.5.1 recommends (and this engine enforces) a SETTINGS
/// response deadline: a peer that never sends its initial SETTINGS is
/// a stuck or malicious peer, not a slow one.
const SETTINGS_TIMEOUT: Duration = Duration::from_secs(30);

/// A single h2 or h3 connection's protocol-level state.
#[derive(Debug)]
pub struct Connection {
    phase: ConnectionPhase,
    local_settings: Settings,
    peer_settings: Settings,
    admission: AdmissionControl,
    rtt: RttEstimator,
    priority: PriorityTree,
    grace: GraceWindow,
    streams: IndexMap<StreamId, Stream>,
    goaway_last_stream_id: Option<StreamId>,
    settings_deadline: Option<Instant>,
}

impl Connection {
    /// A fresh connection with `local_settings` as the SETTINGS we will
    /// advertise.
    #[must_use]
    pub fn new(local_settings: Settings) -> Self {
        Self {
            phase: ConnectionPhase::default(),
            admission: AdmissionControl::new(local_settings.max_concurrent_streams),
            local_settings,
            peer_settings: Settings::default(),
            rtt: RttEstimator::new(),
            priority: PriorityTree::new(),
            grace: GraceWindow::new(GRACE_WINDOW_CAPACITY, DEFAULT_GRACE_LIFETIME),
            streams: IndexMap::new(),
            goaway_last_stream_id: None,
            settings_deadline: None,
        }
    }

    /// Current handshake/lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Mark the preface/transport handshake complete. Arms the SETTINGS
    /// timeout: [`Connection::check_settings_timeout`] must be polled
    /// with the current time until the peer's initial SETTINGS arrives.
    pub fn complete_preface(&mut self, now: Instant) -> Result<(), Error> {
        self.phase.complete_preface()?;
        self.settings_deadline = Some(now + SETTINGS_TIMEOUT);
        Ok(())
    }

    /// Check whether the peer's initial SETTINGS is overdue. If so, the
    /// connection is closed and `Err(Error::SettingsTimeout)` is
    /// returned; otherwise this is a no-op. Harmless to call outside
    /// `AwaitingSettings` (it then always returns `Ok(())`).
    pub fn check_settings_timeout(&mut self, now: Instant) -> Result<(), Error> {
        if self.phase != ConnectionPhase::AwaitingSettings {
            return Ok(());
        }
        let Some(deadline) = self.settings_deadline else {
            return Ok(());
        };
        if now >= deadline {
            warn!("no SETTINGS frame received within the handshake timeout");
            self.close();
            return Err(Error::SettingsTimeout);
        }
        Ok(())
    }

    /// Apply the peer's SETTINGS frame parameters. The first one received
    /// also advances the connection phase to `Active`.
    pub fn apply_peer_settings(&mut self, params: &[(nyx_proto::SettingId, u32)]) -> Result<(), Error> {
        let old_initial_window = self.peer_settings.initial_window_size;
        for &(id, value) in params {
            self.peer_settings.apply(id, value)?;
        }
        if self.peer_settings.initial_window_size != old_initial_window {
            for stream in self.streams.values_mut() {
                stream.adjust_send_initial(old_initial_window, self.peer_settings.initial_window_size)?;
            }
        }
        self.admission.set_limit(self.peer_settings.max_concurrent_streams);
        if self.phase == ConnectionPhase::AwaitingSettings {
            self.phase.receive_initial_settings()?;
            self.settings_deadline = None;
            debug!("connection active after initial SETTINGS exchange");
        }
        Ok(())
    }

    /// Open a new stream, subject to admission control. Returns `Ok(true)`
    /// if the stream was admitted immediately, `Ok(false)` if it was
    /// queued because the concurrency limit was reached.
    pub fn open_stream(&mut self, stream_id: StreamId, priority: Option<PriorityInfo>) -> Result<bool, Error> {
        if !self.phase.can_open_stream() {
            return Err(PhaseError {
                phase: self.phase,
                operation: "open_stream",
            }
            .into());
        }
        if let Some(last) = self.goaway_last_stream_id {
            if stream_id > last {
                return Err(Error::RefusedByGoaway(stream_id));
            }
        }
        if let Some(p) = priority {
            self.priority.set_priority(stream_id, p);
        }
        let weight = priority.map_or(16, |p| p.weight);
        let admitted = self.admission.try_admit(stream_id, weight);
        if admitted {
            self.streams
                .insert(stream_id, Stream::new(stream_id, self.local_settings.initial_window_size));
        }
        Ok(admitted)
    }

    /// Drive `stream_id`'s state machine with `event`.
    pub fn apply_stream_event(&mut self, stream_id: StreamId, event: Event) -> Result<(), Error> {
        if let Some(last) = self.goaway_last_stream_id {
            if stream_id > last {
                return Err(Error::RefusedByGoaway(stream_id));
            }
        }
        let stream = self.streams.get_mut(&stream_id).ok_or(Error::UnknownStream(stream_id))?;
        stream.apply(event)?;
        if stream.state().is_closed() {
            self.close_stream(stream_id, Instant::now());
        }
        Ok(())
    }

    /// Look up a stream, also treating recently-closed ids within their
    /// grace window as "known" (so a late frame for it is not an error).
    #[must_use]
    pub fn stream(&self, stream_id: StreamId) -> Option<&Stream> {
        self.streams.get(&stream_id)
    }

    /// `true` if `stream_id` is either live or within its post-close
    /// grace window.
    #[must_use]
    pub fn is_known_stream(&self, stream_id: StreamId, now: Instant) -> bool {
        self.streams.contains_key(&stream_id) || self.grace.contains(stream_id, now)
    }

    fn close_stream(&mut self, stream_id: StreamId, now: Instant) {
        self.streams.shift_remove(&stream_id);
        self.priority.remove(stream_id);
        self.grace.record(stream_id, now);
        self.grace.set_lifetime(self.rtt.grace_lifetime(DEFAULT_GRACE_LIFETIME));
        if let Some(next) = self.admission.release() {
            trace!(stream_id = next.0, "admission queue drained next stream");
        }
    }

    /// Pick the next ready stream to service, honoring the priority tree.
    #[must_use]
    pub fn schedule(&mut self, ready: &[StreamId]) -> Option<StreamId> {
        self.priority.next_ready(ready)
    }

    /// Record a PING just sent.
    pub fn ping_sent(&mut self, opaque: u64, now: Instant) {
        self.rtt.ping_sent(opaque, now);
    }

    /// Record a PING ACK, returning the sampled round trip if it matched
    /// an outstanding PING.
    pub fn ping_acked(&mut self, opaque: u64, now: Instant) -> Option<Duration> {
        let sample = self.rtt.ping_acked(opaque, now);
        if sample.is_some() {
            self.grace.set_lifetime(self.rtt.grace_lifetime(DEFAULT_GRACE_LIFETIME));
        }
        sample
    }

    /// Current smoothed RTT estimate, if any PING has completed yet.
    #[must_use]
    pub fn rtt_estimate(&self) -> Option<Duration> {
        self.rtt.estimate()
    }

    /// Begin graceful shutdown. `last_stream_id` is the highest stream id
    /// this side will still process.
    pub fn begin_going_away(&mut self, last_stream_id: StreamId) -> Result<(), Error> {
        self.phase.begin_going_away()?;
        self.goaway_last_stream_id = Some(last_stream_id);
        warn!(last_stream_id = last_stream_id.0, "connection going away");
        let now = Instant::now();
        let refused: Vec<StreamId> = self.streams.keys().copied().filter(|id| *id > last_stream_id).collect();
        for stream_id in refused {
            warn!(stream_id = stream_id.0, "stream refused by GOAWAY, failing it");
            self.close_stream(stream_id, now);
        }
        Ok(())
    }

    /// The last stream id announced by a GOAWAY, if one has been sent or
    /// received.
    #[must_use]
    pub fn goaway_last_stream_id(&self) -> Option<StreamId> {
        self.goaway_last_stream_id
    }

    /// Fully tear the connection down.
    pub fn close(&mut self) {
        self.phase.close();
        self.streams.clear();
    }

    /// Current local SETTINGS this side advertises.
    #[must_use]
    pub fn local_settings(&self) -> Settings {
        self.local_settings
    }

    /// The peer's most recently applied SETTINGS.
    #[must_use]
    pub fn peer_settings(&self) -> Settings {
        self.peer_settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_proto::SettingId;

    fn active_connection() -> Connection {
        let mut conn = Connection::new(Settings::default());
        conn.complete_preface(Instant::now()).unwrap();
        conn.apply_peer_settings(&[(SettingId::InitialWindowSize, 65_535)]).unwrap();
        conn
    }

    #[test]
    fn settings_timeout_fires_if_the_peer_never_sends_settings() {
        let mut conn = Connection::new(Settings::default());
        let t0 = Instant::now();
        conn.complete_preface(t0).unwrap();
        assert!(conn.check_settings_timeout(t0 + Duration::from_secs(10)).is_ok());
        let err = conn.check_settings_timeout(t0 + Duration::from_secs(30)).unwrap_err();
        assert!(matches!(err, Error::SettingsTimeout));
        assert_eq!(conn.phase(), ConnectionPhase::Closed);
    }

    #[test]
    fn settings_timeout_never_fires_once_settings_arrived() {
        let mut conn = active_connection();
        assert!(conn.check_settings_timeout(Instant::now() + Duration::from_secs(3600)).is_ok());
        assert_eq!(conn.phase(), ConnectionPhase::Active);
    }

    #[test]
    fn handshake_sequence_reaches_active() {
        let conn = active_connection();
        assert_eq!(conn.phase(), ConnectionPhase::Active);
    }

    #[test]
    fn opening_stream_before_active_is_rejected() {
        let mut conn = Connection::new(Settings::default());
        let err = conn.open_stream(StreamId(1), None).unwrap_err();
        assert!(matches!(err, Error::Phase(_)));
    }

    #[test]
    fn stream_closure_frees_admission_slot_and_starts_grace_window() {
        let mut conn = active_connection();
        conn.admission.set_limit(Some(1));
        assert!(conn.open_stream(StreamId(1), None).unwrap());
        assert!(!conn.open_stream(StreamId(3), None).unwrap());
        conn.apply_stream_event(StreamId(1), Event::SendHeaders { end_stream: true }).unwrap();
        conn.apply_stream_event(StreamId(1), Event::RecvData { end_stream: true }).unwrap();
        assert!(conn.is_known_stream(StreamId(1), Instant::now()));
        assert!(conn.admission.queued() <= 1);
    }

    #[test]
    fn retroactive_window_adjustment_applies_to_open_streams() {
        let mut conn = active_connection();
        conn.open_stream(StreamId(1), None).unwrap();
        conn.apply_stream_event(StreamId(1), Event::SendHeaders { end_stream: false }).unwrap();
        let before = conn.stream(StreamId(1)).unwrap().send_available();
        conn.apply_peer_settings(&[(SettingId::InitialWindowSize, 1_000)]).unwrap();
        let after = conn.stream(StreamId(1)).unwrap().send_available();
        assert_eq!(after, before - (65_535 - 1_000));
    }

    #[test]
    fn retroactive_window_adjustment_past_the_2_31_minus_1_ceiling_is_rejected() {
        let mut conn = active_connection();
        conn.open_stream(StreamId(1), None).unwrap();
        conn.apply_stream_event(StreamId(1), Event::SendHeaders { end_stream: false }).unwrap();
        let err = conn.apply_peer_settings(&[(SettingId::InitialWindowSize, u32::MAX)]).unwrap_err();
        assert!(matches!(err, Error::Stream(nyx_stream::Error::WindowOverflow(_))));
        assert_eq!(err.h2_code(), 0x3);
    }

    #[test]
    fn ping_round_trip_updates_rtt_estimate() {
        let mut conn = active_connection();
        let t0 = Instant::now();
        conn.ping_sent(7, t0);
        let sample = conn.ping_acked(7, t0 + Duration::from_millis(40)).unwrap();
        assert_eq!(sample, Duration::from_millis(40));
        assert!(conn.rtt_estimate().is_some());
    }

    #[test]
    fn begin_going_away_records_last_stream_id() {
        let mut conn = active_connection();
        conn.begin_going_away(StreamId(5)).unwrap();
        assert_eq!(conn.goaway_last_stream_id(), Some(StreamId(5)));
        assert_eq!(conn.phase(), ConnectionPhase::GoingAway);
    }

    #[test]
    fn goaway_fails_a_stream_already_open_above_the_last_stream_id() {
        let mut conn = active_connection();
        conn.open_stream(StreamId(7), None).unwrap();
        conn.apply_stream_event(StreamId(7), Event::SendHeaders { end_stream: false }).unwrap();

        conn.begin_going_away(StreamId(5)).unwrap();

        let err = conn.apply_stream_event(StreamId(7), Event::SendData { end_stream: true }).unwrap_err();
        assert!(matches!(err, Error::RefusedByGoaway(StreamId(7))));
        assert_eq!(err.h2_code(), 0x7);
    }

    #[test]
    fn goaway_rejects_opening_a_new_stream_above_the_last_stream_id() {
        let mut conn = active_connection();
        conn.begin_going_away(StreamId(5)).unwrap();
        let err = conn.open_stream(StreamId(9), None).unwrap_err();
        assert!(matches!(err, Error::RefusedByGoaway(StreamId(9))));
    }

    #[test]
    fn goaway_does_not_disturb_streams_at_or_below_the_last_stream_id() {
        let mut conn = active_connection();
        conn.open_stream(StreamId(3), None).unwrap();
        conn.begin_going_away(StreamId(5)).unwrap();
        conn.apply_stream_event(StreamId(3), Event::SendHeaders { end_stream: true }).unwrap();
    }
}
