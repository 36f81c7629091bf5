//! The ticket store itself: per-origin ranking, replay defense, and
//! encrypted-at-rest persistence.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::{debug, trace, warn};

use crate::aead_seal::AeadSeal;
use crate::error::Error;
use crate::origin::Origin;
use crate::replay::{ReplayGuard, DEFAULT_NONCE_RING_CAPACITY};
use crate::secret_store::SecretStoreHandle;
use crate::ticket::SessionTicket;

/// Default number of precomputed request header blocks to retain per
/// origin (`zero_rtt.precomputed_requests` in `NetworkConfig`).
pub const DEFAULT_PRECOMPUTED_REQUESTS: usize = 8;

/// On-disk persisted form, serialized then sealed before being written.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct Persisted {
    tickets: Vec<SessionTicket>,
}

/// Ranked, replay-guarded store of 0-RTT resumption tickets.
pub struct TicketStore<S: AeadSeal> {
    seal: S,
    tickets: IndexMap<Origin, Vec<SessionTicket>>,
    replay_guards: HashMap<Origin, ReplayGuard>,
    persist_path: Option<PathBuf>,
    replay_window: usize,
}

impl<S: AeadSeal> TicketStore<S> {
    /// A store with no tickets loaded yet, sealing persisted data with
    /// `seal`. If `persist_path` is set, [`TicketStore::load`] /
    /// [`TicketStore::persist`] read and write it. `replay_window` sizes
    /// each origin's nonce ring (`ZeroRttSection::replay_window` in the
    /// network config).
    #[must_use]
    pub fn new(seal: S, persist_path: Option<PathBuf>, replay_window: usize) -> Self {
        Self {
            seal,
            tickets: IndexMap::new(),
            replay_guards: HashMap::new(),
            persist_path,
            replay_window,
        }
    }

    /// A store using the default replay window (128).
    #[must_use]
    pub fn with_defaults(seal: S, persist_path: Option<PathBuf>) -> Self {
        Self::new(seal, persist_path, DEFAULT_NONCE_RING_CAPACITY)
    }

    /// Add a newly issued ticket to the store.
    pub fn store(&mut self, ticket: SessionTicket) {
        let entry = self.tickets.entry(ticket.origin.clone()).or_default();
        entry.push(ticket);
        entry.sort_by(|a, b| b.effective_priority().partial_cmp(&a.effective_priority()).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Borrow the best-ranked, not-yet-replayed ticket for `origin`, if
    /// any. Tickets past their expiry or with three or more recorded
    /// rejections are pruned first and never returned. Returns `None`
    /// (never an error) on a cache miss. The caller should fall back to
    /// a full handshake.
    #[must_use]
    pub fn take_for(&mut self, origin: &Origin) -> Option<SessionTicket> {
        let now = SystemTime::now();
        let tickets = self.tickets.get_mut(origin)?;
        let before = tickets.len();
        tickets.retain(|t| !t.is_expired(now) && !t.is_exhausted());
        if tickets.len() != before {
            debug!(origin = %origin, pruned = before - tickets.len(), "pruned expired or exhausted tickets");
        }
        let replay_window = self.replay_window;
        let guard = self.replay_guards.entry(origin.clone()).or_insert_with(|| ReplayGuard::new(replay_window));
        for ticket in tickets.iter_mut() {
            let nonce = ticket_nonce(ticket);
            if guard.check_and_record(ticket.issued_counter, nonce) {
                ticket.last_used_at = Some(now);
                trace!(origin = %origin, "serving 0-RTT ticket");
                return Some(ticket.clone());
            }
        }
        debug!(origin = %origin, "all tickets for origin were replay-rejected, expired, or exhausted");
        None
    }

    /// Record that a 0-RTT attempt using this ticket was accepted by the
    /// server, improving its ranking.
    pub fn on_accepted(&mut self, origin: &Origin, opaque: &[u8]) {
        self.adjust(origin, opaque, |t| t.accepted_count += 1);
    }

    /// Record that the server rejected 0-RTT and fell back to 1-RTT,
    /// degrading this ticket's ranking.
    pub fn on_rejected(&mut self, origin: &Origin, opaque: &[u8]) {
        self.adjust(origin, opaque, |t| t.rejected_count += 1);
        warn!(origin = %origin, "0-RTT rejected, degrading ticket priority");
    }

    fn adjust(&mut self, origin: &Origin, opaque: &[u8], f: impl FnOnce(&mut SessionTicket)) {
        if let Some(tickets) = self.tickets.get_mut(origin) {
            if let Some(ticket) = tickets.iter_mut().find(|t| t.opaque == opaque) {
                f(ticket);
            }
            tickets.sort_by(|a, b| b.effective_priority().partial_cmp(&a.effective_priority()).unwrap_or(std::cmp::Ordering::Equal));
        }
    }

    /// Number of tickets currently held for `origin`.
    #[must_use]
    pub fn len_for(&self, origin: &Origin) -> usize {
        self.tickets.get(origin).map_or(0, Vec::len)
    }

    /// Serialize, seal, and write the store to its configured path. A
    /// no-op if no path was configured.
    pub async fn persist(&self) -> Result<(), Error> {
        let Some(path) = &self.persist_path else { return Ok(()) };
        let all: Vec<SessionTicket> = self.tickets.values().flatten().cloned().collect();
        let plain = serde_json::to_vec(&Persisted { tickets: all }).map_err(|err| Error::Corrupt(err.to_string()))?;
        let sealed = self.seal.seal(&plain, b"nyx-zero-rtt-store")?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new(".")).to_path_buf();
        let final_path = path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            use std::io::Write;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&sealed)?;
            tmp.persist(&final_path).map_err(|err| Error::Persistence(err.error))?;
            Ok(())
        })
        .await
        .map_err(|err| Error::Corrupt(err.to_string()))??;
        Ok(())
    }

    /// Load and decrypt the store from its configured path, replacing
    /// current in-memory contents. A missing file is treated as an empty
    /// store, not an error.
    pub async fn load(&mut self) -> Result<(), Error> {
        let Some(path) = self.persist_path.clone() else { return Ok(()) };
        let sealed = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(Error::Persistence(err)),
        };
        let plain = self.seal.open(&sealed, b"nyx-zero-rtt-store")?;
        let persisted: Persisted = serde_json::from_slice(&plain).map_err(|err| Error::Corrupt(err.to_string()))?;
        self.tickets.clear();
        for ticket in persisted.tickets {
            self.store(ticket);
        }
        Ok(())
    }
}

fn ticket_nonce(ticket: &SessionTicket) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update(&ticket.opaque);
    hasher.update(ticket.issued_counter.to_be_bytes());
    let digest = hasher.finalize();
    let mut nonce = [0u8; 16];
    nonce.copy_from_slice(&digest[..16]);
    nonce
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::aead_seal::AesGcmSeal;
    use crate::ticket::{CryptoSnapshot, TransportSnapshot};

    fn origin() -> Origin {
        Origin::new("example.com", 443)
    }

    fn crypto() -> CryptoSnapshot {
        CryptoSnapshot {
            cipher_suite: "TLS_AES_128_GCM_SHA256".to_string(),
            tls_version: "TLSv1.3".to_string(),
            alpn: "h3".to_string(),
            cert_hash: [0; 32],
        }
    }

    fn transport() -> TransportSnapshot {
        TransportSnapshot {
            initial_max_data: 1 << 20,
            initial_max_stream_data: 1 << 16,
            max_idle_timeout_ms: 30_000,
        }
    }

    fn ticket(opaque: Vec<u8>, counter: u64, priority: f64) -> SessionTicket {
        let methods = ["GET", "HEAD"].into_iter().map(str::to_string).collect();
        SessionTicket::new(origin(), opaque, counter, priority, Duration::from_secs(86_400), methods, crypto(), transport())
    }

    #[test]
    fn ranking_prefers_higher_effective_priority() {
        let mut store = TicketStore::with_defaults(AesGcmSeal::new(&[1; 32]), None);
        store.store(ticket(vec![1], 1, 1.0));
        store.store(ticket(vec![2], 2, 5.0));
        let best = store.take_for(&origin()).unwrap();
        assert_eq!(best.opaque, vec![2]);
    }

    #[test]
    fn replayed_ticket_is_rejected_on_second_presentation() {
        let mut store = TicketStore::with_defaults(AesGcmSeal::new(&[1; 32]), None);
        store.store(ticket(vec![9], 1, 1.0));
        assert!(store.take_for(&origin()).is_some());
        assert!(store.take_for(&origin()).is_none());
    }

    #[test]
    fn rejection_demotes_ticket_below_a_healthier_one() {
        let mut store = TicketStore::with_defaults(AesGcmSeal::new(&[1; 32]), None);
        store.store(ticket(vec![1], 1, 2.0));
        store.store(ticket(vec![2], 2, 2.0));
        store.on_rejected(&origin(), &[1]);
        let best = store.take_for(&origin()).unwrap();
        assert_eq!(best.opaque, vec![2]);
    }

    #[test]
    fn a_ticket_exhausted_by_three_rejections_is_pruned_on_take() {
        let mut store = TicketStore::with_defaults(AesGcmSeal::new(&[1; 32]), None);
        store.store(ticket(vec![1], 1, 2.0));
        store.on_rejected(&origin(), &[1]);
        store.on_rejected(&origin(), &[1]);
        store.on_rejected(&origin(), &[1]);
        assert!(store.take_for(&origin()).is_none());
        assert_eq!(store.len_for(&origin()), 0);
    }

    #[test]
    fn an_expired_ticket_is_pruned_on_take() {
        let mut store = TicketStore::with_defaults(AesGcmSeal::new(&[1; 32]), None);
        let mut t = ticket(vec![1], 1, 2.0);
        t.expires_at = t.issued_at;
        store.store(t);
        assert!(store.take_for(&origin()).is_none());
    }

    #[test]
    fn taking_a_ticket_records_its_last_used_time() {
        let mut store = TicketStore::with_defaults(AesGcmSeal::new(&[1; 32]), None);
        store.store(ticket(vec![1], 1, 2.0));
        let taken = store.take_for(&origin()).unwrap();
        assert!(taken.last_used_at.is_some());
    }

    #[tokio::test]
    async fn persists_and_reloads_through_encryption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.enc");
        let mut store = TicketStore::with_defaults(AesGcmSeal::new(&[4; 32]), Some(path.clone()));
        store.store(ticket(vec![5, 6], 1, 3.0));
        store.persist().await.unwrap();

        let mut reloaded = TicketStore::with_defaults(AesGcmSeal::new(&[4; 32]), Some(path));
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.len_for(&origin()), 1);
    }

    #[tokio::test]
    async fn load_with_wrong_key_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.enc");
        let mut store = TicketStore::with_defaults(AesGcmSeal::new(&[4; 32]), Some(path.clone()));
        store.store(ticket(vec![5], 1, 3.0));
        store.persist().await.unwrap();

        let mut reloaded = TicketStore::with_defaults(AesGcmSeal::new(&[9; 32]), Some(path));
        assert!(reloaded.load().await.is_err());
    }
}
