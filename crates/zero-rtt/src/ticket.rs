use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::origin::Origin;

/// A header block precomputed while a connection was idle, ready to send
/// the instant a 0-RTT connection opens.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct PrecomputedRequest {
    /// Request path this block was computed for.
    pub path: String,
    /// Pre-encoded header block, ready to carry in a HEADERS frame.
    pub header_block: Vec<u8>,
}

/// The negotiated crypto parameters in effect when a ticket was issued.
/// Resumption is only attempted against a server that would still agree
/// to these, so the handshake layer can fail 0-RTT fast on a mismatch
/// instead of discovering it mid-handshake.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct CryptoSnapshot {
    /// Negotiated cipher suite, e.g. `TLS_AES_128_GCM_SHA256`.
    pub cipher_suite: String,
    /// Negotiated TLS version, e.g. `TLSv1.3`.
    pub tls_version: String,
    /// Negotiated ALPN protocol, e.g. `h3` or `h2`.
    pub alpn: String,
    /// SHA-256 of the server's leaf certificate at issuance.
    pub cert_hash: [u8; 32],
}

/// The transport parameters the server advertised alongside the ticket,
/// snapshotted so early data can be shaped to limits the server is known
/// to have accepted before.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct TransportSnapshot {
    /// Maximum data the server permitted across the whole connection.
    pub initial_max_data: u64,
    /// Maximum data the server permitted on a single stream.
    pub initial_max_stream_data: u64,
    /// Server's advertised idle timeout.
    pub max_idle_timeout_ms: u64,
}

/// A stored resumption ticket for a single origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTicket {
    /// The origin this ticket resumes a session for.
    pub origin: Origin,
    /// Opaque resumption material handed to the TLS/QUIC stack.
    pub opaque: Vec<u8>,
    /// Replay-defense counter at the time this ticket was issued.
    pub issued_counter: u64,
    /// Base priority assigned at issuance (e.g. by recency or server
    /// hint); ranking multiplies this by the observed success rate.
    pub base_priority: f64,
    /// Accepted 0-RTT attempts using tickets derived from this one.
    pub accepted_count: u64,
    /// Rejected (fell back to 1-RTT) attempts.
    pub rejected_count: u64,
    /// Precomputed request header blocks for this origin.
    pub precomputed: Vec<PrecomputedRequest>,
    /// When this ticket was issued by the server.
    pub issued_at: SystemTime,
    /// When this ticket stops being usable. Always strictly after
    /// `issued_at`.
    pub expires_at: SystemTime,
    /// The last time a 0-RTT attempt was made with this ticket.
    pub last_used_at: Option<SystemTime>,
    /// Request methods this ticket may carry as early data. Mirrors
    /// `ZeroRttSection::allowed_methods` at issuance time, so a later
    /// config change doesn't retroactively loosen an already-issued
    /// ticket's scope.
    pub allowed_methods: HashSet<String>,
    /// Crypto parameters in effect when the ticket was issued.
    pub crypto: CryptoSnapshot,
    /// Transport parameters the server advertised alongside the ticket.
    pub transport: TransportSnapshot,
}

impl SessionTicket {
    /// A freshly issued ticket with no usage history yet, valid for `ttl`
    /// starting now.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        origin: Origin,
        opaque: Vec<u8>,
        issued_counter: u64,
        base_priority: f64,
        ttl: Duration,
        allowed_methods: HashSet<String>,
        crypto: CryptoSnapshot,
        transport: TransportSnapshot,
    ) -> Self {
        let issued_at = SystemTime::now();
        Self {
            origin,
            opaque,
            issued_counter,
            base_priority,
            accepted_count: 0,
            rejected_count: 0,
            precomputed: Vec::new(),
            issued_at,
            expires_at: issued_at + ttl,
            last_used_at: None,
            allowed_methods,
            crypto,
            transport,
        }
    }

    /// Observed 0-RTT success rate, `1.0` until any attempt has been
    /// recorded (an untested ticket is given the benefit of the doubt).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.accepted_count + self.rejected_count;
        if total == 0 {
            1.0
        } else {
            self.accepted_count as f64 / total as f64
        }
    }

    /// The ranking key used to pick among multiple tickets for the same
    /// origin: `base_priority * success_rate`.
    #[must_use]
    pub fn effective_priority(&self) -> f64 {
        self.base_priority * self.success_rate()
    }

    /// `true` once `now` has passed `expires_at`; an expired ticket is
    /// unusable regardless of its rejection count.
    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    /// `true` once three 0-RTT attempts using this ticket have been
    /// rejected by the server; a ticket this unreliable is retired
    /// rather than kept around to keep losing races against a plain
    /// 1-RTT handshake.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.rejected_count >= 3
    }

    /// `true` if `method` is within this ticket's early-data scope.
    #[must_use]
    pub fn allows_method(&self, method: &str) -> bool {
        self.allowed_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}
