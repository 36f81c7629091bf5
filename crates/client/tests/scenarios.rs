//! End-to-end scenarios driven against fake storage/fetchers rather than
//! real sockets, so they are deterministic and fast. Covers the
//! cache-hit, stale-while-revalidate, policy-block, and 0-RTT
//! accept/reject paths through the composed [`nyx_client::NetworkCore`].
//!
//! Flow-control-saturation, GOAWAY-mid-flight stream refusal, and
//! ticket pruning/replay are exercised as unit tests inside
//! `nyx-connection` and `nyx-zero-rtt` directly, where the state they
//! depend on actually lives; re-deriving them here would just be
//! driving the same state machines through an extra layer of
//! indirection.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use http::{HeaderMap, Method, StatusCode};
use nyx_cache::{CacheStore, FetchOutcome, FreshnessDirectives, HttpCache, MemoryStore, Validator};
use nyx_client::{Error, FetchResult, NetworkCore, OriginFetcher, Outcome, ZeroRttResult};
use nyx_policy::{DomainPolicyTable, PolicyGate, ScanThresholds, ScannerKind};
use nyx_zero_rtt::{AesGcmSeal, CryptoSnapshot, Origin, SessionTicket, TicketStore, TransportSnapshot};

struct FakeFetcher {
    calls: AtomicUsize,
    outcome: fn() -> Result<FetchOutcome, String>,
}

impl FakeFetcher {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OriginFetcher for FakeFetcher {
    type Fut<'a> = Pin<Box<dyn Future<Output = Result<FetchResult, Error>> + Send + 'a>> where Self: 'a;

    fn fetch<'a>(
        &'a self,
        _method: &'a Method,
        _url: &'a str,
        _validator: Option<Validator>,
        _early_data: Option<SessionTicket>,
    ) -> Self::Fut<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            (self.outcome)()
                .map(|outcome| FetchResult { outcome, zero_rtt: ZeroRttResult::NotAttempted })
                .map_err(Error::ConnectionClosed)
        })
    }
}

fn no_tickets() -> TicketStore<AesGcmSeal> {
    TicketStore::with_defaults(AesGcmSeal::new(&[0; 32]), None)
}

fn entry(body: &'static str, stored_at: SystemTime, freshness: FreshnessDirectives) -> nyx_cache::CacheEntry {
    nyx_cache::CacheEntry {
        status: StatusCode::OK,
        headers: HeaderMap::new(),
        body: bytes::Bytes::from_static(body.as_bytes()),
        compressed_encoding: None,
        integrity_tag: [0; 16],
        stored_at,
        request_time: stored_at,
        response_time: stored_at,
        hit_count: 0,
        last_access: None,
        freshness,
        vary_headers: Vec::new(),
        etag: Some("\"v1\"".to_string()),
        last_modified: None,
    }
}

#[tokio::test]
async fn scenario_1_cache_hit_with_max_age_produces_no_wire_traffic() {
    let store = MemoryStore::new(100);
    let seeded = entry(
        "hello",
        SystemTime::now() - Duration::from_secs(30),
        FreshnessDirectives {
            max_age: Some(Duration::from_secs(60)),
            ..Default::default()
        },
    );
    let key = nyx_cache::Fingerprint::compute(&Method::GET, "https://example.test/x", &HeaderMap::new(), &[]);
    store.save_entry(key.clone(), seeded).await.unwrap();
    let store_handle = store.clone();

    let fetcher = FakeFetcher {
        calls: AtomicUsize::new(0),
        outcome: || panic!("fetch should not be called on a fresh cache hit"),
    };
    let policy = PolicyGate::new(DomainPolicyTable::Standard, HashSet::new());
    let core = NetworkCore::new(policy, HttpCache::new(store), fetcher, no_tickets());

    let outcome = core.request(&Method::GET, "https://example.test/x", &HeaderMap::new(), &[]).await.unwrap();
    match outcome {
        Outcome::Response(response) => {
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(response.body, bytes::Bytes::from_static(b"hello"));
        }
        Outcome::Blocked(_) => panic!("expected a response"),
    }
    assert_eq!(core.fetcher().calls(), 0);

    let stored = store_handle.load_entry(&key).await.unwrap();
    assert_eq!(stored.hit_count, 1);
}

#[tokio::test]
async fn scenario_2_stale_while_revalidate_serves_the_stale_body_immediately() {
    let store = MemoryStore::new(100);
    let seeded = entry(
        "stale but servable",
        SystemTime::now() - Duration::from_secs(20),
        FreshnessDirectives {
            max_age: Some(Duration::from_secs(10)),
            stale_while_revalidate: Some(Duration::from_secs(60)),
            ..Default::default()
        },
    );
    let key = nyx_cache::Fingerprint::compute(&Method::GET, "https://example.test/y", &HeaderMap::new(), &[]);
    store.save_entry(key, seeded).await.unwrap();

    let fetcher = FakeFetcher {
        calls: AtomicUsize::new(0),
        outcome: || panic!("stale-while-revalidate window should serve without a conditional fetch in this test"),
    };
    let policy = PolicyGate::new(DomainPolicyTable::Standard, HashSet::new());
    let core = NetworkCore::new(policy, HttpCache::new(store), fetcher, no_tickets());

    let outcome = core.request(&Method::GET, "https://example.test/y", &HeaderMap::new(), &[]).await.unwrap();
    match outcome {
        Outcome::Response(response) => {
            assert_eq!(response.body, bytes::Bytes::from_static(b"stale but servable"));
        }
        Outcome::Blocked(_) => panic!("expected a response"),
    }
}

#[tokio::test]
async fn scenario_6_policy_block_opens_no_socket() {
    let fetcher = FakeFetcher {
        calls: AtomicUsize::new(0),
        outcome: || panic!("a blocked request must never reach the fetcher"),
    };
    let strict = ScanThresholds {
        block_severity: 0.1,
        block_confidence: 0.1,
    };
    let policy = PolicyGate::new(DomainPolicyTable::High, HashSet::new()).with_thresholds(strict);
    let core = NetworkCore::new(policy, HttpCache::new(MemoryStore::new(100)), fetcher, no_tickets());

    let chain: Vec<String> = (0..6).map(|i| format!("https://hop{i}.example")).collect();
    let outcome = core.request(&Method::GET, "https://final.example", &HeaderMap::new(), &chain).await.unwrap();
    match outcome {
        Outcome::Blocked(info) => assert_eq!(info.block_type, ScannerKind::RedirectAnalyzer),
        Outcome::Response(_) => panic!("a six-hop redirect chain should clear the analyzer floor"),
    }
    assert_eq!(core.fetcher().calls(), 0);
}

struct RecordingFetcher {
    saw_early_data: std::sync::Mutex<Vec<bool>>,
    zero_rtt: ZeroRttResult,
}

impl OriginFetcher for RecordingFetcher {
    type Fut<'a> = Pin<Box<dyn Future<Output = Result<FetchResult, Error>> + Send + 'a>> where Self: 'a;

    fn fetch<'a>(
        &'a self,
        _method: &'a Method,
        _url: &'a str,
        _validator: Option<Validator>,
        early_data: Option<SessionTicket>,
    ) -> Self::Fut<'a> {
        self.saw_early_data.lock().unwrap().push(early_data.is_some());
        let zero_rtt = self.zero_rtt;
        Box::pin(async move {
            Ok(FetchResult {
                outcome: FetchOutcome::Fresh(entry("zero-rtt body", SystemTime::now(), FreshnessDirectives::default())),
                zero_rtt,
            })
        })
    }
}

fn a_ticket() -> SessionTicket {
    let methods: HashSet<String> = ["GET"].into_iter().map(str::to_string).collect();
    let crypto = CryptoSnapshot {
        cipher_suite: "TLS_AES_128_GCM_SHA256".to_string(),
        tls_version: "TLSv1.3".to_string(),
        alpn: "h3".to_string(),
        cert_hash: [0; 32],
    };
    let transport = TransportSnapshot {
        initial_max_data: 1 << 20,
        initial_max_stream_data: 1 << 16,
        max_idle_timeout_ms: 30_000,
    };
    SessionTicket::new(
        Origin::new("example.test", 443),
        vec![7],
        1,
        1.0,
        Duration::from_secs(3600),
        methods,
        crypto,
        transport,
    )
}

#[tokio::test]
async fn scenario_7_zero_rtt_ticket_is_consumed_once_and_not_replayed() {
    let mut tickets = no_tickets();
    tickets.store(a_ticket());

    let fetcher = RecordingFetcher {
        saw_early_data: std::sync::Mutex::new(Vec::new()),
        zero_rtt: ZeroRttResult::Accepted,
    };
    let policy = PolicyGate::new(DomainPolicyTable::Standard, HashSet::new());
    let core = NetworkCore::new(policy, HttpCache::new(MemoryStore::new(100)), fetcher, tickets);

    core.request(&Method::GET, "https://example.test/a", &HeaderMap::new(), &[]).await.unwrap();
    core.request(&Method::GET, "https://example.test/b", &HeaderMap::new(), &[]).await.unwrap();

    let seen = core.fetcher().saw_early_data.lock().unwrap().clone();
    assert_eq!(seen, vec![true, false]);
}

#[tokio::test]
async fn scenario_8_rejected_zero_rtt_still_serves_a_response() {
    let mut tickets = no_tickets();
    tickets.store(a_ticket());

    let fetcher = RecordingFetcher {
        saw_early_data: std::sync::Mutex::new(Vec::new()),
        zero_rtt: ZeroRttResult::Rejected,
    };
    let policy = PolicyGate::new(DomainPolicyTable::Standard, HashSet::new());
    let core = NetworkCore::new(policy, HttpCache::new(MemoryStore::new(100)), fetcher, tickets);

    let outcome = core.request(&Method::GET, "https://example.test/a", &HeaderMap::new(), &[]).await.unwrap();
    match outcome {
        Outcome::Response(response) => assert_eq!(response.body, bytes::Bytes::from_static(b"zero-rtt body")),
        Outcome::Blocked(_) => panic!("expected a response"),
    }
    assert_eq!(core.fetcher().saw_early_data.lock().unwrap().as_slice(), &[true]);
}
