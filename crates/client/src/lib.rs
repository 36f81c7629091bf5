//! Request façade: wires the policy gateway, HTTP cache, 0-RTT ticket
//! store, and connection/stream engine into the single entry point an
//! embedding browser process links against.

mod config;
mod error;

pub use config::{CacheSection, NetworkConfig, NetworkSection, PolicyLevelConfig, PolicySection, ZeroRttSection};
pub use error::Error;

use std::future::Future;

use bytes::Bytes;
use http::{HeaderMap, Method};
use nyx_cache::{CacheStore, FetchOutcome, HttpCache, Validator};
use nyx_policy::{Decision, PolicyGate, RequestContext, RequestType, ScannerKind};
use nyx_zero_rtt::{AeadSeal, Origin, SessionTicket, TicketStore};
use tracing::{info, warn};

/// A response that made it through the policy gate and the cache.
#[derive(Debug, Clone)]
pub struct ResponseParts {
    /// Stored/returned status code.
    pub status: http::StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

/// A request rejected by the policy gate before any socket was opened.
#[derive(Debug, Clone)]
pub struct BlockInfo {
    /// Which rule category matched.
    pub block_type: ScannerKind,
    /// Human-readable reason, for logging/diagnostics.
    pub reason: String,
}

/// What a request produced: either a response, or a distinguished block.
/// A policy block is a normal outcome here, not an error.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The request completed (from cache or the network).
    Response(ResponseParts),
    /// The policy gate rejected the request outright.
    Blocked(BlockInfo),
}

/// What became of an early-data (0-RTT) attempt on a single fetch, so the
/// façade can feed the outcome back into the ticket store's ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroRttResult {
    /// No ticket was offered (no stored ticket, or the method is not
    /// 0-RTT eligible), so nothing to report.
    NotAttempted,
    /// The server accepted the early data.
    Accepted,
    /// The server rejected the early data and fell back to a 1-RTT
    /// handshake; the request still completed.
    Rejected,
}

/// An [`OriginFetcher`] call's full result: the fetched/revalidated
/// content, plus what happened to any early-data attempt.
#[derive(Debug)]
pub struct FetchResult {
    /// The content fetched or confirmed not-modified.
    pub outcome: FetchOutcome,
    /// What became of the `early_data` ticket passed into this call.
    pub zero_rtt: ZeroRttResult,
}

/// Performs the actual network fetch (or conditional revalidation) for a
/// request the cache could not satisfy locally. Implementations own the
/// connection/stream engine and frame codec; this crate only calls
/// through the trait, so tests can inject an in-memory fake transport.
pub trait OriginFetcher: Send + Sync {
    /// The future returned by [`OriginFetcher::fetch`].
    type Fut<'a>: Future<Output = Result<FetchResult, Error>> + 'a
    where
        Self: 'a;

    /// Fetch `method`/`url`. `validator`, if present, should be attached
    /// as `If-None-Match`/`If-Modified-Since` for a conditional request.
    /// `early_data`, if present, is a resumption ticket the caller may
    /// use to attempt 0-RTT; the returned [`FetchResult::zero_rtt`]
    /// reports what happened to that attempt.
    fn fetch<'a>(
        &'a self,
        method: &'a Method,
        url: &'a str,
        validator: Option<Validator>,
        early_data: Option<SessionTicket>,
    ) -> Self::Fut<'a>;
}

/// Request methods eligible to carry 0-RTT early data (idempotent-only,
/// matching `ZeroRttSection::allowed_methods`'s default).
fn is_zero_rtt_eligible(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// The origin a URL resolves to, for ticket-store lookups. `None` for an
/// unparseable URL or one with no host, in which case 0-RTT is simply
/// skipped rather than failing the request.
fn origin_of(url: &str) -> Option<Origin> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let port = parsed.port_or_known_default()?;
    Some(Origin::new(host, port))
}

/// Translate a fetch failure into the façade's error type, upgrading a
/// GOAWAY-refused stream into [`Error::RetriableConnectionClosed`] so
/// callers know it is safe to retry on a new connection.
fn translate_fetch_error(err: Error) -> Error {
    match &err {
        Error::Connection(nyx_connection::Error::RefusedByGoaway(_)) => Error::RetriableConnectionClosed(err.to_string()),
        _ => err,
    }
}

/// The composed network core: policy gate in front of the cache, in
/// front of an injected [`OriginFetcher`], with a 0-RTT ticket store
/// consulted and updated around every fetch.
pub struct NetworkCore<S: CacheStore, F: OriginFetcher, Z: AeadSeal> {
    policy: PolicyGate,
    cache: HttpCache<S>,
    fetcher: F,
    tickets: tokio::sync::Mutex<TicketStore<Z>>,
}

impl<S: CacheStore, F: OriginFetcher, Z: AeadSeal> NetworkCore<S, F, Z> {
    /// Compose a core from its layers.
    #[must_use]
    pub fn new(policy: PolicyGate, cache: HttpCache<S>, fetcher: F, tickets: TicketStore<Z>) -> Self {
        Self {
            policy,
            cache,
            fetcher,
            tickets: tokio::sync::Mutex::new(tickets),
        }
    }

    /// The injected fetcher, for inspecting call counts in tests.
    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Drive one request through policy admission, the cache, and (on a
    /// miss or stale entry) the injected fetcher. `redirect_chain` is the
    /// navigation's prior hops, oldest first, for the policy gate's
    /// redirect-analyzer scanner; pass `&[]` for a direct request.
    pub async fn request(
        &self,
        method: &Method,
        url: &str,
        request_headers: &HeaderMap,
        redirect_chain: &[String],
    ) -> Result<Outcome, Error> {
        let ctx = RequestContext {
            url,
            referrer: request_headers.get(http::header::REFERER).and_then(|v| v.to_str().ok()),
            request_type: RequestType::Navigation,
            redirect_chain,
        };

        let header_rewrites = match self.policy.evaluate(&ctx) {
            Decision::Block { reason, block_type } => {
                warn!(%url, ?block_type, %reason, "policy gate blocked request");
                return Ok(Outcome::Blocked(BlockInfo { block_type, reason }));
            }
            Decision::Allow { header_rewrites } => header_rewrites,
        };

        let origin = origin_of(url);
        let early_data = match &origin {
            Some(origin) if is_zero_rtt_eligible(method) => self.tickets.lock().await.take_for(origin),
            _ => None,
        };

        let fetcher = &self.fetcher;
        let zero_rtt_outcome = std::sync::Mutex::new(ZeroRttResult::NotAttempted);
        let fetch_error: std::sync::Mutex<Option<Error>> = std::sync::Mutex::new(None);

        let cache_result = self
            .cache
            .get_or_fetch(method, url, request_headers, |validator| {
                let early_data = early_data.clone();
                async move {
                    match fetcher.fetch(method, url, validator, early_data).await {
                        Ok(result) => {
                            *zero_rtt_outcome.lock().unwrap() = result.zero_rtt;
                            Ok(result.outcome)
                        }
                        Err(err) => {
                            let rendered = err.to_string();
                            *fetch_error.lock().unwrap() = Some(err);
                            Err(rendered)
                        }
                    }
                }
            })
            .await;

        if let (Some(origin), Some(ticket)) = (&origin, &early_data) {
            match zero_rtt_outcome.into_inner().unwrap() {
                ZeroRttResult::Accepted => self.tickets.lock().await.on_accepted(origin, &ticket.opaque),
                ZeroRttResult::Rejected => self.tickets.lock().await.on_rejected(origin, &ticket.opaque),
                ZeroRttResult::NotAttempted => {}
            }
        }

        let entry = match cache_result {
            Ok(entry) => entry,
            Err(nyx_cache::Error::Fetch(_)) => {
                let err = fetch_error.into_inner().unwrap().unwrap_or_else(|| Error::ConnectionClosed("origin fetch failed".into()));
                return Err(translate_fetch_error(err));
            }
            Err(other) => return Err(Error::Cache(other)),
        };

        let mut headers = entry.headers.clone();
        for (name, value) in header_rewrites.iter() {
            headers.insert(name.clone(), value.clone());
        }

        info!(%url, status = entry.status.as_u16(), "request served");
        Ok(Outcome::Response(ResponseParts {
            status: entry.status,
            headers,
            body: entry.body,
        }))
    }
}
