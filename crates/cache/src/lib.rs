//! RFC 7234-compliant HTTP response cache: fingerprint keying, two-tier
//! LRU storage, freshness/staleness classification (including
//! `stale-while-revalidate`), conditional revalidation, and single-flight
//! coalescing of concurrent fetches for the same fingerprint.

mod coalesce;
mod compression;
mod entry;
mod error;
mod freshness;
mod key;
mod store;

pub use coalesce::Coalescer;
pub use compression::{compress, decompress, CompressionError, ContentCoding};
pub use entry::{CacheEntry, PersistedEntry};
pub use error::Error;
pub use freshness::{classify, freshness_lifetime, FreshnessDirectives, Staleness};
pub use key::Fingerprint;
pub use store::{CacheStore, DiskStore, MemoryStore, StoreError, TwoTierStore};

use std::future::Future;
use std::time::SystemTime;

use http::{HeaderMap, Method};
use tracing::{debug, trace, warn};

/// Validators to attach to a conditional (revalidation) request.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    /// `If-None-Match` value, from a stored `ETag`.
    pub if_none_match: Option<String>,
    /// `If-Modified-Since` value, from a stored `Last-Modified`.
    pub if_modified_since: Option<String>,
}

/// What a fetch (or revalidation) attempt produced.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A full response to store and serve.
    Fresh(CacheEntry),
    /// The origin confirmed (304) that the cached copy is still valid;
    /// its freshness metadata should be refreshed from the given
    /// directives without replacing the body.
    NotModified(FreshnessDirectives),
}

/// The HTTP cache facade: ties fingerprinting, freshness classification,
/// storage, and coalescing together into a single `get_or_fetch` entry
/// point the connection layer calls for every cacheable request.
pub struct HttpCache<S: CacheStore> {
    store: S,
    coalescer: Coalescer,
}

impl<S: CacheStore> HttpCache<S> {
    /// Build a cache over `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            coalescer: Coalescer::new(),
        }
    }

    /// Serve `method`/`url` from cache if fresh, coalescing concurrent
    /// callers and invoking `fetch` at most once per miss.
    ///
    /// `fetch(validator)` is called with `Some(validator)` when a
    /// conditional revalidation should be attempted, or `None` for a
    /// fresh unconditional fetch (no cached copy, or no validator
    /// available).
    pub async fn get_or_fetch<F, Fut>(
        &self,
        method: &Method,
        url: &str,
        request_headers: &HeaderMap,
        fetch: F,
    ) -> Result<CacheEntry, Error>
    where
        F: FnOnce(Option<Validator>) -> Fut,
        Fut: Future<Output = Result<FetchOutcome, String>>,
    {
        let key = Fingerprint::compute(method, url, request_headers, &[]);

        if let Some(entry) = self.store.load_entry(&key).await {
            if let Some(entry) = self.try_serve_fresh(&key, entry).await {
                return Ok(entry);
            }
        }

        let guard = self.coalescer.acquire(&key).await;
        if let Some(entry) = self.store.load_entry(&key).await {
            if let Some(entry) = self.try_serve_fresh(&key, entry).await {
                trace!(fingerprint = %key, "served by a concurrent fetch while waiting");
                drop(guard);
                return Ok(entry);
            }
        }

        let request_time = SystemTime::now();
        let existing = self.store.load_entry(&key).await;
        let validator = existing.as_ref().filter(|e| e.has_validator()).map(|e| Validator {
            if_none_match: e.etag.clone(),
            if_modified_since: e.last_modified.clone(),
        });

        let outcome = fetch(validator).await.map_err(Error::Fetch)?;
        let result = match outcome {
            FetchOutcome::Fresh(mut new_entry) => {
                new_entry.request_time = request_time;
                new_entry.response_time = SystemTime::now();
                self.store.save_entry(key.clone(), new_entry.clone()).await?;
                new_entry
            }
            FetchOutcome::NotModified(directives) => {
                let mut refreshed = existing.ok_or_else(|| Error::Fetch("304 with no cached entry to refresh".into()))?;
                refreshed.stored_at = SystemTime::now();
                refreshed.response_time = SystemTime::now();
                refreshed.freshness = directives;
                self.store.save_entry(key.clone(), refreshed.clone()).await?;
                refreshed
            }
        };
        drop(guard);
        Ok(result)
    }

    /// Purge a fingerprint, e.g. after an unsafe method (POST/PUT/DELETE)
    /// invalidates a previously cached representation (RFC 7234 §4.4).
    pub async fn invalidate(&self, method: &Method, url: &str, request_headers: &HeaderMap) {
        let key = Fingerprint::compute(method, url, request_headers, &[]);
        self.store.remove(&key).await;
    }

    /// If `entry` is fresh or within its stale-while-revalidate window,
    /// record the hit (bumping `hit_count`/`last_access`, persisted back
    /// to the store) and return it; `None` if it must be (re)fetched.
    async fn try_serve_fresh(&self, key: &Fingerprint, mut entry: CacheEntry) -> Option<CacheEntry> {
        match freshness::classify(entry.age(SystemTime::now()), &entry.freshness) {
            Staleness::Fresh => debug!("cache hit: fresh"),
            Staleness::StaleWhileRevalidate => debug!("cache hit: serving stale-while-revalidate copy"),
            Staleness::Stale => return None,
        }
        entry.record_hit(SystemTime::now());
        if let Err(err) = self.store.save_entry(key.clone(), entry.clone()).await {
            warn!(fingerprint = %key, %err, "failed to persist updated hit count");
        }
        Some(entry)
    }
}
