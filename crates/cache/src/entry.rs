use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use crate::compression::ContentCoding;
use crate::freshness::FreshnessDirectives;

/// A single cached HTTP response, with enough metadata to compute
/// freshness and drive conditional revalidation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Stored status code.
    pub status: StatusCode,
    /// Stored response headers, exactly as received.
    pub headers: HeaderMap,
    /// Stored body, already decompressed into memory-tier form.
    pub body: Bytes,
    /// Compression applied when this entry sits in the disk tier; `None`
    /// once loaded into the memory tier as plain bytes.
    pub compressed_encoding: Option<ContentCoding>,
    /// AEAD authentication tag covering the stored (possibly compressed)
    /// body, when persisted to the disk tier.
    pub integrity_tag: [u8; 16],
    /// Wall-clock time this entry was stored.
    pub stored_at: SystemTime,
    /// When the request that produced this entry was issued (RFC 7234
    /// §4.2.3's `request_time`, used for age calculation relative to a
    /// slow origin round trip).
    pub request_time: SystemTime,
    /// When the response that produced (or last revalidated) this entry
    /// was received (RFC 7234 §4.2.3's `response_time`). Updated on every
    /// 304 revalidation, independent of `stored_at`.
    pub response_time: SystemTime,
    /// Number of times this entry has been served from cache (a fresh or
    /// stale-while-revalidate hit), not counting the fetch that created
    /// it.
    pub hit_count: u64,
    /// The last time this entry was served from cache, if ever.
    pub last_access: Option<SystemTime>,
    /// Parsed freshness-relevant `Cache-Control` directives.
    pub freshness: FreshnessDirectives,
    /// The response header names this origin's `Vary` asked to be
    /// projected into the cache key for this entry's URL.
    pub vary_headers: Vec<String>,
    /// `ETag`, if present, for conditional revalidation.
    pub etag: Option<String>,
    /// `Last-Modified`, if present, for conditional revalidation.
    pub last_modified: Option<String>,
}

impl CacheEntry {
    /// How long ago this entry was stored, relative to `now`.
    #[must_use]
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.stored_at).unwrap_or(Duration::ZERO)
    }

    /// `true` if this entry carries a validator usable for a conditional
    /// revalidation request.
    #[must_use]
    pub fn has_validator(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }

    /// Record a cache-served hit: bumps the hit counter and stamps the
    /// access time.
    pub fn record_hit(&mut self, now: SystemTime) {
        self.hit_count += 1;
        self.last_access = Some(now);
    }
}

/// On-disk representation: the body stays compressed and sealed; this is
/// what actually gets written under the cache directory.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedEntry {
    /// See [`CacheEntry::status`].
    pub status: u16,
    /// Serialized header name/value pairs (headers may repeat a name).
    pub headers: Vec<(String, Vec<u8>)>,
    /// Sealed (AEAD-encrypted), compressed body bytes.
    pub sealed_body: Vec<u8>,
    /// See [`CacheEntry::compressed_encoding`].
    pub compressed_encoding: ContentCoding,
    /// Seconds since the Unix epoch.
    pub stored_at_unix: u64,
    /// See [`CacheEntry::request_time`]; seconds since the Unix epoch.
    pub request_time_unix: u64,
    /// See [`CacheEntry::response_time`]; seconds since the Unix epoch.
    pub response_time_unix: u64,
    /// See [`CacheEntry::hit_count`].
    pub hit_count: u64,
    /// See [`CacheEntry::last_access`]; seconds since the Unix epoch.
    pub last_access_unix: Option<u64>,
    /// See [`CacheEntry::freshness`].
    pub max_age_secs: Option<u64>,
    /// See [`CacheEntry::freshness`].
    pub stale_while_revalidate_secs: Option<u64>,
    /// See [`CacheEntry::freshness`].
    pub must_revalidate: bool,
    /// See [`CacheEntry::vary_headers`].
    pub vary_headers: Vec<String>,
    /// See [`CacheEntry::etag`].
    pub etag: Option<String>,
    /// See [`CacheEntry::last_modified`].
    pub last_modified: Option<String>,
}
