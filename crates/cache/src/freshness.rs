//! RFC 7234 §4.2 freshness calculation and staleness classification.

use std::time::Duration;

/// Cache-control directives relevant to freshness, parsed once at store
/// time so every later freshness check is pure arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshnessDirectives {
    /// `max-age` from the response's `Cache-Control`, if present.
    pub max_age: Option<Duration>,
    /// `s-maxage`, used instead of `max_age` by shared caches; this crate
    /// treats itself as a private cache and ignores it, but it is parsed
    /// so a future shared-cache mode can use it.
    pub s_maxage: Option<Duration>,
    /// `stale-while-revalidate`: how long past expiry a stale response
    /// may still be served while a revalidation happens in the
    /// background.
    pub stale_while_revalidate: Option<Duration>,
    /// `no-cache`: may be stored, but must be revalidated before reuse.
    pub no_cache: bool,
    /// `no-store`: must not be stored at all.
    pub no_store: bool,
    /// `must-revalidate`: once stale, must not be served without
    /// successful revalidation, even to tolerate a disconnected origin.
    pub must_revalidate: bool,
}

/// How fresh a stored entry is right now.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Staleness {
    /// May be served as-is.
    Fresh,
    /// Expired, but within its `stale-while-revalidate` window: may be
    /// served immediately while a background revalidation is kicked off.
    StaleWhileRevalidate,
    /// Expired and must be revalidated (conditionally, via
    /// `If-None-Match`/`If-Modified-Since`) before reuse.
    Stale,
}

/// Compute freshness lifetime per RFC 7234 §4.2.1: `s-maxage` (shared
/// caches only; unused here), else `max-age`, else derived from
/// `Expires` minus `Date` (already folded into `directives.max_age` by
/// the caller if that is how it was parsed), else a heuristic of zero
/// (conservatively requires revalidation) when no explicit instruction
/// and no `Last-Modified` heuristic is implemented.
#[must_use]
pub fn freshness_lifetime(directives: &FreshnessDirectives) -> Duration {
    directives.max_age.unwrap_or(Duration::ZERO)
}

/// Classify staleness given how long ago the response was stored
/// (`age`), its freshness lifetime, and its directives.
#[must_use]
pub fn classify(age: Duration, directives: &FreshnessDirectives) -> Staleness {
    let lifetime = freshness_lifetime(directives);
    if age <= lifetime {
        return Staleness::Fresh;
    }
    if directives.must_revalidate {
        return Staleness::Stale;
    }
    if let Some(swr) = directives.stale_while_revalidate {
        if age <= lifetime + swr {
            return Staleness::StaleWhileRevalidate;
        }
    }
    Staleness::Stale
}
