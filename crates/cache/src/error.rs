use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the HTTP cache.
///
/// Per the connection engine's propagation rule, storage faults degrade
/// to a cache miss rather than failing the request; only a fetcher
/// failure (the underlying network fetch itself failing) should reach
/// the caller as an error.
#[derive(Debug, Error)]
pub enum Error {
    /// The injected fetch/revalidate callback failed.
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// A storage-tier fault. Callers that receive this from
    /// [`crate::HttpCache::get_or_fetch`] have already had it logged and
    /// treated as a miss internally; it is only returned when both the
    /// store write *and* the underlying fetch are unavailable.
    #[error(transparent)]
    Store(#[from] StoreError),
}
