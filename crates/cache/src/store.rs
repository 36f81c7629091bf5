//! Two-tier storage: an in-memory `moka` LRU backed by a content-addressed
//! disk tier. A lookup that misses memory but hits disk promotes the
//! entry back into memory.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use moka::future::Cache as MokaCache;
use nyx_zero_rtt::AeadSeal;
use thiserror::Error;
use tracing::{trace, warn};

use crate::compression::{self, ContentCoding};
use crate::entry::{CacheEntry, PersistedEntry};
use crate::freshness::FreshnessDirectives;
use crate::key::Fingerprint;

/// Errors raised by the storage tiers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The disk tier's I/O failed.
    #[error("disk tier I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The persisted entry's metadata could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Decryption of a persisted entry failed (tampering or wrong key).
    #[error("cache entry decryption failed")]
    DecryptionFailed,
    /// Decompression of a persisted entry failed.
    #[error("decompression error: {0}")]
    Decompression(#[from] crate::compression::CompressionError),
}

/// Asynchronous storage backend for cache entries, split between
/// in-memory and durable tiers.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a stored entry, if present.
    async fn load_entry(&self, key: &Fingerprint) -> Option<CacheEntry>;
    /// Store (or overwrite) an entry.
    async fn save_entry(&self, key: Fingerprint, entry: CacheEntry) -> Result<(), StoreError>;
    /// Remove an entry, e.g. after an unsafe method invalidates it.
    async fn remove(&self, key: &Fingerprint);
}

/// In-memory LRU tier, a thin wrapper over `moka::future::Cache`.
#[derive(Clone)]
pub struct MemoryStore {
    inner: MokaCache<Fingerprint, CacheEntry>,
}

impl MemoryStore {
    /// A memory tier holding at most `max_capacity` entries.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: MokaCache::builder().max_capacity(max_capacity).build(),
        }
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn load_entry(&self, key: &Fingerprint) -> Option<CacheEntry> {
        self.inner.get(key).await
    }

    async fn save_entry(&self, key: Fingerprint, entry: CacheEntry) -> Result<(), StoreError> {
        self.inner.insert(key, entry).await;
        Ok(())
    }

    async fn remove(&self, key: &Fingerprint) {
        self.inner.invalidate(key).await;
    }
}

/// Disk tier: one sealed, compressed file per fingerprint under
/// `directory`, named by the fingerprint's hex digest.
pub struct DiskStore<S: AeadSeal> {
    directory: PathBuf,
    seal: S,
    coding: ContentCoding,
}

impl<S: AeadSeal> DiskStore<S> {
    /// A disk tier rooted at `directory`, sealing entries with `seal` and
    /// compressing bodies with `coding`.
    #[must_use]
    pub fn new(directory: PathBuf, seal: S, coding: ContentCoding) -> Self {
        Self { directory, seal, coding }
    }

    fn path_for(&self, key: &Fingerprint) -> PathBuf {
        self.directory.join(key.to_hex())
    }
}

#[async_trait::async_trait]
impl<S: AeadSeal + 'static> CacheStore for DiskStore<S> {
    async fn load_entry(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let sealed = tokio::fs::read(&path).await.ok()?;
        let plain = match self.seal.open(&sealed, key.to_hex().as_bytes()) {
            Ok(plain) => plain,
            Err(_) => {
                warn!(fingerprint = %key, "disk cache entry failed integrity check");
                return None;
            }
        };
        let persisted: PersistedEntry = serde_json::from_slice(&plain).ok()?;
        let body = compression::decompress(&persisted.sealed_body, persisted.compressed_encoding).ok()?;
        let mut headers = HeaderMap::new();
        for (name, value) in &persisted.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_bytes(value)) {
                headers.append(name, value);
            }
        }
        Some(CacheEntry {
            status: StatusCode::from_u16(persisted.status).unwrap_or(StatusCode::OK),
            headers,
            body,
            compressed_encoding: None,
            integrity_tag: [0; 16],
            stored_at: SystemTime::UNIX_EPOCH + Duration::from_secs(persisted.stored_at_unix),
            request_time: SystemTime::UNIX_EPOCH + Duration::from_secs(persisted.request_time_unix),
            response_time: SystemTime::UNIX_EPOCH + Duration::from_secs(persisted.response_time_unix),
            hit_count: persisted.hit_count,
            last_access: persisted.last_access_unix.map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
            freshness: FreshnessDirectives {
                max_age: persisted.max_age_secs.map(Duration::from_secs),
                s_maxage: None,
                stale_while_revalidate: persisted.stale_while_revalidate_secs.map(Duration::from_secs),
                no_cache: false,
                no_store: false,
                must_revalidate: persisted.must_revalidate,
            },
            vary_headers: persisted.vary_headers,
            etag: persisted.etag,
            last_modified: persisted.last_modified,
        })
    }

    async fn save_entry(&self, key: Fingerprint, entry: CacheEntry) -> Result<(), StoreError> {
        let compressed = compression::compress(&entry.body, self.coding)?;
        let headers = entry
            .headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.as_bytes().to_vec()))
            .collect();
        let unix_secs = |t: SystemTime| t.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_secs();
        let stored_at_unix = unix_secs(entry.stored_at);
        let persisted = PersistedEntry {
            status: entry.status.as_u16(),
            headers,
            sealed_body: compressed.to_vec(),
            compressed_encoding: self.coding,
            stored_at_unix,
            request_time_unix: unix_secs(entry.request_time),
            response_time_unix: unix_secs(entry.response_time),
            hit_count: entry.hit_count,
            last_access_unix: entry.last_access.map(unix_secs),
            max_age_secs: entry.freshness.max_age.map(|d| d.as_secs()),
            stale_while_revalidate_secs: entry.freshness.stale_while_revalidate.map(|d| d.as_secs()),
            must_revalidate: entry.freshness.must_revalidate,
            vary_headers: entry.vary_headers,
            etag: entry.etag,
            last_modified: entry.last_modified,
        };
        let plain = serde_json::to_vec(&persisted)?;
        let sealed = self
            .seal
            .seal(&plain, key.to_hex().as_bytes())
            .map_err(|_| StoreError::DecryptionFailed)?;
        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.path_for(&key);
        let dir = self.directory.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            use std::io::Write;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&sealed)?;
            tmp.persist(&path).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;
        Ok(())
    }

    async fn remove(&self, key: &Fingerprint) {
        let _ = tokio::fs::remove_file(self.path_for(key)).await;
        trace!(fingerprint = %key, "disk cache entry removed");
    }
}

/// A memory tier backed by a disk tier: reads promote disk hits back
/// into memory; writes go to both.
pub struct TwoTierStore<S: AeadSeal> {
    memory: MemoryStore,
    disk: DiskStore<S>,
}

impl<S: AeadSeal> TwoTierStore<S> {
    /// Compose a memory tier and a disk tier.
    #[must_use]
    pub fn new(memory: MemoryStore, disk: DiskStore<S>) -> Self {
        Self { memory, disk }
    }
}

#[async_trait::async_trait]
impl<S: AeadSeal + 'static> CacheStore for TwoTierStore<S> {
    async fn load_entry(&self, key: &Fingerprint) -> Option<CacheEntry> {
        if let Some(entry) = self.memory.load_entry(key).await {
            return Some(entry);
        }
        let entry = self.disk.load_entry(key).await?;
        trace!(fingerprint = %key, "promoting disk cache hit into memory tier");
        let _ = self.memory.save_entry(key.clone(), entry.clone()).await;
        Some(entry)
    }

    async fn save_entry(&self, key: Fingerprint, entry: CacheEntry) -> Result<(), StoreError> {
        self.memory.save_entry(key.clone(), entry.clone()).await?;
        self.disk.save_entry(key, entry).await
    }

    async fn remove(&self, key: &Fingerprint) {
        self.memory.remove(key).await;
        self.disk.remove(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_zero_rtt::AesGcmSeal;

    fn sample_entry() -> CacheEntry {
        CacheEntry {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: bytes::Bytes::from_static(b"hello cache"),
            compressed_encoding: None,
            integrity_tag: [0; 16],
            stored_at: SystemTime::now(),
            request_time: SystemTime::now(),
            response_time: SystemTime::now(),
            hit_count: 0,
            last_access: None,
            freshness: FreshnessDirectives {
                max_age: Some(Duration::from_secs(60)),
                ..Default::default()
            },
            vary_headers: Vec::new(),
            etag: Some("\"abc\"".to_string()),
            last_modified: None,
        }
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new(100);
        let key = Fingerprint::compute(&http::Method::GET, "https://example.com", &HeaderMap::new(), &[]);
        store.save_entry(key.clone(), sample_entry()).await.unwrap();
        let loaded = store.load_entry(&key).await.unwrap();
        assert_eq!(loaded.body, sample_entry().body);
    }

    #[tokio::test]
    async fn disk_store_round_trip_through_encryption_and_compression() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf(), AesGcmSeal::new(&[1; 32]), ContentCoding::Gzip);
        let key = Fingerprint::compute(&http::Method::GET, "https://example.com", &HeaderMap::new(), &[]);
        store.save_entry(key.clone(), sample_entry()).await.unwrap();
        let loaded = store.load_entry(&key).await.unwrap();
        assert_eq!(loaded.body, sample_entry().body);
        assert_eq!(loaded.etag, Some("\"abc\"".to_string()));
    }

    #[tokio::test]
    async fn two_tier_promotes_disk_hits_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let memory = MemoryStore::new(100);
        let disk = DiskStore::new(dir.path().to_path_buf(), AesGcmSeal::new(&[2; 32]), ContentCoding::Gzip);
        let key = Fingerprint::compute(&http::Method::GET, "https://example.com", &HeaderMap::new(), &[]);
        disk.save_entry(key.clone(), sample_entry()).await.unwrap();

        let two_tier = TwoTierStore::new(memory, disk);
        assert!(two_tier.load_entry(&key).await.is_some());
        assert!(two_tier.memory.load_entry(&key).await.is_some());
    }
}
