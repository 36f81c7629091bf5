//! Single-flight request coalescing.
//!
//! When several callers ask for the same fingerprint at once (a page
//! firing off the same subresource from multiple frames, say), only the
//! first actually fetches; the rest wait on that fetch and then read
//! whatever it stored.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::key::Fingerprint;

/// Per-fingerprint locks coordinating concurrent fetches.
#[derive(Default)]
pub struct Coalescer {
    locks: Mutex<HashMap<Fingerprint, Arc<Mutex<()>>>>,
}

impl Coalescer {
    /// A coalescer with no in-flight fetches tracked yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`. The first caller to await this gets
    /// the guard immediately and should perform the fetch + store;
    /// subsequent concurrent callers block until that guard drops, then
    /// should re-check the store (it will usually now be a hit).
    pub async fn acquire(&self, key: &Fingerprint) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let guard = lock.clone().lock_owned().await;
        self.sweep(key, &lock).await;
        guard
    }

    /// Drop the map entry for `key` once nobody else holds a reference to
    /// its lock, so the map does not grow unboundedly under churn.
    async fn sweep(&self, key: &Fingerprint, lock: &Arc<Mutex<()>>) {
        if Arc::strong_count(lock) <= 2 {
            let mut locks = self.locks.lock().await;
            if let Some(existing) = locks.get(key) {
                if Arc::ptr_eq(existing, lock) && Arc::strong_count(existing) <= 2 {
                    locks.remove(key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key() -> Fingerprint {
        Fingerprint::compute(&Method::GET, "https://example.com/asset.js", &HeaderMap::new(), &[])
    }

    #[tokio::test]
    async fn second_waiter_blocks_until_first_releases() {
        let coalescer = Arc::new(Coalescer::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let c1 = coalescer.clone();
        let counter1 = counter.clone();
        let first = tokio::spawn(async move {
            let _guard = c1.acquire(&key()).await;
            tokio::time::sleep(Duration::from_millis(30)).await;
            counter1.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(5)).await;
        let c2 = coalescer.clone();
        let counter2 = counter.clone();
        let second = tokio::spawn(async move {
            let _guard = c2.acquire(&key()).await;
            assert_eq!(counter2.load(Ordering::SeqCst), 1);
        });

        first.await.unwrap();
        second.await.unwrap();
    }
}
