//! Keyed TTL cache with per-key single-flight fill
//!
//! Fills for the same key are serialized through a per-key lock, so a burst
//! of callers missing on one key produces one upstream fetch. Distinct keys
//! fill in parallel. Only successful fills are cached. A per-key lock lives
//! only while someone holds or waits on it, and expired entries are pruned on
//! every write.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// A cached value and when it was fetched
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, fetched_at: Instant) -> Self {
        Self { value, fetched_at }
    }

    /// Valid while `now - fetched_at < ttl`
    pub fn is_valid_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    inflight: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value for `key` if still valid
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_valid_at(Instant::now(), self.ttl))
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_valid_at(now, self.ttl));
        entries.insert(key, CacheEntry::new(value, now));
    }

    /// Cached value, or the result of `fill` stored under `key`
    ///
    /// Errors from `fill` are returned and leave the cache untouched.
    pub async fn get_or_try_fill<F, Fut, E>(&self, key: K, fill: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        let lock = {
            let mut map = self.inflight.lock().await;
            Arc::clone(
                map.entry(key.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        let result = {
            let _guard = lock.lock().await;
            match self.get(&key).await {
                Some(value) => Ok(value),
                None => match fill().await {
                    Ok(value) => {
                        self.insert(key.clone(), value.clone()).await;
                        Ok(value)
                    }
                    Err(e) => Err(e),
                },
            }
        };

        self.release(&key, lock).await;
        result
    }

    /// Drop the per-key lock once no other caller holds or awaits it
    async fn release(&self, key: &K, lock: Arc<Mutex<()>>) {
        let mut map = self.inflight.lock().await;
        // One reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            map.remove(key);
        }
        // Counts are only read under the map lock
        drop(lock);
        drop(map);
    }
}
