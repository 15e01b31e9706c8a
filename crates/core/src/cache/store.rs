//! In-memory TTL cache with LRU eviction and hit/miss accounting.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A single cache entry with its own TTL.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    /// An entry is expired once strictly more than `ttl` has elapsed.
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) > self.ttl
    }
}

/// Snapshot of cache usage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Live (non-expired) entries.
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or `None` before the first lookup.
    pub hit_rate: Option<f64>,
}

/// Thread-safe TTL cache.
///
/// Expiry is lazy: a `get` on an expired entry counts as a miss and drops
/// the entry. When built with a capacity, the least recently used entry is
/// evicted once the cap is reached.
#[derive(Debug)]
pub struct CacheStore<V> {
    entries: RwLock<LruCache<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> CacheStore<V> {
    /// Creates a cache. `None` means no entry cap.
    pub fn new(max_entries: Option<NonZeroUsize>) -> Self {
        let lru = match max_entries {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: RwLock::new(lru),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Looks up a live entry, recording a hit or a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();

        let value = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        };

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Inserts or replaces an entry, restarting its TTL.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.put(key.into(), CacheEntry::new(value, ttl));
    }

    /// Removes an entry. No-op if absent.
    pub async fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().await;
        entries.pop(key);
    }

    /// Removes every entry. Counters are kept.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Returns usage statistics. Expired entries are purged first so `size`
    /// only counts live ones.
    pub async fn stats(&self) -> CacheStats {
        let size = {
            let mut entries = self.entries.write().await;
            let now = Instant::now();
            let expired: Vec<String> = entries
                .iter()
                .filter(|(_, entry)| entry.is_expired(now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in expired {
                entries.pop(&key);
            }
            entries.len()
        };

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate = (lookups > 0).then(|| hits as f64 / lookups as f64);

        CacheStats {
            size,
            hits,
            misses,
            hit_rate,
        }
    }
}
