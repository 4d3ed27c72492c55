//! Shared response cache.
//!
//! # Data Flow
//! ```text
//! pipeline cache lookup
//!     → Cache::get (hit: refresh recency, count hit | miss: count miss)
//! origin fetch succeeded
//!     → Cache::put (replace, or insert and evict LRU when full)
//! stats path
//!     → Cache::stats (snapshot of counters)
//! ```
//!
//! # Design Decisions
//! - One mutex guards the recency list and the counters together, so every
//!   `get`/`put` updates order and accounting in a single critical section
//! - Values are `Bytes`: callers get their own immutable handle, never a
//!   borrow into the cache
//! - The lock is never held across I/O

pub mod lru;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::observability::metrics;
use self::lru::{Insert, LruCore};

/// Error constructing a cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache capacity must be at least 1")]
    ZeroCapacity,
}

/// Point-in-time cache counters.
/// Serializes to the stats response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    #[serde(rename = "cache_hits")]
    pub hits: u64,
    #[serde(rename = "cache_misses")]
    pub misses: u64,
    #[serde(rename = "cache_evictions")]
    pub evictions: u64,
}

#[derive(Debug)]
struct Inner {
    entries: LruCore<Bytes>,
    stats: CacheStats,
}

/// Thread-safe LRU cache keyed by request target.
#[derive(Debug)]
pub struct Cache {
    inner: Mutex<Inner>,
}

impl Cache {
    /// Create a cache holding at most `capacity` responses.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            inner: Mutex::new(Inner {
                entries: LruCore::new(capacity),
                stats: CacheStats::default(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every mutation leaves the list consistent before it can panic.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a cached body, marking it most recently used on a hit.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let mut inner = self.lock();
        let found = inner.entries.get(key);
        if found.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        drop(inner);

        metrics::record_cache_lookup(found.is_some());
        found
    }

    /// Store a body, evicting the least recently used entry if full.
    pub fn put(&self, key: impl Into<String>, value: Bytes) {
        let mut inner = self.lock();
        let outcome = inner.entries.insert(key.into(), value);
        if let Insert::Evicted(ref evicted) = outcome {
            inner.stats.evictions += 1;
            tracing::debug!(key = %evicted, "Evicted cache entry");
        }
        drop(inner);

        if matches!(outcome, Insert::Evicted(_)) {
            metrics::record_cache_eviction();
        }
    }

    /// Snapshot of hit, miss and eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Zero all counters without touching cached entries.
    pub fn reset_stats(&self) {
        self.lock().stats = CacheStats::default();
    }

    /// Check for a key without counting a lookup or refreshing recency.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().entries.capacity()
    }

    /// Cached keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.lock().entries.keys_by_recency()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn body(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(Cache::new(0).unwrap_err(), CacheError::ZeroCapacity);
    }

    #[test]
    fn touched_keys_survive_eviction() {
        let capacity = 5;
        let cache = Cache::new(capacity).unwrap();
        let keys: Vec<String> = (1..=capacity + 2).map(|i| format!("k{}", i)).collect();

        for key in &keys[..capacity] {
            cache.put(key.clone(), body("v"));
        }
        assert!(cache.contains("k1"));

        // Touch k2..k5, leaving k1 as the oldest.
        for key in &keys[1..capacity] {
            assert!(cache.get(key).is_some());
        }
        cache.put(keys[capacity + 1].clone(), body("v"));

        assert!(!cache.contains("k1"));
        for key in &keys[1..capacity] {
            assert!(cache.contains(key), "{} should still be cached", key);
        }
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn overfilling_evicts_oldest_untouched_key() {
        let cache = Cache::new(3).unwrap();
        for key in ["k1", "k2", "k3", "k4"] {
            cache.put(key, body("v"));
        }
        assert!(!cache.contains("k1"));

        cache.get("k2");
        cache.get("k3");
        cache.put("k5", body("v"));

        assert_eq!(cache.keys_by_recency(), vec!["k5", "k3", "k2"]);
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn replacing_a_key_does_not_count() {
        let cache = Cache::new(2).unwrap();
        cache.put("a", body("1"));
        cache.put("a", body("2"));

        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.get("a"), Some(body("2")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn counters_follow_operations() {
        let cache = Cache::new(2).unwrap();
        let mut gets = 0;
        let mut expected_evictions = 0;

        for i in 0..20 {
            let key = format!("k{}", i % 4);
            if i % 2 == 0 {
                cache.get(&key);
                gets += 1;
            } else {
                if !cache.contains(&key) && cache.len() == cache.capacity() {
                    expected_evictions += 1;
                }
                cache.put(key, body("x"));
            }
        }

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, gets);
        assert_eq!(stats.evictions, expected_evictions);
    }

    #[test]
    fn reset_keeps_contents() {
        let cache = Cache::new(1).unwrap();
        cache.put("a", body("1"));
        cache.get("a");
        cache.get("b");
        cache.put("b", body("2"));
        assert_eq!(
            cache.stats(),
            CacheStats { hits: 1, misses: 1, evictions: 1 }
        );

        cache.reset_stats();
        assert_eq!(cache.stats(), CacheStats::default());
        assert!(cache.contains("b"));
    }

    #[test]
    fn stats_json_uses_wire_names() {
        let stats = CacheStats { hits: 3, misses: 2, evictions: 1 };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"cache_hits": 3, "cache_misses": 2, "cache_evictions": 1})
        );

        let parsed: CacheStats = serde_json::from_str(&serde_json::to_string(&stats).unwrap()).unwrap();
        assert_eq!(parsed, stats);
    }

    #[test]
    fn concurrent_access_keeps_invariants() {
        let cache = Arc::new(Cache::new(8).unwrap());
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("k{}", (i * 7 + t) % 16);
                        if cache.get(&key).is_none() {
                            cache.put(key, Bytes::from(vec![t as u8; 4]));
                        }
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 8 * 500);
        assert!(cache.len() <= 8);
        assert_eq!(cache.keys_by_recency().len(), cache.len());
    }
}
