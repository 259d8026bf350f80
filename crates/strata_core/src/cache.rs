//! # Sharded LRU Cache
//!
//! Bounded, thread-safe memoisation. Keys hash to one of N shards, each an
//! `lru::LruCache` behind its own `parking_lot::Mutex`, so concurrent
//! generation workers rarely contend.
//!
//! Misses may race: two workers can compute the same value and both insert
//! it. Callers only cache pure results, so the race is harmless.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

/// Bounded LRU cache split into independently locked shards.
pub struct ShardedLru<K, V> {
    shards: Vec<Mutex<LruCache<K, V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> ShardedLru<K, V> {
    /// Creates a cache holding about `capacity` entries over `shards` shards.
    ///
    /// Both values are clamped to at least 1.
    #[must_use]
    pub fn new(capacity: usize, shards: usize) -> Self {
        let shards = shards.max(1);
        let per_shard = NonZeroUsize::new(capacity.div_ceil(shards).max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            shards: (0..shards).map(|_| Mutex::new(LruCache::new(per_shard))).collect(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn shard(&self, key: &K) -> &Mutex<LruCache<K, V>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Looks up a value, refreshing its recency.
    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.shard(key).lock().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Inserts a value, evicting the shard's least recently used entry if full.
    pub fn insert(&self, key: K, value: V) {
        self.shard(&key).lock().put(key, value);
    }

    /// Returns the cached value or computes, stores and returns it.
    pub fn get_or_insert_with(&self, key: K, compute: impl FnOnce() -> V) -> V {
        if let Some(v) = self.get(&key) {
            return v;
        }
        let value = compute();
        self.insert(key, value.clone());
        value
    }

    /// Total entries across shards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    /// Returns true if no shard holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum entries across shards.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shards.iter().map(|s| s.lock().cap().get()).sum()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }

    /// `(hits, misses)` since creation.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_insert() {
        let cache: ShardedLru<u32, u32> = ShardedLru::new(64, 4);
        assert_eq!(cache.get(&1), None);
        cache.insert(1, 10);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_bounded() {
        let cache: ShardedLru<u32, u32> = ShardedLru::new(8, 1);
        for i in 0..100 {
            cache.insert(i, i);
        }
        assert_eq!(cache.len(), 8);
        // Most recent survive, oldest evicted.
        assert_eq!(cache.get(&99), Some(99));
        assert_eq!(cache.get(&0), None);
    }

    #[test]
    fn test_get_or_insert_with_computes_once() {
        let cache: ShardedLru<&str, u32> = ShardedLru::new(4, 2);
        let mut calls = 0;
        let a = cache.get_or_insert_with("k", || {
            calls += 1;
            7
        });
        let b = cache.get_or_insert_with("k", || {
            calls += 1;
            8
        });
        assert_eq!((a, b, calls), (7, 7, 1));
    }
}
