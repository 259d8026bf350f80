//! # Chunk Cache
//!
//! LRU of isolated chunk generations keyed by `(seed, cx, cz)`. A hit
//! short-circuits the whole pipeline; the value is shared, never copied.

use std::sync::Arc;

use strata_core::{ChunkCoord, ShardedLru, WorldSeed};

use crate::chunk::Chunk;

const SHARDS: usize = 8;

/// Bounded cache of finished chunks.
pub struct ChunkCache {
    inner: ShardedLru<(u64, i32, i32), Arc<Chunk>>,
}

impl ChunkCache {
    /// Creates a cache holding about `capacity` chunks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { inner: ShardedLru::new(capacity, SHARDS) }
    }

    /// Cached chunk, if present.
    #[must_use]
    pub fn get(&self, seed: WorldSeed, coord: ChunkCoord) -> Option<Arc<Chunk>> {
        self.inner.get(&(seed.value(), coord.x, coord.z))
    }

    /// Stores a finished chunk.
    pub fn insert(&self, seed: WorldSeed, chunk: Arc<Chunk>) {
        let coord = chunk.coord();
        self.inner.insert((seed.value(), coord.x, coord.z), chunk);
    }

    /// `(hits, misses)` since creation.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        self.inner.stats()
    }

    /// Number of cached chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.inner.clear();
    }
}
