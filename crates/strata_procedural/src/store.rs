//! # Chunk Store
//!
//! Concurrent map from chunk coordinate to chunk. Each chunk sits behind its
//! own readers-writer lock; the map itself behind another.
//!
//! ## Neighbourhood claims
//!
//! Phases 5..=8 may write into the eight surrounding chunks. A worker must
//! first claim the 3x3 neighbourhood with [`ChunkStore::try_claim`]. Claims
//! never block: an overlapping claim fails with `NeighbourhoodBusy` and the
//! caller re-queues. The claim is released when the guard drops.
//!
//! ## Lock order
//!
//! A worker holds at most its own chunk's write lock while taking a
//! neighbour's. Claims keep two such workers apart, so the order never
//! inverts.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use strata_core::{
    Block, BlockPos, BlockRegistry, ChunkCoord, EventSender, StrataError, StrataResult, WorldConfig, WorldEvent,
};

use crate::chunk::{Chunk, ChunkState, PendingEdit, WriteTag};
use crate::light;
use crate::sink::FeatureSink;

/// Shared handle to one chunk.
pub type ChunkHandle = Arc<RwLock<Chunk>>;

/// The world's chunks.
pub struct ChunkStore {
    chunks: RwLock<HashMap<ChunkCoord, ChunkHandle>>,
    claims: Mutex<HashSet<ChunkCoord>>,
    registry: BlockRegistry,
    min_y: i32,
    max_y: i32,
    events: EventSender,
}

impl ChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: &WorldConfig, registry: BlockRegistry, events: EventSender) -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            claims: Mutex::new(HashSet::new()),
            registry,
            min_y: config.min_y,
            max_y: config.max_y,
            events,
        }
    }

    /// The block registry.
    #[must_use]
    pub const fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Lowest block y.
    #[must_use]
    pub const fn min_y(&self) -> i32 {
        self.min_y
    }

    /// Highest block y.
    #[must_use]
    pub const fn max_y(&self) -> i32 {
        self.max_y
    }

    /// Event sender shared with the simulator.
    #[must_use]
    pub const fn events(&self) -> &EventSender {
        &self.events
    }

    /// Handle for `coord`, creating an Empty chunk if absent.
    ///
    /// # Errors
    ///
    /// Returns `CoordinateOutOfRange` for coordinates past the world limit.
    pub fn get_or_create(&self, coord: ChunkCoord) -> StrataResult<ChunkHandle> {
        coord.validate()?;
        if let Some(handle) = self.chunks.read().get(&coord) {
            return Ok(Arc::clone(handle));
        }
        let mut chunks = self.chunks.write();
        let handle = chunks
            .entry(coord)
            .or_insert_with(|| Arc::new(RwLock::new(Chunk::new(coord, self.min_y, self.max_y))));
        Ok(Arc::clone(handle))
    }

    /// Handle for `coord` if it exists.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.chunks.read().get(&coord).cloned()
    }

    /// Generation state of `coord`, if loaded.
    #[must_use]
    pub fn state(&self, coord: ChunkCoord) -> Option<ChunkState> {
        self.get(coord).map(|h| h.read().state())
    }

    /// Returns true if `coord` is loaded and Ready.
    #[must_use]
    pub fn is_ready(&self, coord: ChunkCoord) -> bool {
        self.state(coord) == Some(ChunkState::Ready)
    }

    /// Clone of a chunk's current contents.
    #[must_use]
    pub fn snapshot(&self, coord: ChunkCoord) -> Option<Chunk> {
        self.get(coord).map(|h| h.read().clone())
    }

    /// Number of loaded chunks (any state).
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    /// Returns true if no chunk is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }

    /// Coordinates of every Ready chunk, sorted.
    #[must_use]
    pub fn ready_coords(&self) -> Vec<ChunkCoord> {
        let handles: Vec<(ChunkCoord, ChunkHandle)> =
            self.chunks.read().iter().map(|(c, h)| (*c, Arc::clone(h))).collect();
        let mut out: Vec<_> =
            handles.into_iter().filter(|(_, h)| h.read().state() == ChunkState::Ready).map(|(c, _)| c).collect();
        out.sort_unstable();
        out
    }

    /// Block at `pos`; air if unloaded or outside the height range.
    #[must_use]
    pub fn get_block(&self, pos: BlockPos) -> Block {
        if pos.y < self.min_y || pos.y > self.max_y {
            return Block::AIR;
        }
        self.get(pos.chunk()).map_or(Block::AIR, |h| h.read().get_world(pos))
    }

    /// External overwrite of one voxel. Returns the previous block.
    ///
    /// On a Ready chunk the write lands immediately, refreshes the height map
    /// column, marks the voxel dirty and emits `VoxelChanged`. On a chunk
    /// still generating it is buffered and applied when the chunk becomes
    /// Ready, so generation never clobbers it. Writes outside the height
    /// range are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CoordinateOutOfRange` for coordinates past the world limit.
    pub fn set_block(&self, pos: BlockPos, block: Block) -> StrataResult<Block> {
        if pos.y < self.min_y || pos.y > self.max_y {
            tracing::trace!(%pos, "set_block outside height range ignored");
            return Ok(Block::AIR);
        }
        let handle = self.get_or_create(pos.chunk())?;
        let mut chunk = handle.write();
        let Some((x, y, z)) = chunk.local(pos) else {
            return Ok(Block::AIR);
        };
        if chunk.state() == ChunkState::Ready {
            let old = chunk.external_write(x, y, z, block);
            drop(chunk);
            if old != block {
                self.events.send(WorldEvent::VoxelChanged { pos, old, new: block });
            }
            Ok(old)
        } else {
            let old = chunk.get(x, y, z);
            chunk.push_pending(PendingEdit { pos, block, tag: WriteTag::external() });
            Ok(old)
        }
    }

    /// Column height at world `(x, z)`: the height map entry of a Ready
    /// chunk, `min_y - 1` otherwise.
    #[must_use]
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let coord = ChunkCoord::from_block_pos(x, z);
        self.get(coord)
            .and_then(|h| {
                let chunk = h.read();
                (chunk.state() == ChunkState::Ready).then(|| {
                    let (lx, lz) = BlockPos::new(x, 0, z).local_xz();
                    chunk.height_at(lx, lz)
                })
            })
            .unwrap_or(self.min_y - 1)
    }

    /// Routes a feature write from a neighbouring chunk's generation.
    ///
    /// Applied now through the merge rule if the target already finished the
    /// writer's phase, buffered in its ledger otherwise.
    ///
    /// # Errors
    ///
    /// Returns `CoordinateOutOfRange` if the target lies past the world limit.
    pub fn place_feature(&self, pos: BlockPos, block: Block, tag: WriteTag) -> StrataResult<ChunkCoord> {
        let coord = pos.chunk();
        if pos.y < self.min_y || pos.y > self.max_y {
            return Ok(coord);
        }
        let handle = self.get_or_create(coord)?;
        let mut chunk = handle.write();
        if chunk.accepts_now(tag) {
            if let Some((x, y, z)) = chunk.local(pos) {
                chunk.merge_write(x, y, z, block, tag, &self.registry);
            }
        } else {
            chunk.push_pending(PendingEdit { pos, block, tag });
        }
        Ok(coord)
    }

    /// Re-lights chunks that received late feature writes.
    ///
    /// Chunks already lit get a fresh light pass; Ready chunks also get their
    /// height map recomputed.
    pub fn refresh_after_spill(&self, touched: &BTreeSet<ChunkCoord>) {
        for coord in touched {
            let Some(handle) = self.get(*coord) else { continue };
            let mut chunk = handle.write();
            if chunk.state() >= ChunkState::Lit && chunk.is_dirty() {
                light::compute_light(&mut chunk, &self.registry);
                if chunk.state() == ChunkState::Ready {
                    chunk.recompute_height_map();
                }
                tracing::trace!(%coord, "relit after neighbour spill");
            }
        }
    }

    /// Re-lights every lit chunk with dirty regions. Returns how many.
    pub fn relight_dirty(&self) -> usize {
        let handles: Vec<ChunkHandle> = self.chunks.read().values().cloned().collect();
        let mut relit = 0;
        for handle in handles {
            let mut chunk = handle.write();
            if chunk.state() >= ChunkState::Lit && chunk.is_dirty() {
                light::compute_light(&mut chunk, &self.registry);
                relit += 1;
            }
        }
        relit
    }

    /// Viewer light at `pos` (see [`light::effective_light`]); 0 if unloaded.
    #[must_use]
    pub fn effective_light(&self, pos: BlockPos, daylight: f32) -> u8 {
        self.get(pos.chunk()).map_or(0, |h| {
            let chunk = h.read();
            chunk.local(pos).map_or(0, |(x, y, z)| {
                light::effective_light(chunk.sky_light(x, y, z), chunk.block_light(x, y, z), daylight)
            })
        })
    }

    /// Claims the 3x3 neighbourhood around `center`.
    ///
    /// # Errors
    ///
    /// Returns `NeighbourhoodBusy` if any chunk in it is already claimed.
    pub fn try_claim(&self, center: ChunkCoord) -> StrataResult<NeighbourhoodGuard<'_>> {
        let coords = center.neighbourhood();
        let mut claims = self.claims.lock();
        if coords.iter().any(|c| claims.contains(c)) {
            return Err(StrataError::NeighbourhoodBusy { cx: center.x, cz: center.z });
        }
        claims.extend(coords);
        Ok(NeighbourhoodGuard { store: self, coords })
    }

    /// Number of chunks currently under a claim.
    #[must_use]
    pub fn claimed_count(&self) -> usize {
        self.claims.lock().len()
    }
}

/// Releases a neighbourhood claim on drop.
pub struct NeighbourhoodGuard<'a> {
    store: &'a ChunkStore,
    coords: [ChunkCoord; 9],
}

impl NeighbourhoodGuard<'_> {
    /// The claimed coordinates.
    #[must_use]
    pub const fn coords(&self) -> &[ChunkCoord; 9] {
        &self.coords
    }
}

impl Drop for NeighbourhoodGuard<'_> {
    fn drop(&mut self) {
        let mut claims = self.store.claims.lock();
        for coord in &self.coords {
            claims.remove(coord);
        }
    }
}

/// Routes spills into a [`ChunkStore`] and remembers which chunks they hit.
pub struct StoreSink<'a> {
    store: &'a ChunkStore,
    touched: BTreeSet<ChunkCoord>,
}

impl<'a> StoreSink<'a> {
    /// Creates a sink over `store`.
    #[must_use]
    pub const fn new(store: &'a ChunkStore) -> Self {
        Self { store, touched: BTreeSet::new() }
    }

    /// Chunks that received writes.
    #[must_use]
    pub const fn touched(&self) -> &BTreeSet<ChunkCoord> {
        &self.touched
    }
}

impl FeatureSink for StoreSink<'_> {
    fn spill(&mut self, pos: BlockPos, block: Block, tag: WriteTag) {
        match self.store.place_feature(pos, block, tag) {
            Ok(coord) => {
                self.touched.insert(coord);
            }
            Err(error) => tracing::trace!(%pos, %error, "feature spill dropped"),
        }
    }
}
