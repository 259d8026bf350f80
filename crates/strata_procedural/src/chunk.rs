//! # Chunk Data Model
//!
//! A chunk is a `16 x H x 16` tile of voxels plus:
//! - sky and block light (0..=15 per voxel)
//! - a height map (largest non-air `y`, or `min_y - 1` for empty columns)
//! - a biome map (one biome id per column)
//! - generation state, advancing monotonically through the pipeline
//! - dirty regions awaiting a light pass
//!
//! ## Cross-chunk writes
//!
//! Phases that decorate across chunk borders never write a neighbour's
//! arrays directly. Instead every such write carries a [`WriteTag`]
//! (originating phase + merge priority) and goes through
//! [`Chunk::merge_write`] or, if the target has not finished that phase yet,
//! into the target's pending ledger. The merge rule:
//!
//! - a cell tagged by a later origin rejects the write
//! - a cell tagged by the same origin takes the larger `(priority, id)`
//! - otherwise the write lands only on air or replaceable voxels
//!   (structures and external edits land unconditionally)
//!
//! The rule is commutative, so the final bytes do not depend on the order in
//! which chunks were generated.
//!
//! ## Memory Layout
//!
//! Voxels are stored `[y][z][x]` in flat vectors.

use std::collections::HashMap;

use strata_core::{Aabb, Block, BlockPos, BlockRegistry, ChunkCoord, CHUNK_SIZE};

use crate::biome::Biome;

/// Columns per chunk.
pub const COLUMNS: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Dirty boxes kept before they collapse into one.
const MAX_DIRTY_REGIONS: usize = 16;

/// Generation progress. Only ever advances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ChunkState {
    /// Allocated, nothing generated.
    #[default]
    Empty = 0,
    /// Base terrain filled.
    BaseFilled = 1,
    /// Biomes painted.
    BiomeApplied = 2,
    /// Caves carved.
    Carved = 3,
    /// Ores, boulders and pools placed.
    Featured = 4,
    /// Trees and plants placed.
    Vegetated = 5,
    /// Structure slices stamped.
    Structured = 6,
    /// Light computed.
    Lit = 7,
    /// Height map final, visible to the simulator.
    Ready = 8,
}

/// A generation phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Height field fill.
    BaseTerrain = 1,
    /// Biome map, surface repaint, erosion/deposition, water.
    Biome = 2,
    /// Noise caves and worm tunnels.
    Caves = 3,
    /// Ores, boulders, pools.
    Features = 4,
    /// Trees, cacti, flowers, grass.
    Vegetation = 5,
    /// Structure slices.
    Structures = 6,
    /// Sky and block light.
    Lighting = 7,
    /// Height map and readiness.
    Finalize = 8,
}

impl Phase {
    /// Every phase in pipeline order.
    pub const ALL: [Self; 8] = [
        Self::BaseTerrain,
        Self::Biome,
        Self::Caves,
        Self::Features,
        Self::Vegetation,
        Self::Structures,
        Self::Lighting,
        Self::Finalize,
    ];

    /// Name used in logs and as the per-phase RNG label.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BaseTerrain => "base-terrain",
            Self::Biome => "biome",
            Self::Caves => "caves",
            Self::Features => "features",
            Self::Vegetation => "vegetation",
            Self::Structures => "structures",
            Self::Lighting => "lighting",
            Self::Finalize => "finalize",
        }
    }

    /// State a chunk must be in before this phase runs.
    #[must_use]
    pub const fn requires(self) -> ChunkState {
        match self {
            Self::BaseTerrain => ChunkState::Empty,
            Self::Biome => ChunkState::BaseFilled,
            Self::Caves => ChunkState::BiomeApplied,
            Self::Features => ChunkState::Carved,
            Self::Vegetation => ChunkState::Featured,
            Self::Structures => ChunkState::Vegetated,
            Self::Lighting => ChunkState::Structured,
            Self::Finalize => ChunkState::Lit,
        }
    }

    /// State a chunk is in after this phase.
    #[must_use]
    pub const fn completes(self) -> ChunkState {
        match self {
            Self::BaseTerrain => ChunkState::BaseFilled,
            Self::Biome => ChunkState::BiomeApplied,
            Self::Caves => ChunkState::Carved,
            Self::Features => ChunkState::Featured,
            Self::Vegetation => ChunkState::Vegetated,
            Self::Structures => ChunkState::Structured,
            Self::Lighting => ChunkState::Lit,
            Self::Finalize => ChunkState::Ready,
        }
    }

    /// The phase that runs next for a chunk in `state`.
    #[must_use]
    pub const fn next_for(state: ChunkState) -> Option<Self> {
        match state {
            ChunkState::Empty => Some(Self::BaseTerrain),
            ChunkState::BaseFilled => Some(Self::Biome),
            ChunkState::BiomeApplied => Some(Self::Caves),
            ChunkState::Carved => Some(Self::Features),
            ChunkState::Featured => Some(Self::Vegetation),
            ChunkState::Vegetated => Some(Self::Structures),
            ChunkState::Structured => Some(Self::Lighting),
            ChunkState::Lit => Some(Self::Finalize),
            ChunkState::Ready => None,
        }
    }
}

/// Who wrote a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WriteOrigin {
    /// A generation phase.
    Phase(Phase),
    /// An edit from outside generation (player, piston).
    External,
}

/// Provenance carried by a merged write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WriteTag {
    /// Origin of the write.
    pub origin: WriteOrigin,
    /// Tie-break between writes of the same origin.
    pub priority: u8,
}

impl WriteTag {
    /// Tag for a generation phase write.
    #[must_use]
    pub const fn phase(phase: Phase, priority: u8) -> Self {
        Self { origin: WriteOrigin::Phase(phase), priority }
    }

    /// Tag for an external edit.
    #[must_use]
    pub const fn external() -> Self {
        Self { origin: WriteOrigin::External, priority: u8::MAX }
    }

    /// Returns true if the write lands regardless of what it replaces.
    const fn overrides_terrain(self) -> bool {
        matches!(self.origin, WriteOrigin::External | WriteOrigin::Phase(Phase::Structures))
    }

    /// Phase after which a buffered write may be applied.
    const fn apply_after(self) -> Phase {
        match self.origin {
            WriteOrigin::Phase(phase) => phase,
            WriteOrigin::External => Phase::Finalize,
        }
    }
}

/// A write waiting for its target chunk to reach the writer's phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingEdit {
    /// World position.
    pub pos: BlockPos,
    /// Block to write.
    pub block: Block,
    /// Provenance.
    pub tag: WriteTag,
}

/// A chunk of world data.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    min_y: i32,
    height: usize,
    voxels: Vec<Block>,
    sky_light: Vec<u8>,
    block_light: Vec<u8>,
    height_map: [i32; COLUMNS],
    biome_map: [u8; COLUMNS],
    state: ChunkState,
    dirty: Vec<Aabb>,
    provenance: HashMap<usize, WriteTag>,
    pending: Vec<PendingEdit>,
}

impl Chunk {
    /// Creates an Empty chunk spanning `min_y..=max_y`.
    #[must_use]
    pub fn new(coord: ChunkCoord, min_y: i32, max_y: i32) -> Self {
        let height = (max_y - min_y + 1).max(1) as usize;
        let volume = COLUMNS * height;
        Self {
            coord,
            min_y,
            height,
            voxels: vec![Block::AIR; volume],
            sky_light: vec![0; volume],
            block_light: vec![0; volume],
            height_map: [min_y - 1; COLUMNS],
            biome_map: [Biome::Plains.id(); COLUMNS],
            state: ChunkState::Empty,
            dirty: Vec::new(),
            provenance: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Lowest block y.
    #[inline]
    #[must_use]
    pub const fn min_y(&self) -> i32 {
        self.min_y
    }

    /// Highest block y.
    #[inline]
    #[must_use]
    pub const fn max_y(&self) -> i32 {
        self.min_y + self.height as i32 - 1
    }

    /// Number of layers.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Generation state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ChunkState {
        self.state
    }

    #[inline]
    fn index(&self, x: usize, y: i32, z: usize) -> Option<usize> {
        if x >= CHUNK_SIZE || z >= CHUNK_SIZE || y < self.min_y {
            return None;
        }
        let ly = (y - self.min_y) as usize;
        if ly >= self.height {
            return None;
        }
        Some((ly * CHUNK_SIZE + z) * CHUNK_SIZE + x)
    }

    /// Local coordinates of a world position if it lies in this chunk.
    #[must_use]
    pub fn local(&self, pos: BlockPos) -> Option<(usize, i32, usize)> {
        if pos.chunk() != self.coord || pos.y < self.min_y || pos.y > self.max_y() {
            return None;
        }
        let (x, z) = pos.local_xz();
        Some((x, pos.y, z))
    }

    /// World position of a local cell.
    #[inline]
    #[must_use]
    pub const fn world_pos(&self, x: usize, y: i32, z: usize) -> BlockPos {
        BlockPos::new(self.coord.world_x() + x as i32, y, self.coord.world_z() + z as i32)
    }

    /// Block at local `(x, z)` and world `y`; air outside the chunk.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: i32, z: usize) -> Block {
        self.index(x, y, z).map_or(Block::AIR, |i| self.voxels[i])
    }

    /// Raw write used by bulk terrain phases. Ignores provenance.
    #[inline]
    pub fn set(&mut self, x: usize, y: i32, z: usize, block: Block) {
        if let Some(i) = self.index(x, y, z) {
            self.voxels[i] = block;
        }
    }

    /// Block at a world position; air if outside this chunk.
    #[must_use]
    pub fn get_world(&self, pos: BlockPos) -> Block {
        self.local(pos).map_or(Block::AIR, |(x, y, z)| self.get(x, y, z))
    }

    /// Writes a tagged block using the merge rule (see module docs).
    ///
    /// Returns true if the cell changed.
    pub fn merge_write(&mut self, x: usize, y: i32, z: usize, block: Block, tag: WriteTag, registry: &BlockRegistry) -> bool {
        let Some(i) = self.index(x, y, z) else {
            return false;
        };
        let current = self.voxels[i];
        let accept = match self.provenance.get(&i) {
            Some(existing) if existing.origin > tag.origin => false,
            Some(existing) if existing.origin == tag.origin => {
                (tag.priority, block.id, block.meta) > (existing.priority, current.id, current.meta)
            }
            _ => tag.overrides_terrain() || registry.props(current).replaceable,
        };
        if !accept {
            return false;
        }
        self.provenance.insert(i, tag);
        if current != block {
            self.voxels[i] = block;
            let pos = self.world_pos(x, y, z);
            self.mark_dirty(pos);
        }
        true
    }

    /// Applies an external edit unconditionally and returns the old block.
    ///
    /// The height map column is refreshed once the chunk is Ready.
    pub fn external_write(&mut self, x: usize, y: i32, z: usize, block: Block) -> Block {
        let Some(i) = self.index(x, y, z) else {
            return Block::AIR;
        };
        let old = self.voxels[i];
        self.voxels[i] = block;
        self.provenance.insert(i, WriteTag::external());
        let pos = self.world_pos(x, y, z);
        self.mark_dirty(pos);
        if self.state == ChunkState::Ready {
            self.recompute_column(x, z);
        }
        old
    }

    /// Buffers a write until this chunk finishes the writer's phase.
    pub fn push_pending(&mut self, edit: PendingEdit) {
        self.pending.push(edit);
    }

    /// Number of buffered writes.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if a write tagged `tag` can be applied right now.
    #[must_use]
    pub fn accepts_now(&self, tag: WriteTag) -> bool {
        self.state >= tag.apply_after().completes()
    }

    /// Records that `phase` finished and drains writes that were waiting for it.
    ///
    /// Returns false (and changes nothing) if `phase` is not the next phase.
    pub fn mark_phase_complete(&mut self, phase: Phase, registry: &BlockRegistry) -> bool {
        if self.state != phase.requires() {
            debug_assert!(false, "phase {phase:?} completed out of order in state {:?}", self.state);
            return false;
        }
        self.state = phase.completes();

        if !self.pending.is_empty() {
            let state = self.state;
            let (ready, waiting): (Vec<_>, Vec<_>) =
                self.pending.drain(..).partition(|e| state >= e.tag.apply_after().completes());
            self.pending = waiting;
            for edit in ready {
                self.apply_edit(edit, registry);
            }
        }
        true
    }

    fn apply_edit(&mut self, edit: PendingEdit, registry: &BlockRegistry) {
        if let Some((x, y, z)) = self.local(edit.pos) {
            if edit.tag.origin == WriteOrigin::External {
                self.external_write(x, y, z, edit.block);
            } else {
                self.merge_write(x, y, z, edit.block, edit.tag, registry);
            }
        }
    }

    /// Sky light at a local cell (0 outside).
    #[inline]
    #[must_use]
    pub fn sky_light(&self, x: usize, y: i32, z: usize) -> u8 {
        self.index(x, y, z).map_or(0, |i| self.sky_light[i])
    }

    /// Block light at a local cell (0 outside).
    #[inline]
    #[must_use]
    pub fn block_light(&self, x: usize, y: i32, z: usize) -> u8 {
        self.index(x, y, z).map_or(0, |i| self.block_light[i])
    }

    /// Replaces both light fields (lengths must match the voxel array).
    pub(crate) fn install_light(&mut self, sky: Vec<u8>, block: Vec<u8>) {
        debug_assert_eq!(sky.len(), self.voxels.len());
        debug_assert_eq!(block.len(), self.voxels.len());
        self.sky_light = sky;
        self.block_light = block;
        self.dirty.clear();
    }

    /// Flat voxel slice in `[y][z][x]` order.
    #[inline]
    #[must_use]
    pub fn voxels(&self) -> &[Block] {
        &self.voxels
    }

    /// Flat sky light slice.
    #[inline]
    #[must_use]
    pub fn sky_light_slice(&self) -> &[u8] {
        &self.sky_light
    }

    /// Flat block light slice.
    #[inline]
    #[must_use]
    pub fn block_light_slice(&self) -> &[u8] {
        &self.block_light
    }

    /// Height map entry for local column `(x, z)`.
    #[inline]
    #[must_use]
    pub fn height_at(&self, x: usize, z: usize) -> i32 {
        self.height_map[z * CHUNK_SIZE + x]
    }

    /// The whole height map, `[z][x]`.
    #[must_use]
    pub const fn height_map(&self) -> &[i32; COLUMNS] {
        &self.height_map
    }

    /// Scans a column for its largest non-air `y` (`min_y - 1` if empty).
    #[must_use]
    pub fn column_top(&self, x: usize, z: usize) -> i32 {
        (self.min_y..=self.max_y()).rev().find(|&y| !self.get(x, y, z).is_air()).unwrap_or(self.min_y - 1)
    }

    fn recompute_column(&mut self, x: usize, z: usize) {
        self.height_map[z * CHUNK_SIZE + x] = self.column_top(x, z);
    }

    /// Recomputes the whole height map from voxel content.
    pub fn recompute_height_map(&mut self) {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                self.recompute_column(x, z);
            }
        }
    }

    /// Biome of local column `(x, z)`.
    #[inline]
    #[must_use]
    pub fn biome_at(&self, x: usize, z: usize) -> Biome {
        Biome::from_id(self.biome_map[z * CHUNK_SIZE + x])
    }

    /// Sets the biome of local column `(x, z)`.
    #[inline]
    pub fn set_biome(&mut self, x: usize, z: usize, biome: Biome) {
        self.biome_map[z * CHUNK_SIZE + x] = biome.id();
    }

    /// The whole biome map, `[z][x]`.
    #[must_use]
    pub const fn biome_map(&self) -> &[u8; COLUMNS] {
        &self.biome_map
    }

    /// Grows the dirty set to include `pos`.
    pub fn mark_dirty(&mut self, pos: BlockPos) {
        if let Some(region) = self.dirty.iter_mut().find(|r| r.contains(pos)) {
            region.include(pos);
            return;
        }
        self.dirty.push(Aabb::point(pos));
        if self.dirty.len() > MAX_DIRTY_REGIONS {
            let mut merged = self.dirty[0];
            for region in &self.dirty[1..] {
                merged.include(region.min);
                merged.include(region.max);
            }
            self.dirty = vec![merged];
        }
    }

    /// Regions changed since the last light pass.
    #[must_use]
    pub fn dirty_regions(&self) -> &[Aabb] {
        &self.dirty
    }

    /// Returns true if the chunk needs a light pass.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// 64-bit FNV-1a digest of voxels, light, height map and biome map.
    #[must_use]
    pub fn content_digest(&self) -> u64 {
        let mut hash: u64 = 0xCBF2_9CE4_8422_2325;
        let mut feed = |byte: u8| {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
        };
        for b in &self.voxels {
            for byte in b.id.to_le_bytes().into_iter().chain(b.meta.to_le_bytes()) {
                feed(byte);
            }
        }
        self.sky_light.iter().chain(&self.block_light).for_each(|&l| feed(l));
        for h in &self.height_map {
            h.to_le_bytes().into_iter().for_each(&mut feed);
        }
        self.biome_map.iter().for_each(|&b| feed(b));
        hash
    }

    /// Counts voxels matching `pred` with `y` in `y_range`.
    pub fn count_where(&self, y_range: std::ops::RangeInclusive<i32>, mut pred: impl FnMut(Block) -> bool) -> usize {
        let lo = (*y_range.start()).max(self.min_y);
        let hi = (*y_range.end()).min(self.max_y());
        let mut count = 0;
        for y in lo..=hi {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    if pred(self.get(x, y, z)) {
                        count += 1;
                    }
                }
            }
        }
        count
    }
}
