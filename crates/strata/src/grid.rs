//! Voxel access for the simulator over the live chunk store.

use strata_core::{Block, BlockPos};
use strata_procedural::ChunkStore;
use strata_redstone::VoxelGrid;

/// [`VoxelGrid`] over Ready chunks of a [`ChunkStore`].
///
/// Chunks that are unloaded or still generating are out of bounds: their
/// voxels read as air and pistons refuse to push into them.
pub struct StoreGrid<'a> {
    store: &'a ChunkStore,
}

impl<'a> StoreGrid<'a> {
    /// Wraps `store`.
    #[must_use]
    pub const fn new(store: &'a ChunkStore) -> Self {
        Self { store }
    }
}

impl VoxelGrid for StoreGrid<'_> {
    fn block(&self, pos: BlockPos) -> Block {
        if self.in_bounds(pos) {
            self.store.get_block(pos)
        } else {
            Block::AIR
        }
    }

    fn set_block(&mut self, pos: BlockPos, block: Block) -> Block {
        self.store.set_block(pos, block).unwrap_or_else(|error| {
            tracing::warn!(%pos, %error, "simulator write rejected by the store");
            Block::AIR
        })
    }

    fn in_bounds(&self, pos: BlockPos) -> bool {
        pos.y >= self.store.min_y() && pos.y <= self.store.max_y() && self.store.is_ready(pos.chunk())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{BlockRegistry, ChunkCoord, EventBus, EventSender, WorldConfig};
    use strata_procedural::{ChunkState, DiscardSink, Phase, TerrainGenerator};

    #[test]
    fn test_unloaded_chunks_are_out_of_bounds() {
        let store = ChunkStore::new(&WorldConfig::default(), BlockRegistry::standard(), EventSender::disconnected());
        let grid = StoreGrid::new(&store);
        assert!(!grid.in_bounds(BlockPos::new(0, 10, 0)));
        assert_eq!(grid.block(BlockPos::new(0, 10, 0)), Block::AIR);
        assert!(store.get(ChunkCoord::new(0, 0)).is_none());
    }

    #[test]
    fn test_writes_reach_the_store() {
        let config = WorldConfig { world_type: strata_core::WorldType::Flat, ..WorldConfig::default() };
        let bus = EventBus::new(64);
        let store = ChunkStore::new(&config, BlockRegistry::standard(), bus.sender());
        let generator = TerrainGenerator::new(&config, BlockRegistry::standard()).unwrap();
        let cancel = std::sync::atomic::AtomicBool::new(false);
        generator.generate_in_store(&store, ChunkCoord::new(0, 0), &cancel).unwrap();

        let mut grid = StoreGrid::new(&store);
        let pos = BlockPos::new(3, 65, 3);
        assert!(grid.in_bounds(pos));
        assert_eq!(grid.set_block(pos, Block::STONE), Block::AIR);
        assert_eq!(store.get_block(pos), Block::STONE);
        assert_eq!(store.height_at(3, 3), 65);
    }

    #[test]
    fn test_chunk_mid_generation_reads_as_air() {
        let config = WorldConfig::default();
        let store = ChunkStore::new(&config, BlockRegistry::standard(), EventSender::disconnected());
        let generator = TerrainGenerator::new(&config, BlockRegistry::standard()).unwrap();
        let handle = store.get_or_create(ChunkCoord::new(0, 0)).unwrap();
        assert!(generator.run_phase(&mut handle.write(), Phase::BaseTerrain, &mut DiscardSink));
        assert_eq!(handle.read().state(), ChunkState::BaseFilled);

        let pos = BlockPos::new(3, 5, 3);
        assert!(!store.get_block(pos).is_air());
        let grid = StoreGrid::new(&store);
        assert!(!grid.in_bounds(pos));
        assert_eq!(grid.block(pos), Block::AIR);
    }
}
