//! # Voxel Grid Access
//!
//! The simulator reads and writes voxels through [`VoxelGrid`] so it can run
//! over the chunk store in a live world or over a bare map in tests.

use std::collections::HashMap;

use strata_core::{Aabb, Block, BlockPos};

/// Random access to world voxels.
pub trait VoxelGrid {
    /// Block at `pos`; air where nothing is stored.
    fn block(&self, pos: BlockPos) -> Block;

    /// Overwrites `pos` and returns the previous block.
    fn set_block(&mut self, pos: BlockPos, block: Block) -> Block;

    /// Returns true if `pos` lies inside the grid's height range.
    fn in_bounds(&self, pos: BlockPos) -> bool;
}

/// Hash-map grid with a height range; everything unset is air.
#[derive(Clone, Debug, Default)]
pub struct SparseGrid {
    cells: HashMap<BlockPos, Block>,
    min_y: i32,
    max_y: i32,
}

impl SparseGrid {
    /// Creates an empty grid covering `min_y..=max_y`.
    #[must_use]
    pub fn new(min_y: i32, max_y: i32) -> Self {
        Self { cells: HashMap::new(), min_y, max_y }
    }

    /// Number of non-air cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if every cell is air.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Counts cells holding `id`.
    #[must_use]
    pub fn count(&self, id: u16) -> usize {
        self.cells.values().filter(|b| b.id == id).count()
    }

    /// Tight box around every non-air cell.
    #[must_use]
    pub fn bounds(&self) -> Option<Aabb> {
        let mut cells = self.cells.keys();
        let first = *cells.next()?;
        let mut bounds = Aabb::point(first);
        for pos in cells {
            bounds.include(*pos);
        }
        Some(bounds)
    }
}

impl VoxelGrid for SparseGrid {
    fn block(&self, pos: BlockPos) -> Block {
        self.cells.get(&pos).copied().unwrap_or(Block::AIR)
    }

    fn set_block(&mut self, pos: BlockPos, block: Block) -> Block {
        if !self.in_bounds(pos) {
            return Block::AIR;
        }
        let old = if block.is_air() { self.cells.remove(&pos) } else { self.cells.insert(pos, block) };
        old.unwrap_or(Block::AIR)
    }

    fn in_bounds(&self, pos: BlockPos) -> bool {
        pos.y >= self.min_y && pos.y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_grid_defaults_to_air() {
        let mut grid = SparseGrid::new(0, 15);
        let pos = BlockPos::new(-4, 3, 9);
        assert_eq!(grid.block(pos), Block::AIR);
        assert_eq!(grid.set_block(pos, Block::STONE), Block::AIR);
        assert_eq!(grid.set_block(pos, Block::AIR), Block::STONE);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_out_of_range_writes_ignored() {
        let mut grid = SparseGrid::new(0, 15);
        grid.set_block(BlockPos::new(0, 16, 0), Block::STONE);
        assert!(grid.is_empty());
        assert!(grid.bounds().is_none());
    }
}
