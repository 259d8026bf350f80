//! # Piston Mechanics
//!
//! A push is planned before anything moves. The plan walks the push line
//! until it finds air (or a block that breaks when pushed); an immovable
//! block, the height limit or more than `limit` movable blocks refuse the
//! push and nothing in the world changes.

use strata_core::{ids, Block, BlockPos, BlockRegistry, Facing, PistonBehavior};

use crate::grid::VoxelGrid;

/// A feasible push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushPlan {
    /// Blocks that move one step, nearest first.
    pub moves: Vec<BlockPos>,
    /// Block broken at the end of the line, if any.
    pub destroy: Option<BlockPos>,
}

/// One voxel overwritten by a piston.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoxelWrite {
    /// Position.
    pub pos: BlockPos,
    /// Block before the write.
    pub old: Block,
    /// Block after the write.
    pub new: Block,
}

/// Plans a push from the piston at `piston` towards `facing`.
#[must_use]
pub fn plan_push(
    grid: &dyn VoxelGrid,
    registry: &BlockRegistry,
    piston: BlockPos,
    facing: Facing,
    limit: usize,
) -> Option<PushPlan> {
    let mut moves = Vec::new();
    let mut pos = piston.offset(facing);
    loop {
        if !grid.in_bounds(pos) {
            return None;
        }
        let block = grid.block(pos);
        if block.is_air() {
            return Some(PushPlan { moves, destroy: None });
        }
        match registry.props(block).piston {
            PistonBehavior::Destroy => return Some(PushPlan { moves, destroy: Some(pos) }),
            PistonBehavior::Block => return None,
            PistonBehavior::Push if moves.len() == limit => return None,
            PistonBehavior::Push => moves.push(pos),
        }
        pos = pos.offset(facing);
    }
}

/// The head voxel for a piston block.
#[must_use]
pub fn head_for(piston: Block, facing: Facing) -> Block {
    Block::new(ids::PISTON_HEAD).with_facing(facing).with_sticky(piston.id == ids::STICKY_PISTON)
}

/// Moves the planned blocks and places the head. Returns every write.
pub fn apply_push(grid: &mut dyn VoxelGrid, plan: &PushPlan, piston: BlockPos, facing: Facing, head: Block) -> Vec<VoxelWrite> {
    let mut writes = Vec::with_capacity(plan.moves.len() + 2);
    let mut put = |grid: &mut dyn VoxelGrid, pos: BlockPos, new: Block| {
        let old = grid.set_block(pos, new);
        if old != new {
            writes.push(VoxelWrite { pos, old, new });
        }
    };

    if let Some(pos) = plan.destroy {
        put(grid, pos, Block::AIR);
    }
    for &pos in plan.moves.iter().rev() {
        let block = grid.block(pos);
        put(grid, pos.offset(facing), block);
    }
    put(grid, piston.offset(facing), head);
    writes
}

/// Removes the head in front of `piston`; a sticky piston pulls the block
/// beyond the head back into the freed cell.
pub fn apply_pull(
    grid: &mut dyn VoxelGrid,
    registry: &BlockRegistry,
    piston: BlockPos,
    facing: Facing,
    sticky: bool,
) -> Vec<VoxelWrite> {
    let mut writes = Vec::new();
    let front = piston.offset(facing);
    if grid.block(front).id != ids::PISTON_HEAD {
        return writes;
    }

    let beyond = front.offset(facing);
    let pulled = grid.block(beyond);
    let pullable = sticky && !pulled.is_air() && registry.props(pulled).piston == PistonBehavior::Push;
    let replacement = if pullable { pulled } else { Block::AIR };

    let old = grid.set_block(front, replacement);
    writes.push(VoxelWrite { pos: front, old, new: replacement });
    if pullable {
        let old = grid.set_block(beyond, Block::AIR);
        writes.push(VoxelWrite { pos: beyond, old, new: Block::AIR });
    }
    writes
}
