//! # Feature Sinks
//!
//! Where feature writes go when they leave the chunk being generated.
//!
//! - [`DiscardSink`] drops them (phases that never cross borders)
//! - [`CaptureSink`] keeps only writes aimed at one chunk (isolated generation)
//! - [`crate::store::StoreSink`] routes them into the chunk store

use strata_core::{Block, BlockPos, ChunkCoord};

use crate::chunk::{PendingEdit, WriteTag};

/// Receiver for feature writes that fall outside the generating chunk.
pub trait FeatureSink {
    /// Accepts a write into a neighbouring chunk.
    fn spill(&mut self, pos: BlockPos, block: Block, tag: WriteTag);
}

/// Drops every spilled write.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

impl FeatureSink for DiscardSink {
    fn spill(&mut self, _pos: BlockPos, _block: Block, _tag: WriteTag) {}
}

/// Collects spilled writes that land in one target chunk.
#[derive(Clone, Debug)]
pub struct CaptureSink {
    target: ChunkCoord,
    edits: Vec<PendingEdit>,
}

impl CaptureSink {
    /// Creates a sink capturing writes into `target`.
    #[must_use]
    pub const fn new(target: ChunkCoord) -> Self {
        Self { target, edits: Vec::new() }
    }

    /// Captured writes, in arrival order.
    #[must_use]
    pub fn edits(&self) -> &[PendingEdit] {
        &self.edits
    }

    /// Consumes the sink.
    #[must_use]
    pub fn into_edits(self) -> Vec<PendingEdit> {
        self.edits
    }
}

impl FeatureSink for CaptureSink {
    fn spill(&mut self, pos: BlockPos, block: Block, tag: WriteTag) {
        if pos.chunk() == self.target {
            self.edits.push(PendingEdit { pos, block, tag });
        }
    }
}
