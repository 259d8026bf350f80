//! # Power Snapshots
//!
//! The tick thread owns the simulator; everybody else reads power through
//! a published snapshot.
//!
//! ```text
//!   tick thread                         readers (render, tools)
//!  ┌─────────────┐  publish(Arc<..>)   ┌───────────────────────┐
//!  │ Simulator   │ ──────────────────> │ RwLock<Arc<Snapshot>> │ ──> latest()
//!  └─────────────┘   end of each tick  └───────────────────────┘
//! ```
//!
//! The lock is held only long enough to swap or clone an `Arc`, so a reader
//! never waits on a running tick and always sees a whole tick.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use strata_core::BlockPos;

/// Component power at the end of one redstone tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PowerSnapshot {
    tick: u64,
    power: HashMap<BlockPos, u8>,
}

impl PowerSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(tick: u64, power: HashMap<BlockPos, u8>) -> Self {
        Self { tick, power }
    }

    /// Redstone tick the snapshot was taken after.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Power at `pos` (0 where there is no component).
    #[must_use]
    pub fn power_at(&self, pos: BlockPos) -> u8 {
        self.power.get(&pos).copied().unwrap_or(0)
    }

    /// Number of components captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.power.len()
    }

    /// Returns true if no component was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }
}

/// Writer side, owned by the simulator.
#[derive(Debug, Default)]
pub struct SnapshotPublisher {
    slot: Arc<RwLock<Arc<PowerSnapshot>>>,
}

impl SnapshotPublisher {
    /// Creates a publisher holding an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the published snapshot.
    pub fn publish(&self, snapshot: PowerSnapshot) {
        *self.slot.write() = Arc::new(snapshot);
    }

    /// A reader handle.
    #[must_use]
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader { slot: Arc::clone(&self.slot) }
    }
}

/// Reader side; clone freely across threads.
#[derive(Clone, Debug)]
pub struct SnapshotReader {
    slot: Arc<RwLock<Arc<PowerSnapshot>>>,
}

impl SnapshotReader {
    /// The most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Arc<PowerSnapshot> {
        Arc::clone(&self.slot.read())
    }
}
