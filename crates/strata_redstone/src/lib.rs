//! # STRATA Redstone
//!
//! Discrete-event simulation of redstone circuits over the voxel world.
//!
//! ## Design Principles
//!
//! 1. **Atomic ticks**: a redstone tick runs to the end or is skipped
//! 2. **Deterministic**: same-tick events fire in scheduling order
//! 3. **Voxel-backed**: every component mirrors a voxel, and follows it
//! 4. **Bounded delay**: a circuit settles within its longest delay plus two ticks
//!
//! ## Core Components
//!
//! - [`component`]: per-voxel component state and emission rules
//! - [`scheduler`]: the `(due, seq)` event queue
//! - [`wire`]: wire region settling
//! - [`piston`]: push planning and block movement
//! - [`snapshot`]: power snapshots for other threads
//! - [`simulator`]: the tick loop tying it together
//! - [`grid`]: voxel access the simulator runs over
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::{ids, Block, BlockPos, BlockRegistry, EventSender, RedstoneConfig};
//! use strata_redstone::{RedstoneSimulator, SparseGrid};
//!
//! let mut grid = SparseGrid::new(0, 255);
//! let mut sim = RedstoneSimulator::new(&RedstoneConfig::default(), BlockRegistry::standard(), EventSender::disconnected());
//! sim.place_component(&mut grid, BlockPos::new(0, 64, 0), Block::new(ids::LEVER));
//! sim.step(&mut grid);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod component;
pub mod grid;
pub mod piston;
pub mod scheduler;
pub mod simulator;
pub mod snapshot;
pub mod wire;

pub use component::{Component, ComponentState, Scheduled, TorchHistory, MAX_DELAY, MAX_POWER};
pub use grid::{SparseGrid, VoxelGrid};
pub use piston::{apply_pull, apply_push, head_for, plan_push, PushPlan, VoxelWrite};
pub use scheduler::{EventAction, EventQueue, RedstoneEvent};
pub use simulator::{ChangeSender, RedstoneSimulator, TickReport, VoxelChange};
pub use snapshot::{PowerSnapshot, SnapshotPublisher, SnapshotReader};
