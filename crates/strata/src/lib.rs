//! # STRATA
//!
//! The world core: procedural terrain and redstone behind one handle.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                              World                                │
//! ├───────────────────────────────────────────────────────────────────┤
//! │                                                                   │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │  │ GenerationPool   │──>│ ChunkStore       │<──│ Redstone     │  │
//! │  │  • workers       │   │  • chunk locks   │   │ Simulator    │  │
//! │  │  • 8 phases      │   │  • claims        │   │  • queue     │  │
//! │  └──────────────────┘   │  • height/light  │   │  • wires     │  │
//! │                         └────────┬─────────┘   │  • pistons   │  │
//! │                                  │             └──────┬───────┘  │
//! │                                  v                    v          │
//! │                         ┌──────────────────────────────────┐     │
//! │                         │ EventBus (VoxelChanged,          │     │
//! │                         │  ComponentChanged, ChunkReady)   │     │
//! │                         └──────────────────────────────────┘     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`world`]: the facade and its tick
//! - [`grid`]: simulator voxel access over the chunk store
//! - [`stats`]: block and biome tallies
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata::World;
//! use strata_core::{ChunkCoord, WorldConfig};
//!
//! let world = World::start(WorldConfig::default())?;
//! world.generate_area(ChunkCoord::new(0, 0), 2);
//! let surface = world.height_at(8, 8);
//! world.tick();
//! world.shutdown();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod grid;
pub mod stats;
pub mod world;

// Re-export the subsystems
pub use strata_core;
pub use strata_procedural;
pub use strata_redstone;

pub use grid::StoreGrid;
pub use stats::AreaStats;
pub use world::{AreaReport, World};
