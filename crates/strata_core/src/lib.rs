//! # STRATA Core
//!
//! Shared vocabulary of the world simulation core.
//!
//! ## Contents
//!
//! - [`coords`] - block positions, chunk coordinates, facings, boxes
//! - [`seed`] - world seeds and the world-defining seed hash
//! - [`block`] - the voxel registry
//! - [`config`] - TOML world configuration
//! - [`error`] - the error taxonomy
//! - [`clock`] - game-tick clock and pacing
//! - [`events`] - the world event bus
//! - [`cache`] - sharded LRU memoisation
//!
//! Nothing in here generates terrain or simulates redstone; those live in
//! `strata_procedural` and `strata_redstone`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod block;
pub mod cache;
pub mod clock;
pub mod config;
pub mod coords;
pub mod error;
pub mod events;
pub mod seed;

pub use block::{ids, Block, BlockClass, BlockProperties, BlockRegistry, PistonBehavior, RedstoneKind};
pub use cache::ShardedLru;
pub use clock::{ClockReader, TickClock, TickLoop, TickStats};
pub use config::{
    CacheConfig, FractalMode, GenerationConfig, NoiseConfig, NoiseKind, NoiseQuality, RedstoneConfig, WorldConfig,
    WorldType,
};
pub use coords::{Aabb, BlockPos, ChunkCoord, Facing, CHUNK_SIZE, CHUNK_SIZE_I32, MAX_CHUNK_COORD};
pub use error::{StrataError, StrataResult};
pub use events::{EventBus, EventReceiver, EventSender, WorldEvent};
pub use seed::{seed_hash, SplitMix64, WorldSeed};
