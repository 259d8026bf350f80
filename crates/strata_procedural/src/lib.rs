//! # STRATA Procedural Generation
//!
//! Deterministic, chunked world generation.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same seed and chunk coordinate give the same bytes
//! 2. **Phased**: eight generation phases, never skipped or reordered
//! 3. **Order-independent**: neighbours may generate in any order or in parallel
//! 4. **Resumable**: a cancelled chunk resumes from its last completed phase
//!
//! ## Core Components
//!
//! - [`noise`]: gradient, value and cellular noise with fractal stacking
//! - [`biome`]: climate fields and biome classification
//! - [`chunk`]: the voxel tile, its light, maps and generation state
//! - [`store`]: concurrent chunk store with neighbourhood claims
//! - [`generator`]: the eight-phase terrain pipeline
//! - [`light`]: sky and block light
//! - [`pool`]: worker threads feeding the store
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_core::{BlockRegistry, ChunkCoord, WorldConfig};
//! use strata_procedural::TerrainGenerator;
//!
//! let generator = TerrainGenerator::new(&WorldConfig::default(), BlockRegistry::standard())?;
//! let chunk = generator.generate(ChunkCoord::new(0, 0))?;
//! assert!(chunk.height_at(0, 0) > 0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod biome;
pub mod cache;
pub mod chunk;
pub mod generator;
pub mod light;
pub mod noise;
pub mod pool;
pub mod sink;
pub mod store;

pub use biome::{Biome, BiomeClassifier, BiomeDescriptor, BiomeTable, Climate, FeatureKind, FeatureWeights};
pub use cache::ChunkCache;
pub use chunk::{Chunk, ChunkState, PendingEdit, Phase, WriteOrigin, WriteTag};
pub use generator::structures::{StructureKind, StructurePlan};
pub use generator::{FeatureWriter, TerrainGenerator};
pub use light::{compute_light, effective_light, MAX_LIGHT};
pub use noise::{CachedNoise, HybridNoise, Noise, NoiseField};
pub use pool::{GenerationOutcome, GenerationPool};
pub use sink::{CaptureSink, DiscardSink, FeatureSink};
pub use store::{ChunkHandle, ChunkStore, NeighbourhoodGuard, StoreSink};
