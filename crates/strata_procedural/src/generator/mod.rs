//! # Terrain Generator
//!
//! Eight phases, always in this order, each recorded on the chunk when it
//! completes:
//!
//! ```text
//! 1 base-terrain  height field fill             own chunk
//! 2 biome         biome map, repaint, water     own chunk
//! 3 caves         noise caves + worm slices     own chunk
//! 4 features      ore slices, boulders, pools   own chunk
//! 5 vegetation    trees, plants                 may spill into neighbours
//! 6 structures    structure slices              own chunk
//! 7 lighting      sky + block light             own chunk
//! 8 finalize      height map, Ready             own chunk
//! ```
//!
//! Each phase draws from its own RNG seeded by `(seed, cx, cz, phase name)`,
//! so a chunk interrupted between phases resumes to the same bytes.
//!
//! Two drivers share the phase code:
//! - [`TerrainGenerator::generate_in_store`] runs inside a [`ChunkStore`],
//!   claiming the neighbourhood for phases 5..=8.
//! - [`TerrainGenerator::generate`] builds one chunk in isolation, replaying
//!   its neighbours' vegetation to collect what they spill into it. The
//!   result equals the stored chunk once its whole neighbourhood is Ready.

pub mod caves;
pub mod features;
pub mod structures;
pub mod terrain;
pub mod vegetation;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strata_core::{
    Block, BlockPos, BlockRegistry, ChunkCoord, StrataError, StrataResult, WorldConfig, WorldEvent, WorldSeed,
    WorldType,
};

use crate::biome::Biome;
use crate::cache::ChunkCache;
use crate::chunk::{Chunk, ChunkState, Phase, WriteTag};
use crate::light::compute_light;
use crate::sink::{CaptureSink, DiscardSink, FeatureSink};
use crate::store::{ChunkStore, StoreSink};

use self::caves::CaveCarver;
use self::features::FeaturePlacer;
use self::structures::StructureLayout;
use self::terrain::TerrainShape;
use self::vegetation::VegetationPlacer;

/// Phases that only read and write their own chunk.
const LOCAL_PHASES: [Phase; 5] = [Phase::BaseTerrain, Phase::Biome, Phase::Caves, Phase::Features, Phase::Vegetation];
/// Phases after neighbour spills are merged.
const LATE_PHASES: [Phase; 3] = [Phase::Structures, Phase::Lighting, Phase::Finalize];

/// Writes feature blocks: into the chunk directly, elsewhere through a sink.
pub struct FeatureWriter<'a> {
    pub(crate) chunk: &'a mut Chunk,
    sink: &'a mut dyn FeatureSink,
    registry: &'a BlockRegistry,
}

impl<'a> FeatureWriter<'a> {
    /// Creates a writer over `chunk`.
    pub fn new(chunk: &'a mut Chunk, sink: &'a mut dyn FeatureSink, registry: &'a BlockRegistry) -> Self {
        Self { chunk, sink, registry }
    }

    /// Writes one block with the merge rule, wherever it lands.
    pub fn put(&mut self, pos: BlockPos, block: Block, tag: WriteTag) {
        if let Some((x, y, z)) = self.chunk.local(pos) {
            self.chunk.merge_write(x, y, z, block, tag, self.registry);
        } else if pos.y >= self.chunk.min_y() && pos.y <= self.chunk.max_y() {
            self.sink.spill(pos, block, tag);
        }
    }
}

/// Fails with `CancelRequested` once `cancel` is set.
fn check_cancel(cancel: Option<&AtomicBool>, coord: ChunkCoord, phase: Phase) -> StrataResult<()> {
    if cancel.is_some_and(|flag| flag.load(Ordering::Acquire)) {
        return Err(StrataError::CancelRequested { cx: coord.x, cz: coord.z, phase: phase.name() });
    }
    Ok(())
}

/// Deterministic chunk generator.
pub struct TerrainGenerator {
    seed: WorldSeed,
    config: WorldConfig,
    registry: BlockRegistry,
    shape: TerrainShape,
    caves: CaveCarver,
    features: FeaturePlacer,
    vegetation: VegetationPlacer,
    structures: StructureLayout,
    cache: ChunkCache,
}

impl TerrainGenerator {
    /// Builds a generator for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation.
    pub fn new(config: &WorldConfig, registry: BlockRegistry) -> StrataResult<Self> {
        config.validate()?;
        let seed = WorldSeed::from_signed(config.seed);
        let gen = &config.generation;
        Ok(Self {
            seed,
            shape: TerrainShape::new(seed, config)?,
            caves: CaveCarver::new(seed, config)?,
            features: FeaturePlacer::new(seed, gen.ore_density, config.min_y, config.max_y),
            vegetation: VegetationPlacer::new(seed, gen.vegetation_density),
            structures: StructureLayout::new(seed, gen.min_structure_spacing, config.min_y, config.max_y),
            cache: ChunkCache::new(config.cache.chunk_capacity),
            config: config.clone(),
            registry,
        })
    }

    /// Forces every column into a dimension biome (Nether, End).
    #[must_use]
    pub fn with_dimension(mut self, biome: Biome) -> Self {
        self.shape = self.shape.with_dimension(biome);
        self.cache.clear();
        self
    }

    /// World seed.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Block registry.
    #[must_use]
    pub const fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// The pure column function.
    #[must_use]
    pub const fn shape(&self) -> &TerrainShape {
        &self.shape
    }

    /// Structure layout.
    #[must_use]
    pub const fn structures(&self) -> &StructureLayout {
        &self.structures
    }

    /// Cache `(hits, misses)`.
    #[must_use]
    pub fn cache_stats(&self) -> (u64, u64) {
        self.cache.stats()
    }

    /// A fresh Empty chunk sized for this world.
    #[must_use]
    pub fn new_chunk(&self, coord: ChunkCoord) -> Chunk {
        Chunk::new(coord, self.config.min_y, self.config.max_y)
    }

    fn decorates(&self) -> bool {
        self.config.world_type != WorldType::Flat
    }

    /// Runs `phase` if it is the chunk's next phase.
    ///
    /// Flat worlds skip carving and decoration but still record the phases.
    /// Returns false if the chunk was not ready for `phase`.
    #[tracing::instrument(level = "trace", skip_all, fields(coord = %chunk.coord(), phase = phase.name()))]
    pub fn run_phase(&self, chunk: &mut Chunk, phase: Phase, sink: &mut dyn FeatureSink) -> bool {
        if chunk.state() != phase.requires() {
            return false;
        }
        let decorate = self.decorates();
        match phase {
            Phase::BaseTerrain => self.shape.fill_base(chunk),
            Phase::Biome => self.shape.apply_biomes(chunk),
            Phase::Caves if decorate => self.caves.carve(chunk),
            Phase::Features if decorate => self.features.place(&self.shape, chunk),
            Phase::Vegetation if decorate => {
                self.vegetation.place(&self.shape, &mut FeatureWriter::new(chunk, sink, &self.registry));
            }
            Phase::Structures if decorate => self.structures.stamp(&self.shape, chunk, &self.registry),
            Phase::Lighting => compute_light(chunk, &self.registry),
            Phase::Finalize => chunk.recompute_height_map(),
            Phase::Caves | Phase::Features | Phase::Vegetation | Phase::Structures => {}
        }
        chunk.mark_phase_complete(phase, &self.registry);
        if phase == Phase::Finalize && chunk.is_dirty() {
            // Edits buffered while generating landed just now.
            compute_light(chunk, &self.registry);
        }
        tracing::trace!("phase complete");
        true
    }

    /// Runs every remaining phase on `chunk`, spilling into `sink`.
    ///
    /// # Errors
    ///
    /// Returns `CancelRequested` if `cancel` is set at a phase boundary; the
    /// chunk keeps its last completed phase.
    pub fn generate_chunk(
        &self,
        chunk: &mut Chunk,
        sink: &mut dyn FeatureSink,
        cancel: Option<&AtomicBool>,
    ) -> StrataResult<()> {
        while let Some(phase) = Phase::next_for(chunk.state()) {
            check_cancel(cancel, chunk.coord(), phase)?;
            self.run_phase(chunk, phase, sink);
        }
        Ok(())
    }

    /// Generates one chunk in isolation, including what its eight neighbours'
    /// vegetation spills into it. Cached by `(seed, cx, cz)`.
    ///
    /// # Errors
    ///
    /// Returns `CoordinateOutOfRange` past the world limit.
    pub fn generate(&self, coord: ChunkCoord) -> StrataResult<Arc<Chunk>> {
        coord.validate()?;
        if let Some(chunk) = self.cache.get(self.seed, coord) {
            return Ok(chunk);
        }

        let mut chunk = self.new_chunk(coord);
        for phase in LOCAL_PHASES {
            self.run_phase(&mut chunk, phase, &mut DiscardSink);
        }
        if self.decorates() {
            let mut capture = CaptureSink::new(coord);
            for neighbour in coord.neighbourhood() {
                if neighbour == coord || neighbour.validate().is_err() {
                    continue;
                }
                let mut scratch = self.new_chunk(neighbour);
                for phase in LOCAL_PHASES {
                    self.run_phase(&mut scratch, phase, &mut capture);
                }
            }
            for edit in capture.into_edits() {
                if let Some((x, y, z)) = chunk.local(edit.pos) {
                    chunk.merge_write(x, y, z, edit.block, edit.tag, &self.registry);
                }
            }
        }
        for phase in LATE_PHASES {
            self.run_phase(&mut chunk, phase, &mut DiscardSink);
        }

        let chunk = Arc::new(chunk);
        self.cache.insert(self.seed, Arc::clone(&chunk));
        tracing::debug!(%coord, "generated chunk in isolation");
        Ok(chunk)
    }

    /// Generates (or resumes) `coord` inside `store`.
    ///
    /// Phases 1..=4 run under the chunk's own lock. Phases 5..=8 need the
    /// 3x3 neighbourhood claim; on success the chunk is Ready and a
    /// `ChunkReady` event is sent.
    ///
    /// # Errors
    ///
    /// - `CoordinateOutOfRange` past the world limit
    /// - `NeighbourhoodBusy` if the claim fails (chunk stays at its last phase)
    /// - `CancelRequested` if `cancel` is set at a phase boundary
    pub fn generate_in_store(&self, store: &ChunkStore, coord: ChunkCoord, cancel: &AtomicBool) -> StrataResult<()> {
        let handle = store.get_or_create(coord)?;
        loop {
            let mut chunk = handle.write();
            match Phase::next_for(chunk.state()) {
                Some(phase) if phase < Phase::Vegetation => {
                    check_cancel(Some(cancel), coord, phase)?;
                    self.run_phase(&mut chunk, phase, &mut DiscardSink);
                }
                _ => break,
            }
        }
        if handle.read().state() == ChunkState::Ready {
            return Ok(());
        }

        let _claim = store.try_claim(coord)?;
        let mut touched = BTreeSet::new();
        loop {
            let mut chunk = handle.write();
            let Some(phase) = Phase::next_for(chunk.state()) else { break };
            check_cancel(Some(cancel), coord, phase)?;
            let mut sink = StoreSink::new(store);
            self.run_phase(&mut chunk, phase, &mut sink);
            touched.extend(sink.touched().iter().copied());
            if phase == Phase::Finalize {
                drop(chunk);
                store.events().send(WorldEvent::ChunkReady { coord });
                tracing::debug!(%coord, "chunk ready");
            }
        }
        touched.remove(&coord);
        store.refresh_after_spill(&touched);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{ids, EventBus};

    fn generator(world_type: WorldType) -> TerrainGenerator {
        let config = WorldConfig { seed: 42, world_type, ..WorldConfig::default() };
        TerrainGenerator::new(&config, BlockRegistry::standard()).unwrap()
    }

    #[test]
    fn test_phases_recorded_in_order() {
        let gen = generator(WorldType::Normal);
        let mut chunk = gen.new_chunk(ChunkCoord::new(0, 0));
        assert!(!gen.run_phase(&mut chunk, Phase::Caves, &mut DiscardSink));
        for phase in Phase::ALL {
            assert!(gen.run_phase(&mut chunk, phase, &mut DiscardSink));
            assert_eq!(chunk.state(), phase.completes());
        }
        assert!(!gen.run_phase(&mut chunk, Phase::Finalize, &mut DiscardSink));
    }

    #[test]
    fn test_generate_is_cached() {
        let gen = generator(WorldType::Normal);
        let a = gen.generate(ChunkCoord::new(1, 1)).unwrap();
        let b = gen.generate(ChunkCoord::new(1, 1)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(gen.cache_stats(), (1, 1));
        assert_eq!(a.state(), ChunkState::Ready);
    }

    #[test]
    fn test_cancel_keeps_last_phase() {
        let gen = generator(WorldType::Normal);
        let mut chunk = gen.new_chunk(ChunkCoord::new(0, 0));
        gen.run_phase(&mut chunk, Phase::BaseTerrain, &mut DiscardSink);
        let cancel = AtomicBool::new(true);
        let err = gen.generate_chunk(&mut chunk, &mut DiscardSink, Some(&cancel)).unwrap_err();
        assert!(matches!(err, StrataError::CancelRequested { phase: "biome", .. }));
        assert_eq!(chunk.state(), ChunkState::BaseFilled);

        cancel.store(false, Ordering::Release);
        gen.generate_chunk(&mut chunk, &mut DiscardSink, Some(&cancel)).unwrap();
        let mut fresh = gen.new_chunk(ChunkCoord::new(0, 0));
        gen.generate_chunk(&mut fresh, &mut DiscardSink, None).unwrap();
        assert_eq!(chunk.content_digest(), fresh.content_digest());
    }

    #[test]
    fn test_store_claim_busy_leaves_featured() {
        let gen = generator(WorldType::Normal);
        let bus = EventBus::new(16);
        let store = ChunkStore::new(gen.config(), BlockRegistry::standard(), bus.sender());
        let claim = store.try_claim(ChunkCoord::new(1, 0)).unwrap();
        let cancel = AtomicBool::new(false);
        let err = gen.generate_in_store(&store, ChunkCoord::new(0, 0), &cancel).unwrap_err();
        assert!(matches!(err, StrataError::NeighbourhoodBusy { cx: 0, cz: 0 }));
        assert_eq!(store.state(ChunkCoord::new(0, 0)), Some(ChunkState::Featured));
        drop(claim);
        gen.generate_in_store(&store, ChunkCoord::new(0, 0), &cancel).unwrap();
        assert!(store.is_ready(ChunkCoord::new(0, 0)));
        assert!(bus.receiver().drain().contains(&WorldEvent::ChunkReady { coord: ChunkCoord::new(0, 0) }));
    }

    #[test]
    fn test_cave_carve_golden_count() {
        let mut config = WorldConfig { seed: 42, ..WorldConfig::default() };
        config.generation.cave_density = 0.1;
        let gen = TerrainGenerator::new(&config, BlockRegistry::standard()).unwrap();
        let chunk = gen.generate(ChunkCoord::new(0, 0)).unwrap();
        assert_eq!(chunk.count_where(10..=40, |b| b.is_air()), 72);
    }

    #[test]
    fn test_flat_world_scenario() {
        let gen = generator(WorldType::Flat);
        let chunk = gen.generate(ChunkCoord::new(0, 0)).unwrap();
        for z in 0..16 {
            for x in 0..16 {
                assert_eq!(chunk.height_at(x, z), 64);
                assert_eq!(chunk.get(x, 64, z), Block::GRASS);
                assert_eq!(chunk.get(x, 63, z), Block::DIRT);
                assert_eq!(chunk.get(x, 60, z), Block::STONE);
                assert_eq!(chunk.sky_light(x, 65, z), 15);
            }
        }
        assert_eq!(chunk.count_where(0..=255, |b| b.id == ids::BEDROCK), 0);
    }
}
