//! # World
//!
//! One handle over every subsystem. Generation runs on the pool's workers;
//! everything else (player writes, ticks, queries) can be called from any
//! thread through `&World`. Player writes and redstone ticks are serialised
//! behind the simulator mutex.
//!
//! ```text
//!  set_block ──> ChunkStore ──> VoxelChanged ──┐
//!      │                                       ├──> EventBus ──> events()
//!      └──> simulator queue ──> tick() ────────┘   (ComponentChanged)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use strata_core::{
    Aabb, Block, BlockPos, BlockRegistry, ChunkCoord, ClockReader, EventBus, EventReceiver, StrataResult, TickClock,
    WorldConfig,
};
use strata_procedural::{Biome, ChunkState, ChunkStore, GenerationOutcome, GenerationPool, TerrainGenerator};
use strata_redstone::{Component, RedstoneSimulator, SnapshotReader, TickReport, VoxelGrid};

use crate::grid::StoreGrid;
use crate::stats::AreaStats;

/// Outcome counts of one [`World::generate_area`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AreaReport {
    /// Chunks that reached Ready.
    pub ready: Vec<ChunkCoord>,
    /// Chunks interrupted by shutdown.
    pub cancelled: usize,
    /// Chunks that failed for good.
    pub failed: usize,
    /// Redstone components indexed from the new chunks.
    pub components: usize,
}

/// A running world.
pub struct World {
    config: WorldConfig,
    registry: BlockRegistry,
    bus: EventBus,
    store: Arc<ChunkStore>,
    generator: Arc<TerrainGenerator>,
    pool: GenerationPool,
    simulator: Mutex<RedstoneSimulator>,
    clock: TickClock,
    shutdown: Arc<AtomicBool>,
}

impl World {
    /// Validates `config` and brings every subsystem up.
    ///
    /// # Errors
    ///
    /// Returns the configuration error when the world could not start.
    pub fn start(config: WorldConfig) -> StrataResult<Self> {
        if let Err(error) = config.validate() {
            tracing::error!(%error, "world could not start");
            return Err(error);
        }

        let registry = BlockRegistry::standard();
        let bus = EventBus::new(config.redstone.event_capacity);
        let store = Arc::new(ChunkStore::new(&config, registry.clone(), bus.sender()));
        let generator = match TerrainGenerator::new(&config, registry.clone()) {
            Ok(generator) => Arc::new(generator),
            Err(error) => {
                tracing::error!(%error, "world could not start");
                return Err(error);
            }
        };
        let pool = GenerationPool::new(Arc::clone(&generator), Arc::clone(&store), config.generation.worker_count);

        let shutdown = Arc::new(AtomicBool::new(false));
        let simulator = RedstoneSimulator::new(&config.redstone, registry.clone(), bus.sender())
            .with_shutdown(Arc::clone(&shutdown));
        let clock = TickClock::new(config.redstone.ticks_per_second);

        tracing::info!(
            seed = config.seed,
            world_type = ?config.world_type,
            workers = pool.worker_count(),
            "world started"
        );
        Ok(Self {
            config,
            registry,
            bus,
            store,
            generator,
            pool,
            simulator: Mutex::new(simulator),
            clock,
            shutdown,
        })
    }

    /// The validated configuration.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The voxel registry.
    #[must_use]
    pub const fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// The chunk store.
    #[must_use]
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// The terrain generator.
    #[must_use]
    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// A new subscriber to world events.
    #[must_use]
    pub fn events(&self) -> EventReceiver {
        self.bus.receiver()
    }

    /// Read-only view of the game clock.
    #[must_use]
    pub fn clock(&self) -> ClockReader {
        self.clock.reader()
    }

    /// Power snapshots published at the end of every redstone tick.
    #[must_use]
    pub fn power_snapshots(&self) -> SnapshotReader {
        self.simulator.lock().snapshot_reader()
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Generates the `(2 * radius + 1)²` chunks centred on `center` and
    /// indexes any redstone they hold.
    pub fn generate_area(&self, center: ChunkCoord, radius: u32) -> AreaReport {
        let r = radius as i32;
        let coords: Vec<_> = (-r..=r).flat_map(|dz| (-r..=r).map(move |dx| center.offset(dx, dz))).collect();
        self.generate_chunks(&coords)
    }

    /// Generates `coords` through the pool.
    #[tracing::instrument(level = "debug", skip_all, fields(chunks = coords.len()))]
    pub fn generate_chunks(&self, coords: &[ChunkCoord]) -> AreaReport {
        let mut report = AreaReport::default();
        for outcome in self.pool.generate_all(coords) {
            match outcome {
                GenerationOutcome::Ready(coord) => report.ready.push(coord),
                GenerationOutcome::Cancelled { coord, phase } => {
                    tracing::debug!(%coord, phase, "generation cancelled");
                    report.cancelled += 1;
                }
                GenerationOutcome::Failed { coord, error } => {
                    tracing::warn!(%coord, %error, "generation failed");
                    report.failed += 1;
                }
            }
        }

        let mut simulator = self.simulator.lock();
        let grid = StoreGrid::new(&self.store);
        for &coord in &report.ready {
            if self.holds_redstone(coord) {
                report.components += simulator.index_region(&grid, self.chunk_box(coord));
            }
        }
        drop(simulator);

        tracing::debug!(
            ready = report.ready.len(),
            cancelled = report.cancelled,
            failed = report.failed,
            components = report.components,
            "area generated"
        );
        report
    }

    /// Tallies blocks and biomes over the Ready chunks among `coords`.
    #[must_use]
    pub fn area_stats(&self, coords: &[ChunkCoord]) -> AreaStats {
        let mut stats = AreaStats::new();
        for &coord in coords {
            if let Some(chunk) = self.store.snapshot(coord).filter(|c| c.state() == ChunkState::Ready) {
                stats.add_chunk(&chunk, &self.registry);
            }
        }
        stats
    }

    fn holds_redstone(&self, coord: ChunkCoord) -> bool {
        self.store.get(coord).is_some_and(|handle| {
            handle.read().voxels().iter().any(|&block| self.registry.redstone_kind(block).is_some())
        })
    }

    fn chunk_box(&self, coord: ChunkCoord) -> Aabb {
        let low = BlockPos::new(coord.world_x(), self.store.min_y(), coord.world_z());
        Aabb::from_corners(low, low.add(15, self.store.max_y() - self.store.min_y(), 15))
    }

    // =========================================================================
    // Voxel writes and redstone inputs
    // =========================================================================

    /// Player write: lands in the store now, reaches the simulator on its
    /// next tick. Returns the previous block.
    ///
    /// Waits out a redstone tick in progress, so a tick never sees a voxel
    /// change under it.
    ///
    /// # Errors
    ///
    /// Returns `CoordinateOutOfRange` for positions past the world limit.
    pub fn set_block(&self, pos: BlockPos, block: Block) -> StrataResult<Block> {
        let simulator = self.simulator.lock();
        let old = self.store.set_block(pos, block)?;
        if old != block {
            simulator.on_voxel_changed(pos, old, block);
        }
        Ok(old)
    }

    /// Block at `pos`; air where nothing is loaded.
    #[must_use]
    pub fn block(&self, pos: BlockPos) -> Block {
        self.store.get_block(pos)
    }

    /// Flips the lever at `pos`.
    ///
    /// # Errors
    ///
    /// Returns `ComponentMissing` if there is no lever at `pos`.
    pub fn set_lever(&self, pos: BlockPos, on: bool) -> StrataResult<()> {
        self.with_redstone(|simulator, grid| simulator.set_lever(grid, pos, on))
    }

    /// Presses the button at `pos`.
    ///
    /// # Errors
    ///
    /// Returns `ComponentMissing` if there is no button at `pos`.
    pub fn press_button(&self, pos: BlockPos) -> StrataResult<()> {
        self.with_redstone(|simulator, grid| simulator.press_button(grid, pos))
    }

    /// Activates or releases the pressure plate at `pos`.
    ///
    /// # Errors
    ///
    /// Returns `ComponentMissing` if there is no plate at `pos`.
    pub fn set_pressure_plate(&self, pos: BlockPos, active: bool) -> StrataResult<()> {
        self.with_redstone(|simulator, grid| simulator.set_pressure_plate(grid, pos, active))
    }

    /// Sets the output level of the power source at `pos`.
    ///
    /// # Errors
    ///
    /// Returns `ComponentMissing` if there is no source at `pos`.
    pub fn set_source_level(&self, pos: BlockPos, level: u8) -> StrataResult<()> {
        self.with_redstone(|simulator, grid| simulator.set_source_level(grid, pos, level))
    }

    /// Runs `f` with the simulator locked and a grid over the store.
    pub fn with_redstone<R>(&self, f: impl FnOnce(&mut RedstoneSimulator, &mut dyn VoxelGrid) -> R) -> R {
        let mut simulator = self.simulator.lock();
        let grid: &mut dyn VoxelGrid = &mut StoreGrid::new(&self.store);
        f(&mut *simulator, grid)
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Advances the clock one game tick: relights edited chunks and runs a
    /// redstone tick when one is due.
    pub fn tick(&self) -> Option<TickReport> {
        let game_tick = self.clock.advance();
        let relit = self.store.relight_dirty();
        if relit > 0 {
            tracing::trace!(game_tick, relit, "chunks relit");
        }
        self.with_redstone(|simulator, grid| simulator.tick(grid, game_tick))
    }

    /// Runs `count` game ticks; returns the redstone ticks that ran.
    pub fn run_ticks(&self, count: u64) -> Vec<TickReport> {
        (0..count).filter_map(|_| self.tick()).collect()
    }

    /// Runs game ticks until `redstone_ticks` redstone ticks have run.
    pub fn run_redstone_ticks(&self, redstone_ticks: u64) -> Vec<TickReport> {
        let mut reports = Vec::new();
        while (reports.len() as u64) < redstone_ticks && !self.shutdown.load(Ordering::Acquire) {
            if let Some(report) = self.tick() {
                reports.push(report);
            }
        }
        reports
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Column height: the height map of a Ready chunk, `min_y - 1` elsewhere.
    #[must_use]
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        self.store.height_at(x, z)
    }

    /// Biome of column `(x, z)`: the stored biome of a Ready chunk, or the
    /// classifier's answer where nothing is generated yet.
    #[must_use]
    pub fn biome_at(&self, x: i32, z: i32) -> Biome {
        let pos = BlockPos::new(x, 0, z);
        let stored = self.store.get(pos.chunk()).and_then(|handle| {
            let chunk = handle.read();
            (chunk.state() == ChunkState::Ready).then(|| {
                let (lx, lz) = pos.local_xz();
                chunk.biome_at(lx, lz)
            })
        });
        stored.unwrap_or_else(|| self.generator.shape().column(x, z).biome)
    }

    /// Temperature field at `(x, z)`, in `[-1, 1]`.
    #[must_use]
    pub fn temperature_at(&self, x: i32, z: i32) -> f64 {
        self.generator.shape().classifier().temperature(x, z)
    }

    /// Humidity field at `(x, z)`, in `[-1, 1]`.
    #[must_use]
    pub fn humidity_at(&self, x: i32, z: i32) -> f64 {
        self.generator.shape().classifier().humidity(x, z)
    }

    /// Redstone power at `pos`.
    #[must_use]
    pub fn power_at(&self, pos: BlockPos) -> u8 {
        self.simulator.lock().power_at(pos)
    }

    /// Copy of the component at `pos`.
    #[must_use]
    pub fn component_at(&self, pos: BlockPos) -> Option<Component> {
        self.simulator.lock().component_at(pos).cloned()
    }

    /// Light at `pos` for a daylight factor in `[0, 1]`.
    #[must_use]
    pub fn light_at(&self, pos: BlockPos, daylight: f32) -> u8 {
        self.store.effective_light(pos, daylight)
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Returns true once [`World::shutdown`] has begun.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stops ticking, cancels outstanding generation and joins the workers.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Release);
        self.pool.shutdown();
        tracing::info!(game_tick = self.clock.now(), "world stopped");
    }
}
