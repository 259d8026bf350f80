//! # Terrain Shape
//!
//! The pure column function behind phases 1 and 2. Every other phase that
//! needs a height or biome outside its own chunk (structure anchors, ore
//! biome weights) asks this module instead of reading a neighbour, so the
//! answer never depends on what has been generated.
//!
//! ```text
//! base    = sea + continentalness * amplitude + detail * detail_amplitude
//! biome   = classify(climate, base - sea)
//! height  = base + blended biome offset + detail * detail_amplitude * (variance - 1)
//! ```

use strata_core::{ids, Block, StrataResult, WorldConfig, WorldSeed, WorldType, CHUNK_SIZE};

use crate::biome::{Biome, BiomeClassifier, BiomeDescriptor, BiomeTable};
use crate::chunk::Chunk;
use crate::noise::{CachedNoise, Noise, NoiseField};

/// Layers of dirt under the grass of a flat world.
pub const FLAT_DIRT_LAYERS: i32 = 3;

/// Block phase 1 leaves on top of each column until the biome pass paints
/// the real surface.
pub const SURFACE_MARKER: Block = Block::GRASS;

/// One evaluated terrain column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnSample {
    /// Continentalness in `[-1, 1]`.
    pub continentalness: f64,
    /// Height after phase 1.
    pub base_height: i32,
    /// Height after biome adjustment.
    pub height: i32,
    /// Column biome.
    pub biome: Biome,
}

/// Deterministic column heights and biomes.
pub struct TerrainShape {
    continent: CachedNoise<Noise>,
    detail: CachedNoise<Noise>,
    classifier: BiomeClassifier,
    biomes: BiomeTable,
    world_type: WorldType,
    dimension: Option<Biome>,
    sea_level: i32,
    min_y: i32,
    max_y: i32,
    height_amplitude: f64,
    detail_amplitude: f64,
    surface_depth: i32,
    subsurface_depth: i32,
}

impl TerrainShape {
    /// Builds the shape for a world.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a noise layer is invalid.
    pub fn new(seed: WorldSeed, config: &WorldConfig) -> StrataResult<Self> {
        let gen = &config.generation;
        let cache = &config.cache;
        let amplitude = match config.world_type {
            WorldType::Amplified => gen.height_amplitude * gen.amplified_factor,
            WorldType::Normal | WorldType::Flat => gen.height_amplitude,
        };
        Ok(Self {
            continent: CachedNoise::new(
                Noise::new(seed, gen.base_noise)?,
                cache.noise_capacity,
                cache.noise_shards,
            ),
            detail: CachedNoise::new(
                Noise::new(seed, gen.detail_noise)?,
                cache.noise_capacity,
                cache.noise_shards,
            ),
            classifier: BiomeClassifier::new(seed, gen)?,
            biomes: BiomeTable::standard(),
            world_type: config.world_type,
            dimension: None,
            sea_level: config.sea_level,
            min_y: config.min_y,
            max_y: config.max_y,
            height_amplitude: amplitude,
            detail_amplitude: gen.detail_amplitude,
            surface_depth: gen.surface_depth as i32,
            subsurface_depth: gen.subsurface_depth as i32,
        })
    }

    /// Forces every column into a dimension biome (Nether, End).
    #[must_use]
    pub fn with_dimension(mut self, biome: Biome) -> Self {
        self.classifier = self.classifier.with_dimension(biome);
        self.dimension = Some(biome);
        self
    }

    /// Biome descriptors.
    #[must_use]
    pub const fn biomes(&self) -> &BiomeTable {
        &self.biomes
    }

    /// Climate fields and classification.
    #[must_use]
    pub const fn classifier(&self) -> &BiomeClassifier {
        &self.classifier
    }

    /// Sea level.
    #[must_use]
    pub const fn sea_level(&self) -> i32 {
        self.sea_level
    }

    /// World type.
    #[must_use]
    pub const fn world_type(&self) -> WorldType {
        self.world_type
    }

    /// Continentalness at world `(x, z)`.
    #[must_use]
    pub fn continentalness(&self, x: i32, z: i32) -> f64 {
        self.continent.field_2d(f64::from(x), f64::from(z))
    }

    fn clamp_y(&self, y: f64) -> i32 {
        (y.round() as i32).clamp(self.min_y, self.max_y)
    }

    /// Evaluates the column at world `(x, z)`.
    #[must_use]
    pub fn column(&self, x: i32, z: i32) -> ColumnSample {
        if self.world_type == WorldType::Flat {
            return ColumnSample {
                continentalness: 0.0,
                base_height: self.sea_level,
                height: self.sea_level,
                biome: self.dimension.unwrap_or(Biome::Plains),
            };
        }
        let continentalness = self.continentalness(x, z);
        let detail = self.detail.field_2d(f64::from(x), f64::from(z)) * self.detail_amplitude;
        let raw = f64::from(self.sea_level) + continentalness * self.height_amplitude + detail;
        let base_height = self.clamp_y(raw);
        let above_sea = f64::from(base_height - self.sea_level);

        let biome = self.classifier.classify_at(x, z, continentalness, above_sea);
        let desc = self.biomes.get(biome);
        let offset = if biome.is_ocean() {
            desc.base_height_offset
        } else {
            let ocean = self.biomes.get(Biome::Ocean).base_height_offset;
            let t = self.classifier.coastal_blend(above_sea);
            ocean + (desc.base_height_offset - ocean) * t
        };
        let variance = detail * (desc.height_variance - 1.0);
        ColumnSample { continentalness, base_height, height: self.clamp_y(raw + offset + variance), biome }
    }

    /// Filler below the surface layers.
    #[must_use]
    pub const fn fill_block(&self) -> Block {
        match self.dimension {
            Some(Biome::Nether) => Block::new(ids::NETHERRACK),
            Some(Biome::End) => Block::new(ids::END_STONE),
            _ => Block::STONE,
        }
    }

    /// Fluid poured up to sea level, if any.
    #[must_use]
    pub const fn sea_fluid(&self) -> Option<Block> {
        match self.dimension {
            Some(Biome::Nether) => Some(Block::new(ids::LAVA)),
            Some(Biome::End) => None,
            _ => Some(Block::WATER),
        }
    }

    /// Phase 1: fills every column up to its base height, with the surface
    /// marker on top and fill below.
    pub fn fill_base(&self, chunk: &mut Chunk) {
        let origin_x = chunk.coord().world_x();
        let origin_z = chunk.coord().world_z();
        let fill = self.fill_block();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                if self.world_type == WorldType::Flat {
                    self.fill_flat_column(chunk, x, z);
                    continue;
                }
                let top = self.column(origin_x + x as i32, origin_z + z as i32).base_height;
                for y in self.min_y..top {
                    chunk.set(x, y, z, fill);
                }
                chunk.set(x, top, z, SURFACE_MARKER);
                chunk.set(x, self.min_y, z, Block::BEDROCK);
            }
        }
    }

    fn fill_flat_column(&self, chunk: &mut Chunk, x: usize, z: usize) {
        for y in self.min_y..=self.sea_level {
            let block = if y == self.sea_level {
                Block::GRASS
            } else if y >= self.sea_level - FLAT_DIRT_LAYERS {
                Block::DIRT
            } else {
                Block::STONE
            };
            chunk.set(x, y, z, block);
        }
    }

    /// Phase 2: biome map, erosion/deposition toward the final height,
    /// surface repaint and sea fill.
    pub fn apply_biomes(&self, chunk: &mut Chunk) {
        let origin_x = chunk.coord().world_x();
        let origin_z = chunk.coord().world_z();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let sample = self.column(origin_x + x as i32, origin_z + z as i32);
                chunk.set_biome(x, z, sample.biome);
                if self.world_type == WorldType::Flat {
                    continue;
                }
                self.reshape_column(chunk, x, z, sample);
            }
        }
    }

    fn reshape_column(&self, chunk: &mut Chunk, x: usize, z: usize, sample: ColumnSample) {
        let fill = self.fill_block();
        let (base, height) = (sample.base_height, sample.height);
        if base > self.min_y {
            // Phase 1 marker back to fill; the repaint below picks the surface.
            chunk.set(x, base, z, fill);
        }
        if height > base {
            for y in base + 1..=height {
                chunk.set(x, y, z, fill);
            }
        } else {
            for y in height + 1..=base {
                chunk.set(x, y, z, Block::AIR);
            }
        }

        let desc: &BiomeDescriptor = self.biomes.get(sample.biome);
        let underwater = height < self.sea_level;
        let (surface, sub) = if underwater && !sample.biome.is_ocean() && self.dimension.is_none() {
            (Block::SAND, Block::SAND)
        } else {
            (desc.surface_block, desc.sub_surface_block)
        };
        let surface_bottom = height - self.surface_depth + 1;
        let sub_bottom = surface_bottom - self.subsurface_depth;
        for y in (sub_bottom.max(self.min_y + 1)..=height).rev() {
            chunk.set(x, y, z, if y >= surface_bottom { surface } else { sub });
        }

        if let Some(fluid) = self.sea_fluid() {
            for y in height + 1..=self.sea_level.min(self.max_y) {
                chunk.set(x, y, z, fluid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ChunkCoord;

    fn shape(world_type: WorldType) -> TerrainShape {
        let config = WorldConfig { seed: 42, world_type, ..WorldConfig::default() };
        TerrainShape::new(WorldSeed::from_signed(42), &config).unwrap()
    }

    #[test]
    fn test_base_fill_marks_the_surface() {
        let shape = shape(WorldType::Normal);
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0), 0, 255);
        shape.fill_base(&mut chunk);
        for (x, z) in [(0usize, 0usize), (7, 9), (15, 15)] {
            let base = shape.column(x as i32, z as i32).base_height;
            assert_eq!(chunk.get(x, base, z), SURFACE_MARKER);
            assert_eq!(chunk.get(x, base - 1, z), Block::STONE);
            assert!(chunk.get(x, base + 1, z).is_air());
            assert_eq!(chunk.get(x, 0, z), Block::BEDROCK);
        }

        shape.apply_biomes(&mut chunk);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let height = shape.column(x as i32, z as i32).height;
                let painted = height - shape.surface_depth - shape.subsurface_depth + 1;
                for y in 1..painted {
                    assert_eq!(chunk.get(x, y, z), Block::STONE, "marker left at ({x}, {y}, {z})");
                }
            }
        }
    }

    #[test]
    fn test_column_deterministic() {
        let a = shape(WorldType::Normal);
        let b = shape(WorldType::Normal);
        for (x, z) in [(0, 0), (123, -77), (-4000, 9000)] {
            assert_eq!(a.column(x, z), b.column(x, z));
        }
    }

    #[test]
    fn test_column_heights_in_range() {
        let s = shape(WorldType::Amplified);
        for x in (-512..512).step_by(37) {
            for z in (-512..512).step_by(41) {
                let c = s.column(x, z);
                assert!((0..=255).contains(&c.height));
                assert!((0..=255).contains(&c.base_height));
            }
        }
    }

    #[test]
    fn test_ocean_columns_are_below_sea() {
        let s = shape(WorldType::Normal);
        for x in (-2048..2048).step_by(61) {
            for z in (-2048..2048).step_by(67) {
                let c = s.column(x, z);
                if c.biome.is_ocean() {
                    assert!(c.base_height < s.sea_level());
                }
            }
        }
    }

    #[test]
    fn test_flat_columns() {
        let s = shape(WorldType::Flat);
        let mut chunk = Chunk::new(ChunkCoord::new(5, -9), 0, 255);
        s.fill_base(&mut chunk);
        s.apply_biomes(&mut chunk);
        for (x, z) in [(0, 0), (15, 15), (7, 3)] {
            assert_eq!(chunk.get(x, 64, z), Block::GRASS);
            for y in 61..64 {
                assert_eq!(chunk.get(x, y, z), Block::DIRT);
            }
            for y in 0..61 {
                assert_eq!(chunk.get(x, y, z), Block::STONE);
            }
            assert_eq!(chunk.get(x, 65, z), Block::AIR);
            assert_eq!(chunk.biome_at(x, z), Biome::Plains);
        }
    }

    #[test]
    fn test_reshape_surface_and_water() {
        let s = shape(WorldType::Normal);
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0), 0, 255);
        s.fill_base(&mut chunk);
        s.apply_biomes(&mut chunk);
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let sample = s.column(x as i32, z as i32);
                assert_eq!(chunk.column_top(x, z).max(s.sea_level()), sample.height.max(s.sea_level()));
                assert_eq!(chunk.get(x, 0, z), Block::BEDROCK);
                if sample.height < s.sea_level() {
                    assert_eq!(chunk.get(x, s.sea_level(), z), Block::WATER);
                }
            }
        }
    }

    #[test]
    fn test_nether_dimension_blocks() {
        let s = shape(WorldType::Normal).with_dimension(Biome::Nether);
        assert_eq!(s.fill_block(), Block::new(ids::NETHERRACK));
        assert_eq!(s.sea_fluid(), Some(Block::new(ids::LAVA)));
        assert_eq!(s.column(10, 10).biome, Biome::Nether);
    }
}
