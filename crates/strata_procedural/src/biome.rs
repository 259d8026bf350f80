//! # Biome Classification
//!
//! One biome per horizontal column, from coarse climate fields:
//! - Temperature and humidity (own noise channels)
//! - Continentalness (the base terrain field, supplied by the caller)
//! - Column height relative to sea level
//!
//! Land biomes come from a rectangular `(temperature, humidity)` lookup.
//! Rectangles share their edges; the first matching rectangle in
//! declaration order wins. Columns within `coastal_margin` blocks of sea
//! level are beaches, deeper ones are oceans.

use strata_core::config::{GenerationConfig, NoiseConfig};
use strata_core::seed::WorldSeed;
use strata_core::{ids, Block, StrataResult};

use crate::noise::Noise;

/// Biome types in the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Biome {
    /// Shallow ocean.
    Ocean = 0,
    /// Deep ocean.
    DeepOcean = 1,
    /// Beach/coastline.
    Beach = 2,
    /// Plains/grassland.
    Plains = 3,
    /// Forest.
    Forest = 4,
    /// Snowy taiga forest.
    Taiga = 5,
    /// Swamp/wetland.
    Swamp = 6,
    /// Arid desert.
    Desert = 7,
    /// Savanna grassland.
    Savanna = 8,
    /// Dense jungle.
    Jungle = 9,
    /// Cold tundra.
    Tundra = 10,
    /// High mountains.
    Mountain = 11,
    /// Nether dimension.
    Nether = 12,
    /// End dimension.
    End = 13,
}

impl Biome {
    /// Every biome in id order.
    pub const ALL: [Self; 14] = [
        Self::Ocean,
        Self::DeepOcean,
        Self::Beach,
        Self::Plains,
        Self::Forest,
        Self::Taiga,
        Self::Swamp,
        Self::Desert,
        Self::Savanna,
        Self::Jungle,
        Self::Tundra,
        Self::Mountain,
        Self::Nether,
        Self::End,
    ];

    /// Numeric id stored in chunk biome maps.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Converts from u8 (unknown ids map to `Plains`).
    #[must_use]
    pub const fn from_id(value: u8) -> Self {
        match value {
            0 => Self::Ocean,
            1 => Self::DeepOcean,
            2 => Self::Beach,
            4 => Self::Forest,
            5 => Self::Taiga,
            6 => Self::Swamp,
            7 => Self::Desert,
            8 => Self::Savanna,
            9 => Self::Jungle,
            10 => Self::Tundra,
            11 => Self::Mountain,
            12 => Self::Nether,
            13 => Self::End,
            _ => Self::Plains,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ocean => "ocean",
            Self::DeepOcean => "deep_ocean",
            Self::Beach => "beach",
            Self::Plains => "plains",
            Self::Forest => "forest",
            Self::Taiga => "taiga",
            Self::Swamp => "swamp",
            Self::Desert => "desert",
            Self::Savanna => "savanna",
            Self::Jungle => "jungle",
            Self::Tundra => "tundra",
            Self::Mountain => "mountain",
            Self::Nether => "nether",
            Self::End => "end",
        }
    }

    /// Returns true for water biomes.
    #[inline]
    #[must_use]
    pub const fn is_ocean(self) -> bool {
        matches!(self, Self::Ocean | Self::DeepOcean)
    }
}

/// Kinds of world features a biome can weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    /// Oak tree.
    TreeOak,
    /// Spruce tree.
    TreeSpruce,
    /// Jungle tree.
    TreeJungle,
    /// Cactus column.
    Cactus,
    /// Red flower.
    FlowerRed,
    /// Yellow flower.
    FlowerYellow,
    /// Tall grass.
    TallGrass,
    /// Coal deposit.
    OreCoal,
    /// Iron deposit.
    OreIron,
    /// Gold deposit.
    OreGold,
    /// Diamond deposit.
    OreDiamond,
    /// Redstone deposit.
    OreRedstone,
    /// Surface boulder.
    Boulder,
    /// Water pool.
    PoolWater,
    /// Lava pool.
    PoolLava,
}

impl FeatureKind {
    /// Number of feature kinds.
    pub const COUNT: usize = 15;

    /// Every kind in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::TreeOak,
        Self::TreeSpruce,
        Self::TreeJungle,
        Self::Cactus,
        Self::FlowerRed,
        Self::FlowerYellow,
        Self::TallGrass,
        Self::OreCoal,
        Self::OreIron,
        Self::OreGold,
        Self::OreDiamond,
        Self::OreRedstone,
        Self::Boulder,
        Self::PoolWater,
        Self::PoolLava,
    ];

    /// Stable string key ("tree-oak", "ore-coal", ...).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::TreeOak => "tree-oak",
            Self::TreeSpruce => "tree-spruce",
            Self::TreeJungle => "tree-jungle",
            Self::Cactus => "cactus",
            Self::FlowerRed => "flower-red",
            Self::FlowerYellow => "flower-yellow",
            Self::TallGrass => "tall-grass",
            Self::OreCoal => "ore-coal",
            Self::OreIron => "ore-iron",
            Self::OreGold => "ore-gold",
            Self::OreDiamond => "ore-diamond",
            Self::OreRedstone => "ore-redstone",
            Self::Boulder => "boulder",
            Self::PoolWater => "pool-water",
            Self::PoolLava => "pool-lava",
        }
    }

    /// Parses a string key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    /// Merge priority of blocks this feature writes.
    ///
    /// When two writes of the same phase land on one cell, the higher
    /// priority wins regardless of which was applied first.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::TallGrass => 1,
            Self::FlowerRed | Self::FlowerYellow => 2,
            Self::Boulder => 3,
            Self::PoolWater => 4,
            Self::PoolLava => 5,
            Self::OreCoal => 6,
            Self::OreIron => 7,
            Self::OreRedstone => 8,
            Self::OreGold => 9,
            Self::OreDiamond => 10,
            Self::Cactus => 11,
            Self::TreeOak | Self::TreeSpruce | Self::TreeJungle => 12,
        }
    }
}

/// Density in `[0, 1]` per feature kind.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeatureWeights([f64; FeatureKind::COUNT]);

impl FeatureWeights {
    /// Builds weights from `(kind, density)` pairs; densities clamp to `[0, 1]`.
    #[must_use]
    pub fn from_pairs(pairs: &[(FeatureKind, f64)]) -> Self {
        let mut weights = [0.0; FeatureKind::COUNT];
        for &(kind, density) in pairs {
            weights[kind as usize] = density.clamp(0.0, 1.0);
        }
        Self(weights)
    }

    /// Density for a kind.
    #[inline]
    #[must_use]
    pub fn get(&self, kind: FeatureKind) -> f64 {
        self.0[kind as usize]
    }

    /// Density for a string key (0 for unknown keys).
    #[must_use]
    pub fn get_key(&self, key: &str) -> f64 {
        FeatureKind::from_key(key).map_or(0.0, |k| self.get(k))
    }

    /// Non-zero entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureKind, f64)> + '_ {
        FeatureKind::ALL.into_iter().map(|k| (k, self.get(k))).filter(|(_, w)| *w > 0.0)
    }
}

/// Everything later phases need to know about a biome.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiomeDescriptor {
    /// Biome id.
    pub biome: Biome,
    /// Blocks added to column height by the biome pass (negative erodes).
    pub base_height_offset: f64,
    /// Multiplier on the detail-noise contribution to height.
    pub height_variance: f64,
    /// Block painted on top.
    pub surface_block: Block,
    /// Block painted under the surface.
    pub sub_surface_block: Block,
    /// Nominal temperature in `[-1, 1]`.
    pub temperature: f64,
    /// Nominal humidity in `[-1, 1]`.
    pub humidity: f64,
    /// Feature densities.
    pub feature_weights: FeatureWeights,
}

/// Static table of biome descriptors.
#[derive(Clone, Debug)]
pub struct BiomeTable {
    descriptors: Vec<BiomeDescriptor>,
}

impl BiomeTable {
    /// Builds the standard table.
    #[must_use]
    pub fn standard() -> Self {
        use FeatureKind as F;

        const UNDERGROUND: [(FeatureKind, f64); 6] = [
            (FeatureKind::OreCoal, 0.6),
            (FeatureKind::OreIron, 0.4),
            (FeatureKind::OreGold, 0.1),
            (FeatureKind::OreDiamond, 0.04),
            (FeatureKind::OreRedstone, 0.15),
            (FeatureKind::PoolLava, 0.04),
        ];

        let with_ores = |extra: &[(FeatureKind, f64)]| {
            let mut pairs = UNDERGROUND.to_vec();
            pairs.extend_from_slice(extra);
            FeatureWeights::from_pairs(&pairs)
        };

        let entry = |biome: Biome,
                     offset: f64,
                     variance: f64,
                     surface: u16,
                     sub: u16,
                     temperature: f64,
                     humidity: f64,
                     weights: FeatureWeights| BiomeDescriptor {
            biome,
            base_height_offset: offset,
            height_variance: variance,
            surface_block: Block::new(surface),
            sub_surface_block: Block::new(sub),
            temperature,
            humidity,
            feature_weights: weights,
        };

        let descriptors = vec![
            entry(Biome::Ocean, 0.0, 1.0, ids::SAND, ids::SAND, 0.2, 0.5, with_ores(&[])),
            entry(Biome::DeepOcean, -4.0, 1.0, ids::GRAVEL, ids::GRAVEL, 0.0, 0.5, with_ores(&[])),
            entry(Biome::Beach, 0.0, 0.4, ids::SAND, ids::SAND, 0.4, 0.2, with_ores(&[])),
            entry(
                Biome::Plains,
                1.0,
                0.6,
                ids::GRASS,
                ids::DIRT,
                0.0,
                -0.1,
                with_ores(&[(F::TreeOak, 0.03), (F::FlowerRed, 0.15), (F::FlowerYellow, 0.2), (F::TallGrass, 0.6), (F::Boulder, 0.05), (F::PoolWater, 0.1)]),
            ),
            entry(
                Biome::Forest,
                2.0,
                1.0,
                ids::GRASS,
                ids::DIRT,
                0.0,
                0.2,
                with_ores(&[(F::TreeOak, 0.6), (F::FlowerRed, 0.05), (F::TallGrass, 0.3)]),
            ),
            entry(
                Biome::Taiga,
                3.0,
                1.1,
                ids::GRASS,
                ids::DIRT,
                -0.6,
                0.5,
                with_ores(&[(F::TreeSpruce, 0.5), (F::TallGrass, 0.15), (F::Boulder, 0.1)]),
            ),
            entry(
                Biome::Swamp,
                -2.0,
                0.3,
                ids::GRASS,
                ids::CLAY,
                -0.2,
                0.7,
                with_ores(&[(F::TreeOak, 0.2), (F::TallGrass, 0.5), (F::PoolWater, 0.3)]),
            ),
            entry(
                Biome::Desert,
                1.0,
                0.5,
                ids::SAND,
                ids::SANDSTONE,
                0.8,
                -0.7,
                with_ores(&[(F::Cactus, 0.1), (F::PoolLava, 0.06)]),
            ),
            entry(
                Biome::Savanna,
                2.0,
                0.8,
                ids::GRASS,
                ids::DIRT,
                0.7,
                -0.3,
                with_ores(&[(F::TreeOak, 0.05), (F::TallGrass, 0.4), (F::FlowerYellow, 0.05)]),
            ),
            entry(
                Biome::Jungle,
                3.0,
                1.2,
                ids::GRASS,
                ids::DIRT,
                0.8,
                0.8,
                with_ores(&[(F::TreeJungle, 0.8), (F::TreeOak, 0.1), (F::TallGrass, 0.7), (F::FlowerRed, 0.1)]),
            ),
            entry(
                Biome::Tundra,
                0.0,
                0.5,
                ids::SNOW,
                ids::DIRT,
                -0.8,
                -0.2,
                with_ores(&[(F::TreeSpruce, 0.02), (F::Boulder, 0.05)]),
            ),
            entry(
                Biome::Mountain,
                12.0,
                1.8,
                ids::STONE,
                ids::STONE,
                -0.3,
                0.0,
                with_ores(&[(F::TreeSpruce, 0.05), (F::Boulder, 0.3)]),
            ),
            entry(Biome::Nether, 0.0, 1.0, ids::NETHERRACK, ids::NETHERRACK, 1.0, -1.0, FeatureWeights::from_pairs(&[(F::PoolLava, 0.3)])),
            entry(Biome::End, 0.0, 1.0, ids::END_STONE, ids::END_STONE, -0.5, -1.0, FeatureWeights::default()),
        ];
        Self { descriptors }
    }

    /// Descriptor for a biome.
    #[inline]
    #[must_use]
    pub fn get(&self, biome: Biome) -> &BiomeDescriptor {
        &self.descriptors[biome as usize]
    }
}

impl Default for BiomeTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// A rectangle of the climate lookup (bounds inclusive).
struct ClimateCell {
    biome: Biome,
    temperature: (f64, f64),
    humidity: (f64, f64),
}

const fn cell(biome: Biome, t_min: f64, t_max: f64, h_min: f64, h_max: f64) -> ClimateCell {
    ClimateCell { biome, temperature: (t_min, t_max), humidity: (h_min, h_max) }
}

/// Land climate lookup, scanned in order.
const CLIMATE_TABLE: [ClimateCell; 11] = [
    cell(Biome::Tundra, -1.0, -0.45, -1.0, 0.3),
    cell(Biome::Taiga, -1.0, -0.45, 0.3, 1.0),
    cell(Biome::Plains, -0.45, 0.1, -1.0, -0.3),
    cell(Biome::Forest, -0.45, 0.1, -0.3, 0.3),
    cell(Biome::Swamp, -0.45, 0.1, 0.3, 1.0),
    cell(Biome::Savanna, 0.1, 0.5, -1.0, -0.3),
    cell(Biome::Plains, 0.1, 0.5, -0.3, 0.3),
    cell(Biome::Forest, 0.1, 0.5, 0.3, 1.0),
    cell(Biome::Desert, 0.5, 1.0, -1.0, -0.3),
    cell(Biome::Savanna, 0.5, 1.0, -0.3, 0.3),
    cell(Biome::Jungle, 0.5, 1.0, 0.3, 1.0),
];

/// Continentalness above which high land becomes mountains.
const MOUNTAIN_CONTINENTALNESS: f64 = 0.55;
/// Blocks above sea level required for mountains.
const MOUNTAIN_HEIGHT: f64 = 20.0;
/// Blocks below sea level where ocean turns deep.
const DEEP_OCEAN_DEPTH: f64 = 16.0;

/// Climate sample for a column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Climate {
    /// Temperature in `[-1, 1]`.
    pub temperature: f64,
    /// Humidity in `[-1, 1]`.
    pub humidity: f64,
    /// Continentalness in `[-1, 1]`.
    pub continentalness: f64,
}

/// Biome classifier.
///
/// Owns the temperature and humidity noise channels. Continentalness and
/// column height come from the terrain shape and are passed in.
pub struct BiomeClassifier {
    temperature_noise: Noise,
    humidity_noise: Noise,
    coastal_margin: f64,
    dimension: Option<Biome>,
}

impl BiomeClassifier {
    /// Creates a classifier for an overworld.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the climate frequency is invalid.
    pub fn new(seed: WorldSeed, config: &GenerationConfig) -> StrataResult<Self> {
        let climate = |salt| NoiseConfig {
            seed: salt,
            frequency: config.climate_frequency,
            octaves: 3,
            ..NoiseConfig::default()
        };
        Ok(Self {
            temperature_noise: Noise::new(seed, climate(11))?,
            humidity_noise: Noise::new(seed, climate(12))?,
            coastal_margin: config.coastal_margin,
            dimension: None,
        })
    }

    /// Forces every column to `biome` (Nether/End dimensions).
    #[must_use]
    pub const fn with_dimension(mut self, biome: Biome) -> Self {
        self.dimension = Some(biome);
        self
    }

    /// Temperature at world `(x, z)`, in `[-1, 1]`.
    #[must_use]
    pub fn temperature(&self, x: i32, z: i32) -> f64 {
        self.temperature_noise.sample_fractal_2d(f64::from(x), f64::from(z))
    }

    /// Humidity at world `(x, z)`, in `[-1, 1]`.
    #[must_use]
    pub fn humidity(&self, x: i32, z: i32) -> f64 {
        self.humidity_noise.sample_fractal_2d(f64::from(x), f64::from(z))
    }

    /// Full climate sample at `(x, z)`.
    #[must_use]
    pub fn climate(&self, x: i32, z: i32, continentalness: f64) -> Climate {
        Climate { temperature: self.temperature(x, z), humidity: self.humidity(x, z), continentalness }
    }

    /// Classifies the column at `(x, z)`.
    ///
    /// `height_above_sea` is the column's terrain height minus sea level.
    #[must_use]
    pub fn classify_at(&self, x: i32, z: i32, continentalness: f64, height_above_sea: f64) -> Biome {
        if let Some(biome) = self.dimension {
            return biome;
        }
        self.classify(self.climate(x, z, continentalness), height_above_sea)
    }

    /// Classifies a climate sample.
    #[must_use]
    pub fn classify(&self, climate: Climate, height_above_sea: f64) -> Biome {
        if let Some(biome) = self.dimension {
            return biome;
        }
        if height_above_sea < -self.coastal_margin {
            return if height_above_sea < -DEEP_OCEAN_DEPTH { Biome::DeepOcean } else { Biome::Ocean };
        }
        if height_above_sea <= self.coastal_margin {
            return Biome::Beach;
        }
        if climate.continentalness > MOUNTAIN_CONTINENTALNESS && height_above_sea > MOUNTAIN_HEIGHT {
            return Biome::Mountain;
        }
        classify_land(climate.temperature, climate.humidity)
    }

    /// Land weight of the coastal blend at a given height, in `[0, 1]`.
    ///
    /// 0 at `coastal_margin` blocks below sea level, 1 at `coastal_margin`
    /// above, linear between.
    #[must_use]
    pub fn coastal_blend(&self, height_above_sea: f64) -> f64 {
        if self.coastal_margin <= 0.0 {
            return if height_above_sea >= 0.0 { 1.0 } else { 0.0 };
        }
        ((height_above_sea + self.coastal_margin) / (2.0 * self.coastal_margin)).clamp(0.0, 1.0)
    }
}

/// Rectangular lookup; first matching rectangle wins.
#[must_use]
pub fn classify_land(temperature: f64, humidity: f64) -> Biome {
    let t = temperature.clamp(-1.0, 1.0);
    let h = humidity.clamp(-1.0, 1.0);
    CLIMATE_TABLE
        .iter()
        .find(|c| t >= c.temperature.0 && t <= c.temperature.1 && h >= c.humidity.0 && h <= c.humidity.1)
        .map_or(Biome::Plains, |c| c.biome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> BiomeClassifier {
        BiomeClassifier::new(WorldSeed::new(42), &GenerationConfig::default()).unwrap()
    }

    #[test]
    fn test_id_roundtrip() {
        for biome in Biome::ALL {
            assert_eq!(Biome::from_id(biome.id()), biome);
        }
    }

    #[test]
    fn test_table_corners() {
        assert_eq!(classify_land(-1.0, -1.0), Biome::Tundra);
        assert_eq!(classify_land(-1.0, 1.0), Biome::Taiga);
        assert_eq!(classify_land(1.0, -1.0), Biome::Desert);
        assert_eq!(classify_land(1.0, 1.0), Biome::Jungle);
        assert_eq!(classify_land(0.0, 0.0), Biome::Forest);
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        // Shared edge between Tundra and Taiga rows.
        assert_eq!(classify_land(-0.7, 0.3), Biome::Tundra);
        // Shared edge between cold and temperate columns.
        assert_eq!(classify_land(-0.45, -0.5), Biome::Tundra);
    }

    #[test]
    fn test_ocean_and_coast() {
        let c = classifier();
        let climate = Climate { temperature: 0.0, humidity: 0.0, continentalness: -0.5 };
        assert_eq!(c.classify(climate, -30.0), Biome::DeepOcean);
        assert_eq!(c.classify(climate, -5.0), Biome::Ocean);
        assert_eq!(c.classify(climate, -2.0), Biome::Beach);
        assert_eq!(c.classify(climate, 2.0), Biome::Beach);
        assert_eq!(c.classify(climate, 3.0), Biome::Forest);
    }

    #[test]
    fn test_mountain() {
        let c = classifier();
        let climate = Climate { temperature: 0.9, humidity: 0.9, continentalness: 0.8 };
        assert_eq!(c.classify(climate, 40.0), Biome::Mountain);
        assert_eq!(c.classify(climate, 10.0), Biome::Jungle);
    }

    #[test]
    fn test_coastal_blend_linear() {
        let c = classifier();
        assert!((c.coastal_blend(-2.0) - 0.0).abs() < 1e-12);
        assert!((c.coastal_blend(0.0) - 0.5).abs() < 1e-12);
        assert!((c.coastal_blend(1.0) - 0.75).abs() < 1e-12);
        assert!((c.coastal_blend(10.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_biome_lookup_idempotent() {
        let c = classifier();
        for x in (-200..200).step_by(37) {
            for z in (-200..200).step_by(41) {
                let a = c.classify_at(x, z, 0.1, 8.0);
                let b = c.classify_at(x, z, 0.1, 8.0);
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_dimension_override() {
        let c = classifier().with_dimension(Biome::Nether);
        assert_eq!(c.classify_at(5, 5, -1.0, -50.0), Biome::Nether);
    }

    #[test]
    fn test_feature_keys() {
        let table = BiomeTable::standard();
        let forest = table.get(Biome::Forest);
        assert!(forest.feature_weights.get_key("tree-oak") > 0.5);
        assert!(forest.feature_weights.get_key("ore-coal") > 0.0);
        assert_eq!(forest.feature_weights.get_key("no-such-feature"), 0.0);
        for kind in FeatureKind::ALL {
            assert_eq!(FeatureKind::from_key(kind.key()), Some(kind));
        }
        for biome in Biome::ALL {
            assert_eq!(table.get(biome).biome, biome);
            for (_, w) in table.get(biome).feature_weights.iter() {
                assert!((0.0..=1.0).contains(&w));
            }
        }
    }
}
