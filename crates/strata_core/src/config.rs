//! # World Configuration
//!
//! Everything tunable about a world, loaded once at startup.
//!
//! Files are TOML. Every table is `#[serde(default)]`, so a file only needs
//! the keys it changes:
//!
//! ```toml
//! seed = 42
//! world_type = "flat"
//! sea_level = 64
//!
//! [generation]
//! cave_density = 0.1
//! ```
//!
//! A config is only usable after [`WorldConfig::validate`] accepts it.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{StrataError, StrataResult};

/// Largest supported world height (`max_y - min_y + 1`).
pub const MAX_WORLD_HEIGHT: i32 = 4096;

/// Upper bound on fractal octaves.
pub const MAX_OCTAVES: u32 = 16;

/// World layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldType {
    /// Noise terrain with biomes, caves, features and structures.
    #[default]
    Normal,
    /// Fixed layers: grass at sea level, three dirt, stone below.
    Flat,
    /// Normal generation with exaggerated height amplitude.
    Amplified,
}

/// Base noise kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// Simplex gradient noise.
    #[default]
    Gradient,
    /// Lattice value noise.
    Value,
    /// Cellular (F1 Worley) noise.
    Cellular,
}

/// How octaves are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalMode {
    /// Plain fractional Brownian motion.
    #[default]
    Fbm,
    /// `1 - |base|` per octave (sharp crests).
    Ridged,
    /// `|base|` per octave (puffy).
    Billow,
}

/// Interpolation quality for lattice kernels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseQuality {
    /// Linear interpolation.
    Fast,
    /// Quintic fade.
    #[default]
    Standard,
}

/// Noise evaluator parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Base kernel.
    pub kind: NoiseKind,
    /// Octave combination.
    pub fractal: FractalMode,
    /// Per-evaluator salt mixed with the world seed.
    pub seed: u64,
    /// Base frequency (cycles per block).
    pub frequency: f64,
    /// Output multiplier.
    pub amplitude: f64,
    /// Octave count.
    pub octaves: u32,
    /// Amplitude falloff per octave.
    pub persistence: f64,
    /// Frequency growth per octave.
    pub lacunarity: f64,
    /// Coordinate pre-scale.
    pub scale: f64,
    /// Interpolation quality.
    pub quality: NoiseQuality,
    /// Octave weighting gain for ridged stacks.
    pub gain: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            kind: NoiseKind::Gradient,
            fractal: FractalMode::Fbm,
            seed: 0,
            frequency: 1.0 / 128.0,
            amplitude: 1.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            scale: 1.0,
            quality: NoiseQuality::Standard,
            gain: 2.0,
        }
    }
}

impl NoiseConfig {
    /// Checks the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Configuration`] for non-positive or non-finite
    /// frequency/scale/amplitude, octaves outside `1..=16`, persistence
    /// outside `(0, 1]` or lacunarity below 1.
    pub fn validate(&self) -> StrataResult<()> {
        fn positive(name: &str, v: f64) -> StrataResult<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(StrataError::Configuration(format!("noise {name} must be positive and finite, got {v}")))
            }
        }
        positive("frequency", self.frequency)?;
        positive("amplitude", self.amplitude)?;
        positive("scale", self.scale)?;
        positive("gain", self.gain)?;
        if self.octaves == 0 || self.octaves > MAX_OCTAVES {
            return Err(StrataError::Configuration(format!(
                "noise octaves must be in 1..={MAX_OCTAVES}, got {}",
                self.octaves
            )));
        }
        if !(self.persistence > 0.0 && self.persistence <= 1.0) {
            return Err(StrataError::Configuration(format!(
                "noise persistence must be in (0, 1], got {}",
                self.persistence
            )));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity >= 1.0) {
            return Err(StrataError::Configuration(format!(
                "noise lacunarity must be >= 1, got {}",
                self.lacunarity
            )));
        }
        Ok(())
    }
}

/// Terrain pipeline parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Continental height noise.
    pub base_noise: NoiseConfig,
    /// Small-scale height noise.
    pub detail_noise: NoiseConfig,
    /// Blocks of height per unit of base noise.
    pub height_amplitude: f64,
    /// Blocks of height per unit of detail noise.
    pub detail_amplitude: f64,
    /// Height multiplier applied in amplified worlds.
    pub amplified_factor: f64,
    /// Climate noise frequency (temperature, humidity, continentalness).
    pub climate_frequency: f64,
    /// Surface blocks repainted per column.
    pub surface_depth: u32,
    /// Subsurface blocks repainted per column.
    pub subsurface_depth: u32,
    /// Width of the coastal blend band in blocks.
    pub coastal_margin: f64,
    /// Fraction of the cave band carved, in `[0, 1]`.
    pub cave_density: f64,
    /// Lowest carvable y.
    pub cave_min_y: i32,
    /// Highest carvable y.
    pub cave_max_y: i32,
    /// Cave noise frequency.
    pub cave_frequency: f64,
    /// Chance per chunk of a worm tunnel starting there.
    pub worm_chance: f64,
    /// Worm tunnel radius in blocks.
    pub worm_radius: f64,
    /// Worm tunnel length in steps.
    pub worm_length: u32,
    /// Multiplier on every ore weight.
    pub ore_density: f64,
    /// Multiplier on every vegetation weight.
    pub vegetation_density: f64,
    /// Structure grid cell size in chunks.
    pub min_structure_spacing: u32,
    /// Generation worker threads (0 = one per core).
    pub worker_count: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_noise: NoiseConfig {
                seed: 1,
                frequency: 1.0 / 256.0,
                octaves: 5,
                ..NoiseConfig::default()
            },
            detail_noise: NoiseConfig {
                seed: 2,
                frequency: 1.0 / 32.0,
                octaves: 3,
                ..NoiseConfig::default()
            },
            height_amplitude: 24.0,
            detail_amplitude: 4.0,
            amplified_factor: 3.0,
            climate_frequency: 1.0 / 512.0,
            surface_depth: 1,
            subsurface_depth: 3,
            coastal_margin: 2.0,
            cave_density: 0.1,
            cave_min_y: 6,
            cave_max_y: 96,
            cave_frequency: 1.0 / 24.0,
            worm_chance: 0.15,
            worm_radius: 2.0,
            worm_length: 48,
            ore_density: 1.0,
            vegetation_density: 1.0,
            min_structure_spacing: 8,
            worker_count: 0,
        }
    }
}

/// Redstone timing and limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedstoneConfig {
    /// Nominal game ticks per second.
    pub ticks_per_second: u32,
    /// Game ticks per redstone tick.
    pub game_ticks_per_redstone_tick: u32,
    /// Most blocks a piston can push.
    pub push_limit: usize,
    /// Torch toggles inside the window that burn it out.
    pub torch_burnout_toggles: u32,
    /// Burn-out window in game ticks.
    pub torch_burnout_window: u64,
    /// Quiet game ticks before a burnt-out torch recovers.
    pub torch_rest_ticks: u64,
    /// Button pulse length in redstone ticks.
    pub button_pulse: u32,
    /// Piston animation length in redstone ticks.
    pub piston_animation: u32,
    /// Capacity of the component-change event channel.
    pub event_capacity: usize,
}

impl Default for RedstoneConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 20,
            game_ticks_per_redstone_tick: 2,
            push_limit: 12,
            torch_burnout_toggles: 8,
            torch_burnout_window: 60,
            torch_rest_ticks: 160,
            button_pulse: 10,
            piston_animation: 2,
            event_capacity: 4096,
        }
    }
}

/// Cache bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries per noise cache (0 disables memoisation).
    pub noise_capacity: usize,
    /// Lock shards per noise cache.
    pub noise_shards: usize,
    /// Generated chunks kept by the chunk cache (0 disables it).
    pub chunk_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { noise_capacity: 1 << 16, noise_shards: 16, chunk_capacity: 256 }
    }
}

/// Top-level world configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed.
    pub seed: i64,
    /// Layout.
    pub world_type: WorldType,
    /// Lowest block y.
    pub min_y: i32,
    /// Highest block y.
    pub max_y: i32,
    /// Water level (and grass level in flat worlds).
    pub sea_level: i32,
    /// Terrain pipeline.
    pub generation: GenerationConfig,
    /// Redstone simulator.
    pub redstone: RedstoneConfig,
    /// Caches.
    pub cache: CacheConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            world_type: WorldType::Normal,
            min_y: 0,
            max_y: 255,
            sea_level: 64,
            generation: GenerationConfig::default(),
            redstone: RedstoneConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::ConfigParse`] on malformed TOML. The result is
    /// not validated.
    pub fn from_toml_str(text: &str) -> StrataResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Io`], [`StrataError::ConfigParse`] or
    /// [`StrataError::Configuration`].
    pub fn load(path: impl AsRef<Path>) -> StrataResult<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of block layers.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        (self.max_y - self.min_y + 1) as usize
    }

    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns [`StrataError::Configuration`] describing the first problem.
    pub fn validate(&self) -> StrataResult<()> {
        let bad = |msg: String| -> StrataResult<()> { Err(StrataError::Configuration(msg)) };

        if self.min_y >= self.max_y {
            return bad(format!("min_y ({}) must be below max_y ({})", self.min_y, self.max_y));
        }
        if i64::from(self.max_y) - i64::from(self.min_y) + 1 > i64::from(MAX_WORLD_HEIGHT) {
            return bad(format!("world height exceeds {MAX_WORLD_HEIGHT}"));
        }
        if self.sea_level < self.min_y || self.sea_level > self.max_y {
            return bad(format!("sea_level ({}) outside [{}, {}]", self.sea_level, self.min_y, self.max_y));
        }

        let g = &self.generation;
        g.base_noise.validate()?;
        g.detail_noise.validate()?;
        for (name, v) in [
            ("height_amplitude", g.height_amplitude),
            ("detail_amplitude", g.detail_amplitude),
            ("coastal_margin", g.coastal_margin),
            ("worm_radius", g.worm_radius),
            ("ore_density", g.ore_density),
            ("vegetation_density", g.vegetation_density),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return bad(format!("{name} must be finite and non-negative, got {v}"));
            }
        }
        for (name, v) in [
            ("amplified_factor", g.amplified_factor),
            ("climate_frequency", g.climate_frequency),
            ("cave_frequency", g.cave_frequency),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return bad(format!("{name} must be positive and finite, got {v}"));
            }
        }
        for (name, v) in [("cave_density", g.cave_density), ("worm_chance", g.worm_chance)] {
            if !(0.0..=1.0).contains(&v) {
                return bad(format!("{name} must be in [0, 1], got {v}"));
            }
        }
        if g.cave_min_y > g.cave_max_y {
            return bad(format!("cave_min_y ({}) above cave_max_y ({})", g.cave_min_y, g.cave_max_y));
        }
        if g.min_structure_spacing < 2 {
            return bad("min_structure_spacing must be at least 2 chunks".to_string());
        }

        let r = &self.redstone;
        if r.ticks_per_second == 0 || r.game_ticks_per_redstone_tick == 0 {
            return bad("tick rates must be non-zero".to_string());
        }
        if r.torch_burnout_toggles == 0 || r.piston_animation == 0 || r.button_pulse == 0 {
            return bad("redstone timings must be non-zero".to_string());
        }
        if r.event_capacity == 0 {
            return bad("event_capacity must be non-zero".to_string());
        }

        if self.cache.noise_capacity > 0 && self.cache.noise_shards == 0 {
            return bad("noise_shards must be non-zero when the noise cache is enabled".to_string());
        }

        if self.world_type == WorldType::Flat && self.sea_level - 3 <= self.min_y {
            return bad("flat worlds need at least four layers below sea_level".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = WorldConfig::from_toml_str(
            r#"
            seed = -42
            world_type = "flat"

            [generation]
            cave_density = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, -42);
        assert_eq!(config.world_type, WorldType::Flat);
        assert!((config.generation.cave_density - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.sea_level, 64);
        assert_eq!(config.redstone.push_limit, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_height_rejected() {
        let config = WorldConfig { min_y: 100, max_y: 50, ..WorldConfig::default() };
        assert!(matches!(config.validate(), Err(StrataError::Configuration(_))));
    }

    #[test]
    fn test_noise_validation() {
        let zero_freq = NoiseConfig { frequency: 0.0, ..NoiseConfig::default() };
        assert!(zero_freq.validate().is_err());

        let too_many = NoiseConfig { octaves: MAX_OCTAVES + 1, ..NoiseConfig::default() };
        assert!(too_many.validate().is_err());

        let no_octaves = NoiseConfig { octaves: 0, ..NoiseConfig::default() };
        assert!(no_octaves.validate().is_err());

        let nan = NoiseConfig { persistence: f64::NAN, ..NoiseConfig::default() };
        assert!(nan.validate().is_err());

        assert!(NoiseConfig::default().validate().is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            WorldConfig::from_toml_str("seed = \"abc\""),
            Err(StrataError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            WorldConfig::load("/nonexistent/strata/world.toml"),
            Err(StrataError::Io(_))
        ));
    }
}
