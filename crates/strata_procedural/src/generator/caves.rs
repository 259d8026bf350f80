//! # Cave Carving
//!
//! Two carvers, both writing only the chunk being generated:
//!
//! - **Noise caves**: a voxel in the cave band becomes air when
//!   `|cave_noise(x, y, z)| > threshold(y)`. The threshold rises toward the
//!   top of the band so caves thin out near the surface.
//! - **Worm tunnels**: some chunks seed a random walk that carves a sphere
//!   at every step. A tunnel can cross many chunks; each chunk replays the
//!   walks of every source chunk in reach and carves only its own slice.

use strata_core::{ids, Block, ChunkCoord, NoiseConfig, SplitMix64, StrataResult, WorldConfig, WorldSeed, CHUNK_SIZE};

use crate::chunk::Chunk;
use crate::noise::{Noise, NoiseField};

/// Salt of the cave noise layer.
const CAVE_NOISE_SALT: u64 = 21;
/// Threshold added at the top of the cave band.
const SURFACE_BIAS: f64 = 0.1;

/// One worm tunnel: the centres of its carved spheres.
#[derive(Clone, Debug, PartialEq)]
pub struct Worm {
    /// Sphere centres in world space.
    pub points: Vec<[f64; 3]>,
    /// Sphere radius.
    pub radius: f64,
}

/// Carves noise caves and worm tunnels.
pub struct CaveCarver {
    seed: WorldSeed,
    noise: Noise,
    density: f64,
    band_lo: i32,
    band_hi: i32,
    min_y: i32,
    max_y: i32,
    worm_chance: f64,
    worm_radius: f64,
    worm_length: u32,
}

impl CaveCarver {
    /// Builds the carver.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the cave frequency is invalid.
    pub fn new(seed: WorldSeed, config: &WorldConfig) -> StrataResult<Self> {
        let gen = &config.generation;
        let noise = Noise::new(
            seed,
            NoiseConfig { seed: CAVE_NOISE_SALT, frequency: gen.cave_frequency, octaves: 2, ..NoiseConfig::default() },
        )?;
        Ok(Self {
            seed,
            noise,
            density: gen.cave_density,
            band_lo: gen.cave_min_y.max(config.min_y + 1),
            band_hi: gen.cave_max_y.min(config.max_y),
            min_y: config.min_y,
            max_y: config.max_y,
            worm_chance: gen.worm_chance,
            worm_radius: gen.worm_radius,
            worm_length: gen.worm_length,
        })
    }

    /// Carve threshold at height `y`.
    #[must_use]
    pub fn threshold(&self, y: i32) -> f64 {
        let span = f64::from((self.band_hi - self.band_lo).max(1));
        let t = (f64::from(y - self.band_lo) / span).clamp(0.0, 1.0);
        0.2 + 0.6 * (1.0 - self.density) + SURFACE_BIAS * t
    }

    /// Returns true if noise carves the voxel at world `(x, y, z)`.
    #[must_use]
    pub fn carves(&self, x: i32, y: i32, z: i32) -> bool {
        if y < self.band_lo || y > self.band_hi {
            return false;
        }
        self.noise.field_3d(f64::from(x), f64::from(y), f64::from(z)).abs() > self.threshold(y)
    }

    /// Phase 3 entry point.
    pub fn carve(&self, chunk: &mut Chunk) {
        let ox = chunk.coord().world_x();
        let oz = chunk.coord().world_z();
        for y in self.band_lo..=self.band_hi {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    if carvable(chunk.get(x, y, z)) && self.carves(ox + x as i32, y, oz + z as i32) {
                        chunk.set(x, y, z, Block::AIR);
                    }
                }
            }
        }
        self.carve_worms(chunk);
    }

    /// The worm seeded by `source`, if any.
    #[must_use]
    pub fn worm(&self, source: ChunkCoord) -> Option<Worm> {
        let mut rng = SplitMix64::new(self.seed.hash(source.x, source.z, "cave-worm"));
        if rng.next_f64() >= self.worm_chance || self.band_hi <= self.band_lo {
            return None;
        }
        let mut p = [
            f64::from(source.world_x()) + rng.next_f64() * CHUNK_SIZE as f64,
            f64::from(self.band_lo) + rng.next_f64() * f64::from(self.band_hi - self.band_lo),
            f64::from(source.world_z()) + rng.next_f64() * CHUNK_SIZE as f64,
        ];
        let mut dir = normalise([rng.next_f64() * 2.0 - 1.0, (rng.next_f64() * 2.0 - 1.0) * 0.3, rng.next_f64() * 2.0 - 1.0]);
        let mut points = Vec::with_capacity(self.worm_length as usize);
        for _ in 0..self.worm_length {
            points.push(p);
            dir = normalise([
                dir[0] + (rng.next_f64() * 2.0 - 1.0) * 0.3,
                dir[1] + (rng.next_f64() * 2.0 - 1.0) * 0.15,
                dir[2] + (rng.next_f64() * 2.0 - 1.0) * 0.3,
            ]);
            for (axis, d) in p.iter_mut().zip(dir) {
                *axis += d;
            }
        }
        Some(Worm { points, radius: self.worm_radius })
    }

    /// Chunks whose worms can reach this far.
    fn reach(&self) -> i32 {
        ((f64::from(self.worm_length) + self.worm_radius + 1.0) / CHUNK_SIZE as f64).ceil() as i32
    }

    fn carve_worms(&self, chunk: &mut Chunk) {
        let coord = chunk.coord();
        let reach = self.reach();
        let (lo_x, lo_z) = (f64::from(coord.world_x()), f64::from(coord.world_z()));
        let size = CHUNK_SIZE as f64;
        for dx in -reach..=reach {
            for dz in -reach..=reach {
                let source = coord.offset(dx, dz);
                let Some(worm) = self.worm(source) else { continue };
                let r = worm.radius;
                for c in &worm.points {
                    if c[0] + r < lo_x || c[0] - r >= lo_x + size || c[2] + r < lo_z || c[2] - r >= lo_z + size {
                        continue;
                    }
                    self.carve_sphere(chunk, *c, r);
                }
            }
        }
    }

    fn carve_sphere(&self, chunk: &mut Chunk, c: [f64; 3], r: f64) {
        let ox = chunk.coord().world_x();
        let oz = chunk.coord().world_z();
        let r2 = r * r;
        let y_lo = ((c[1] - r).floor() as i32).max(self.min_y + 1);
        let y_hi = ((c[1] + r).ceil() as i32).min(self.max_y);
        let x_lo = ((c[0] - r).floor() as i32).max(ox);
        let x_hi = ((c[0] + r).ceil() as i32).min(ox + CHUNK_SIZE as i32 - 1);
        let z_lo = ((c[2] - r).floor() as i32).max(oz);
        let z_hi = ((c[2] + r).ceil() as i32).min(oz + CHUNK_SIZE as i32 - 1);
        for y in y_lo..=y_hi {
            for z in z_lo..=z_hi {
                for x in x_lo..=x_hi {
                    let d = [f64::from(x) + 0.5 - c[0], f64::from(y) + 0.5 - c[1], f64::from(z) + 0.5 - c[2]];
                    if d[0] * d[0] + d[1] * d[1] + d[2] * d[2] > r2 {
                        continue;
                    }
                    let (lx, lz) = ((x - ox) as usize, (z - oz) as usize);
                    if carvable(chunk.get(lx, y, lz)) {
                        chunk.set(lx, y, lz, Block::AIR);
                    }
                }
            }
        }
    }
}

fn carvable(block: Block) -> bool {
    !matches!(block.id, ids::AIR | ids::BEDROCK | ids::WATER | ids::LAVA)
}

fn normalise(v: [f64; 3]) -> [f64; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len < 1e-9 {
        [1.0, 0.0, 0.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carver(config: &WorldConfig) -> CaveCarver {
        CaveCarver::new(WorldSeed::from_signed(config.seed), config).unwrap()
    }

    fn solid_chunk(coord: ChunkCoord) -> Chunk {
        let mut chunk = Chunk::new(coord, 0, 127);
        for y in 0..=127 {
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    chunk.set(x, y, z, if y == 0 { Block::BEDROCK } else { Block::STONE });
                }
            }
        }
        chunk
    }

    #[test]
    fn test_threshold_rises_with_height() {
        let c = carver(&WorldConfig::default());
        assert!(c.threshold(10) < c.threshold(90));
    }

    #[test]
    fn test_carving_is_reproducible() {
        let config = WorldConfig { seed: 42, ..WorldConfig::default() };
        let count = |chunk: &Chunk| chunk.count_where(10..=40, Block::is_air);
        let mut a = solid_chunk(ChunkCoord::new(0, 0));
        let mut b = solid_chunk(ChunkCoord::new(0, 0));
        carver(&config).carve(&mut a);
        carver(&config).carve(&mut b);
        assert_eq!(count(&a), count(&b));
        assert_eq!(a.voxels(), b.voxels());
    }

    #[test]
    fn test_bedrock_survives() {
        let mut config = WorldConfig::default();
        config.generation.cave_density = 1.0;
        config.generation.cave_min_y = 0;
        let mut chunk = solid_chunk(ChunkCoord::new(3, 3));
        carver(&config).carve(&mut chunk);
        assert_eq!(chunk.count_where(0..=0, |b| b == Block::BEDROCK), CHUNK_SIZE * CHUNK_SIZE);
        assert!(chunk.count_where(1..=96, Block::is_air) > 0);
    }

    #[test]
    fn test_density_widens_caves() {
        let count_for = |density: f64| {
            let mut config = WorldConfig::default();
            config.generation.cave_density = density;
            config.generation.worm_chance = 0.0;
            let mut chunk = solid_chunk(ChunkCoord::new(-2, 5));
            carver(&config).carve(&mut chunk);
            chunk.count_where(0..=127, Block::is_air)
        };
        assert!(count_for(0.0) <= count_for(0.5));
        assert!(count_for(0.5) <= count_for(1.0));
        assert!(count_for(1.0) > 0);
    }

    #[test]
    fn test_worm_slices_agree_across_chunks() {
        let mut config = WorldConfig::default();
        config.generation.cave_density = 0.0;
        config.generation.worm_chance = 1.0;
        let c = carver(&config);
        let worm = c.worm(ChunkCoord::new(0, 0)).unwrap();
        assert_eq!(worm.points.len(), config.generation.worm_length as usize);
        assert_eq!(c.worm(ChunkCoord::new(0, 0)), Some(worm.clone()));

        // A chunk carved twice from scratch ends up the same whatever its neighbours did.
        let mut a = solid_chunk(ChunkCoord::new(1, 0));
        c.carve(&mut a);
        let mut b = solid_chunk(ChunkCoord::new(1, 0));
        c.carve(&mut b);
        assert_eq!(a.voxels(), b.voxels());
        assert!(a.count_where(0..=127, Block::is_air) > 0);
    }
}
