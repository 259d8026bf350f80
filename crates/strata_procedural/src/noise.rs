//! # Noise Pipeline
//!
//! Deterministic coherent noise: gradient (simplex), value and cellular
//! kernels, stacked into fBm, ridged or billow fractals.
//!
//! ## Determinism Guarantee
//!
//! Every evaluator is a pure function of `(world seed, config, coords)`.
//! The permutation table is a Fisher-Yates shuffle of `0..=255` driven by a
//! SplitMix64 stream seeded with
//! `seed_hash(world_seed, 0, 0, "perm") ^ mix64(config.seed)`.
//! Kernels only use `+ - * /`, `floor`, `abs` and `sqrt`, all of which are
//! exactly specified by IEEE-754, so output is bit-identical everywhere.
//!
//! ## Ranges
//!
//! `sample_*` and `sample_fractal_*` return values in `[-1, 1]`. Fractal
//! stacks are normalised by the sum of octave amplitudes.

use strata_core::config::{FractalMode, NoiseConfig, NoiseKind, NoiseQuality};
use strata_core::seed::{mix64, seed_hash, SplitMix64, WorldSeed};
use strata_core::{ShardedLru, StrataResult};

/// Skewing factor for 2D simplex grid: `(sqrt(3) - 1) / 2`.
const F2: f64 = 0.366_025_403_784_438_6;
/// Unskewing factor for 2D simplex grid: `(3 - sqrt(3)) / 6`.
const G2: f64 = 0.211_324_865_405_187_1;
/// Skewing factor for 3D simplex grid.
const F3: f64 = 1.0 / 3.0;
/// Unskewing factor for 3D simplex grid.
const G3: f64 = 1.0 / 6.0;

/// 12 gradient vectors for 2D simplex (regular 12-gon, doubled axes).
const GRAD2: [[f64; 2]; 12] = [
    [1.0, 0.0],
    [1.0, 1.0],
    [0.0, 1.0],
    [-1.0, 1.0],
    [-1.0, 0.0],
    [-1.0, -1.0],
    [0.0, -1.0],
    [1.0, -1.0],
    [1.0, 0.0],
    [0.0, 1.0],
    [-1.0, 0.0],
    [0.0, -1.0],
];

/// 12 cube-edge gradients for 3D simplex.
const GRAD3: [[f64; 3]; 12] = [
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 0.0, 1.0],
    [-1.0, 0.0, 1.0],
    [1.0, 0.0, -1.0],
    [-1.0, 0.0, -1.0],
    [0.0, 1.0, 1.0],
    [0.0, -1.0, 1.0],
    [0.0, 1.0, -1.0],
    [0.0, -1.0, -1.0],
];

/// Pre-computed permutation table.
///
/// 256 entries doubled to 512 so lookups never wrap mid-hash.
#[derive(Clone)]
struct PermutationTable {
    perm: [u8; 512],
}

impl PermutationTable {
    fn new(seed: u64) -> Self {
        let mut perm = [0u8; 512];
        for (i, p) in perm.iter_mut().take(256).enumerate() {
            *p = i as u8;
        }

        let mut rng = SplitMix64::new(seed);
        for i in (1..256usize).rev() {
            let j = rng.next_below(i as u64 + 1) as usize;
            perm.swap(i, j);
        }

        for i in 0..256 {
            perm[256 + i] = perm[i];
        }
        Self { perm }
    }

    #[inline]
    fn get(&self, index: usize) -> u8 {
        self.perm[index & 511]
    }

    #[inline]
    fn hash2(&self, i: i64, j: i64) -> u8 {
        self.get((i & 255) as usize + self.get((j & 255) as usize) as usize)
    }

    #[inline]
    fn hash3(&self, i: i64, j: i64, k: i64) -> u8 {
        self.get((i & 255) as usize + self.hash2(j, k) as usize)
    }
}

/// Anything that yields a scalar field.
///
/// Implemented by [`Noise`], [`HybridNoise`] and [`CachedNoise`] so they
/// compose freely.
pub trait NoiseField: Send + Sync {
    /// Field value at a 2D point.
    fn field_2d(&self, x: f64, z: f64) -> f64;
    /// Field value at a 3D point.
    fn field_3d(&self, x: f64, y: f64, z: f64) -> f64;
}

/// A configured noise evaluator.
///
/// # Example
///
/// ```rust,ignore
/// let noise = Noise::new(WorldSeed::new(42), NoiseConfig::default())?;
/// let h = noise.sample_fractal_2d(100.0, 200.0);
/// assert!((-1.0..=1.0).contains(&h));
/// ```
#[derive(Clone)]
pub struct Noise {
    config: NoiseConfig,
    perm: PermutationTable,
    /// `1 / sum(octave amplitudes)`.
    bounding: f64,
}

impl Noise {
    /// Creates an evaluator.
    ///
    /// # Errors
    ///
    /// Returns [`strata_core::StrataError::Configuration`] if the config is invalid.
    pub fn new(seed: WorldSeed, config: NoiseConfig) -> StrataResult<Self> {
        config.validate()?;

        let perm_seed = seed_hash(seed.value(), 0, 0, "perm") ^ mix64(config.seed);
        let mut total = 0.0;
        let mut amp = config.amplitude;
        for _ in 0..config.octaves {
            total += amp;
            amp *= config.persistence;
        }

        Ok(Self { config, perm: PermutationTable::new(perm_seed), bounding: 1.0 / total })
    }

    /// The evaluator's config.
    #[must_use]
    pub const fn config(&self) -> &NoiseConfig {
        &self.config
    }

    #[inline]
    fn base_frequency(&self) -> f64 {
        self.config.frequency * self.config.scale
    }

    /// Single-octave sample at `(x, z)`, in `[-1, 1]`.
    #[must_use]
    pub fn sample_2d(&self, x: f64, z: f64) -> f64 {
        let f = self.base_frequency();
        self.kernel_2d(x * f, z * f)
    }

    /// Single-octave sample at `(x, y, z)`, in `[-1, 1]`.
    #[must_use]
    pub fn sample_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let f = self.base_frequency();
        self.kernel_3d(x * f, y * f, z * f)
    }

    /// Fractal sample at `(x, z)`, in `[-1, 1]`.
    #[must_use]
    pub fn sample_fractal_2d(&self, x: f64, z: f64) -> f64 {
        self.fractal(|f| self.kernel_2d(x * f, z * f))
    }

    /// Fractal sample at `(x, y, z)`, in `[-1, 1]`.
    #[must_use]
    pub fn sample_fractal_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.fractal(|f| self.kernel_3d(x * f, y * f, z * f))
    }

    /// Samples fractal noise and maps it to an integer in `[0, max)`.
    ///
    /// Useful for selecting discrete values like block types.
    #[must_use]
    pub fn sample_discrete(&self, x: f64, z: f64, max: u32) -> u32 {
        let unit = (self.sample_fractal_2d(x, z) + 1.0) * 0.5;
        ((unit * f64::from(max)) as u32).min(max.saturating_sub(1))
    }

    fn fractal(&self, kernel: impl Fn(f64) -> f64) -> f64 {
        let c = &self.config;
        let mut frequency = self.base_frequency();
        let mut amplitude = c.amplitude;
        let mut weight = 1.0;
        let mut total = 0.0;

        for _ in 0..c.octaves {
            let n = kernel(frequency);
            let layer = match c.fractal {
                FractalMode::Fbm => n,
                FractalMode::Billow => n.abs() * 2.0 - 1.0,
                FractalMode::Ridged => {
                    let ridge = 1.0 - n.abs();
                    let signal = ridge * ridge * weight;
                    weight = (signal * c.gain).clamp(0.0, 1.0);
                    signal
                }
            };
            total += layer * amplitude;
            amplitude *= c.persistence;
            frequency *= c.lacunarity;
        }

        let normalised = total * self.bounding;
        let out = match c.fractal {
            // Ridged layers live in [0, 1].
            FractalMode::Ridged => normalised * 2.0 - 1.0,
            FractalMode::Fbm | FractalMode::Billow => normalised,
        };
        out.clamp(-1.0, 1.0)
    }

    #[inline]
    fn kernel_2d(&self, x: f64, z: f64) -> f64 {
        match self.config.kind {
            NoiseKind::Gradient => self.simplex_2d(x, z),
            NoiseKind::Value => self.value_2d(x, z),
            NoiseKind::Cellular => self.cellular_2d(x, z),
        }
    }

    #[inline]
    fn kernel_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        match self.config.kind {
            NoiseKind::Gradient => self.simplex_3d(x, y, z),
            NoiseKind::Value => self.value_3d(x, y, z),
            NoiseKind::Cellular => self.cellular_3d(x, y, z),
        }
    }

    fn simplex_2d(&self, x: f64, y: f64) -> f64 {
        // Skew input coordinates to simplex grid
        let skew = (x + y) * F2;
        let i = (x + skew).floor() as i64;
        let j = (y + skew).floor() as i64;

        let unskew = (i + j) as f64 * G2;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);

        // Upper or lower triangle
        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + G2;
        let y1 = y0 - j1 as f64 + G2;
        let x2 = x0 - 1.0 + 2.0 * G2;
        let y2 = y0 - 1.0 + 2.0 * G2;

        let g0 = self.perm.hash2(i, j);
        let g1 = self.perm.hash2(i + i1, j + j1);
        let g2 = self.perm.hash2(i + 1, j + 1);

        let n0 = corner_2d(x0, y0, g0);
        let n1 = corner_2d(x1, y1, g1);
        let n2 = corner_2d(x2, y2, g2);

        (70.0 * (n0 + n1 + n2)).clamp(-1.0, 1.0)
    }

    fn simplex_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let skew = (x + y + z) * F3;
        let i = (x + skew).floor() as i64;
        let j = (y + skew).floor() as i64;
        let k = (z + skew).floor() as i64;

        let unskew = (i + j + k) as f64 * G3;
        let x0 = x - (i as f64 - unskew);
        let y0 = y - (j as f64 - unskew);
        let z0 = z - (k as f64 - unskew);

        // Which of the six tetrahedra
        let (i1, j1, k1, i2, j2, k2) = if x0 >= y0 {
            if y0 >= z0 {
                (1, 0, 0, 1, 1, 0)
            } else if x0 >= z0 {
                (1, 0, 0, 1, 0, 1)
            } else {
                (0, 0, 1, 1, 0, 1)
            }
        } else if y0 < z0 {
            (0, 0, 1, 0, 1, 1)
        } else if x0 < z0 {
            (0, 1, 0, 0, 1, 1)
        } else {
            (0, 1, 0, 1, 1, 0)
        };

        let x1 = x0 - i1 as f64 + G3;
        let y1 = y0 - j1 as f64 + G3;
        let z1 = z0 - k1 as f64 + G3;
        let x2 = x0 - i2 as f64 + 2.0 * G3;
        let y2 = y0 - j2 as f64 + 2.0 * G3;
        let z2 = z0 - k2 as f64 + 2.0 * G3;
        let x3 = x0 - 1.0 + 3.0 * G3;
        let y3 = y0 - 1.0 + 3.0 * G3;
        let z3 = z0 - 1.0 + 3.0 * G3;

        let n0 = corner_3d(x0, y0, z0, self.perm.hash3(i, j, k));
        let n1 = corner_3d(x1, y1, z1, self.perm.hash3(i + i1, j + j1, k + k1));
        let n2 = corner_3d(x2, y2, z2, self.perm.hash3(i + i2, j + j2, k + k2));
        let n3 = corner_3d(x3, y3, z3, self.perm.hash3(i + 1, j + 1, k + 1));

        (32.0 * (n0 + n1 + n2 + n3)).clamp(-1.0, 1.0)
    }

    #[inline]
    fn fade(&self, t: f64) -> f64 {
        match self.config.quality {
            NoiseQuality::Fast => t,
            NoiseQuality::Standard => t * t * t * (t * (t * 6.0 - 15.0) + 10.0),
        }
    }

    #[inline]
    fn lattice_value_2d(&self, i: i64, j: i64) -> f64 {
        f64::from(self.perm.hash2(i, j)) / 127.5 - 1.0
    }

    #[inline]
    fn lattice_value_3d(&self, i: i64, j: i64, k: i64) -> f64 {
        f64::from(self.perm.hash3(i, j, k)) / 127.5 - 1.0
    }

    fn value_2d(&self, x: f64, y: f64) -> f64 {
        let (xf, yf) = (x.floor(), y.floor());
        let (i, j) = (xf as i64, yf as i64);
        let u = self.fade(x - xf);
        let v = self.fade(y - yf);

        let a = lerp(self.lattice_value_2d(i, j), self.lattice_value_2d(i + 1, j), u);
        let b = lerp(self.lattice_value_2d(i, j + 1), self.lattice_value_2d(i + 1, j + 1), u);
        lerp(a, b, v)
    }

    fn value_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let (xf, yf, zf) = (x.floor(), y.floor(), z.floor());
        let (i, j, k) = (xf as i64, yf as i64, zf as i64);
        let u = self.fade(x - xf);
        let v = self.fade(y - yf);
        let w = self.fade(z - zf);

        let face = |k: i64| {
            let a = lerp(self.lattice_value_3d(i, j, k), self.lattice_value_3d(i + 1, j, k), u);
            let b = lerp(self.lattice_value_3d(i, j + 1, k), self.lattice_value_3d(i + 1, j + 1, k), u);
            lerp(a, b, v)
        };
        lerp(face(k), face(k + 1), w)
    }

    /// Jitter of the feature point inside lattice cell `(i, j[, k])`, per axis in `[0, 1)`.
    #[inline]
    fn jitter(&self, h: u8, axis: usize) -> f64 {
        f64::from(self.perm.get(usize::from(h) + axis * 61)) / 256.0
    }

    fn cellular_2d(&self, x: f64, y: f64) -> f64 {
        let (ci, cj) = (x.floor() as i64, y.floor() as i64);
        let mut best = f64::MAX;
        for di in -1..=1 {
            for dj in -1..=1 {
                let (i, j) = (ci + di, cj + dj);
                let h = self.perm.hash2(i, j);
                let dx = i as f64 + self.jitter(h, 0) - x;
                let dy = j as f64 + self.jitter(h, 1) - y;
                best = best.min(dx * dx + dy * dy);
            }
        }
        (best.sqrt().min(1.0) * 2.0 - 1.0).clamp(-1.0, 1.0)
    }

    fn cellular_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let (ci, cj, ck) = (x.floor() as i64, y.floor() as i64, z.floor() as i64);
        let mut best = f64::MAX;
        for di in -1..=1 {
            for dj in -1..=1 {
                for dk in -1..=1 {
                    let (i, j, k) = (ci + di, cj + dj, ck + dk);
                    let h = self.perm.hash3(i, j, k);
                    let dx = i as f64 + self.jitter(h, 0) - x;
                    let dy = j as f64 + self.jitter(h, 1) - y;
                    let dz = k as f64 + self.jitter(h, 2) - z;
                    best = best.min(dx * dx + dy * dy + dz * dz);
                }
            }
        }
        (best.sqrt().min(1.0) * 2.0 - 1.0).clamp(-1.0, 1.0)
    }
}

impl NoiseField for Noise {
    #[inline]
    fn field_2d(&self, x: f64, z: f64) -> f64 {
        self.sample_fractal_2d(x, z)
    }

    #[inline]
    fn field_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.sample_fractal_3d(x, y, z)
    }
}

#[inline]
fn corner_2d(x: f64, y: f64, hash: u8) -> f64 {
    let t = 0.5 - x * x - y * y;
    if t < 0.0 {
        0.0
    } else {
        let g = GRAD2[usize::from(hash % 12)];
        let t2 = t * t;
        t2 * t2 * (x * g[0] + y * g[1])
    }
}

#[inline]
fn corner_3d(x: f64, y: f64, z: f64, hash: u8) -> f64 {
    let t = 0.6 - x * x - y * y - z * z;
    if t < 0.0 {
        0.0
    } else {
        let g = GRAD3[usize::from(hash % 12)];
        let t2 = t * t;
        t2 * t2 * (x * g[0] + y * g[1] + z * g[2])
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Linear mix of two fields by a third.
///
/// The weight field's `[-1, 1]` output maps to a mix factor in `[0, 1]`:
/// `-1` yields `low` only, `1` yields `high` only.
pub struct HybridNoise<A, B, W> {
    low: A,
    high: B,
    weight: W,
}

impl<A: NoiseField, B: NoiseField, W: NoiseField> HybridNoise<A, B, W> {
    /// Creates a hybrid of `low` and `high` driven by `weight`.
    #[must_use]
    pub const fn new(low: A, high: B, weight: W) -> Self {
        Self { low, high, weight }
    }

    #[inline]
    fn mix(w: f64, a: f64, b: f64) -> f64 {
        let t = ((w + 1.0) * 0.5).clamp(0.0, 1.0);
        lerp(a, b, t)
    }
}

impl<A: NoiseField, B: NoiseField, W: NoiseField> NoiseField for HybridNoise<A, B, W> {
    fn field_2d(&self, x: f64, z: f64) -> f64 {
        Self::mix(self.weight.field_2d(x, z), self.low.field_2d(x, z), self.high.field_2d(x, z))
    }

    fn field_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        Self::mix(
            self.weight.field_3d(x, y, z),
            self.low.field_3d(x, y, z),
            self.high.field_3d(x, y, z),
        )
    }
}

/// Cache key quantisation: 1/1024 of a block.
const QUANTUM: f64 = 1024.0;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct QuantKey {
    x: i64,
    y: i64,
    z: i64,
    three_d: bool,
}

#[inline]
fn quantise(v: f64) -> i64 {
    (v * QUANTUM).round() as i64
}

/// Memoising wrapper around a field.
///
/// Coordinates are snapped to a 1/1024 lattice before evaluation whether the
/// value is cached or not, so output never depends on cache state. Block
/// coordinates sit on the lattice and are unaffected.
pub struct CachedNoise<N> {
    inner: N,
    cache: Option<ShardedLru<QuantKey, f64>>,
}

impl<N: NoiseField> CachedNoise<N> {
    /// Wraps `inner` with a cache of `capacity` entries over `shards` shards.
    ///
    /// A capacity of 0 disables memoisation.
    #[must_use]
    pub fn new(inner: N, capacity: usize, shards: usize) -> Self {
        let cache = (capacity > 0).then(|| ShardedLru::new(capacity, shards));
        Self { inner, cache }
    }

    /// The wrapped field.
    #[must_use]
    pub const fn inner(&self) -> &N {
        &self.inner
    }

    /// `(hits, misses)`; zero when memoisation is disabled.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        self.cache.as_ref().map_or((0, 0), ShardedLru::stats)
    }
}

impl<N: NoiseField> NoiseField for CachedNoise<N> {
    fn field_2d(&self, x: f64, z: f64) -> f64 {
        let key = QuantKey { x: quantise(x), y: 0, z: quantise(z), three_d: false };
        let eval = || self.inner.field_2d(key.x as f64 / QUANTUM, key.z as f64 / QUANTUM);
        match &self.cache {
            Some(cache) => cache.get_or_insert_with(key, eval),
            None => eval(),
        }
    }

    fn field_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let key = QuantKey { x: quantise(x), y: quantise(y), z: quantise(z), three_d: true };
        let eval = || {
            self.inner
                .field_3d(key.x as f64 / QUANTUM, key.y as f64 / QUANTUM, key.z as f64 / QUANTUM)
        };
        match &self.cache {
            Some(cache) => cache.get_or_insert_with(key, eval),
            None => eval(),
        }
    }
}
