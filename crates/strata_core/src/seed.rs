//! # Seeds and the World Hash
//!
//! Every random decision in world generation derives from one 64-bit seed.
//!
//! ## The World Hash (do not change)
//!
//! `seed_hash(seed, cx, cz, label)` is a chain of SplitMix64 finalisers:
//!
//! ```text
//! h = mix(seed ^ 0x9E37_79B9_7F4A_7C15)
//! h = mix(h ^ (cx as i64 as u64))
//! h = mix(h ^ (cz as i64 as u64))
//! h = mix(h ^ fnv1a_64(label))
//!
//! mix(z):  z = (z ^ (z >> 30)) * 0xBF58_476D_1CE4_E5B9
//!          z = (z ^ (z >> 27)) * 0x94D0_49BB_1331_11EB
//!          z ^ (z >> 31)
//! ```
//!
//! All multiplications wrap. The hash defines world output forever: changing
//! any constant here changes every world ever generated.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Golden-ratio increment used by SplitMix64.
const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;

/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Creates a seed from the signed form used in world configs.
    #[inline]
    #[must_use]
    pub const fn from_signed(seed: i64) -> Self {
        Self(seed as u64)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g., biome generation).
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        Self(mix64(self.0 ^ mix64(purpose.wrapping_add(GOLDEN_GAMMA))))
    }

    /// Hash of `(seed, cx, cz, label)`; see the module docs.
    #[inline]
    #[must_use]
    pub fn hash(self, cx: i32, cz: i32, label: &str) -> u64 {
        seed_hash(self.0, cx, cz, label)
    }

    /// A reproducible RNG for one generation phase of one chunk.
    #[must_use]
    pub fn phase_rng(self, cx: i32, cz: i32, phase: &str) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.hash(cx, cz, phase))
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0xDEAD_BEEF_CAFE_BABE)
    }
}

/// SplitMix64 finaliser.
#[inline]
#[must_use]
pub const fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// FNV-1a 64-bit hash of a byte string.
#[inline]
#[must_use]
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// The world hash `(seed, cx, cz, label) -> u64`.
///
/// Every world byte derives from this function; changing it changes every
/// world. Golden values pinned by tests:
///
/// | seed | setting | chunk | measure | value |
/// |------|---------|-------|---------|-------|
/// | 42 | `cave_density = 0.1` | (0, 0) | air voxels, `y` in `10..=40` | 72 |
#[must_use]
pub fn seed_hash(seed: u64, cx: i32, cz: i32, label: &str) -> u64 {
    let mut h = mix64(seed ^ GOLDEN_GAMMA);
    h = mix64(h ^ i64::from(cx) as u64);
    h = mix64(h ^ i64::from(cz) as u64);
    mix64(h ^ fnv1a_64(label.as_bytes()))
}

/// Hash of an arbitrary lattice point, used by noise kernels.
#[inline]
#[must_use]
pub const fn lattice_hash(seed: u64, x: i64, y: i64, z: i64) -> u64 {
    let mut h = mix64(seed ^ GOLDEN_GAMMA);
    h = mix64(h ^ x as u64);
    h = mix64(h ^ (y as u64).rotate_left(21));
    mix64(h ^ (z as u64).rotate_left(42))
}

/// SplitMix64 stream.
///
/// Used where a tiny, portable, allocation-free generator is enough
/// (permutation shuffles, cave worm walks).
#[derive(Clone, Debug)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    /// Creates a stream starting at `seed`.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next 64-bit value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(GOLDEN_GAMMA);
        mix64(self.state)
    }

    /// Uniform value in `[0, 1)` built from the top 53 bits.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[0, bound)`; `bound` must be non-zero.
    #[inline]
    pub fn next_below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        self.next_u64() % bound
    }
}
