//! # Vegetation (phase 5)
//!
//! Trees, cacti, flowers and tall grass on a jittered 4x4 grid of candidate
//! columns, one candidate per cell.
//!
//! Decisions read only this chunk's own voxels. Tree crowns may reach up to
//! three blocks into a neighbour; those writes leave through the
//! [`FeatureWriter`]'s sink with a vegetation tag so the chunk store merges
//! them order-independently.

use rand::Rng;
use strata_core::{ids, Block, BlockPos, SplitMix64, WorldSeed, CHUNK_SIZE};

use crate::biome::FeatureKind;
use crate::chunk::{Phase, WriteTag};
use crate::generator::terrain::TerrainShape;
use crate::generator::FeatureWriter;

/// Candidate grid cell edge, in blocks.
const GRID: usize = 4;

/// Plant kinds in roll order. The first whose roll passes wins.
const PLANTS: [FeatureKind; 7] = [
    FeatureKind::TreeOak,
    FeatureKind::TreeSpruce,
    FeatureKind::TreeJungle,
    FeatureKind::Cactus,
    FeatureKind::FlowerRed,
    FeatureKind::FlowerYellow,
    FeatureKind::TallGrass,
];

/// Places phase 5 vegetation.
pub struct VegetationPlacer {
    seed: WorldSeed,
    density: f64,
}

impl VegetationPlacer {
    /// Creates a placer.
    #[must_use]
    pub const fn new(seed: WorldSeed, density: f64) -> Self {
        Self { seed, density }
    }

    /// Phase 5 entry point.
    pub fn place(&self, shape: &TerrainShape, writer: &mut FeatureWriter<'_>) {
        let coord = writer.chunk.coord();
        let mut rng = self.seed.phase_rng(coord.x, coord.z, Phase::Vegetation.name());
        let cells = CHUNK_SIZE / GRID;
        for gz in 0..cells {
            for gx in 0..cells {
                let x = gx * GRID + rng.gen_range(0..GRID);
                let z = gz * GRID + rng.gen_range(0..GRID);
                let rolls: [f64; PLANTS.len()] = std::array::from_fn(|_| rng.gen());
                let variant: u64 = rng.gen();

                let chunk = &*writer.chunk;
                let top = chunk.column_top(x, z);
                if top + 1 > chunk.max_y() || !chunk.get(x, top + 1, z).is_air() {
                    continue;
                }
                let ground = chunk.get(x, top, z);
                let weights = shape.biomes().get(chunk.biome_at(x, z)).feature_weights;
                let chosen = PLANTS
                    .iter()
                    .zip(rolls)
                    .find(|(kind, roll)| *roll < weights.get(**kind) * self.density && supports(**kind, ground))
                    .map(|(kind, _)| *kind);
                if let Some(kind) = chosen {
                    let base = chunk.world_pos(x, top + 1, z);
                    grow(writer, kind, base, variant);
                }
            }
        }
    }
}

fn supports(kind: FeatureKind, ground: Block) -> bool {
    match kind {
        FeatureKind::Cactus => ground.id == ids::SAND,
        FeatureKind::TreeOak | FeatureKind::TreeSpruce | FeatureKind::TreeJungle => {
            matches!(ground.id, ids::GRASS | ids::DIRT | ids::SNOW)
        }
        _ => ground.id == ids::GRASS,
    }
}

/// Writes one plant rooted at `base`.
fn grow(writer: &mut FeatureWriter<'_>, kind: FeatureKind, base: BlockPos, variant: u64) {
    let leaves_tag = WriteTag::phase(Phase::Vegetation, kind.priority());
    let wood_tag = WriteTag::phase(Phase::Vegetation, kind.priority() + 1);
    let mut rng = SplitMix64::new(variant);
    match kind {
        FeatureKind::TreeOak => {
            let h = 4 + rng.next_below(3) as i32;
            for dy in h - 2..=h + 1 {
                let r: i32 = if dy >= h { 1 } else { 2 };
                for dz in -r..=r {
                    for dx in -r..=r {
                        let corner = dx.abs() == r && dz.abs() == r;
                        if (corner && (dy == h + 1 || rng.next_below(2) == 0)) || (dx == 0 && dz == 0 && dy < h) {
                            continue;
                        }
                        writer.put(base.add(dx, dy, dz), Block::new(ids::OAK_LEAVES), leaves_tag);
                    }
                }
            }
            trunk(writer, base, h, Block::new(ids::OAK_LOG), wood_tag);
        }
        FeatureKind::TreeSpruce => {
            let h = 6 + rng.next_below(4) as i32;
            for dy in 2..=h + 1 {
                let r: i32 = if dy >= h {
                    0
                } else if dy >= h - 2 {
                    1
                } else {
                    2 - dy % 2
                };
                for dz in -r..=r {
                    for dx in -r..=r {
                        if (dx.abs() == r && dz.abs() == r && r > 0) || (dx == 0 && dz == 0 && dy < h) {
                            continue;
                        }
                        writer.put(base.add(dx, dy, dz), Block::new(ids::SPRUCE_LEAVES), leaves_tag);
                    }
                }
            }
            trunk(writer, base, h, Block::new(ids::SPRUCE_LOG), wood_tag);
        }
        FeatureKind::TreeJungle => {
            let h = 8 + rng.next_below(5) as i32;
            for (dy, r) in [(h - 2, 3), (h - 1, 3), (h, 2), (h + 1, 1)] {
                for dz in -r..=r {
                    for dx in -r..=r {
                        if dx * dx + dz * dz > r * r + 1 || (dx == 0 && dz == 0 && dy < h) {
                            continue;
                        }
                        writer.put(base.add(dx, dy, dz), Block::new(ids::JUNGLE_LEAVES), leaves_tag);
                    }
                }
            }
            trunk(writer, base, h, Block::new(ids::JUNGLE_LOG), wood_tag);
        }
        FeatureKind::Cactus => {
            let h = 1 + rng.next_below(3) as i32;
            trunk(writer, base, h, Block::new(ids::CACTUS), leaves_tag);
        }
        FeatureKind::FlowerRed => writer.put(base, Block::new(ids::FLOWER_RED), leaves_tag),
        FeatureKind::FlowerYellow => writer.put(base, Block::new(ids::FLOWER_YELLOW), leaves_tag),
        _ => writer.put(base, Block::new(ids::TALL_GRASS), leaves_tag),
    }
}

fn trunk(writer: &mut FeatureWriter<'_>, base: BlockPos, h: i32, block: Block, tag: WriteTag) {
    for dy in 0..h {
        writer.put(base.add(0, dy, 0), block, tag);
    }
}
