//! # Structures (phase 6)
//!
//! The world is cut into square regions `spacing` chunks wide. Each region
//! holds at most one structure, decided by the region's own RNG. The
//! structure is anchored at the lowest chunk it occupies and its footprint
//! never leaves the region, so neighbouring regions cannot collide.
//!
//! Plans are built from the RNG and the pure terrain shape only. Every chunk
//! rebuilds its region's plan and stamps the cells that fall inside it.
//! Structure writes override terrain and vegetation.

use std::collections::HashSet;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use strata_core::{ids, Block, BlockPos, BlockRegistry, ChunkCoord, WorldSeed, CHUNK_SIZE_I32};

use crate::chunk::{Chunk, Phase, WriteTag};
use crate::generator::terrain::TerrainShape;

/// Structure kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructureKind {
    /// Small underground room.
    Dungeon,
    /// Two huts on the surface.
    Village,
    /// Broken obsidian frame on the surface.
    RuinedPortal,
    /// Deep stone-brick hall.
    Stronghold,
}

impl StructureKind {
    /// Stable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dungeon => "dungeon",
            Self::Village => "village",
            Self::RuinedPortal => "ruined-portal",
            Self::Stronghold => "stronghold",
        }
    }

    const fn priority(self) -> u8 {
        match self {
            Self::RuinedPortal => 1,
            Self::Dungeon => 2,
            Self::Village => 3,
            Self::Stronghold => 4,
        }
    }
}

/// A fully resolved structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructurePlan {
    /// Kind.
    pub kind: StructureKind,
    /// Lowest chunk the structure occupies.
    pub anchor: ChunkCoord,
    /// Minimum corner of the footprint.
    pub origin: BlockPos,
    /// Every cell it writes.
    pub cells: Vec<(BlockPos, Block)>,
}

/// Plans and stamps structures.
pub struct StructureLayout {
    seed: WorldSeed,
    spacing: i32,
    min_y: i32,
    max_y: i32,
}

impl StructureLayout {
    /// Creates a layout; `spacing` is clamped to at least 2.
    #[must_use]
    pub fn new(seed: WorldSeed, spacing: u32, min_y: i32, max_y: i32) -> Self {
        Self { seed, spacing: (spacing as i32).max(2), min_y, max_y }
    }

    /// Region containing `coord`.
    #[must_use]
    pub const fn region_of(&self, coord: ChunkCoord) -> (i32, i32) {
        (coord.x.div_euclid(self.spacing), coord.z.div_euclid(self.spacing))
    }

    /// The structure of region `(rx, rz)`, if any.
    #[must_use]
    pub fn plan(&self, shape: &TerrainShape, rx: i32, rz: i32) -> Option<StructurePlan> {
        let mut rng = self.seed.phase_rng(rx, rz, "structure-region");
        let roll: f64 = rng.gen();
        let kind = match roll {
            r if r < 0.30 => StructureKind::Dungeon,
            r if r < 0.45 => StructureKind::Village,
            r if r < 0.60 => StructureKind::RuinedPortal,
            r if r < 0.68 => StructureKind::Stronghold,
            _ => return None,
        };
        let ox = rng.gen_range(0..=self.spacing - 2);
        let oz = rng.gen_range(0..=self.spacing - 2);
        let anchor = ChunkCoord::new(rx * self.spacing + ox, rz * self.spacing + oz);
        let origin_x = anchor.world_x() + rng.gen_range(0..CHUNK_SIZE_I32);
        let origin_z = anchor.world_z() + rng.gen_range(0..CHUNK_SIZE_I32);

        let mut cells = Vec::new();
        let origin = match kind {
            StructureKind::Dungeon => {
                let surface = shape.column(origin_x + 3, origin_z + 3).height;
                let y = (surface - 20).max(self.min_y + 2);
                let origin = BlockPos::new(origin_x, y, origin_z);
                room(&mut cells, origin, (7, 5, 7), &mut rng, &[ids::COBBLESTONE, ids::MOSSY_COBBLESTONE], None);
                origin
            }
            StructureKind::Stronghold => {
                let origin = BlockPos::new(origin_x, self.min_y + 10, origin_z);
                room(&mut cells, origin, (11, 7, 11), &mut rng, &[ids::STONE_BRICKS], Some(ids::GLOWSTONE));
                origin
            }
            StructureKind::Village => {
                let first = shape.column(origin_x + 2, origin_z + 2);
                if first.biome.is_ocean() || first.height < shape.sea_level() {
                    return None;
                }
                for (dx, dz) in [(0, 0), (8, 8)] {
                    let hut_x = origin_x + dx;
                    let hut_z = origin_z + dz;
                    let floor = shape.column(hut_x + 2, hut_z + 2).height;
                    hut(&mut cells, BlockPos::new(hut_x, floor, hut_z));
                }
                BlockPos::new(origin_x, first.height, origin_z)
            }
            StructureKind::RuinedPortal => {
                let ground = shape.column(origin_x + 1, origin_z).height;
                if ground < shape.sea_level() {
                    return None;
                }
                let origin = BlockPos::new(origin_x, ground + 1, origin_z);
                portal(&mut cells, origin, &mut rng);
                origin
            }
        };
        cells.retain(|(p, _)| p.y >= self.min_y && p.y <= self.max_y);
        // Later cells win where a plan writes one position twice.
        let mut seen = HashSet::new();
        cells.reverse();
        cells.retain(|(p, _)| seen.insert(*p));
        cells.reverse();
        Some(StructurePlan { kind, anchor, origin, cells })
    }

    /// Phase 6 entry point: stamps this chunk's slice of its region's plan.
    pub fn stamp(&self, shape: &TerrainShape, chunk: &mut Chunk, registry: &BlockRegistry) {
        let (rx, rz) = self.region_of(chunk.coord());
        let Some(plan) = self.plan(shape, rx, rz) else { return };
        let tag = WriteTag::phase(Phase::Structures, plan.kind.priority());
        for (pos, block) in plan.cells {
            if let Some((x, y, z)) = chunk.local(pos) {
                if chunk.get(x, y, z) != Block::BEDROCK {
                    chunk.merge_write(x, y, z, block, tag, registry);
                }
            }
        }
    }
}

/// Hollow box: walls from `materials`, air inside, optional light in the ceiling.
fn room(
    cells: &mut Vec<(BlockPos, Block)>,
    origin: BlockPos,
    (sx, sy, sz): (i32, i32, i32),
    rng: &mut ChaCha8Rng,
    materials: &[u16],
    light: Option<u16>,
) {
    for dy in 0..sy {
        for dz in 0..sz {
            for dx in 0..sx {
                let shell = dx == 0 || dy == 0 || dz == 0 || dx == sx - 1 || dy == sy - 1 || dz == sz - 1;
                let block = if shell {
                    Block::new(materials[rng.gen_range(0..materials.len())])
                } else {
                    Block::AIR
                };
                cells.push((origin.add(dx, dy, dz), block));
            }
        }
    }
    if let Some(id) = light {
        cells.push((origin.add(sx / 2, sy - 1, sz / 2), Block::new(id)));
    }
}

/// 5x5 hut on a cobblestone footing with a door gap and a torch.
fn hut(cells: &mut Vec<(BlockPos, Block)>, origin: BlockPos) {
    for dz in 0..5 {
        for dx in 0..5 {
            for dy in -2..=0 {
                cells.push((origin.add(dx, dy, dz), Block::new(ids::COBBLESTONE)));
            }
            let edge = dx == 0 || dz == 0 || dx == 4 || dz == 4;
            for dy in 1..=3 {
                let door = dx == 2 && dz == 0 && dy <= 2;
                let block = if edge && !door { Block::new(ids::PLANKS) } else { Block::AIR };
                cells.push((origin.add(dx, dy, dz), block));
            }
            cells.push((origin.add(dx, 4, dz), Block::new(ids::PLANKS)));
        }
    }
    cells.push((origin.add(1, 1, 1), Block::new(ids::TORCH)));
}

/// 4x5 obsidian frame; the sill is whole, about a fifth of the rest is missing.
fn portal(cells: &mut Vec<(BlockPos, Block)>, origin: BlockPos, rng: &mut ChaCha8Rng) {
    for dy in 0..5 {
        for dx in 0..4 {
            let frame = dx == 0 || dx == 3 || dy == 0 || dy == 4;
            let roll: f64 = rng.gen();
            if frame && (dy == 0 || roll >= 0.2) {
                cells.push((origin.add(dx, dy, 0), Block::new(ids::OBSIDIAN)));
            }
        }
    }
}
