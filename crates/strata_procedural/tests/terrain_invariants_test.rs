//! # Terrain Invariant Tests
//!
//! Properties every Ready chunk must satisfy, checked over a spread of
//! coordinates including ones far from the origin.

use strata_core::{ids, Block, BlockRegistry, ChunkCoord, StrataError, WorldConfig, WorldType, CHUNK_SIZE, MAX_CHUNK_COORD};
use strata_procedural::{Biome, Chunk, ChunkState, TerrainGenerator, MAX_LIGHT};

fn generator(world_type: WorldType) -> TerrainGenerator {
    let config = WorldConfig { seed: 1234, world_type, ..WorldConfig::default() };
    TerrainGenerator::new(&config, BlockRegistry::standard()).unwrap()
}

fn sample_coords() -> Vec<ChunkCoord> {
    vec![
        ChunkCoord::new(0, 0),
        ChunkCoord::new(-1, 5),
        ChunkCoord::new(17, -3),
        ChunkCoord::new(1 << 20, 1 << 20),
        ChunkCoord::new(-(1 << 20), -(1 << 20)),
    ]
}

fn assert_height_map(chunk: &Chunk) {
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let h = chunk.height_at(x, z);
            assert!(h >= chunk.min_y() - 1 && h <= chunk.max_y());
            if h >= chunk.min_y() {
                assert!(!chunk.get(x, h, z).is_air(), "height map points at air in {}", chunk.coord());
            }
            for y in (h + 1)..=chunk.max_y() {
                assert!(chunk.get(x, y, z).is_air());
            }
        }
    }
}

fn assert_open_sky(chunk: &Chunk) {
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            for y in (chunk.height_at(x, z) + 1)..=chunk.max_y() {
                assert_eq!(chunk.sky_light(x, y, z), MAX_LIGHT);
            }
        }
    }
}

#[test]
fn test_height_map_and_sky_light_invariants() {
    let gen = generator(WorldType::Normal);
    for coord in sample_coords() {
        let chunk = gen.generate(coord).unwrap();
        assert_eq!(chunk.state(), ChunkState::Ready);
        assert_height_map(&chunk);
        assert_open_sky(&chunk);
    }
}

#[test]
fn test_bedrock_floor() {
    let gen = generator(WorldType::Normal);
    for coord in sample_coords() {
        let chunk = gen.generate(coord).unwrap();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                assert_eq!(chunk.get(x, chunk.min_y(), z), Block::BEDROCK);
            }
        }
        assert_eq!(chunk.count_where(chunk.min_y() + 1..=chunk.max_y(), |b| b.id == ids::BEDROCK), 0);
    }
}

#[test]
fn test_biome_map_is_filled() {
    let gen = generator(WorldType::Normal);
    let chunk = gen.generate(ChunkCoord::new(2, 2)).unwrap();
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let biome = chunk.biome_at(x, z);
            assert!(!matches!(biome, Biome::Nether | Biome::End));
            assert_eq!(biome, gen.shape().column(chunk.coord().world_x() + x as i32, chunk.coord().world_z() + z as i32).biome);
        }
    }
}

#[test]
fn test_flat_world_layers() {
    let gen = generator(WorldType::Flat);
    for coord in sample_coords() {
        let chunk = gen.generate(coord).unwrap();
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                assert_eq!(chunk.height_at(x, z), 64);
                assert_eq!(chunk.get(x, 64, z), Block::GRASS);
                for y in 61..=63 {
                    assert_eq!(chunk.get(x, y, z), Block::DIRT);
                }
                assert_eq!(chunk.get(x, 0, z), Block::STONE);
                assert_eq!(chunk.biome_at(x, z), Biome::Plains);
            }
        }
        assert_open_sky(&chunk);
    }
}

#[test]
fn test_caves_rerun_identically() {
    let coord = ChunkCoord::new(9, 9);
    let a = generator(WorldType::Normal);
    let b = generator(WorldType::Normal);
    let mut first = a.new_chunk(coord);
    let mut second = b.new_chunk(coord);
    for phase in [strata_procedural::Phase::BaseTerrain, strata_procedural::Phase::Biome, strata_procedural::Phase::Caves] {
        assert!(a.run_phase(&mut first, phase, &mut strata_procedural::DiscardSink));
        assert!(b.run_phase(&mut second, phase, &mut strata_procedural::DiscardSink));
    }
    assert_eq!(first.voxels(), second.voxels());
}

#[test]
fn test_amplified_world_is_taller() {
    let normal = generator(WorldType::Normal);
    let amplified = generator(WorldType::Amplified);
    let spread = |gen: &TerrainGenerator| {
        let heights: Vec<i32> = (0..64).map(|i| gen.shape().column(i * 37, i * -53).height).collect();
        heights.iter().max().copied().unwrap_or(0) - heights.iter().min().copied().unwrap_or(0)
    };
    assert!(spread(&amplified) > spread(&normal));
}

#[test]
fn test_coordinates_past_the_limit_are_rejected() {
    let gen = generator(WorldType::Normal);
    let err = gen.generate(ChunkCoord::new(MAX_CHUNK_COORD + 1, 0)).unwrap_err();
    assert!(matches!(err, StrataError::CoordinateOutOfRange { .. }));
    assert!(gen.generate(ChunkCoord::new(MAX_CHUNK_COORD, -MAX_CHUNK_COORD)).is_ok());
}
