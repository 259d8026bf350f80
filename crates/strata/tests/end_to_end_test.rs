//! # End-to-End Scenarios
//!
//! Whole worlds driven through the public facade: generation on the pool,
//! player edits, redstone on generated terrain and the event bus.

use strata::World;
use strata_core::{ids, Block, BlockPos, ChunkCoord, Facing, StrataError, WorldConfig, WorldEvent, WorldType};

fn config(seed: i64, world_type: WorldType, workers: usize) -> WorldConfig {
    let mut config = WorldConfig { seed, world_type, ..WorldConfig::default() };
    config.generation.worker_count = workers;
    config
}

fn flat_world() -> World {
    let world = World::start(config(7, WorldType::Flat, 2)).unwrap();
    let report = world.generate_area(ChunkCoord::new(0, 0), 1);
    assert_eq!(report.ready.len(), 9);
    world
}

fn p(x: i32, y: i32, z: i32) -> BlockPos {
    BlockPos::new(x, y, z)
}

fn facing(id: u16, facing: Facing) -> Block {
    Block::new(id).with_facing(facing)
}

#[test]
fn test_flat_world_layers() {
    let world = flat_world();
    for z in -16..32 {
        for x in -16..32 {
            assert_eq!(world.height_at(x, z), 64);
            assert!(world.block(p(x, 65, z)).is_air());
            assert_eq!(world.block(p(x, 64, z)), Block::GRASS);
            for y in 61..=63 {
                assert_eq!(world.block(p(x, y, z)), Block::DIRT);
            }
            assert_eq!(world.block(p(x, 60, z)), Block::STONE);
            assert_eq!(world.block(p(x, 0, z)), Block::STONE);
        }
    }
    world.shutdown();
}

#[test]
fn test_cave_count_is_reproducible() {
    let count = |workers: usize, order: &[ChunkCoord]| {
        let mut config = config(42, WorldType::Normal, workers);
        config.generation.cave_density = 0.1;
        let world = World::start(config).unwrap();
        for &coord in order {
            assert_eq!(world.generate_chunks(&[coord]).ready, vec![coord]);
        }
        let chunk = world.store().snapshot(ChunkCoord::new(0, 0)).unwrap();
        let mut air = 0usize;
        for z in 0..16 {
            for x in 0..16 {
                air += (10..=40).filter(|&y| chunk.get(x, y, z).is_air()).count();
            }
        }
        world.shutdown();
        air
    };

    let forward: Vec<_> = (-1..=1).flat_map(|z| (-1..=1).map(move |x| ChunkCoord::new(x, z))).collect();
    let backward: Vec<_> = forward.iter().rev().copied().collect();
    // Golden count for seed 42 at cave density 0.1, recorded next to `seed_hash`.
    assert_eq!(count(1, &forward), 72);
    assert_eq!(count(4, &backward), 72);
}

#[test]
fn test_same_seed_same_world_for_any_worker_count() {
    let a = World::start(config(99, WorldType::Normal, 1)).unwrap();
    let b = World::start(config(99, WorldType::Normal, 4)).unwrap();
    a.generate_area(ChunkCoord::new(3, -2), 1);
    b.generate_area(ChunkCoord::new(3, -2), 1);

    let center = ChunkCoord::new(3, -2);
    let left = a.store().snapshot(center).unwrap();
    let right = b.store().snapshot(center).unwrap();
    assert_eq!(left.voxels(), right.voxels());
    assert_eq!(left.height_map(), right.height_map());
    assert_eq!(left.biome_map(), right.biome_map());
    assert_eq!(a.biome_at(50, -20), b.biome_at(50, -20));
    a.shutdown();
    b.shutdown();
}

#[test]
fn test_torch_inverter_on_generated_ground() {
    let world = flat_world();
    let lever = p(-1, 65, 0);
    let torch = p(1, 65, 0);
    world.set_block(lever, Block::new(ids::LEVER)).unwrap();
    world.set_block(p(0, 65, 0), Block::STONE).unwrap();
    world.set_block(torch, facing(ids::REDSTONE_TORCH, Facing::PosX)).unwrap();
    for x in 2..=5 {
        world.set_block(p(x, 65, 0), Block::new(ids::WIRE)).unwrap();
    }
    world.run_redstone_ticks(3);
    assert_eq!(world.power_at(torch), 15);
    let line: Vec<u8> = (2..=5).map(|x| world.power_at(p(x, 65, 0))).collect();
    assert_eq!(line, vec![15, 14, 13, 12]);
    assert_eq!(world.block(p(2, 65, 0)).stored_power(), 15);

    let events = world.events();
    events.drain();
    world.set_lever(lever, true).unwrap();
    world.run_redstone_ticks(1);
    assert_eq!(world.power_at(torch), 15);
    world.run_redstone_ticks(1);
    assert_eq!(world.power_at(torch), 0);
    assert!((2..=5).all(|x| world.power_at(p(x, 65, 0)) == 0));
    assert!(events
        .drain()
        .iter()
        .any(|e| matches!(e, WorldEvent::ComponentChanged { pos, power: 0, .. } if *pos == torch)));

    world.set_lever(lever, false).unwrap();
    world.run_redstone_ticks(2);
    assert_eq!(world.power_at(torch), 15);
    assert_eq!(world.power_snapshots().latest().power_at(p(5, 65, 0)), 12);
    world.shutdown();
}

#[test]
fn test_piston_push_on_generated_ground() {
    let world = flat_world();
    let lever = p(-1, 65, 0);
    world.set_block(lever, Block::new(ids::LEVER)).unwrap();
    world.set_block(p(0, 65, 0), facing(ids::PISTON, Facing::PosX)).unwrap();
    for x in 1..=3 {
        world.set_block(p(x, 65, 0), Block::STONE).unwrap();
    }
    world.run_redstone_ticks(2);
    assert_eq!(world.height_at(4, 0), 64);

    world.set_lever(lever, true).unwrap();
    world.run_redstone_ticks(2);
    assert_eq!(world.block(p(1, 65, 0)).id, ids::PISTON_HEAD);
    let row: Vec<Block> = (1..=4).map(|x| world.block(p(x, 65, 0))).collect();
    assert_eq!(row.iter().filter(|b| **b == Block::STONE).count(), 3);
    assert_eq!(row.iter().filter(|b| b.id == ids::PISTON_HEAD).count(), 1);
    assert_eq!(world.height_at(4, 0), 65);
    world.shutdown();
}

#[test]
fn test_redstone_written_before_generation_is_indexed() {
    let world = World::start(config(3, WorldType::Flat, 2)).unwrap();
    let source = p(40, 200, 40);
    let wire = p(41, 200, 40);
    world.set_block(source, Block::new(ids::SOURCE).with_stored_power(15)).unwrap();
    world.set_block(wire, Block::new(ids::WIRE)).unwrap();
    assert!(world.block(source).is_air());

    let report = world.generate_area(ChunkCoord::new(2, 2), 0);
    assert_eq!(report.ready, vec![ChunkCoord::new(2, 2)]);
    assert_eq!(report.components, 2);
    assert_eq!(world.block(source).id, ids::SOURCE);

    world.run_redstone_ticks(2);
    assert_eq!(world.power_at(wire), 15);
    assert!(world.component_at(source).is_some());
    world.shutdown();
}

#[test]
fn test_player_edits_reach_the_bus() {
    let world = flat_world();
    let events = world.events();
    let ready = events.drain().iter().filter(|e| matches!(e, WorldEvent::ChunkReady { .. })).count();
    assert_eq!(ready, 9);

    let pos = p(8, 64, 8);
    assert_eq!(world.set_block(pos, Block::AIR).unwrap(), Block::GRASS);
    assert_eq!(world.height_at(8, 8), 63);
    assert_eq!(events.drain(), vec![WorldEvent::VoxelChanged { pos, old: Block::GRASS, new: Block::AIR }]);
    world.shutdown();
}

#[test]
fn test_out_of_range_edit_is_rejected() {
    let world = World::start(config(1, WorldType::Flat, 1)).unwrap();
    let far = p(i32::MAX - 4, 70, 0);
    assert!(matches!(world.set_block(far, Block::STONE), Err(StrataError::CoordinateOutOfRange { .. })));
    world.shutdown();
}

#[test]
fn test_bad_config_reports_configuration_error() {
    let mut bad = WorldConfig::default();
    bad.redstone.ticks_per_second = 0;
    assert!(matches!(World::start(bad), Err(StrataError::Configuration(_))));
}
