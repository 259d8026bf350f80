//! Benchmark for whole-world operations through the facade.
//!
//! Run with: cargo bench --package strata --bench world_benchmark

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use strata::World;
use strata_core::{ids, Block, BlockPos, ChunkCoord, WorldConfig, WorldType};

/// 3x3 chunks of normal terrain on a fresh world.
fn benchmark_generate_area(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_area");
    group.sample_size(10);
    group.bench_function("normal_3x3", |b| {
        b.iter_batched(
            || World::start(WorldConfig { seed: 12345, ..WorldConfig::default() }).unwrap(),
            |world| {
                black_box(world.generate_area(ChunkCoord::new(0, 0), 1));
                world.shutdown();
            },
            BatchSize::PerIteration,
        );
    });
    group.finish();
}

/// Game ticks over a flat world carrying a lever-driven wire line.
fn benchmark_world_tick(c: &mut Criterion) {
    let world = World::start(WorldConfig { world_type: WorldType::Flat, ..WorldConfig::default() }).unwrap();
    world.generate_area(ChunkCoord::new(0, 0), 0);
    let lever = BlockPos::new(0, 65, 0);
    world.set_block(lever, Block::new(ids::LEVER)).unwrap();
    for x in 1..=15 {
        world.set_block(BlockPos::new(x, 65, 0), Block::new(ids::WIRE)).unwrap();
    }
    world.run_redstone_ticks(1);

    let mut on = false;
    c.bench_function("world_tick_pair", |b| {
        b.iter(|| {
            on = !on;
            world.set_lever(lever, on).unwrap();
            black_box(world.run_ticks(2))
        });
    });
}

criterion_group!(benches, benchmark_generate_area, benchmark_world_tick);
criterion_main!(benches);
