//! Benchmark for noise evaluation.
//!
//! Run with: cargo bench --package strata_procedural --bench noise_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use strata_core::{FractalMode, NoiseConfig, NoiseKind, WorldSeed};
use strata_procedural::noise::{CachedNoise, Noise, NoiseField};

fn noise(kind: NoiseKind, fractal: FractalMode) -> Noise {
    let config = NoiseConfig { kind, fractal, octaves: 4, frequency: 1.0 / 64.0, ..NoiseConfig::default() };
    Noise::new(WorldSeed::new(42), config).unwrap()
}

fn benchmark_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise_kernels");
    for (name, kind) in [("gradient", NoiseKind::Gradient), ("value", NoiseKind::Value), ("cellular", NoiseKind::Cellular)] {
        let n = noise(kind, FractalMode::Fbm);
        group.bench_function(name, |b| {
            let mut x = 0.0f64;
            b.iter(|| {
                x += 0.37;
                black_box(n.sample_fractal_2d(black_box(x), black_box(x * 0.7)))
            });
        });
    }
    group.finish();
}

fn benchmark_column_grid(c: &mut Criterion) {
    let n = noise(NoiseKind::Gradient, FractalMode::Ridged);

    let mut group = c.benchmark_group("column_grid");
    group.throughput(Throughput::Elements(256 * 256));
    group.sample_size(20);
    group.bench_function("256x256_ridged_2d", |b| {
        b.iter(|| {
            for z in 0..256 {
                for x in 0..256 {
                    black_box(n.sample_fractal_2d(f64::from(x), f64::from(z)));
                }
            }
        });
    });
    group.finish();
}

fn benchmark_cached(c: &mut Criterion) {
    let cached = CachedNoise::new(noise(NoiseKind::Gradient, FractalMode::Fbm), 4096, 8);

    c.bench_function("cached_noise_hot", |b| {
        let mut i = 0u32;
        b.iter(|| {
            i = (i + 1) % 64;
            black_box(cached.field_2d(f64::from(i), 3.0))
        });
    });
}

criterion_group!(benches, benchmark_kernels, benchmark_column_grid, benchmark_cached);
criterion_main!(benches);
