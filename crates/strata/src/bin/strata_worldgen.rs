//! # STRATA World Generator
//!
//! Headless. Generates a square of chunks around the origin and prints what
//! came out of it.
//!
//! ```bash
//! # Defaults, 5x5 chunks
//! ./strata_worldgen
//!
//! # Own config, 9x9 chunks, with phase timings
//! RUST_LOG=strata_procedural=trace ./strata_worldgen world.toml 4
//! ```

use std::process::ExitCode;
use std::time::Instant;

use strata::World;
use strata_core::{ChunkCoord, WorldConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_RADIUS: u32 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => match WorldConfig::load(&path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("world could not start: {path}: {error}");
                return ExitCode::FAILURE;
            }
        },
        None => WorldConfig::default(),
    };
    let radius = match args.next().map(|r| r.parse::<u32>()) {
        None => DEFAULT_RADIUS,
        Some(Ok(radius)) => radius,
        Some(Err(error)) => {
            eprintln!("radius must be a non-negative integer: {error}");
            return ExitCode::FAILURE;
        }
    };

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    STRATA WORLDGEN v{}", env!("CARGO_PKG_VERSION"));
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  seed:       {}", config.seed);
    println!("  world type: {:?}", config.world_type);
    println!("  height:     {}..={} (sea level {})", config.min_y, config.max_y, config.sea_level);
    println!("  area:       {0}x{0} chunks", radius * 2 + 1);
    println!();

    let world = match World::start(config) {
        Ok(world) => world,
        Err(error) => {
            eprintln!("world could not start: {error}");
            return ExitCode::FAILURE;
        }
    };

    let started = Instant::now();
    let report = world.generate_area(ChunkCoord::new(0, 0), radius);
    let elapsed = started.elapsed();

    let chunks = report.ready.len();
    println!(
        "generated {chunks} chunks in {:.2?} ({:.2?}/chunk), {} cancelled, {} failed",
        elapsed,
        elapsed / u32::try_from(chunks.max(1)).unwrap_or(u32::MAX),
        report.cancelled,
        report.failed,
    );
    println!();
    print!("{}", world.area_stats(&report.ready));

    let failed = report.failed > 0;
    world.shutdown();
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
