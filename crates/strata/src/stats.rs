//! Block and biome tallies over generated chunks.

use std::collections::BTreeMap;
use std::fmt;

use strata_core::{BlockRegistry, CHUNK_SIZE};
use strata_procedural::{Biome, Chunk};

/// Counts gathered from a set of chunks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AreaStats {
    /// Chunks counted.
    pub chunks: usize,
    /// Columns per biome name.
    pub biomes: BTreeMap<&'static str, u64>,
    /// Voxels per block name, air excluded.
    pub blocks: BTreeMap<&'static str, u64>,
    /// Lowest column height seen.
    pub min_height: Option<i32>,
    /// Highest column height seen.
    pub max_height: Option<i32>,
}

impl AreaStats {
    /// Empty tallies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one chunk.
    pub fn add_chunk(&mut self, chunk: &Chunk, registry: &BlockRegistry) {
        self.chunks += 1;
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                *self.biomes.entry(chunk.biome_at(x, z).name()).or_insert(0) += 1;
                let height = chunk.height_at(x, z);
                self.min_height = Some(self.min_height.map_or(height, |h| h.min(height)));
                self.max_height = Some(self.max_height.map_or(height, |h| h.max(height)));
            }
        }
        for &block in chunk.voxels() {
            if !block.is_air() {
                *self.blocks.entry(registry.props(block).name).or_insert(0) += 1;
            }
        }
    }

    /// Columns classified as `biome`.
    #[must_use]
    pub fn biome_columns(&self, biome: Biome) -> u64 {
        self.biomes.get(biome.name()).copied().unwrap_or(0)
    }

    /// Voxels of the block named `name`.
    #[must_use]
    pub fn block_count(&self, name: &str) -> u64 {
        self.blocks.get(name).copied().unwrap_or(0)
    }

    /// Total solid, fluid and plant voxels.
    #[must_use]
    pub fn total_blocks(&self) -> u64 {
        self.blocks.values().sum()
    }
}

impl fmt::Display for AreaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "chunks: {}", self.chunks)?;
        if let (Some(low), Some(high)) = (self.min_height, self.max_height) {
            writeln!(f, "heights: {low}..={high}")?;
        }

        let columns: u64 = self.biomes.values().sum();
        writeln!(f, "biomes:")?;
        let mut biomes: Vec<_> = self.biomes.iter().collect();
        biomes.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (name, count) in biomes {
            let share = if columns == 0 { 0.0 } else { *count as f64 * 100.0 / columns as f64 };
            writeln!(f, "  {name:<20} {count:>10} {share:>6.2}%")?;
        }

        writeln!(f, "blocks:")?;
        let mut blocks: Vec<_> = self.blocks.iter().collect();
        blocks.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (name, count) in blocks {
            writeln!(f, "  {name:<20} {count:>10}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{ChunkCoord, WorldConfig, WorldType};
    use strata_procedural::TerrainGenerator;

    #[test]
    fn test_flat_chunk_tallies() {
        let config = WorldConfig { world_type: WorldType::Flat, ..WorldConfig::default() };
        let registry = BlockRegistry::standard();
        let generator = TerrainGenerator::new(&config, registry.clone()).unwrap();
        let chunk = generator.generate(ChunkCoord::new(0, 0)).unwrap();

        let mut stats = AreaStats::new();
        stats.add_chunk(&chunk, &registry);
        assert_eq!(stats.chunks, 1);
        assert_eq!(stats.min_height, Some(64));
        assert_eq!(stats.max_height, Some(64));
        assert_eq!(stats.biomes.values().sum::<u64>(), 256);
        assert_eq!(stats.block_count("grass"), 256);
        assert_eq!(stats.block_count("dirt"), 3 * 256);
        assert!(stats.to_string().contains("grass"));
    }
}
