//! # Chunk Lighting
//!
//! Sky and block light, 0..=15, computed inside one chunk.
//!
//! Sky light falls straight down at full strength through clear voxels,
//! loses each voxel's filter through leaves, water and ice, and stops at
//! opaque voxels. Both fields then flood-fill, losing one level per step
//! plus the filter of the voxel entered. Light never crosses the chunk
//! border: each chunk is lit from its own voxels alone, which keeps the
//! result independent of neighbour generation order.
//!
//! That leaves a visible seam. Glowstone at local x=15 lights its own
//! chunk but leaves x=0 of the next one dark, and an overhang that starts
//! in a neighbour does not shade this chunk's sky light.

use std::collections::VecDeque;

use strata_core::{BlockRegistry, CHUNK_SIZE};

use crate::chunk::Chunk;

/// Maximum light level.
pub const MAX_LIGHT: u8 = 15;

/// Recomputes sky and block light for the whole chunk and clears its dirty set.
pub fn compute_light(chunk: &mut Chunk, registry: &BlockRegistry) {
    let height = chunk.height();
    let voxels = chunk.voxels();
    let volume = voxels.len();
    let opaque: Vec<bool> = voxels.iter().map(|&b| registry.props(b).is_opaque()).collect();
    let filter: Vec<u8> = voxels.iter().map(|&b| registry.props(b).light_filter).collect();

    let mut sky = vec![0u8; volume];
    let mut queue = VecDeque::new();
    for z in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let mut level = MAX_LIGHT;
            for ly in (0..height).rev() {
                let i = (ly * CHUNK_SIZE + z) * CHUNK_SIZE + x;
                if opaque[i] {
                    level = 0;
                } else {
                    level = level.saturating_sub(filter[i]);
                }
                sky[i] = level;
                if level > 1 {
                    queue.push_back(i);
                }
            }
        }
    }
    flood(&mut sky, &mut queue, &opaque, &filter, height);

    let mut block = vec![0u8; volume];
    for (i, &voxel) in voxels.iter().enumerate() {
        let emission = registry.emission(voxel).min(MAX_LIGHT);
        if emission > 0 {
            block[i] = emission;
            queue.push_back(i);
        }
    }
    flood(&mut block, &mut queue, &opaque, &filter, height);

    chunk.install_light(sky, block);
}

fn flood(light: &mut [u8], queue: &mut VecDeque<usize>, opaque: &[bool], filter: &[u8], height: usize) {
    let layer = CHUNK_SIZE * CHUNK_SIZE;
    while let Some(i) = queue.pop_front() {
        let level = light[i];
        if level <= 1 {
            continue;
        }
        let x = i % CHUNK_SIZE;
        let z = (i / CHUNK_SIZE) % CHUNK_SIZE;
        let ly = i / layer;
        let mut neighbours = [None; 6];
        if x > 0 {
            neighbours[0] = Some(i - 1);
        }
        if x + 1 < CHUNK_SIZE {
            neighbours[1] = Some(i + 1);
        }
        if z > 0 {
            neighbours[2] = Some(i - CHUNK_SIZE);
        }
        if z + 1 < CHUNK_SIZE {
            neighbours[3] = Some(i + CHUNK_SIZE);
        }
        if ly > 0 {
            neighbours[4] = Some(i - layer);
        }
        if ly + 1 < height {
            neighbours[5] = Some(i + layer);
        }
        for n in neighbours.into_iter().flatten() {
            if opaque[n] {
                continue;
            }
            let candidate = level.saturating_sub(1 + filter[n]);
            if candidate > light[n] {
                light[n] = candidate;
                queue.push_back(n);
            }
        }
    }
}

/// Light a viewer sees: `max(sky * daylight, block)`.
///
/// `daylight` is clamped to `[0, 1]`.
#[must_use]
pub fn effective_light(sky: u8, block: u8, daylight: f32) -> u8 {
    let scaled = (f32::from(sky) * daylight.clamp(0.0, 1.0)).round() as u8;
    scaled.max(block).min(MAX_LIGHT)
}
