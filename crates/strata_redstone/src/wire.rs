//! # Wire Networks
//!
//! Wire voxels that touch form a region. Two wires touch when they are
//! horizontal neighbours, when one sits directly on the other, or when they
//! are one step apart diagonally up or down with nothing solid resting on
//! the lower one:
//!
//! ```text
//!   .  W        S  W
//!   W  S        W  S      W = wire, S = solid
//!   linked      cut
//! ```
//!
//! A region is always recomputed as a whole: every member starts at its
//! external input and power then spreads with a loss of one per step, from
//! the strongest level downwards. The result is the unique fixpoint where
//! each wire holds `max(input, strongest linked wire - 1)`, so linked wires
//! never differ by more than one and a region with no input settles at 0 in
//! the same tick, loops included.

use std::collections::{HashMap, HashSet, VecDeque};

use strata_core::{BlockPos, Facing};

use crate::component::MAX_POWER;

/// A connected set of wires and the links between them.
#[derive(Clone, Debug, Default)]
pub struct WireRegion {
    members: Vec<BlockPos>,
    links: HashMap<BlockPos, Vec<BlockPos>>,
}

impl WireRegion {
    /// Members, sorted by position.
    #[must_use]
    pub fn members(&self) -> &[BlockPos] {
        &self.members
    }

    /// Wires linked to `pos`.
    #[must_use]
    pub fn links(&self, pos: BlockPos) -> &[BlockPos] {
        self.links.get(&pos).map_or(&[], Vec::as_slice)
    }
}

/// Wires `pos` connects to, given which cells hold wire and which are solid.
pub fn linked(pos: BlockPos, is_wire: impl Fn(BlockPos) -> bool, is_solid: impl Fn(BlockPos) -> bool) -> Vec<BlockPos> {
    let up = pos.offset(Facing::PosY);
    let down = pos.offset(Facing::NegY);
    let mut out = Vec::with_capacity(6);
    for candidate in [up, down] {
        if is_wire(candidate) {
            out.push(candidate);
        }
    }
    let covered = is_solid(up);
    for facing in Facing::HORIZONTAL {
        let side = pos.offset(facing);
        if is_wire(side) {
            out.push(side);
        }
        // Step up: the wire above the side block, unless this one is covered.
        let above = side.offset(Facing::PosY);
        if !covered && is_wire(above) {
            out.push(above);
        }
        // Step down: the wire below the side block, unless it is covered.
        let below = side.offset(Facing::NegY);
        if !is_solid(side) && is_wire(below) {
            out.push(below);
        }
    }
    out
}

/// Collects the region containing `start`.
pub fn collect_region(
    start: BlockPos,
    is_wire: impl Fn(BlockPos) -> bool,
    is_solid: impl Fn(BlockPos) -> bool,
) -> WireRegion {
    let mut seen = HashSet::from([start]);
    let mut open = VecDeque::from([start]);
    let mut region = WireRegion::default();
    while let Some(pos) = open.pop_front() {
        region.members.push(pos);
        let next = linked(pos, &is_wire, &is_solid);
        for &other in &next {
            if seen.insert(other) {
                open.push_back(other);
            }
        }
        region.links.insert(pos, next);
    }
    region.members.sort_unstable();
    region
}

/// Computes the settled power of every member of a region.
///
/// `input` is the power a wire receives from outside the region.
pub fn settle(region: &WireRegion, input: impl Fn(BlockPos) -> u8) -> HashMap<BlockPos, u8> {
    let mut field: HashMap<BlockPos, u8> = region.members.iter().map(|&p| (p, input(p).min(MAX_POWER))).collect();
    let mut buckets: Vec<Vec<BlockPos>> = vec![Vec::new(); usize::from(MAX_POWER) + 1];
    for &pos in &region.members {
        let level = field[&pos];
        if level > 1 {
            buckets[usize::from(level)].push(pos);
        }
    }

    for level in (2..=MAX_POWER).rev() {
        let bucket = std::mem::take(&mut buckets[usize::from(level)]);
        for pos in bucket {
            if field[&pos] != level {
                continue;
            }
            for next in region.links(pos) {
                if let Some(power) = field.get_mut(next) {
                    if *power < level - 1 {
                        *power = level - 1;
                        buckets[usize::from(level - 1)].push(*next);
                    }
                }
            }
        }
    }
    field
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(cells: &[BlockPos]) -> WireRegion {
        collect_region(cells[0], |p| cells.contains(&p), |_| false)
    }

    #[test]
    fn test_line_loses_one_per_step() {
        let line: Vec<_> = (0..20).map(|x| BlockPos::new(x, 0, 0)).collect();
        let field = settle(&flat(&line), |p| if p.x == 0 { 15 } else { 0 });
        for pos in &line {
            assert_eq!(field[pos], 15u8.saturating_sub(pos.x as u8));
        }
    }

    #[test]
    fn test_loop_without_input_is_dark() {
        let ring: Vec<_> = [(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (1, 2), (0, 2), (0, 1)]
            .iter()
            .map(|&(x, z)| BlockPos::new(x, 0, z))
            .collect();
        let region = flat(&ring);
        assert_eq!(region.members().len(), ring.len());
        let field = settle(&region, |_| 0);
        assert!(field.values().all(|&p| p == 0));
    }

    #[test]
    fn test_neighbours_differ_by_at_most_one() {
        let members: Vec<_> = (0..6).flat_map(|x| (0..6).map(move |z| BlockPos::new(x, 4, z))).collect();
        let region = flat(&members);
        let field = settle(&region, |p| match (p.x, p.z) {
            (0, 0) => 15,
            (5, 5) => 12,
            (3, 0) => 7,
            _ => 0,
        });
        for pos in &members {
            for facing in Facing::HORIZONTAL {
                if let Some(other) = field.get(&pos.offset(facing)) {
                    assert!(field[pos].abs_diff(*other) <= 1);
                }
            }
        }
        assert_eq!(field[&BlockPos::new(5, 4, 5)], 12);
    }

    #[test]
    fn test_staircase_links_across_layers() {
        // Wire climbs a stone step at x=2 and runs on at y=2.
        let wires = [BlockPos::new(1, 1, 0), BlockPos::new(2, 2, 0), BlockPos::new(3, 2, 0)];
        let solid = [BlockPos::new(2, 1, 0)];
        let region = collect_region(wires[0], |p| wires.contains(&p), |p| solid.contains(&p));
        assert_eq!(region.members(), &wires);
        assert!(region.links(wires[0]).contains(&wires[1]));
        assert!(region.links(wires[1]).contains(&wires[0]));

        let field = settle(&region, |p| if p == wires[0] { 15 } else { 0 });
        assert_eq!([field[&wires[0]], field[&wires[1]], field[&wires[2]]], [15, 14, 13]);
    }

    #[test]
    fn test_solid_on_lower_wire_cuts_the_step() {
        let wires = [BlockPos::new(1, 1, 0), BlockPos::new(2, 2, 0)];
        let solid = [BlockPos::new(2, 1, 0), BlockPos::new(1, 2, 0)];
        let region = collect_region(wires[0], |p| wires.contains(&p), |p| solid.contains(&p));
        assert_eq!(region.members(), &wires[..1]);
        let upper = collect_region(wires[1], |p| wires.contains(&p), |p| solid.contains(&p));
        assert_eq!(upper.members(), &wires[1..]);
    }

    #[test]
    fn test_stacked_wires_link() {
        let wires = [BlockPos::new(0, 1, 0), BlockPos::new(0, 2, 0)];
        let region = flat(&wires);
        let field = settle(&region, |p| if p.y == 1 { 15 } else { 0 });
        assert_eq!(field[&wires[1]], 14);
    }
}
