//! # Circuit Scenario Tests
//!
//! Small circuits built on a sparse grid and stepped one redstone tick at a
//! time, checking the exact tick each effect shows up on.

use strata_core::{ids, Aabb, Block, BlockPos, BlockRegistry, EventBus, Facing, RedstoneConfig, WorldEvent};
use strata_redstone::{RedstoneSimulator, SparseGrid, VoxelGrid, MAX_DELAY};

struct Bench {
    sim: RedstoneSimulator,
    grid: SparseGrid,
}

impl Bench {
    fn new() -> Self {
        let bus = EventBus::new(4096);
        Self::with_bus(&bus)
    }

    fn with_bus(bus: &EventBus) -> Self {
        let sim = RedstoneSimulator::new(&RedstoneConfig::default(), BlockRegistry::standard(), bus.sender());
        Self { sim, grid: SparseGrid::new(0, 15) }
    }

    fn place(&mut self, pos: BlockPos, block: Block) {
        self.sim.place_component(&mut self.grid, pos, block);
    }

    fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.sim.step(&mut self.grid);
        }
    }

    fn lever(&mut self, pos: BlockPos, on: bool) {
        self.sim.set_lever(&mut self.grid, pos, on).unwrap();
    }

    fn source(&mut self, pos: BlockPos, level: u8) {
        self.sim.set_source_level(&mut self.grid, pos, level).unwrap();
    }

    fn power(&self, pos: BlockPos) -> u8 {
        self.sim.power_at(pos)
    }

    fn lit(&self, pos: BlockPos) -> bool {
        self.grid.block(pos).is_lit()
    }
}

fn p(x: i32, y: i32, z: i32) -> BlockPos {
    BlockPos::new(x, y, z)
}

fn wire() -> Block {
    Block::new(ids::WIRE)
}

fn facing(id: u16, facing: Facing) -> Block {
    Block::new(id).with_facing(facing)
}

#[test]
fn test_torch_inverter_lags_one_tick() {
    let mut bench = Bench::new();
    let lever = p(-1, 1, 0);
    let torch = p(1, 1, 0);
    bench.place(lever, Block::new(ids::LEVER));
    bench.place(p(0, 1, 0), Block::STONE);
    bench.place(torch, facing(ids::REDSTONE_TORCH, Facing::PosX));
    for x in 2..=5 {
        bench.place(p(x, 1, 0), wire());
    }
    bench.run(3);
    assert_eq!(bench.power(torch), 15);
    let line: Vec<u8> = (2..=5).map(|x| bench.power(p(x, 1, 0))).collect();
    assert_eq!(line, vec![15, 14, 13, 12]);

    bench.lever(lever, true);
    bench.run(1);
    assert_eq!(bench.power(torch), 15);
    assert_eq!(bench.power(p(2, 1, 0)), 15);
    bench.run(1);
    assert_eq!(bench.power(torch), 0);
    assert!((2..=5).all(|x| bench.power(p(x, 1, 0)) == 0));

    bench.lever(lever, false);
    bench.run(1);
    assert_eq!(bench.power(torch), 0);
    bench.run(1);
    assert_eq!(bench.power(torch), 15);
    assert_eq!(bench.power(p(5, 1, 0)), 12);
}

#[test]
fn test_repeater_delay_reaches_lamp_on_time() {
    let mut bench = Bench::new();
    let source = p(0, 1, 0);
    let lamp = p(7, 1, 0);
    bench.place(source, Block::new(ids::SOURCE));
    bench.place(p(1, 1, 0), facing(ids::REPEATER, Facing::PosX).with_repeater_delay(3));
    for x in 2..=6 {
        bench.place(p(x, 1, 0), wire());
    }
    bench.place(lamp, Block::new(ids::LAMP));
    bench.run(3);
    assert!(!bench.lit(lamp));

    bench.source(source, 15);
    bench.run(3);
    assert!(!bench.lit(lamp));
    bench.run(1);
    assert!(bench.lit(lamp));
    assert_eq!(bench.power(p(6, 1, 0)), 11);
    assert_eq!(bench.power(lamp), 11);

    bench.source(source, 0);
    bench.run(5);
    assert!(bench.lit(lamp));
    bench.run(1);
    assert!(!bench.lit(lamp));
}

#[test]
fn test_comparator_modes() {
    let mut bench = Bench::new();
    let comparator = p(0, 1, 0);
    let side = p(0, 1, 1);
    let sink = p(1, 1, 0);
    bench.place(p(-1, 1, 0), Block::new(ids::SOURCE).with_stored_power(12));
    bench.place(side, Block::new(ids::SOURCE).with_stored_power(5));
    bench.place(comparator, facing(ids::COMPARATOR, Facing::PosX).with_subtract_mode(true));
    bench.place(sink, Block::new(ids::SINK));
    bench.run(2);
    assert_eq!(bench.power(comparator), 7);
    assert_eq!(bench.power(sink), 7);

    bench.source(side, 15);
    bench.run(1);
    assert_eq!(bench.power(sink), 7);
    bench.run(1);
    assert_eq!(bench.power(sink), 0);

    bench.place(comparator, facing(ids::COMPARATOR, Facing::PosX));
    bench.source(side, 3);
    bench.run(2);
    assert_eq!(bench.power(sink), 12);
}

#[test]
fn test_piston_pushes_at_midpoint_and_retracts() {
    let mut bench = Bench::new();
    let lever = p(-1, 1, 0);
    bench.place(lever, Block::new(ids::LEVER));
    bench.place(p(0, 1, 0), facing(ids::PISTON, Facing::PosX));
    for x in 1..=3 {
        bench.place(p(x, 1, 0), Block::STONE);
    }
    bench.run(2);

    bench.lever(lever, true);
    bench.run(1);
    assert_eq!(bench.grid.block(p(1, 1, 0)), Block::STONE);
    bench.run(1);
    assert_eq!(bench.grid.block(p(1, 1, 0)).id, ids::PISTON_HEAD);
    assert!((2..=4).all(|x| bench.grid.block(p(x, 1, 0)) == Block::STONE));
    assert_eq!(bench.grid.count(ids::STONE), 3);
    bench.run(1);
    assert!(bench.lit(p(0, 1, 0)));

    bench.lever(lever, false);
    bench.run(2);
    assert_eq!(bench.grid.block(p(1, 1, 0)), Block::AIR);
    assert!((2..=4).all(|x| bench.grid.block(p(x, 1, 0)) == Block::STONE));
    bench.run(1);
    assert!(!bench.lit(p(0, 1, 0)));
}

#[test]
fn test_sticky_piston_pulls_block_back() {
    let mut bench = Bench::new();
    let lever = p(-1, 1, 0);
    bench.place(lever, Block::new(ids::LEVER));
    bench.place(p(0, 1, 0), facing(ids::STICKY_PISTON, Facing::PosX));
    bench.place(p(1, 1, 0), Block::STONE);
    bench.run(2);

    bench.lever(lever, true);
    bench.run(3);
    assert_eq!(bench.grid.block(p(2, 1, 0)), Block::STONE);
    assert!(bench.grid.block(p(1, 1, 0)).is_sticky());

    bench.lever(lever, false);
    bench.run(3);
    assert_eq!(bench.grid.block(p(1, 1, 0)), Block::STONE);
    assert_eq!(bench.grid.block(p(2, 1, 0)), Block::AIR);
}

fn push_line(stones: i32, blocker: Option<Block>) -> (Bench, Vec<Block>) {
    let mut bench = Bench::new();
    bench.place(p(-1, 1, 0), Block::new(ids::LEVER));
    bench.place(p(0, 1, 0), facing(ids::PISTON, Facing::PosX));
    for x in 1..=stones {
        bench.place(p(x, 1, 0), Block::STONE);
    }
    if let Some(block) = blocker {
        bench.place(p(stones + 1, 1, 0), block);
    }
    bench.run(2);
    let before = (0..=20).map(|x| bench.grid.block(p(x, 1, 0))).collect();
    (bench, before)
}

#[test]
fn test_push_limit_refuses_without_change() {
    let (mut bench, before) = push_line(13, None);
    bench.lever(p(-1, 1, 0), true);
    bench.run(5);
    let after: Vec<Block> = (0..=20).map(|x| bench.grid.block(p(x, 1, 0))).collect();
    assert_eq!(before, after);

    let (mut bench, _) = push_line(12, None);
    bench.lever(p(-1, 1, 0), true);
    bench.run(3);
    assert_eq!(bench.grid.block(p(1, 1, 0)).id, ids::PISTON_HEAD);
    assert_eq!(bench.grid.block(p(13, 1, 0)), Block::STONE);
    assert_eq!(bench.grid.count(ids::STONE), 12);
}

#[test]
fn test_immovable_block_refuses_push() {
    let (mut bench, before) = push_line(3, Some(Block::new(ids::OBSIDIAN)));
    bench.lever(p(-1, 1, 0), true);
    bench.run(5);
    let after: Vec<Block> = (0..=20).map(|x| bench.grid.block(p(x, 1, 0))).collect();
    assert_eq!(before, after);
}

#[test]
fn test_lamp_off_delay() {
    let mut bench = Bench::new();
    let lever = p(0, 1, 0);
    let lamp = p(1, 1, 0);
    bench.place(lever, Block::new(ids::LEVER));
    bench.place(lamp, Block::new(ids::LAMP));
    bench.run(1);

    bench.lever(lever, true);
    bench.run(1);
    assert!(bench.lit(lamp));

    bench.lever(lever, false);
    bench.run(2);
    assert!(bench.lit(lamp));
    bench.run(1);
    assert!(!bench.lit(lamp));

    bench.lever(lever, true);
    bench.run(1);
    bench.lever(lever, false);
    bench.run(1);
    bench.lever(lever, true);
    bench.run(3);
    assert!(bench.lit(lamp));
}

#[test]
fn test_button_pulse() {
    let mut bench = Bench::new();
    let button = p(0, 1, 0);
    let lamp = p(1, 1, 0);
    bench.place(button, Block::new(ids::BUTTON));
    bench.place(lamp, Block::new(ids::LAMP));
    bench.run(1);

    bench.sim.press_button(&mut bench.grid, button).unwrap();
    bench.run(1);
    assert!(bench.lit(lamp));
    bench.run(9);
    assert_eq!(bench.power(button), 15);
    bench.run(1);
    assert_eq!(bench.power(button), 0);
    assert!(!bench.lit(button));
    assert!(bench.lit(lamp));
    bench.run(2);
    assert!(!bench.lit(lamp));
}

#[test]
fn test_torch_burns_out_and_recovers() {
    let mut bench = Bench::new();
    let torch = p(1, 1, 0);
    bench.place(p(0, 1, 0), Block::STONE);
    bench.place(torch, facing(ids::REDSTONE_TORCH, Facing::PosX));
    bench.place(p(1, 1, 1), wire());
    bench.place(p(0, 1, 1), wire());

    bench.run(20);
    assert!(bench.sim.component_at(torch).unwrap().torch.burnt_out);
    for _ in 0..30 {
        bench.run(1);
        assert_eq!(bench.power(torch), 0);
    }

    bench.sim.remove_component(&mut bench.grid, p(0, 1, 1));
    bench.run(100);
    let state = bench.sim.component_at(torch).unwrap();
    assert!(!state.torch.burnt_out);
    assert_eq!(state.power, 15);
    assert_eq!(bench.power(p(1, 1, 1)), 15);
}

#[test]
fn test_locked_repeater_holds_output() {
    let mut bench = Bench::new();
    let input = p(-1, 1, 0);
    let lock = p(0, 1, 2);
    let sink = p(1, 1, 0);
    bench.place(input, Block::new(ids::SOURCE));
    bench.place(p(0, 1, 0), facing(ids::REPEATER, Facing::PosX));
    bench.place(sink, Block::new(ids::SINK));
    bench.place(p(0, 1, 1), facing(ids::REPEATER, Facing::NegZ));
    bench.place(lock, Block::new(ids::SOURCE));
    bench.run(2);

    bench.source(input, 15);
    bench.run(2);
    assert_eq!(bench.power(sink), 15);

    bench.source(lock, 15);
    bench.run(2);
    assert!(bench.sim.component_at(p(0, 1, 0)).unwrap().locked);

    bench.source(input, 0);
    bench.run(3);
    assert_eq!(bench.power(sink), 15);

    bench.source(lock, 0);
    bench.run(3);
    assert_eq!(bench.power(sink), 0);
}

#[test]
fn test_observer_pulses_on_change() {
    let mut bench = Bench::new();
    let observer = p(0, 1, 0);
    let sink = p(-1, 1, 0);
    bench.place(observer, facing(ids::OBSERVER, Facing::PosX));
    bench.place(sink, Block::new(ids::SINK));
    bench.run(2);
    assert_eq!(bench.power(sink), 0);

    bench.place(p(1, 1, 0), Block::STONE);
    bench.run(1);
    assert_eq!(bench.power(sink), 0);
    bench.run(1);
    assert_eq!(bench.power(sink), 15);
    bench.run(1);
    assert_eq!(bench.power(sink), 0);
}

#[test]
fn test_wire_loop_settles_dark() {
    let mut bench = Bench::new();
    let lever = p(-1, 1, 0);
    let ring: Vec<BlockPos> =
        [(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (1, 2), (0, 2), (0, 1)].iter().map(|&(x, z)| p(x, 1, z)).collect();
    bench.place(lever, Block::new(ids::LEVER));
    for &pos in &ring {
        bench.place(pos, wire());
    }
    bench.lever(lever, true);
    bench.run(1);
    assert!(ring.iter().all(|&pos| bench.power(pos) > 0));
    assert_eq!(bench.power(p(0, 1, 0)), 15);

    bench.lever(lever, false);
    bench.run(ring.len());
    assert!(ring.iter().all(|&pos| bench.power(pos) == 0));
}

#[test]
fn test_place_then_remove_restores_network() {
    let mut bench = Bench::new();
    let lever = p(0, 1, 0);
    bench.place(lever, Block::new(ids::LEVER).with_lit(true));
    for x in 1..=4 {
        bench.place(p(x, 1, 0), wire());
    }
    bench.run(2);
    let before: Vec<u8> = (1..=4).map(|x| bench.power(p(x, 1, 0))).collect();
    assert_eq!(before, vec![15, 14, 13, 12]);

    bench.place(p(4, 1, 1), Block::new(ids::SOURCE).with_stored_power(15));
    bench.run(1);
    assert_eq!(bench.power(p(4, 1, 0)), 15);

    bench.sim.remove_component(&mut bench.grid, p(4, 1, 1));
    bench.run(3);
    let after: Vec<u8> = (1..=4).map(|x| bench.power(p(x, 1, 0))).collect();
    assert_eq!(before, after);
    let region = Aabb::from_corners(p(-2, 0, -2), p(6, 3, 3));
    assert!(bench.sim.registry_agrees_with(&bench.grid, region));
}

#[test]
fn test_torch_place_then_remove_restores_network() {
    let mut bench = Bench::new();
    let lever = p(-1, 1, 0);
    let torch = p(1, 1, 0);
    let line: Vec<BlockPos> = (2..=5).map(|x| p(x, 1, 0)).collect();
    bench.place(lever, Block::new(ids::LEVER));
    bench.place(p(0, 1, 0), Block::STONE);
    for &pos in &line {
        bench.place(pos, wire());
    }
    bench.run(2);
    let powers = |bench: &Bench| -> Vec<u8> { line.iter().map(|&pos| bench.power(pos)).collect() };
    let before = powers(&bench);
    assert_eq!(before, vec![0; 4]);

    let deadline = usize::from(MAX_DELAY) + 2;
    for held in [0, 2, 5] {
        bench.place(torch, facing(ids::REDSTONE_TORCH, Facing::PosX));
        bench.run(held);
        if held >= 2 {
            assert_eq!(bench.power(torch), 15);
            assert_eq!(powers(&bench), vec![15, 14, 13, 12]);
        }

        bench.sim.remove_component(&mut bench.grid, torch);
        bench.run(deadline);
        assert_eq!(powers(&bench), before, "torch held for {held} ticks");
        assert!(bench.sim.component_at(torch).is_none());
        assert_eq!(bench.sim.pending_events(), 0);
        bench.run(3);
        assert_eq!(powers(&bench), before);
    }
    let region = Aabb::from_corners(p(-2, 0, -2), p(6, 3, 2));
    assert!(bench.sim.registry_agrees_with(&bench.grid, region));
}

#[test]
fn test_wire_climbs_and_descends_a_step() {
    let mut bench = Bench::new();
    let lower = p(1, 1, 0);
    let upper = p(2, 2, 0);
    let next = p(3, 2, 0);
    bench.place(p(0, 1, 0), Block::new(ids::SOURCE).with_stored_power(15));
    bench.place(lower, wire());
    bench.place(p(2, 1, 0), Block::STONE);
    bench.place(upper, wire());
    bench.place(next, wire());
    bench.run(1);
    assert_eq!([bench.power(lower), bench.power(upper), bench.power(next)], [15, 14, 13]);

    // Stone on the lower wire cuts the step.
    bench.place(p(1, 2, 0), Block::STONE);
    bench.run(1);
    assert_eq!([bench.power(lower), bench.power(upper), bench.power(next)], [15, 0, 0]);

    bench.sim.remove_component(&mut bench.grid, p(1, 2, 0));
    bench.run(1);
    assert_eq!(bench.power(next), 13);

    // Powered from the top, the line runs back down.
    bench.source(p(0, 1, 0), 0);
    bench.place(p(4, 2, 0), Block::new(ids::SOURCE).with_stored_power(15));
    bench.run(1);
    assert_eq!([bench.power(next), bench.power(upper), bench.power(lower)], [15, 14, 13]);
}

#[test]
fn test_index_region_tracks_voxels() {
    let mut bench = Bench::new();
    bench.grid.set_block(p(0, 1, 0), Block::new(ids::LEVER).with_lit(true));
    bench.grid.set_block(p(1, 1, 0), wire());
    bench.grid.set_block(p(2, 1, 0), Block::new(ids::LAMP));
    let region = Aabb::from_corners(p(-1, 0, -1), p(3, 2, 1));

    assert_eq!(bench.sim.index_region(&bench.grid, region), 3);
    assert!(bench.sim.registry_agrees_with(&bench.grid, region));
    bench.run(1);
    assert_eq!(bench.power(p(1, 1, 0)), 15);
    assert!(bench.lit(p(2, 1, 0)));

    bench.grid.set_block(p(3, 1, 1), Block::new(ids::LEVER));
    assert!(!bench.sim.registry_agrees_with(&bench.grid, region));
    bench.sim.on_voxel_changed(p(3, 1, 1), Block::AIR, Block::new(ids::LEVER));
    bench.run(1);
    assert!(bench.sim.registry_agrees_with(&bench.grid, region));
}

#[test]
fn test_component_changes_reach_the_bus() {
    let bus = EventBus::new(256);
    let receiver = bus.receiver();
    let mut bench = Bench::with_bus(&bus);
    let lever = p(0, 1, 0);
    bench.place(lever, Block::new(ids::LEVER));
    bench.run(1);
    receiver.drain();

    bench.lever(lever, true);
    bench.run(1);
    let events = receiver.drain();
    assert!(events.contains(&WorldEvent::ComponentChanged { pos: lever, power: 15, tick: 4 }));
}
