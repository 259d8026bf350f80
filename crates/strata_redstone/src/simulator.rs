//! # Redstone Simulator
//!
//! Discrete-event simulation of every component in the world.
//!
//! ## One redstone tick
//!
//! ```text
//! 1. drain voxel changes (FIFO)  ──> sync components, mark dirty
//! 2. loop:
//!      evaluate dirty components  ──> zero-delay effects, schedule delayed ones
//!      pop next event due now     ──> apply it, mark dirty
//!    until nothing is dirty and nothing is due
//! 3. publish the power snapshot
//! ```
//!
//! A tick either runs to the end or is skipped entirely; readers only ever
//! see snapshots of finished ticks. Events due on the same tick fire in the
//! order they were scheduled.
//!
//! ## Invariants
//!
//! - Every redstone voxel in an indexed region has exactly one component,
//!   and every component sits on a redstone voxel.
//! - An event whose target was removed, replaced or rescheduled is dropped.
//! - Wire power never exceeds its strongest input.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use strata_core::{
    ids, Aabb, Block, BlockPos, BlockRegistry, EventSender, Facing, RedstoneConfig, RedstoneKind, StrataError,
    StrataResult, WorldEvent,
};

use crate::component::{Component, ComponentState, Scheduled, MAX_POWER};
use crate::grid::VoxelGrid;
use crate::piston::{self, VoxelWrite};
use crate::scheduler::{EventAction, EventQueue, RedstoneEvent};
use crate::snapshot::{PowerSnapshot, SnapshotPublisher, SnapshotReader};
use crate::wire;

/// Redstone ticks a lamp stays lit after losing power.
const LAMP_OFF_DELAY: u64 = 2;

/// Component evaluations allowed in one tick before the rest is deferred.
const MAX_UPDATES_PER_TICK: usize = 1 << 20;

/// A voxel overwrite the simulator has not seen yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoxelChange {
    /// Position.
    pub pos: BlockPos,
    /// Block before the write.
    pub old: Block,
    /// Block after the write.
    pub new: Block,
}

/// Cloneable handle for reporting voxel changes from any thread.
///
/// Changes are applied at the start of the next redstone tick.
#[derive(Clone, Debug)]
pub struct ChangeSender {
    tx: Sender<VoxelChange>,
}

impl ChangeSender {
    /// Queues a change. Returns false if the simulator is gone.
    pub fn send(&self, pos: BlockPos, old: Block, new: Block) -> bool {
        self.tx.send(VoxelChange { pos, old, new }).is_ok()
    }
}

/// What one redstone tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Redstone tick number.
    pub tick: u64,
    /// Voxel changes applied.
    pub changes: usize,
    /// Events fired.
    pub events: usize,
    /// Component evaluations.
    pub updates: usize,
    /// Output changes.
    pub outputs: usize,
}

/// The redstone simulator.
pub struct RedstoneSimulator {
    config: RedstoneConfig,
    registry: BlockRegistry,
    components: HashMap<BlockPos, Component>,
    queue: EventQueue,
    changes_tx: Sender<VoxelChange>,
    changes_rx: Receiver<VoxelChange>,
    dirty: VecDeque<BlockPos>,
    dirty_set: HashSet<BlockPos>,
    now: u64,
    events: EventSender,
    publisher: SnapshotPublisher,
    shutdown: Arc<AtomicBool>,
    report: TickReport,
}

impl RedstoneSimulator {
    /// Creates an empty simulator.
    #[must_use]
    pub fn new(config: &RedstoneConfig, registry: BlockRegistry, events: EventSender) -> Self {
        let (changes_tx, changes_rx) = unbounded();
        tracing::info!(
            ratio = config.game_ticks_per_redstone_tick,
            push_limit = config.push_limit,
            "redstone simulator created"
        );
        Self {
            config: config.clone(),
            registry,
            components: HashMap::new(),
            queue: EventQueue::new(),
            changes_tx,
            changes_rx,
            dirty: VecDeque::new(),
            dirty_set: HashSet::new(),
            now: 0,
            events,
            publisher: SnapshotPublisher::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            report: TickReport::default(),
        }
    }

    /// Shares an external shutdown flag; once set, ticks are skipped.
    #[must_use]
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// Handle for queueing voxel changes.
    #[must_use]
    pub fn change_sender(&self) -> ChangeSender {
        ChangeSender { tx: self.changes_tx.clone() }
    }

    /// Reader for the published power snapshots.
    #[must_use]
    pub fn snapshot_reader(&self) -> SnapshotReader {
        self.publisher.reader()
    }

    /// Redstone ticks executed so far.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.now
    }

    /// Game time of the current redstone tick.
    #[must_use]
    pub fn game_time(&self) -> u64 {
        self.now * self.ratio()
    }

    /// Number of registered components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Number of queued events, stale ones included.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Component at `pos`.
    #[must_use]
    pub fn component_at(&self, pos: BlockPos) -> Option<&Component> {
        self.components.get(&pos)
    }

    /// Output power at `pos`; the input level for lamps, pistons and sinks.
    #[must_use]
    pub fn power_at(&self, pos: BlockPos) -> u8 {
        self.components.get(&pos).map_or(0, |c| c.power)
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Queues a voxel change made elsewhere.
    pub fn on_voxel_changed(&self, pos: BlockPos, old: Block, new: Block) {
        if self.changes_tx.send(VoxelChange { pos, old, new }).is_err() {
            tracing::warn!(%pos, "voxel change lost");
        }
    }

    /// Writes `block` at `pos` and queues the change. Returns the old block.
    pub fn place_component(&self, grid: &mut dyn VoxelGrid, pos: BlockPos, block: Block) -> Block {
        let old = grid.set_block(pos, block);
        if old != block {
            self.on_voxel_changed(pos, old, block);
        }
        old
    }

    /// Clears `pos` to air and queues the change. Returns the old block.
    pub fn remove_component(&self, grid: &mut dyn VoxelGrid, pos: BlockPos) -> Block {
        self.place_component(grid, pos, Block::AIR)
    }

    /// Flips a lever.
    ///
    /// # Errors
    ///
    /// [`StrataError::ComponentMissing`] if `pos` holds no lever.
    pub fn set_lever(&self, grid: &mut dyn VoxelGrid, pos: BlockPos, on: bool) -> StrataResult<()> {
        self.edit_input(grid, pos, ids::LEVER, |b| b.with_lit(on))
    }

    /// Presses a button; it releases by itself after the pulse length.
    ///
    /// # Errors
    ///
    /// [`StrataError::ComponentMissing`] if `pos` holds no button.
    pub fn press_button(&self, grid: &mut dyn VoxelGrid, pos: BlockPos) -> StrataResult<()> {
        self.edit_input(grid, pos, ids::BUTTON, |b| b.with_lit(true))
    }

    /// Activates or releases a pressure plate.
    ///
    /// # Errors
    ///
    /// [`StrataError::ComponentMissing`] if `pos` holds no plate.
    pub fn set_pressure_plate(&self, grid: &mut dyn VoxelGrid, pos: BlockPos, active: bool) -> StrataResult<()> {
        self.edit_input(grid, pos, ids::PRESSURE_PLATE, |b| b.with_lit(active))
    }

    /// Sets the level of a constant source.
    ///
    /// # Errors
    ///
    /// [`StrataError::ComponentMissing`] if `pos` holds no source.
    pub fn set_source_level(&self, grid: &mut dyn VoxelGrid, pos: BlockPos, level: u8) -> StrataResult<()> {
        self.edit_input(grid, pos, ids::SOURCE, |b| b.with_stored_power(level.min(MAX_POWER)))
    }

    fn edit_input(
        &self,
        grid: &mut dyn VoxelGrid,
        pos: BlockPos,
        id: u16,
        edit: impl FnOnce(Block) -> Block,
    ) -> StrataResult<()> {
        let old = grid.block(pos);
        if old.id != id {
            return Err(missing(pos));
        }
        let new = edit(old);
        if new != old {
            grid.set_block(pos, new);
            self.on_voxel_changed(pos, old, new);
        }
        Ok(())
    }

    /// Registers every component found in `region`, replacing what the
    /// simulator held there. Returns the number found.
    pub fn index_region(&mut self, grid: &dyn VoxelGrid, region: Aabb) -> usize {
        self.components.retain(|pos, _| !region.contains(*pos));
        let mut found = 0;
        for pos in region.iter() {
            let block = grid.block(pos);
            if let Some(kind) = self.registry.redstone_kind(block) {
                self.components.insert(pos, Component::from_block(kind, block));
                self.mark_dirty(pos);
                found += 1;
            }
        }
        tracing::debug!(found, volume = region.volume(), "indexed redstone region");
        found
    }

    /// Returns true if the registry holds exactly the components the voxels
    /// in `region` describe.
    #[must_use]
    pub fn registry_agrees_with(&self, grid: &dyn VoxelGrid, region: Aabb) -> bool {
        region
            .iter()
            .all(|pos| self.components.get(&pos).map(|c| c.kind) == self.registry.redstone_kind(grid.block(pos)))
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Advances to `game_tick`: runs one redstone tick on every
    /// `game_ticks_per_redstone_tick`-th game tick, none otherwise or after
    /// shutdown.
    pub fn tick(&mut self, grid: &mut dyn VoxelGrid, game_tick: u64) -> Option<TickReport> {
        if game_tick % self.ratio() != 0 {
            return None;
        }
        if self.shutdown.load(Ordering::Acquire) {
            tracing::debug!(game_tick, "redstone tick skipped after shutdown");
            return None;
        }
        Some(self.step(grid))
    }

    /// Runs exactly one redstone tick.
    #[tracing::instrument(level = "trace", skip_all, fields(tick = self.now + 1))]
    pub fn step(&mut self, grid: &mut dyn VoxelGrid) -> TickReport {
        self.now += 1;
        self.report = TickReport { tick: self.now, ..TickReport::default() };

        while let Ok(change) = self.changes_rx.try_recv() {
            self.apply_change(grid, change);
            self.report.changes += 1;
        }

        loop {
            self.drain_dirty(grid);
            let Some(event) = self.queue.pop_due(self.now) else {
                break;
            };
            self.report.events += 1;
            self.fire(grid, event);
        }

        self.publisher.publish(PowerSnapshot::new(
            self.now,
            self.components.iter().map(|(pos, c)| (*pos, c.power)).collect(),
        ));
        tracing::trace!(report = ?self.report, "redstone tick done");
        self.report
    }

    fn ratio(&self) -> u64 {
        u64::from(self.config.game_ticks_per_redstone_tick.max(1))
    }

    /// Game ticks converted to redstone ticks, at least one.
    fn redstone_ticks(&self, game_ticks: u64) -> u64 {
        game_ticks.div_ceil(self.ratio()).max(1)
    }

    fn apply_change(&mut self, grid: &mut dyn VoxelGrid, change: VoxelChange) {
        let VoxelChange { pos, old, .. } = change;
        // The change names the cell; the grid holds its current content.
        let current = grid.block(pos);
        self.sync_component(grid, pos, current);

        let pressed = current.id == ids::BUTTON && current.is_lit() && !(old.id == ids::BUTTON && old.is_lit());
        if pressed {
            let due = self.now + u64::from(self.config.button_pulse.max(1));
            self.queue.schedule(pos, 0, pos, due, EventAction::ButtonRelease);
        }

        self.mark_dirty(pos);
        self.notify_around(grid, pos);
        if old != current {
            self.trigger_observers(pos);
        }
    }

    /// Brings the component at `pos` in line with `block`.
    fn sync_component(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos, block: Block) {
        let held = self.components.get(&pos).map(|c| c.kind);
        let wanted = self.registry.redstone_kind(block);
        match (held, wanted) {
            (Some(a), Some(b)) if a == b => self.refresh_component(grid, pos, block),
            (held, wanted) => {
                if held.is_some() {
                    self.components.remove(&pos);
                    self.dirty_set.remove(&pos);
                }
                if let Some(kind) = wanted {
                    self.components.insert(pos, Component::from_block(kind, block));
                }
            }
        }
    }

    fn refresh_component(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos, block: Block) {
        let Some(comp) = self.components.get_mut(&pos) else {
            return;
        };
        comp.facing = block.facing();
        comp.delay = block.repeater_delay();
        comp.subtract = block.is_subtract_mode();
        let external = match comp.kind {
            RedstoneKind::Lever | RedstoneKind::Button | RedstoneKind::PressurePlate => {
                Some(if block.is_lit() { MAX_POWER } else { 0 })
            }
            RedstoneKind::Source => Some(block.stored_power()),
            _ => None,
        };
        if let Some(power) = external {
            self.set_output(grid, pos, power);
        }
    }

    fn drain_dirty(&mut self, grid: &mut dyn VoxelGrid) {
        while let Some(pos) = self.dirty.pop_front() {
            if !self.dirty_set.remove(&pos) {
                continue;
            }
            if self.report.updates >= MAX_UPDATES_PER_TICK {
                tracing::warn!(pending = self.dirty.len() + 1, "update cap reached, deferring to next tick");
                self.dirty_set.insert(pos);
                self.dirty.push_front(pos);
                return;
            }
            self.report.updates += 1;
            self.evaluate(grid, pos);
        }
    }

    fn mark_dirty(&mut self, pos: BlockPos) {
        if self.components.contains_key(&pos) && self.dirty_set.insert(pos) {
            self.dirty.push_back(pos);
        }
    }

    /// Marks everything whose input may depend on `pos`: its neighbours,
    /// and the neighbours of any solid block next to it.
    fn notify_around(&mut self, grid: &dyn VoxelGrid, pos: BlockPos) {
        for next in pos.neighbours() {
            self.mark_dirty(next);
            if self.registry.props(grid.block(next)).conductive {
                for beyond in next.neighbours() {
                    if beyond != pos {
                        self.mark_dirty(beyond);
                    }
                }
            }
        }
    }

    /// Schedules a pulse on every observer watching `pos`.
    fn trigger_observers(&mut self, pos: BlockPos) {
        for dir in Facing::ALL {
            let at = pos.offset(dir);
            let Some(comp) = self.components.get_mut(&at) else {
                continue;
            };
            if comp.kind == RedstoneKind::Observer
                && comp.facing == dir.opposite()
                && comp.power == 0
                && comp.scheduled.is_none()
            {
                let seq = self.queue.schedule(at, MAX_POWER, pos, self.now + 1, EventAction::Output);
                comp.scheduled = Some(Scheduled { target: MAX_POWER, seq });
                comp.state = ComponentState::Rising;
            }
        }
    }

    // =========================================================================
    // Power queries
    // =========================================================================

    /// `(strong, weak)` power held by the solid block at `pos`.
    fn block_power(&self, pos: BlockPos) -> (u8, u8) {
        let mut strong = 0;
        let mut weak = 0;
        for dir in Facing::ALL {
            if let Some(c) = self.components.get(&pos.offset(dir)) {
                let (s, w) = c.powers_block(dir.opposite());
                strong = strong.max(s);
                weak = weak.max(w);
            }
        }
        (strong, weak)
    }

    /// Power the neighbour in direction `dir` delivers into `pos`.
    fn input_from(&self, grid: &dyn VoxelGrid, pos: BlockPos, dir: Facing) -> u8 {
        let next = pos.offset(dir);
        if let Some(c) = self.components.get(&next) {
            return c.emits_toward(dir.opposite());
        }
        if self.registry.props(grid.block(next)).conductive {
            let (strong, weak) = self.block_power(next);
            strong.max(weak)
        } else {
            0
        }
    }

    fn strongest_input(&self, grid: &dyn VoxelGrid, pos: BlockPos, except: Option<Facing>) -> u8 {
        Facing::ALL
            .into_iter()
            .filter(|&dir| Some(dir) != except)
            .map(|dir| self.input_from(grid, pos, dir))
            .max()
            .unwrap_or(0)
    }

    /// Input a wire receives from outside its region. Solid blocks only pass
    /// strong power into wire; other wires feed it only through region links.
    fn wire_input(&self, grid: &dyn VoxelGrid, pos: BlockPos) -> u8 {
        let mut best = 0;
        for dir in Facing::ALL {
            let next = pos.offset(dir);
            let power = match self.components.get(&next) {
                Some(c) if c.kind == RedstoneKind::Wire => 0,
                Some(c) => c.emits_toward(dir.opposite()),
                None if self.registry.props(grid.block(next)).conductive => self.block_power(next).0,
                None => 0,
            };
            best = best.max(power);
        }
        best
    }

    fn is_wire(&self, pos: BlockPos) -> bool {
        self.components.get(&pos).is_some_and(|c| c.kind == RedstoneKind::Wire)
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    fn evaluate(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos) {
        let Some(kind) = self.components.get(&pos).map(|c| c.kind) else {
            return;
        };
        match kind {
            RedstoneKind::Wire => self.evaluate_wire_region(grid, pos),
            RedstoneKind::Torch => self.evaluate_torch(grid, pos),
            RedstoneKind::Repeater => self.evaluate_repeater(grid, pos),
            RedstoneKind::Comparator => self.evaluate_comparator(grid, pos),
            RedstoneKind::Lamp => self.evaluate_lamp(grid, pos),
            RedstoneKind::Piston | RedstoneKind::StickyPiston => self.evaluate_piston(grid, pos),
            RedstoneKind::Sink => {
                let input = self.strongest_input(grid, pos, None);
                self.set_output(grid, pos, input);
            }
            RedstoneKind::Lever
            | RedstoneKind::Button
            | RedstoneKind::PressurePlate
            | RedstoneKind::Source
            | RedstoneKind::Observer => {}
        }
    }

    fn evaluate_wire_region(&mut self, grid: &mut dyn VoxelGrid, start: BlockPos) {
        let view: &dyn VoxelGrid = &*grid;
        let region = wire::collect_region(
            start,
            |p| self.is_wire(p),
            |p| self.registry.props(view.block(p)).conductive,
        );
        let field = wire::settle(&region, |p| self.wire_input(view, p));
        for &pos in region.members() {
            let power = field.get(&pos).copied().unwrap_or(0);
            self.set_output(grid, pos, power);
        }
        // The region is settled as a whole; members marked by their
        // siblings above need no second pass.
        for pos in region.members() {
            self.dirty_set.remove(pos);
        }
    }

    fn evaluate_torch(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos) {
        let Some(back) = self.components.get(&pos).map(Component::back) else {
            return;
        };
        let target = if self.input_from(grid, pos, back) > 0 { 0 } else { MAX_POWER };
        let game_time = self.game_time();
        let rest = self.redstone_ticks(self.config.torch_rest_ticks);
        let Some(comp) = self.components.get_mut(&pos) else {
            return;
        };
        if target > 0 && comp.torch.burnt_out {
            comp.torch.last_trigger = game_time;
            if !comp.torch.recover_pending {
                comp.torch.recover_pending = true;
                self.queue.schedule(pos, 0, pos, self.now + rest, EventAction::TorchRecover);
            }
            return;
        }
        self.schedule_output(pos, target, 1);
    }

    fn evaluate_repeater(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos) {
        let Some((facing, delay)) = self.components.get(&pos).map(|c| (c.facing, c.delay)) else {
            return;
        };
        let back = self.input_from(grid, pos, facing.opposite());
        let locked = facing.sides().into_iter().any(|side| {
            self.components
                .get(&pos.offset(side))
                .is_some_and(|c| c.is_diode() && c.facing == side.opposite() && c.power > 0)
        });
        if let Some(comp) = self.components.get_mut(&pos) {
            comp.locked = locked;
        }
        if locked {
            return;
        }
        self.schedule_output(pos, if back > 0 { MAX_POWER } else { 0 }, delay);
    }

    fn evaluate_comparator(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos) {
        let Some((facing, subtract)) = self.components.get(&pos).map(|c| (c.facing, c.subtract)) else {
            return;
        };
        let back = self.input_from(grid, pos, facing.opposite());
        let side = facing
            .sides()
            .into_iter()
            .map(|s| self.components.get(&pos.offset(s)).map_or(0, |c| c.emits_toward(s.opposite())))
            .max()
            .unwrap_or(0);
        let target = if subtract {
            back.saturating_sub(side)
        } else if back >= side {
            back
        } else {
            0
        };
        self.schedule_output(pos, target, 1);
    }

    fn evaluate_lamp(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos) {
        let input = self.strongest_input(grid, pos, None);
        let Some(comp) = self.components.get_mut(&pos) else {
            return;
        };
        comp.power = input;
        match (comp.state, input > 0) {
            (ComponentState::Off | ComponentState::Rising, true) => {
                comp.state = ComponentState::On;
                comp.scheduled = None;
                self.restamp(grid, pos);
            }
            (ComponentState::Falling, true) => {
                comp.state = ComponentState::On;
                comp.scheduled = None;
            }
            (ComponentState::On, false) => {
                let seq = self.queue.schedule(pos, 0, pos, self.now + LAMP_OFF_DELAY, EventAction::LampOff);
                comp.scheduled = Some(Scheduled { target: 0, seq });
                comp.state = ComponentState::Falling;
            }
            _ => {}
        }
    }

    fn evaluate_piston(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos) {
        let Some((facing, state)) = self.components.get(&pos).map(|c| (c.facing, c.state)) else {
            return;
        };
        let input = self.strongest_input(grid, pos, Some(facing));
        let animation = u64::from(self.config.piston_animation.max(1));
        let midpoint = (animation / 2).max(1);

        let (next, action) = match (state, input > 0) {
            (ComponentState::Off, true) => {
                if piston::plan_push(&*grid, &self.registry, pos, facing, self.config.push_limit).is_none() {
                    tracing::trace!(%pos, "piston push refused");
                    return;
                }
                (ComponentState::Rising, EventAction::PistonPush)
            }
            (ComponentState::On, false) => (ComponentState::Falling, EventAction::PistonPull),
            _ => return,
        };
        if let Some(comp) = self.components.get_mut(&pos) {
            comp.power = input;
            comp.state = next;
        }
        self.queue.schedule(pos, input, pos, self.now + midpoint, action);
        self.queue.schedule(pos, input, pos, self.now + animation.max(midpoint + 1), EventAction::PistonSettle);
    }

    /// Queues an output change `delay` ticks out, replacing any pending one.
    fn schedule_output(&mut self, pos: BlockPos, target: u8, delay: u8) {
        let due = self.now + u64::from(delay.max(1));
        let Some(comp) = self.components.get_mut(&pos) else {
            return;
        };
        if comp.scheduled.is_some_and(|s| s.target == target) {
            return;
        }
        if comp.power == target {
            comp.scheduled = None;
            comp.state = if target > 0 { ComponentState::On } else { ComponentState::Off };
            return;
        }
        let seq = self.queue.schedule(pos, target, pos, due, EventAction::Output);
        comp.scheduled = Some(Scheduled { target, seq });
        comp.state = if target > comp.power { ComponentState::Rising } else { ComponentState::Falling };
    }

    // =========================================================================
    // Effects
    // =========================================================================

    /// Sets a component's output, mirrors it into its voxel and wakes its
    /// neighbours.
    fn set_output(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos, power: u8) {
        let Some(comp) = self.components.get_mut(&pos) else {
            return;
        };
        if !matches!(comp.kind, RedstoneKind::Lamp | RedstoneKind::Piston | RedstoneKind::StickyPiston)
            && comp.scheduled.is_none()
        {
            comp.state = if power > 0 { ComponentState::On } else { ComponentState::Off };
        }
        if comp.power == power {
            return;
        }
        comp.power = power;
        self.report.outputs += 1;
        self.restamp(grid, pos);
        self.notify_around(grid, pos);
    }

    /// Writes the component's visible state into its voxel and announces it.
    fn restamp(&mut self, grid: &mut dyn VoxelGrid, pos: BlockPos) {
        let Some(comp) = self.components.get(&pos) else {
            return;
        };
        let block = grid.block(pos);
        let power = comp.power;
        if self.registry.redstone_kind(block) == Some(comp.kind) {
            let stamped = comp.stamp(block);
            if stamped != block {
                grid.set_block(pos, stamped);
                self.trigger_observers(pos);
            }
        }
        self.events.send(WorldEvent::ComponentChanged { pos, power, tick: self.game_time() });
    }

    /// Follows up structural writes made by a piston.
    fn after_writes(&mut self, grid: &mut dyn VoxelGrid, writes: &[VoxelWrite]) {
        for write in writes {
            self.sync_component(grid, write.pos, write.new);
            self.mark_dirty(write.pos);
            self.notify_around(grid, write.pos);
            self.trigger_observers(write.pos);
        }
    }

    fn fire(&mut self, grid: &mut dyn VoxelGrid, event: RedstoneEvent) {
        let pos = event.target;
        let Some(comp) = self.components.get_mut(&pos) else {
            let error = missing(pos);
            tracing::debug!(%error, action = ?event.action, "dropping event");
            return;
        };
        let kind = comp.kind;

        match event.action {
            EventAction::Output => {
                if comp.scheduled.map(|s| s.seq) != Some(event.seq) {
                    tracing::trace!(%pos, seq = event.seq, "stale event");
                    return;
                }
                comp.scheduled = None;
                if kind == RedstoneKind::Repeater && comp.locked {
                    comp.state = if comp.power > 0 { ComponentState::On } else { ComponentState::Off };
                    return;
                }
                let mut power = event.power;
                if kind == RedstoneKind::Torch {
                    power = self.torch_toggle(pos, power);
                }
                self.set_output(grid, pos, power);
                if kind == RedstoneKind::Observer && power > 0 {
                    self.schedule_output(pos, 0, 1);
                }
            }
            EventAction::LampOff => {
                if comp.scheduled.map(|s| s.seq) != Some(event.seq) {
                    return;
                }
                comp.scheduled = None;
                comp.state = ComponentState::Off;
                self.restamp(grid, pos);
            }
            EventAction::ButtonRelease => {
                if kind != RedstoneKind::Button {
                    return;
                }
                let block = grid.block(pos);
                if block.id == ids::BUTTON {
                    grid.set_block(pos, block.with_lit(false));
                }
                self.set_output(grid, pos, 0);
            }
            EventAction::PistonPush => {
                let facing = comp.facing;
                if comp.state != ComponentState::Rising {
                    return;
                }
                match piston::plan_push(&*grid, &self.registry, pos, facing, self.config.push_limit) {
                    Some(plan) => {
                        let head = piston::head_for(grid.block(pos), facing);
                        let writes = piston::apply_push(grid, &plan, pos, facing, head);
                        tracing::trace!(%pos, moved = plan.moves.len(), "piston extended");
                        self.after_writes(grid, &writes);
                    }
                    None => {
                        comp.state = ComponentState::Off;
                        tracing::trace!(%pos, "push line blocked mid-animation");
                    }
                }
            }
            EventAction::PistonPull => {
                let facing = comp.facing;
                if comp.state != ComponentState::Falling {
                    return;
                }
                let sticky = kind == RedstoneKind::StickyPiston;
                let writes = piston::apply_pull(grid, &self.registry, pos, facing, sticky);
                self.after_writes(grid, &writes);
            }
            EventAction::PistonSettle => {
                comp.state = match comp.state {
                    ComponentState::Rising | ComponentState::On => ComponentState::On,
                    ComponentState::Falling | ComponentState::Off => ComponentState::Off,
                };
                self.restamp(grid, pos);
                self.mark_dirty(pos);
            }
            EventAction::TorchRecover => self.torch_recover(pos),
        }
    }

    /// Records a torch toggle and returns the power it may actually take.
    fn torch_toggle(&mut self, pos: BlockPos, power: u8) -> u8 {
        let game_time = self.game_time();
        let rest = self.redstone_ticks(self.config.torch_rest_ticks);
        let window = self.config.torch_burnout_window;
        let limit = self.config.torch_burnout_toggles;
        let Some(comp) = self.components.get_mut(&pos) else {
            return power;
        };
        if !comp.torch.record(game_time, window, limit) {
            return power;
        }
        comp.torch.burnt_out = true;
        comp.torch.last_trigger = game_time;
        if !comp.torch.recover_pending {
            comp.torch.recover_pending = true;
            self.queue.schedule(pos, 0, pos, self.now + rest, EventAction::TorchRecover);
        }
        tracing::debug!(%pos, game_time, "redstone torch burnt out");
        0
    }

    fn torch_recover(&mut self, pos: BlockPos) {
        let game_time = self.game_time();
        let rest = self.config.torch_rest_ticks;
        let Some(comp) = self.components.get_mut(&pos) else {
            return;
        };
        comp.torch.recover_pending = false;
        if !comp.torch.burnt_out {
            return;
        }
        let ready_at = comp.torch.last_trigger + rest;
        if game_time >= ready_at {
            comp.torch.burnt_out = false;
            comp.torch.toggles.clear();
            tracing::debug!(%pos, "redstone torch recovered");
            self.mark_dirty(pos);
        } else {
            comp.torch.recover_pending = true;
            let wait = self.redstone_ticks(ready_at - game_time);
            self.queue.schedule(pos, 0, pos, self.now + wait, EventAction::TorchRecover);
        }
    }
}

fn missing(pos: BlockPos) -> StrataError {
    StrataError::ComponentMissing { x: pos.x, y: pos.y, z: pos.z }
}
