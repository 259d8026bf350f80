//! # Components
//!
//! One [`Component`] per redstone-bearing voxel. The component holds the
//! simulator's view of the voxel: output power, state machine position,
//! scheduled change and per-kind extras (repeater lock, torch burn-out
//! history, piston animation).
//!
//! ## Emission rules
//!
//! | Kind                 | Into neighbouring components   | Into solid blocks          |
//! |----------------------|--------------------------------|----------------------------|
//! | Wire                 | horizontal + below, weak       | horizontal + below, weak   |
//! | Torch                | every side except its mount    | block above, strong        |
//! | Repeater, Comparator | front only                     | front, strong              |
//! | Observer             | back only                      | back, strong               |
//! | Lever, Button, Plate | every side                     | every side, strong         |
//! | Source               | every side                     | none                       |
//! | Lamp, Piston, Sink   | nothing                        | nothing                    |

use std::collections::VecDeque;

use strata_core::{Block, Facing, RedstoneKind};

/// Maximum signal strength.
pub const MAX_POWER: u8 = 15;

/// Longest delay any component puts between input and output, in redstone
/// ticks. A network settles this long after its last change, plus two.
pub const MAX_DELAY: u8 = 4;

/// Position in a component's state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ComponentState {
    /// Output 0, nothing pending.
    #[default]
    Off,
    /// A rise is scheduled (or a piston is extending).
    Rising,
    /// Output above 0, nothing pending.
    On,
    /// A fall is scheduled (or a piston is retracting).
    Falling,
}

/// A change already in the event queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheduled {
    /// Output the event will set.
    pub target: u8,
    /// Sequence id of the event; any other id is stale.
    pub seq: u64,
}

/// Torch anti-oscillation bookkeeping, in game ticks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TorchHistory {
    /// Game ticks of recent toggles.
    pub toggles: VecDeque<u64>,
    /// Forced off until the torch rests.
    pub burnt_out: bool,
    /// Last time the torch wanted to relight while burnt out.
    pub last_trigger: u64,
    /// A recovery check is in the queue.
    pub recover_pending: bool,
}

impl TorchHistory {
    /// Records a toggle at `now`, forgetting toggles older than `window`.
    /// Returns true if the torch has now toggled more than `limit` times
    /// inside the window.
    pub fn record(&mut self, now: u64, window: u64, limit: u32) -> bool {
        self.toggles.push_back(now);
        while self.toggles.front().is_some_and(|&t| t + window <= now) {
            self.toggles.pop_front();
        }
        self.toggles.len() > limit as usize
    }
}

/// A redstone component at one position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Component {
    /// Kind, from the voxel registry.
    pub kind: RedstoneKind,
    /// Orientation (output side for diodes, push side for pistons,
    /// watched side for observers, away from the mount for torches).
    pub facing: Facing,
    /// Output power; for lamps, pistons and sinks the last input seen.
    pub power: u8,
    /// State machine position.
    pub state: ComponentState,
    /// Repeater delay in redstone ticks (1..=4).
    pub delay: u8,
    /// Comparator subtract mode.
    pub subtract: bool,
    /// Repeater locked by a side input.
    pub locked: bool,
    /// Pending output change.
    pub scheduled: Option<Scheduled>,
    /// Torch burn-out history.
    pub torch: TorchHistory,
}

impl Component {
    /// Builds the component described by a voxel.
    #[must_use]
    pub fn from_block(kind: RedstoneKind, block: Block) -> Self {
        let on = block.is_lit();
        let power = match kind {
            RedstoneKind::Wire | RedstoneKind::Comparator | RedstoneKind::Source => block.stored_power(),
            RedstoneKind::Torch
            | RedstoneKind::Repeater
            | RedstoneKind::Lever
            | RedstoneKind::Button
            | RedstoneKind::PressurePlate
            | RedstoneKind::Observer => {
                if on {
                    MAX_POWER
                } else {
                    0
                }
            }
            RedstoneKind::Lamp | RedstoneKind::Piston | RedstoneKind::StickyPiston | RedstoneKind::Sink => 0,
        };
        let state = match kind {
            RedstoneKind::Lamp | RedstoneKind::Piston | RedstoneKind::StickyPiston if on => ComponentState::On,
            _ if power > 0 => ComponentState::On,
            _ => ComponentState::Off,
        };
        Self {
            kind,
            facing: block.facing(),
            power,
            state,
            delay: block.repeater_delay(),
            subtract: block.is_subtract_mode(),
            locked: false,
            scheduled: None,
            torch: TorchHistory::default(),
        }
    }

    /// Side the component reads its main input from.
    #[must_use]
    pub const fn back(&self) -> Facing {
        self.facing.opposite()
    }

    /// Returns true for lamps and pistons that are currently lit/extended.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.state, ComponentState::On | ComponentState::Falling)
    }

    /// Power delivered to the neighbouring component in direction `dir`.
    #[must_use]
    pub fn emits_toward(&self, dir: Facing) -> u8 {
        match self.kind {
            RedstoneKind::Wire if dir != Facing::PosY => self.power,
            RedstoneKind::Torch if dir != self.back() => self.power,
            RedstoneKind::Repeater | RedstoneKind::Comparator if dir == self.facing => self.power,
            RedstoneKind::Observer if dir == self.back() => self.power,
            RedstoneKind::Lever | RedstoneKind::Button | RedstoneKind::PressurePlate | RedstoneKind::Source => {
                self.power
            }
            _ => 0,
        }
    }

    /// `(strong, weak)` power driven into a solid block in direction `dir`.
    #[must_use]
    pub fn powers_block(&self, dir: Facing) -> (u8, u8) {
        match self.kind {
            RedstoneKind::Wire if dir != Facing::PosY => (0, self.power),
            RedstoneKind::Torch if dir == Facing::PosY => (self.power, 0),
            RedstoneKind::Repeater | RedstoneKind::Comparator if dir == self.facing => (self.power, 0),
            RedstoneKind::Observer if dir == self.back() => (self.power, 0),
            RedstoneKind::Lever | RedstoneKind::Button | RedstoneKind::PressurePlate => (self.power, 0),
            _ => (0, 0),
        }
    }

    /// Returns true for repeaters and comparators.
    #[must_use]
    pub const fn is_diode(&self) -> bool {
        matches!(self.kind, RedstoneKind::Repeater | RedstoneKind::Comparator)
    }

    /// The voxel carrying this component's visible state.
    #[must_use]
    pub fn stamp(&self, block: Block) -> Block {
        match self.kind {
            RedstoneKind::Wire | RedstoneKind::Comparator | RedstoneKind::Source => {
                block.with_stored_power(self.power)
            }
            RedstoneKind::Lamp | RedstoneKind::Piston | RedstoneKind::StickyPiston => block.with_lit(self.is_active()),
            RedstoneKind::Sink => block.with_stored_power(self.power),
            _ => block.with_lit(self.power > 0),
        }
    }
}
