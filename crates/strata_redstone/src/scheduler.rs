//! # Event Queue
//!
//! Min-heap of pending component changes ordered by `(due, seq)`. The
//! sequence number is handed out at scheduling time, so events due on the
//! same tick fire in the order they were scheduled.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use strata_core::BlockPos;

/// What a due event does to its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventAction {
    /// Set the target's output to `power`.
    Output,
    /// Turn a lamp off after its off-delay.
    LampOff,
    /// End a button pulse.
    ButtonRelease,
    /// Piston animation midpoint: move the blocks out.
    PistonPush,
    /// Piston animation midpoint: pull the head (and a sticky block) in.
    PistonPull,
    /// Piston animation finished.
    PistonSettle,
    /// Check whether a burnt-out torch has rested long enough.
    TorchRecover,
}

/// A scheduled change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RedstoneEvent {
    /// Component the event applies to.
    pub target: BlockPos,
    /// Power carried by the event.
    pub power: u8,
    /// Component that caused it.
    pub source: BlockPos,
    /// Redstone tick the event fires on.
    pub due: u64,
    /// Tie-breaker, unique per queue.
    pub seq: u64,
    /// Effect.
    pub action: EventAction,
}

impl Ord for RedstoneEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

impl PartialOrd for RedstoneEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending events, earliest first.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<RedstoneEvent>>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event and returns its sequence number.
    pub fn schedule(&mut self, target: BlockPos, power: u8, source: BlockPos, due: u64, action: EventAction) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(RedstoneEvent { target, power, source, due, seq, action }));
        seq
    }

    /// Removes and returns the earliest event due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<RedstoneEvent> {
        if self.heap.peek()?.0.due > now {
            return None;
        }
        self.heap.pop().map(|Reverse(event)| event)
    }

    /// Tick of the earliest pending event.
    #[must_use]
    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(event)| event.due)
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drops every pending event.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
