//! # World Event Bus
//!
//! The only cross-subsystem hook. Three event kinds flow out of the world
//! core to whoever listens (rendering sparks, sound, persistence):
//!
//! ```text
//! ┌────────────┐  VoxelChanged      ┌─────────┐
//! │ ChunkStore │──────────────────> │         │
//! ├────────────┤  ChunkReady        │  Event  │────> listeners
//! │ Generator  │──────────────────> │   Bus   │
//! ├────────────┤  ComponentChanged  │         │
//! │ Redstone   │──────────────────> │         │
//! └────────────┘                    └─────────┘
//! ```
//!
//! Channels are bounded. A full channel drops the event rather than stall a
//! generation worker or the tick thread.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::block::Block;
use crate::coords::{BlockPos, ChunkCoord};

/// Events emitted by the world core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// A voxel was overwritten outside generation (player edit, piston).
    VoxelChanged {
        /// Position.
        pos: BlockPos,
        /// Previous block.
        old: Block,
        /// New block.
        new: Block,
    },

    /// A redstone component changed its output or state.
    ComponentChanged {
        /// Component position.
        pos: BlockPos,
        /// New output power.
        power: u8,
        /// Game tick of the change.
        tick: u64,
    },

    /// A chunk finished its last generation phase.
    ChunkReady {
        /// Chunk coordinate.
        coord: ChunkCoord,
    },
}

/// Event bus.
///
/// Pre-allocates a bounded channel so memory cannot grow without limit.
pub struct EventBus {
    sender: Sender<WorldEvent>,
    receiver: Receiver<WorldEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum events in flight before new ones are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Creates a sender handle (clone for multiple producers).
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender { sender: self.sender.clone() }
    }

    /// Creates a receiver handle (clone for multiple consumers).
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver { receiver: self.receiver.clone() }
    }
}

/// Handle for sending events.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: Sender<WorldEvent>,
}

impl EventSender {
    /// Sends an event without blocking.
    ///
    /// Returns `false` if the event was dropped (channel full or closed).
    #[inline]
    pub fn send(&self, event: WorldEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("event bus full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// A sender whose events go nowhere.
    #[must_use]
    pub fn disconnected() -> Self {
        let (sender, _) = bounded(1);
        Self { sender }
    }
}

/// Handle for receiving events.
#[derive(Clone, Debug)]
pub struct EventReceiver {
    receiver: Receiver<WorldEvent>,
}

impl EventReceiver {
    /// Receives all pending events without blocking.
    #[inline]
    pub fn drain(&self) -> Vec<WorldEvent> {
        let mut events = Vec::with_capacity(self.receiver.len());
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Receives one event without blocking.
    #[inline]
    pub fn try_recv(&self) -> Option<WorldEvent> {
        self.receiver.try_recv().ok()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus() {
        let bus = EventBus::new(16);
        let sender = bus.sender();
        let receiver = bus.receiver();

        assert!(sender.send(WorldEvent::ChunkReady { coord: ChunkCoord::new(1, 2) }));
        assert!(receiver.has_events());
        assert_eq!(receiver.pending_count(), 1);

        let events = receiver.drain();
        assert_eq!(events, vec![WorldEvent::ChunkReady { coord: ChunkCoord::new(1, 2) }]);
        assert!(!receiver.has_events());
    }

    #[test]
    fn test_full_channel_drops() {
        let bus = EventBus::new(1);
        let sender = bus.sender();
        let ev = WorldEvent::ComponentChanged { pos: BlockPos::new(0, 0, 0), power: 15, tick: 3 };
        assert!(sender.send(ev.clone()));
        assert!(!sender.send(ev));
        assert_eq!(bus.receiver().drain().len(), 1);
    }

    #[test]
    fn test_disconnected_sender() {
        let sender = EventSender::disconnected();
        assert!(!sender.send(WorldEvent::ChunkReady { coord: ChunkCoord::default() }));
    }
}
