//! Input command queue for externally-submitted signals.
//!
//! Interaction, movement and power signals arrive from the host at arbitrary
//! points in a frame. Queued through [`CommandQueue`], they are applied at
//! the start of the next tick in submission order, so one tick never sees a
//! half-applied signal.

use crate::device::GeneratorStatus;
use crate::id::{DeviceId, EntityId};
use crate::insertion::InteractionRequest;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single signal that can be submitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// An agent used an item on a generator.
    Interact(InteractionRequest),
    /// An agent moved; cancels its move-sensitive insertions.
    AgentMoved { agent: EntityId },
    /// An agent stopped holding an item.
    ItemReleased { agent: EntityId, item: EntityId },
    /// The power grid changed a device's supply state.
    PowerChanged { device: DeviceId, powered: bool },
    /// Set the presentation status of a device.
    SetStatus {
        device: DeviceId,
        status: GeneratorStatus,
    },
    /// Tear a device down.
    RemoveDevice { device: DeviceId },
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// Commands waiting for the next tick boundary, with optional history for
/// replay and debugging.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Command>,
    /// Executed commands: (tick, command).
    history: Vec<(u64, Command)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that retains up to `max_history` executed commands.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Drain all pending commands, recording them in history under `tick`.
    /// Returns the drained commands in submission order.
    pub fn drain(&mut self, tick: u64) -> Vec<Command> {
        let commands = std::mem::take(&mut self.pending);

        if self.max_history > 0 {
            self.history
                .extend(commands.iter().cloned().map(|cmd| (tick, cmd)));
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn history(&self) -> &[(u64, Command)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(agent: u64) -> Command {
        Command::AgentMoved {
            agent: EntityId(agent),
        }
    }

    #[test]
    fn new_queue_is_empty() {
        let queue = CommandQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn drain_preserves_submission_order() {
        let mut queue = CommandQueue::new();
        queue.push(moved(1));
        queue.push_batch([moved(2), moved(3)]);
        assert_eq!(queue.drain(0), vec![moved(1), moved(2), moved(3)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn no_history_by_default() {
        let mut queue = CommandQueue::new();
        queue.push(moved(1));
        queue.drain(4);
        assert!(queue.history().is_empty());
    }

    #[test]
    fn history_is_trimmed_to_limit() {
        let mut queue = CommandQueue::with_max_history(2);
        queue.push_batch([moved(1), moved(2)]);
        queue.drain(1);
        queue.push(moved(3));
        queue.drain(2);

        let history = queue.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], (1, moved(2)));
        assert_eq!(history[1], (2, moved(3)));

        queue.clear_history();
        assert!(queue.history().is_empty());
    }
}
