//! Cancelable timed actions.
//!
//! An insertion does not happen the moment an agent uses an item on a
//! generator: the agent must keep holding the item and stand still for a
//! delay proportional to the item's mass. Each such wait is a [`TimedAction`]
//! with an explicit state machine:
//!
//! ```text
//! Pending --(delay elapsed, engine commits)--> Committed
//! Pending --(agent moved / item released / device removed)--> Cancelled
//! ```
//!
//! The scheduler only tracks time and cancellation. Committing (the device
//! mutation) is the engine's job; until it calls [`ActionScheduler::mark_committed`]
//! a matured action is still `Pending`. Finished actions stay queryable until
//! [`ActionScheduler::prune_finished`] runs.

use slotmap::SlotMap;

use crate::fixed::Fixed64;
use crate::id::{ActionId, DeviceId, EntityId};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Conditions that cancel an action before it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionConstraints {
    /// Cancel when the agent stops holding the used item.
    pub require_held_item: bool,
    /// Cancel when the agent moves.
    pub cancel_on_move: bool,
}

impl Default for ActionConstraints {
    fn default() -> Self {
        Self {
            require_held_item: true,
            cancel_on_move: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Pending,
    Committed,
    Cancelled,
}

/// A single in-flight insertion.
#[derive(Debug, Clone)]
pub struct TimedAction {
    pub agent: EntityId,
    pub item: EntityId,
    /// The generator that will receive the item.
    pub device: DeviceId,
    /// The interaction target. Checked again at completion.
    pub target: Option<DeviceId>,
    pub delay: Fixed64,
    pub elapsed: Fixed64,
    pub constraints: ActionConstraints,
    pub state: ActionState,
    /// Start order, used to complete same-tick actions deterministically.
    seq: u64,
}

impl TimedAction {
    pub fn is_pending(&self) -> bool {
        self.state == ActionState::Pending
    }
}

/// Parameters for [`ActionScheduler::start`].
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest {
    pub agent: EntityId,
    pub item: EntityId,
    pub device: DeviceId,
    pub target: Option<DeviceId>,
    pub delay: Fixed64,
    pub constraints: ActionConstraints,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ActionScheduler {
    actions: SlotMap<ActionId, TimedAction>,
    next_seq: u64,
}

impl ActionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a new pending action.
    pub fn start(&mut self, request: ActionRequest) -> ActionId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.actions.insert(TimedAction {
            agent: request.agent,
            item: request.item,
            device: request.device,
            target: request.target,
            delay: request.delay.max(Fixed64::ZERO),
            elapsed: Fixed64::ZERO,
            constraints: request.constraints,
            state: ActionState::Pending,
            seq,
        })
    }

    pub fn get(&self, id: ActionId) -> Option<&TimedAction> {
        self.actions.get(id)
    }

    pub fn state(&self, id: ActionId) -> Option<ActionState> {
        self.actions.get(id).map(|a| a.state)
    }

    /// Number of pending actions.
    pub fn pending_count(&self) -> usize {
        self.actions.values().filter(|a| a.is_pending()).count()
    }

    /// Number of pending actions feeding `device`.
    pub fn pending_for_device(&self, device: DeviceId) -> usize {
        self.actions
            .values()
            .filter(|a| a.is_pending() && a.device == device)
            .count()
    }

    /// Advance every pending action by `dt` and return those whose delay has
    /// fully elapsed, in start order. They remain `Pending`.
    pub fn advance(&mut self, dt: Fixed64) -> Vec<ActionId> {
        let mut matured: Vec<(u64, ActionId)> = Vec::new();
        for (id, action) in self.actions.iter_mut() {
            if !action.is_pending() {
                continue;
            }
            action.elapsed = action.elapsed.saturating_add(dt);
            if action.elapsed >= action.delay {
                matured.push((action.seq, id));
            }
        }
        matured.sort_by_key(|(seq, _)| *seq);
        matured.into_iter().map(|(_, id)| id).collect()
    }

    /// Mark a pending action as committed. No-op otherwise.
    pub fn mark_committed(&mut self, id: ActionId) {
        if let Some(action) = self.actions.get_mut(id)
            && action.is_pending()
        {
            action.state = ActionState::Committed;
        }
    }

    /// Cancel a single pending action. Returns whether it was pending.
    pub fn cancel(&mut self, id: ActionId) -> bool {
        match self.actions.get_mut(id) {
            Some(action) if action.is_pending() => {
                action.state = ActionState::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// The agent moved: cancel its move-sensitive actions.
    pub fn agent_moved(&mut self, agent: EntityId) -> Vec<ActionId> {
        self.cancel_where(|a| a.agent == agent && a.constraints.cancel_on_move)
    }

    /// The agent let go of `item`: cancel actions that need it held.
    pub fn item_released(&mut self, agent: EntityId, item: EntityId) -> Vec<ActionId> {
        self.cancel_where(|a| a.agent == agent && a.item == item && a.constraints.require_held_item)
    }

    /// Cancel everything feeding or targeting `device`.
    pub fn cancel_for_device(&mut self, device: DeviceId) -> Vec<ActionId> {
        self.cancel_where(|a| a.device == device || a.target == Some(device))
    }

    /// Cancel everything using `item`.
    pub fn cancel_for_item(&mut self, item: EntityId) -> Vec<ActionId> {
        self.cancel_where(|a| a.item == item)
    }

    /// Drop committed and cancelled actions. Returns how many were removed.
    pub fn prune_finished(&mut self) -> usize {
        let before = self.actions.len();
        self.actions.retain(|_, a| a.is_pending());
        before - self.actions.len()
    }

    fn cancel_where(&mut self, predicate: impl Fn(&TimedAction) -> bool) -> Vec<ActionId> {
        let mut cancelled: Vec<(u64, ActionId)> = Vec::new();
        for (id, action) in self.actions.iter_mut() {
            if action.is_pending() && predicate(action) {
                action.state = ActionState::Cancelled;
                cancelled.push((action.seq, id));
            }
        }
        cancelled.sort_by_key(|(seq, _)| *seq);
        cancelled.into_iter().map(|(_, id)| id).collect()
    }
}
