//! Feeding items into a generator.
//!
//! Insertion is two-step. [`plan_insertion`] checks a candidate and computes
//! how long the agent has to hold it against the machine; the engine then
//! schedules a timed action. Only when that action matures uncancelled does
//! [`commit_insertion`] move the item's mass into the device counters.

use tracing::debug;

use crate::device::DeviceState;
use crate::event::Event;
use crate::fixed::Fixed64;
use crate::id::{ActionId, DeviceId, EntityId};
use crate::marker::{self, DeviceContext};
use crate::world::{
    EntityLifecycle, InventoryRelocation, ItemClassifier, MassQuery, Presentation,
};
use crate::yield_calc;

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// An agent used `item` on `device`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionRequest {
    pub agent: EntityId,
    pub item: EntityId,
    /// The generator handling the interaction.
    pub device: DeviceId,
    /// The entity the interaction was aimed at, if any.
    pub target: Option<DeviceId>,
    /// Whether the interaction system found the target within reach.
    pub can_reach: bool,
}

/// Why an interaction did not start an insertion. None of these are errors:
/// the request is simply ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unreachable,
    NoTarget,
    NotGrindable,
    NoMass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionOutcome {
    Started(ActionId),
    Rejected(RejectReason),
}

impl InsertionOutcome {
    pub fn action(self) -> Option<ActionId> {
        match self {
            InsertionOutcome::Started(id) => Some(id),
            InsertionOutcome::Rejected(_) => None,
        }
    }
}

/// A validated candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionPlan {
    pub mass: Fixed64,
    pub delay: Fixed64,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check reach, target, eligibility and mass, in that order.
pub fn plan_insertion<W: MassQuery + ItemClassifier + ?Sized>(
    device: &DeviceState,
    request: &InteractionRequest,
    world: &W,
) -> Result<InsertionPlan, RejectReason> {
    if !request.can_reach {
        return Err(RejectReason::Unreachable);
    }
    if request.target.is_none() {
        return Err(RejectReason::NoTarget);
    }
    if !world.is_grindable(request.item) {
        return Err(RejectReason::NotGrindable);
    }
    let mass = world.mass_of(request.item).ok_or(RejectReason::NoMass)?;
    Ok(InsertionPlan {
        mass,
        delay: yield_calc::insertion_delay(&device.config, mass),
    })
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// What a commit added to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    pub yield_added: Fixed64,
    pub time_added: Fixed64,
}

/// Consume `item` into `device`. The caller has already checked that the
/// action is still pending and its target valid; `mass` is read at
/// completion time, not at start.
pub(crate) fn commit_insertion<W>(
    ctx: &mut DeviceContext<'_, W>,
    id: DeviceId,
    device: &mut DeviceState,
    action: ActionId,
    item: EntityId,
    mass: Fixed64,
) -> CommitReceipt
where
    W: ItemClassifier + InventoryRelocation + EntityLifecycle + Presentation + ?Sized,
{
    let is_produce = ctx.world.is_produce(item);
    let yield_added = yield_calc::yield_for_mass(&device.config, mass, is_produce);
    let time_added = yield_calc::processing_time_added(&device.config, mass);

    device.expected_yield =
        yield_calc::saturating_sum(device.expected_yield, yield_added, "expected yield");
    device.processing_timer =
        yield_calc::saturating_sum(device.processing_timer, time_added, "processing timer");

    ctx.world.drop_carried_items_near(item, id);
    ctx.world.destroy_entity(item);

    ctx.events.emit(Event::InsertionCommitted {
        device: id,
        action,
        item,
        yield_added,
        time_added,
        tick: ctx.tick,
    });
    debug!(
        ?id,
        ?item,
        %mass,
        %yield_added,
        %time_added,
        "item consumed"
    );

    marker::activate(ctx, id, device);

    CommitReceipt {
        yield_added,
        time_added,
    }
}
