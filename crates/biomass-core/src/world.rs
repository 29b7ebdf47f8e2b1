//! Narrow contracts to the systems that surround a generator.
//!
//! The engine never looks anything up globally. It owns one value
//! implementing [`World`] (every collaborator trait at once) and calls into it
//! at the points where a generator needs power state, item mass, the resource
//! store or presentation. Hosts implement the traits on whatever adapter
//! bridges to their own power grid, physics and audio.

use crate::device::GeneratorStatus;
use crate::fixed::Fixed64;
use crate::id::{DeviceId, EntityId, ResourceKind};

// ---------------------------------------------------------------------------
// Presentation values
// ---------------------------------------------------------------------------

/// Identifies a one-shot audio cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CueId(pub &'static str);

/// Played once whenever a device becomes active.
pub const STARTUP_CUE: CueId = CueId("/Audio/Machines/reclaimer_startup.ogg");

/// A visual key/value pair pushed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualState {
    Status(GeneratorStatus),
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Read-only view of the power grid.
pub trait PowerSupply {
    fn is_powered(&self, device: DeviceId) -> bool;
}

/// Mass of physical entities. `None` when the entity has no physics body.
pub trait MassQuery {
    fn mass_of(&self, entity: EntityId) -> Option<Fixed64>;
}

/// Capability checks on candidate items.
pub trait ItemClassifier {
    /// Whether the entity is organic matter a generator may consume.
    fn is_grindable(&self, entity: EntityId) -> bool;

    /// Whether the entity is botany produce (eligible for the produce
    /// yield multiplier).
    fn is_produce(&self, entity: EntityId) -> bool;
}

/// Moves whatever an entity carries out of the way before it is consumed.
pub trait InventoryRelocation {
    fn drop_carried_items_near(&mut self, entity: EntityId, device: DeviceId);
}

/// Per-device material storage.
pub trait ResourceStore {
    /// Deposit `amount` units of `kind`. Returns `false` if the store refused.
    fn add_resource(&mut self, device: DeviceId, kind: ResourceKind, amount: u32) -> bool;
}

/// Audio and visual feedback. Fire-and-forget.
pub trait Presentation {
    fn set_ambience(&mut self, device: DeviceId, enabled: bool);
    fn play_one_shot(&mut self, cue: CueId, device: DeviceId);
    fn set_visual_state(&mut self, device: DeviceId, state: VisualState);
}

/// Removes entities from the world.
pub trait EntityLifecycle {
    fn destroy_entity(&mut self, entity: EntityId);
}

/// Everything a generator engine needs from its host.
pub trait World:
    PowerSupply
    + MassQuery
    + ItemClassifier
    + InventoryRelocation
    + ResourceStore
    + Presentation
    + EntityLifecycle
{
}

impl<T> World for T where
    T: PowerSupply
        + MassQuery
        + ItemClassifier
        + InventoryRelocation
        + ResourceStore
        + Presentation
        + EntityLifecycle
{
}
