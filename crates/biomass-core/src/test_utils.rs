//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use std::collections::{HashMap, HashSet};

use crate::action::ActionState;
use crate::device::{BIOMASS, GeneratorConfig};
use crate::engine::Engine;
use crate::fixed::Fixed64;
use crate::id::{ActionId, DeviceId, EntityId, ResourceKind};
use crate::insertion::InteractionRequest;
use crate::sim::SimulationStrategy;
use crate::world::{
    CueId, EntityLifecycle, InventoryRelocation, ItemClassifier, MassQuery, PowerSupply,
    Presentation, ResourceStore, VisualState,
};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

pub fn biomass() -> ResourceKind {
    BIOMASS
}

pub const AGENT: EntityId = EntityId(1);
pub const OTHER_AGENT: EntityId = EntityId(2);

// ===========================================================================
// Mock world
// ===========================================================================

/// In-memory host. Every device is powered unless listed in `unpowered`;
/// every call the engine makes is recorded for assertions.
#[derive(Debug, Default)]
pub struct MockWorld {
    pub unpowered: HashSet<DeviceId>,
    pub masses: HashMap<EntityId, Fixed64>,
    pub grindable: HashSet<EntityId>,
    pub produce: HashSet<EntityId>,
    /// carrier -> entities it carries.
    pub carried: HashMap<EntityId, Vec<EntityId>>,
    pub dropped: Vec<(EntityId, DeviceId)>,
    pub destroyed: Vec<EntityId>,
    pub deposits: Vec<(DeviceId, ResourceKind, u32)>,
    pub refuse_deposits: bool,
    pub ambience: HashMap<DeviceId, bool>,
    pub one_shots: Vec<(CueId, DeviceId)>,
    pub visuals: Vec<(DeviceId, VisualState)>,
}

impl MockWorld {
    /// A grindable item with a physics body.
    pub fn spawn_item(&mut self, id: u64, mass: f64, produce: bool) -> EntityId {
        let entity = EntityId(id);
        self.masses.insert(entity, fixed(mass));
        self.grindable.insert(entity);
        if produce {
            self.produce.insert(entity);
        }
        entity
    }

    /// Has mass but is not organic.
    pub fn spawn_inert(&mut self, id: u64, mass: f64) -> EntityId {
        let entity = EntityId(id);
        self.masses.insert(entity, fixed(mass));
        entity
    }

    /// Organic but without a physics body.
    pub fn spawn_massless(&mut self, id: u64) -> EntityId {
        let entity = EntityId(id);
        self.grindable.insert(entity);
        entity
    }

    pub fn give(&mut self, carrier: EntityId, carried: EntityId) {
        self.carried.entry(carrier).or_default().push(carried);
    }

    pub fn is_destroyed(&self, entity: EntityId) -> bool {
        self.destroyed.contains(&entity)
    }

    pub fn resource_total(&self, device: DeviceId, kind: ResourceKind) -> u64 {
        self.deposits
            .iter()
            .filter(|(d, k, _)| *d == device && *k == kind)
            .map(|(_, _, amount)| u64::from(*amount))
            .sum()
    }
}

impl PowerSupply for MockWorld {
    fn is_powered(&self, device: DeviceId) -> bool {
        !self.unpowered.contains(&device)
    }
}

impl MassQuery for MockWorld {
    fn mass_of(&self, entity: EntityId) -> Option<Fixed64> {
        if self.is_destroyed(entity) {
            return None;
        }
        self.masses.get(&entity).copied()
    }
}

impl ItemClassifier for MockWorld {
    fn is_grindable(&self, entity: EntityId) -> bool {
        self.grindable.contains(&entity) && !self.is_destroyed(entity)
    }

    fn is_produce(&self, entity: EntityId) -> bool {
        self.produce.contains(&entity)
    }
}

impl InventoryRelocation for MockWorld {
    fn drop_carried_items_near(&mut self, entity: EntityId, device: DeviceId) {
        if let Some(items) = self.carried.remove(&entity) {
            self.dropped.extend(items.into_iter().map(|item| (item, device)));
        }
    }
}

impl ResourceStore for MockWorld {
    fn add_resource(&mut self, device: DeviceId, kind: ResourceKind, amount: u32) -> bool {
        if self.refuse_deposits {
            return false;
        }
        self.deposits.push((device, kind, amount));
        true
    }
}

impl Presentation for MockWorld {
    fn set_ambience(&mut self, device: DeviceId, enabled: bool) {
        self.ambience.insert(device, enabled);
    }

    fn play_one_shot(&mut self, cue: CueId, device: DeviceId) {
        self.one_shots.push((cue, device));
    }

    fn set_visual_state(&mut self, device: DeviceId, state: VisualState) {
        self.visuals.push((device, state));
    }
}

impl EntityLifecycle for MockWorld {
    fn destroy_entity(&mut self, entity: EntityId) {
        self.destroyed.push(entity);
    }
}

// ===========================================================================
// Engine helpers
// ===========================================================================

pub fn make_engine() -> Engine<MockWorld> {
    Engine::new(SimulationStrategy::Variable, MockWorld::default())
}

pub fn add_generator(engine: &mut Engine<MockWorld>) -> DeviceId {
    engine
        .add_device(GeneratorConfig::default())
        .expect("default config is valid")
}

/// A reachable interaction aimed at the generator itself.
pub fn interact(device: DeviceId, agent: EntityId, item: EntityId) -> InteractionRequest {
    InteractionRequest {
        agent,
        item,
        device,
        target: Some(device),
        can_reach: true,
    }
}

/// Start an insertion and step exactly its delay so it commits.
pub fn insert_and_commit(
    engine: &mut Engine<MockWorld>,
    device: DeviceId,
    agent: EntityId,
    item: EntityId,
) -> ActionId {
    let action = engine
        .begin_insertion(interact(device, agent, item))
        .expect("device exists")
        .action()
        .expect("insertion accepted");
    let delay = engine.action(action).expect("action just started").delay;
    engine.step(delay);
    assert_eq!(engine.action_state(action), Some(ActionState::Committed));
    action
}

/// Step `dt` until no device is active. Returns the number of steps run.
pub fn run_until_idle(engine: &mut Engine<MockWorld>, dt: Fixed64, max_steps: u64) -> u64 {
    let mut steps = 0;
    while engine.active_count() > 0 && steps < max_steps {
        engine.step(dt);
        steps += 1;
    }
    steps
}
