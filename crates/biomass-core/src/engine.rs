use slotmap::{Key, SlotMap};
use tracing::{debug, warn};

use crate::action::{ActionConstraints, ActionRequest, ActionScheduler, ActionState, TimedAction};
use crate::command_queue::{Command, CommandQueue};
use crate::device::{ConfigError, DeviceState, GeneratorConfig, GeneratorStatus};
use crate::event::{Event, EventBus, EventKind, PassiveListener, ReactiveHandler};
use crate::fixed::{Fixed64, Ticks};
use crate::gate::{self, AnchorOutcome};
use crate::id::{ActionId, DeviceId, EntityId};
use crate::insertion::{self, InsertionOutcome, InteractionRequest};
use crate::marker::{self, ActiveIndex, DeviceContext};
use crate::processing;
use crate::query::DeviceSnapshot;
use crate::sim::{AdvanceResult, SimState, SimulationStrategy, StateHash};
use crate::world::{VisualState, World};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("unknown device {0:?}")]
    UnknownDevice(DeviceId),
    #[error("invalid generator config: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns every generator and drives them through the tick pipeline.
///
/// The engine is generic over the host [`World`], which it owns and calls
/// into for power, mass, storage and presentation.
#[derive(Debug)]
pub struct Engine<W: World> {
    world: W,
    devices: SlotMap<DeviceId, DeviceState>,
    active: ActiveIndex,
    actions: ActionScheduler,
    commands: CommandQueue,
    event_bus: EventBus,
    strategy: SimulationStrategy,
    sim_state: SimState,
    paused: bool,
}

impl<W: World> Engine<W> {
    pub fn new(strategy: SimulationStrategy, world: W) -> Self {
        Self::with_event_capacity(strategy, world, 1024)
    }

    /// Create an engine whose event ring buffers hold `capacity` events per
    /// kind between deliveries.
    pub fn with_event_capacity(strategy: SimulationStrategy, world: W, capacity: usize) -> Self {
        Self {
            world,
            devices: SlotMap::with_key(),
            active: ActiveIndex::new(),
            actions: ActionScheduler::new(),
            commands: CommandQueue::new(),
            event_bus: EventBus::new(capacity),
            strategy,
            sim_state: SimState::new(),
            paused: false,
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn strategy(&self) -> &SimulationStrategy {
        &self.strategy
    }

    // -----------------------------------------------------------------------
    // Device lifecycle
    // -----------------------------------------------------------------------

    /// Create a generator. The config is validated here and never again.
    pub fn add_device(&mut self, config: GeneratorConfig) -> Result<DeviceId, EngineError> {
        config.validate()?;
        let id = self.devices.insert(DeviceState::new(config));
        self.event_bus.emit(Event::DeviceAdded {
            device: id,
            tick: self.sim_state.tick,
        });
        debug!(?id, "generator added");
        Ok(id)
    }

    /// Tear a generator down. Pending insertions into it are cancelled and
    /// unfinished work is discarded without emission.
    pub fn remove_device(&mut self, id: DeviceId) -> Result<(), EngineError> {
        if !self.devices.contains_key(id) {
            return Err(EngineError::UnknownDevice(id));
        }
        let tick = self.sim_state.tick;
        let cancelled = self.actions.cancel_for_device(id);
        emit_cancelled(&mut self.event_bus, &self.actions, &cancelled, tick);

        let (devices, _, mut ctx) = self.split();
        if let Some(device) = devices.get_mut(id) {
            marker::deactivate(&mut ctx, id, device);
        }
        devices.remove(id);
        ctx.events.emit(Event::DeviceRemoved { device: id, tick });
        debug!(?id, "generator removed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Signals
    // -----------------------------------------------------------------------

    /// An agent used an item on a generator. Ineligible requests are
    /// reported as [`InsertionOutcome::Rejected`] and change nothing.
    pub fn begin_insertion(
        &mut self,
        request: InteractionRequest,
    ) -> Result<InsertionOutcome, EngineError> {
        let device = self
            .devices
            .get(request.device)
            .ok_or(EngineError::UnknownDevice(request.device))?;

        let plan = match insertion::plan_insertion(device, &request, &self.world) {
            Ok(plan) => plan,
            Err(reason) => {
                debug!(device = ?request.device, item = ?request.item, ?reason, "insertion rejected");
                return Ok(InsertionOutcome::Rejected(reason));
            }
        };

        let action = self.actions.start(ActionRequest {
            agent: request.agent,
            item: request.item,
            device: request.device,
            target: request.target,
            delay: plan.delay,
            constraints: ActionConstraints::default(),
        });
        self.event_bus.emit(Event::InsertionStarted {
            device: request.device,
            action,
            agent: request.agent,
            item: request.item,
            delay: plan.delay,
            tick: self.sim_state.tick,
        });
        debug!(
            device = ?request.device,
            item = ?request.item,
            delay = %plan.delay,
            "insertion started"
        );
        Ok(InsertionOutcome::Started(action))
    }

    /// The agent moved. Returns how many insertions were cancelled.
    pub fn agent_moved(&mut self, agent: EntityId) -> usize {
        let cancelled = self.actions.agent_moved(agent);
        emit_cancelled(&mut self.event_bus, &self.actions, &cancelled, self.sim_state.tick);
        cancelled.len()
    }

    /// The agent let go of `item`. Returns how many insertions were cancelled.
    pub fn item_released(&mut self, agent: EntityId, item: EntityId) -> usize {
        let cancelled = self.actions.item_released(agent, item);
        emit_cancelled(&mut self.event_bus, &self.actions, &cancelled, self.sim_state.tick);
        cancelled.len()
    }

    /// The grid changed this device's supply.
    pub fn set_powered(&mut self, id: DeviceId, powered: bool) -> Result<(), EngineError> {
        let (devices, _, mut ctx) = self.split();
        let device = devices.get_mut(id).ok_or(EngineError::UnknownDevice(id))?;
        gate::on_power_changed(&mut ctx, id, device, powered);
        Ok(())
    }

    /// Something tried to unanchor the device.
    pub fn request_unanchor(&mut self, id: DeviceId) -> Result<AnchorOutcome, EngineError> {
        let (devices, _, mut ctx) = self.split();
        let device = devices.get(id).ok_or(EngineError::UnknownDevice(id))?;
        let outcome = gate::on_unanchor_attempt(&mut ctx, id, device);
        if outcome == AnchorOutcome::Vetoed {
            debug!(?id, "unanchor vetoed while processing");
        }
        Ok(outcome)
    }

    /// Set the presentation status and push it to the renderer.
    pub fn set_status(&mut self, id: DeviceId, status: GeneratorStatus) -> Result<(), EngineError> {
        let device = self
            .devices
            .get_mut(id)
            .ok_or(EngineError::UnknownDevice(id))?;
        device.status = status;
        self.world.set_visual_state(id, VisualState::Status(status));
        self.event_bus.emit(Event::StatusChanged {
            device: id,
            status,
            tick: self.sim_state.tick,
        });
        Ok(())
    }

    /// Queue a signal for the start of the next tick.
    pub fn submit(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn submit_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.commands.push_batch(commands);
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.pending_count()
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    pub fn on_reactive(&mut self, kind: EventKind, handler: ReactiveHandler) {
        self.event_bus.on_reactive(kind, handler);
    }

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn event_bus_mut(&mut self) -> &mut EventBus {
        &mut self.event_bus
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn device(&self, id: DeviceId) -> Option<&DeviceState> {
        self.devices.get(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &DeviceState)> {
        self.devices.iter()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn is_active(&self, id: DeviceId) -> bool {
        self.active.contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn action(&self, id: ActionId) -> Option<&TimedAction> {
        self.actions.get(id)
    }

    /// State of an insertion. Finished actions are forgotten at the start of
    /// the following tick.
    pub fn action_state(&self, id: ActionId) -> Option<ActionState> {
        self.actions.state(id)
    }

    pub fn pending_insertions(&self) -> usize {
        self.actions.pending_count()
    }

    pub fn snapshot_device(&self, id: DeviceId) -> Option<DeviceSnapshot> {
        let device = self.devices.get(id)?;
        Some(DeviceSnapshot {
            id,
            config: device.config.clone(),
            time_left: device.time_left(),
            expected_yield: device.expected_yield,
            active: device.is_active(),
            status: device.status,
            pending_insertions: self.actions.pending_for_device(id),
        })
    }

    pub fn snapshot_all(&self) -> Vec<DeviceSnapshot> {
        self.devices
            .keys()
            .filter_map(|id| self.snapshot_device(id))
            .collect()
    }

    pub fn tick(&self) -> Ticks {
        self.sim_state.tick
    }

    /// Hash of everything that affects future ticks.
    pub fn state_hash(&self) -> u64 {
        let mut hash = StateHash::new();
        hash.write_u64(self.sim_state.tick);
        hash.write_fixed64(self.sim_state.accumulator);
        for (id, device) in &self.devices {
            hash.write_u64(id.data().as_ffi());
            hash.write_fixed64(device.processing_timer);
            hash.write_fixed64(device.expected_yield);
            hash.write_u8(u8::from(device.active));
            hash.write_u8(device.status as u8);
        }
        hash.write_u64(self.actions.pending_count() as u64);
        hash.finish()
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Advance by `dt` seconds according to the configured strategy.
    ///
    /// - **Variable**: exactly one tick of `dt` runs.
    /// - **Fixed**: `dt` is accumulated; as many whole timesteps run as fit.
    pub fn advance(&mut self, dt: Fixed64) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if self.paused {
            return result;
        }

        match self.strategy.clone() {
            SimulationStrategy::Variable => self.step_internal(dt, &mut result),
            SimulationStrategy::Fixed { timestep } => {
                let timestep = timestep.max(Fixed64::DELTA);
                self.sim_state.accumulator = self.sim_state.accumulator.saturating_add(dt);
                while self.sim_state.accumulator >= timestep {
                    self.sim_state.accumulator -= timestep;
                    self.step_internal(timestep, &mut result);
                }
            }
        }

        result
    }

    /// Run exactly one tick of `dt` seconds, whatever the strategy.
    pub fn step(&mut self, dt: Fixed64) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if !self.paused {
            self.step_internal(dt, &mut result);
        }
        result
    }

    fn step_internal(&mut self, dt: Fixed64, result: &mut AdvanceResult) {
        // Phase 1: Pre-tick -- forget finished actions, apply queued signals.
        self.phase_pre_tick();

        // Phase 2: Actions -- advance insertions, commit the matured ones.
        self.phase_actions(dt, result);

        // Phase 3: Process -- count down active devices, emit on completion.
        self.phase_process(dt, result);

        // Phase 4: Post-tick -- deliver buffered events.
        self.event_bus.deliver();

        // Phase 5: Bookkeeping.
        self.sim_state.tick += 1;
        result.steps_run += 1;
    }

    // -----------------------------------------------------------------------
    // Phase 1: Pre-tick
    // -----------------------------------------------------------------------

    fn phase_pre_tick(&mut self) {
        self.actions.prune_finished();

        let mut commands = self.event_bus.drain_commands();
        commands.extend(self.commands.drain(self.sim_state.tick));
        for command in commands {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: Command) {
        let applied = match command {
            Command::Interact(request) => self.begin_insertion(request).map(|_| ()),
            Command::AgentMoved { agent } => {
                self.agent_moved(agent);
                Ok(())
            }
            Command::ItemReleased { agent, item } => {
                self.item_released(agent, item);
                Ok(())
            }
            Command::PowerChanged { device, powered } => self.set_powered(device, powered),
            Command::SetStatus { device, status } => self.set_status(device, status),
            Command::RemoveDevice { device } => self.remove_device(device),
        };
        if let Err(err) = applied {
            warn!(%err, "dropping command");
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2: Actions
    // -----------------------------------------------------------------------

    fn phase_actions(&mut self, dt: Fixed64, result: &mut AdvanceResult) {
        for action in self.actions.advance(dt) {
            if self.complete_action(action) {
                result.committed.push(action);
            }
        }
    }

    /// Commit a matured action, or abort it without mutation if its
    /// references no longer hold.
    fn complete_action(&mut self, action: ActionId) -> bool {
        let tick = self.sim_state.tick;
        let (devices, actions, mut ctx) = self.split();

        // An earlier commit this tick may have consumed the same item.
        let Some(pending) = actions.get(action).filter(|a| a.is_pending()) else {
            return false;
        };
        let (id, item, target) = (pending.device, pending.item, pending.target);

        let target_ok = target.is_some_and(|t| devices.contains_key(t));
        let mass = ctx.world.mass_of(item);
        let (Some(device), true, Some(mass)) = (devices.get_mut(id), target_ok, mass) else {
            warn!(?action, device = ?id, ?item, "aborting malformed insertion");
            actions.cancel(action);
            emit_cancelled(ctx.events, actions, &[action], tick);
            return false;
        };

        insertion::commit_insertion(&mut ctx, id, device, action, item, mass);
        actions.mark_committed(action);

        let superseded = actions.cancel_for_item(item);
        emit_cancelled(ctx.events, actions, &superseded, tick);
        true
    }

    // -----------------------------------------------------------------------
    // Phase 3: Process
    // -----------------------------------------------------------------------

    fn phase_process(&mut self, dt: Fixed64, result: &mut AdvanceResult) {
        let (devices, _, mut ctx) = self.split();
        let report = processing::run(devices, &mut ctx, dt);
        result.absorb(report);
    }

    /// Borrow the device table, the scheduler and a per-device context at
    /// the same time.
    fn split(
        &mut self,
    ) -> (
        &mut SlotMap<DeviceId, DeviceState>,
        &mut ActionScheduler,
        DeviceContext<'_, W>,
    ) {
        let ctx = DeviceContext {
            world: &mut self.world,
            active: &mut self.active,
            events: &mut self.event_bus,
            tick: self.sim_state.tick,
        };
        (&mut self.devices, &mut self.actions, ctx)
    }
}

fn emit_cancelled(events: &mut EventBus, actions: &ActionScheduler, ids: &[ActionId], tick: Ticks) {
    for &action in ids {
        if let Some(a) = actions.get(action) {
            debug!(?action, device = ?a.device, "insertion cancelled");
            events.emit(Event::InsertionCancelled {
                device: a.device,
                action,
                tick,
            });
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insertion::RejectReason;
    use crate::test_utils::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn add_device_rejects_invalid_config() {
        let mut engine = make_engine();
        let config = GeneratorConfig {
            yield_per_unit_mass: Fixed64::ZERO,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            engine.add_device(config),
            Err(EngineError::Config(_))
        ));
        assert_eq!(engine.device_count(), 0);
    }

    #[test]
    fn unknown_device_is_an_error() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        engine.remove_device(id).unwrap();

        assert_eq!(
            engine.set_powered(id, true),
            Err(EngineError::UnknownDevice(id))
        );
        assert_eq!(
            engine.request_unanchor(id),
            Err(EngineError::UnknownDevice(id))
        );
        assert!(engine.snapshot_device(id).is_none());
    }

    #[test]
    fn insertion_commits_after_delay() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let item = engine.world_mut().spawn_item(10, 5.0, true);

        let action = engine
            .begin_insertion(interact(id, AGENT, item))
            .unwrap()
            .action()
            .unwrap();

        // Delay is 0.1 * 5, a hair over 0.5s in Q32.32.
        engine.step(fixed(0.25));
        assert_eq!(engine.action_state(action), Some(ActionState::Pending));
        assert!(!engine.is_active(id));

        let result = engine.step(fixed(0.3));
        assert_eq!(result.committed, vec![action]);
        assert_eq!(engine.action_state(action), Some(ActionState::Committed));
        assert!(engine.is_active(id));
        assert!(engine.world().is_destroyed(item));
    }

    #[test]
    fn finished_actions_are_pruned_next_tick() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let item = engine.world_mut().spawn_item(10, 1.0, true);
        let action = engine
            .begin_insertion(interact(id, AGENT, item))
            .unwrap()
            .action()
            .unwrap();
        engine.step(fixed(1.0));
        assert!(engine.action_state(action).is_some());
        engine.step(fixed(0.1));
        assert!(engine.action_state(action).is_none());
    }

    #[test]
    fn rejected_insertion_leaves_no_trace() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let rock = engine.world_mut().spawn_inert(10, 5.0);
        let before = engine.state_hash();

        let outcome = engine.begin_insertion(interact(id, AGENT, rock)).unwrap();
        assert_eq!(outcome, InsertionOutcome::Rejected(RejectReason::NotGrindable));
        assert_eq!(engine.pending_insertions(), 0);
        assert_eq!(engine.state_hash(), before);
    }

    #[test]
    fn item_vanishing_before_commit_aborts() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let item = engine.world_mut().spawn_item(10, 2.0, true);
        let action = engine
            .begin_insertion(interact(id, AGENT, item))
            .unwrap()
            .action()
            .unwrap();

        engine.world_mut().masses.remove(&item);
        let result = engine.step(fixed(1.0));

        assert!(result.committed.is_empty());
        assert_eq!(engine.action_state(action), Some(ActionState::Cancelled));
        assert_eq!(engine.device(id).unwrap().expected_yield, Fixed64::ZERO);
        assert!(!engine.is_active(id));
    }

    #[test]
    fn removing_target_cancels_insertion() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let other = add_generator(&mut engine);
        let item = engine.world_mut().spawn_item(10, 2.0, true);
        let mut request = interact(id, AGENT, item);
        request.target = Some(other);
        let action = engine.begin_insertion(request).unwrap().action().unwrap();

        engine.remove_device(other).unwrap();
        engine.step(fixed(1.0));

        assert_eq!(engine.action_state(action), Some(ActionState::Cancelled));
        assert_eq!(engine.device(id).unwrap().processing_timer, Fixed64::ZERO);
        assert!(!engine.world().is_destroyed(item));
    }

    #[test]
    fn same_item_commits_once() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let item = engine.world_mut().spawn_item(10, 1.0, true);
        let first = engine
            .begin_insertion(interact(id, AGENT, item))
            .unwrap()
            .action()
            .unwrap();
        let second = engine
            .begin_insertion(interact(id, AGENT, item))
            .unwrap()
            .action()
            .unwrap();

        let result = engine.step(fixed(1.0));
        assert_eq!(result.committed, vec![first]);
        assert_eq!(engine.action_state(second), Some(ActionState::Cancelled));
        assert_eq!(engine.world().destroyed, vec![item]);
    }

    #[test]
    fn removing_active_device_silences_it() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let item = engine.world_mut().spawn_item(10, 4.0, true);
        insert_and_commit(&mut engine, id, AGENT, item);
        assert!(engine.is_active(id));

        engine.remove_device(id).unwrap();
        assert_eq!(engine.active_count(), 0);
        assert_eq!(engine.world().ambience.get(&id), Some(&false));
        assert_eq!(engine.world().resource_total(id, biomass()), 0);
    }

    #[test]
    fn status_is_written_not_derived() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let item = engine.world_mut().spawn_item(10, 1.0, true);
        insert_and_commit(&mut engine, id, AGENT, item);

        assert_eq!(engine.device(id).unwrap().status, GeneratorStatus::Idle);
        engine.set_status(id, GeneratorStatus::Generating).unwrap();
        assert_eq!(engine.device(id).unwrap().status, GeneratorStatus::Generating);
        assert_eq!(
            engine.world().visuals.last(),
            Some(&(id, VisualState::Status(GeneratorStatus::Generating)))
        );
    }

    #[test]
    fn reactive_handler_can_mirror_status() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        engine.on_reactive(
            EventKind::ProcessingStarted,
            Box::new(|e: &Event| {
                vec![Command::SetStatus {
                    device: e.device(),
                    status: GeneratorStatus::Generating,
                }]
            }),
        );
        let item = engine.world_mut().spawn_item(10, 1.0, true);
        insert_and_commit(&mut engine, id, AGENT, item);
        // The handler's command lands on the following tick.
        engine.step(fixed(0.01));
        assert_eq!(engine.device(id).unwrap().status, GeneratorStatus::Generating);
    }

    #[test]
    fn queued_commands_apply_at_tick_start() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let item = engine.world_mut().spawn_item(10, 1.0, true);
        engine.submit(Command::Interact(interact(id, AGENT, item)));
        assert_eq!(engine.pending_insertions(), 0);

        engine.step(fixed(0.01));
        assert_eq!(engine.pending_insertions(), 1);
        assert_eq!(engine.pending_commands(), 0);
    }

    #[test]
    fn commands_for_unknown_devices_are_dropped() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        engine.remove_device(id).unwrap();
        engine.submit(Command::PowerChanged {
            device: id,
            powered: true,
        });
        let result = engine.step(fixed(0.1));
        assert_eq!(result.steps_run, 1);
    }

    #[test]
    fn fixed_strategy_carries_remainder() {
        let mut engine = Engine::new(
            SimulationStrategy::Fixed {
                timestep: fixed(0.5),
            },
            MockWorld::default(),
        );
        assert_eq!(engine.advance(fixed(1.25)).steps_run, 2);
        assert_eq!(engine.advance(fixed(0.25)).steps_run, 1);
        assert_eq!(engine.tick(), 3);
    }

    #[test]
    fn paused_engine_does_nothing() {
        let mut engine = make_engine();
        engine.pause();
        assert_eq!(engine.advance(fixed(1.0)).steps_run, 0);
        assert_eq!(engine.step(fixed(1.0)).steps_run, 0);
        engine.resume();
        assert_eq!(engine.step(fixed(1.0)).steps_run, 1);
    }

    #[test]
    fn events_reach_listeners_in_post_tick() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let emitted = Rc::new(RefCell::new(0u32));
        let sink = emitted.clone();
        engine.on_passive(
            EventKind::ResourceEmitted,
            Box::new(move |e| {
                if let Event::ResourceEmitted { amount, .. } = e {
                    *sink.borrow_mut() += amount;
                }
            }),
        );

        let item = engine.world_mut().spawn_item(10, 5.0, false);
        insert_and_commit(&mut engine, id, AGENT, item);
        run_until_idle(&mut engine, fixed(0.5), 100);

        assert_eq!(*emitted.borrow(), 3);
    }

    #[test]
    fn snapshot_reports_pending_and_clamped_time() {
        let mut engine = make_engine();
        let id = add_generator(&mut engine);
        let a = engine.world_mut().spawn_item(10, 1.0, true);
        let b = engine.world_mut().spawn_item(11, 50.0, true);
        insert_and_commit(&mut engine, id, AGENT, a);
        engine.begin_insertion(interact(id, OTHER_AGENT, b)).unwrap();
        run_until_idle(&mut engine, fixed(0.2), 100);

        let snap = engine.snapshot_device(id).unwrap();
        assert_eq!(snap.time_left, Fixed64::ZERO);
        assert!(!snap.active);
        assert_eq!(snap.pending_insertions, 1);
        assert_eq!(engine.snapshot_all().len(), 1);
    }
}
