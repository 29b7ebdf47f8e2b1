//! Biomass Core -- the simulation engine for biomass generators.
//!
//! A biomass generator accepts organic items from agents, converts their mass
//! into a fractional yield of one material, and after a powered processing
//! delay deposits the whole part of that yield into its resource store.
//! All arithmetic runs on Q32.32 fixed point so two engines fed the same
//! signals stay bit-identical.
//!
//! # Five-Phase Tick Pipeline
//!
//! Each call to [`engine::Engine::step`] advances the simulation by one tick
//! through the following phases:
//!
//! 1. **Pre-tick** -- Forget finished insertions and apply queued commands.
//! 2. **Actions** -- Advance timed insertions; commit the ones that matured.
//! 3. **Process** -- Count down active generators and emit on completion.
//! 4. **Post-tick** -- Deliver buffered events to subscribers.
//! 5. **Bookkeeping** -- Increment the tick counter.
//!
//! # Host Integration
//!
//! The engine owns a value implementing [`world::World`] and calls into it
//! for power state, item mass, storage and presentation:
//!
//! ```rust,ignore
//! let mut engine = Engine::new(SimulationStrategy::Variable, my_world);
//! let generator = engine.add_device(GeneratorConfig::default())?;
//! engine.begin_insertion(request)?;
//! engine.step(Fixed64::from_num(1.0 / 60.0));
//! ```
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Device table, scheduler and pipeline orchestrator.
//! - [`device::GeneratorConfig`] -- Per-generator rates, validated once.
//! - [`action::ActionScheduler`] -- Cancellable delayed insertions.
//! - [`event::EventBus`] -- Subscription-based event bus with buffered delivery.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod action;
pub mod command_queue;
pub mod device;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod gate;
pub mod id;
pub mod insertion;
pub mod marker;
pub mod processing;
pub mod query;
pub mod sim;
pub mod world;
pub mod yield_calc;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
