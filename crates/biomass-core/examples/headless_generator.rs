//! Headless generator example: one generator fed a few items.
//!
//! Inserts three organic items into a single generator, cuts its power
//! halfway through processing, restores it, and runs until the generator
//! goes idle. Prints the device snapshot each simulated second.
//!
//! Run with: `RUST_LOG=biomass_core=debug cargo run -p biomass-core --example headless_generator --features test-utils`

use biomass_core::device::GeneratorConfig;
use biomass_core::engine::Engine;
use biomass_core::event::{Event, EventKind};
use biomass_core::fixed::{Fixed64, fixed64_to_f64};
use biomass_core::sim::SimulationStrategy;
use biomass_core::test_utils::{AGENT, MockWorld, interact};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 60 ticks per simulated second.
    let timestep = Fixed64::from_num(1) / Fixed64::from_num(60);
    let mut engine = Engine::new(SimulationStrategy::Fixed { timestep }, MockWorld::default());

    engine.on_passive(
        EventKind::ResourceEmitted,
        Box::new(|event: &Event| {
            if let Event::ResourceEmitted { amount, tick, .. } = event {
                println!("tick {tick}: emitted {amount} biomass");
            }
        }),
    );

    let generator = engine
        .add_device(GeneratorConfig::default())
        .expect("default config is valid");

    // --- Feed three items, one after another ---

    for (id, mass, produce) in [(1, 5.0, false), (2, 2.5, true), (3, 1.25, false)] {
        let item = engine.world_mut().spawn_item(id, mass, produce);
        let outcome = engine
            .begin_insertion(interact(generator, AGENT, item))
            .expect("generator exists");
        println!("item {id} ({mass} kg): {outcome:?}");
        // Hold still long enough for the insertion to finish.
        engine.advance(Fixed64::from_num(mass * 0.1 + 0.05));
    }

    // --- Run, with a power cut in the middle ---

    let one_second = Fixed64::from_num(1);
    for second in 1..=30 {
        if second == 2 {
            engine.world_mut().unpowered.insert(generator);
            engine
                .set_powered(generator, false)
                .expect("generator exists");
            println!("power lost");
        }
        if second == 5 {
            engine.world_mut().unpowered.remove(&generator);
            engine
                .set_powered(generator, true)
                .expect("generator exists");
            println!("power restored");
        }

        engine.advance(one_second);

        let snap = engine
            .snapshot_device(generator)
            .expect("generator exists");
        println!(
            "t={second:>2}s active={} time_left={:.2}s expected_yield={:.2}",
            snap.active,
            fixed64_to_f64(snap.time_left),
            fixed64_to_f64(snap.expected_yield),
        );
        if !snap.active && second > 5 {
            break;
        }
    }

    println!(
        "total biomass: {}",
        engine
            .world()
            .resource_total(generator, biomass_core::device::BIOMASS)
    );
}
