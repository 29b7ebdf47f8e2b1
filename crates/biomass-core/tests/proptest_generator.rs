//! Property-based tests for the biomass generator engine.
//!
//! Uses proptest to generate random item streams and signal sequences, then
//! verify the arithmetic and state-machine invariants hold.

use biomass_core::device::GeneratorConfig;
use biomass_core::engine::Engine;
use biomass_core::fixed::{Fixed64, fixed64_to_f64};
use biomass_core::gate::AnchorOutcome;
use biomass_core::test_utils::*;
use biomass_core::yield_calc;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// Item masses in quarter-kilogram steps, including zero.
fn arb_mass() -> impl Strategy<Value = f64> {
    (0u32..=80).prop_map(|q| f64::from(q) * 0.25)
}

/// Signals a host might send between ticks.
#[derive(Debug, Clone)]
enum Op {
    Insert { mass: f64, produce: bool },
    Step(u8),
    Move,
    PowerOff,
    PowerOn,
    Unanchor,
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            3 => (arb_mass(), any::<bool>()).prop_map(|(mass, produce)| Op::Insert { mass, produce }),
            4 => (1u8..=20).prop_map(Op::Step),
            1 => Just(Op::Move),
            1 => Just(Op::PowerOff),
            1 => Just(Op::PowerOn),
            1 => Just(Op::Unanchor),
        ],
        1..=max_ops,
    )
}

fn apply_ops(ops: &[Op]) -> Engine<MockWorld> {
    let mut engine = make_engine();
    let gen_id = add_generator(&mut engine);
    for (i, op) in ops.iter().enumerate() {
        match *op {
            Op::Insert { mass, produce } => {
                let item = engine.world_mut().spawn_item(1000 + i as u64, mass, produce);
                engine
                    .begin_insertion(interact(gen_id, AGENT, item))
                    .unwrap();
            }
            Op::Step(tenths) => {
                engine.step(fixed(f64::from(tenths) * 0.1));
            }
            Op::Move => {
                engine.agent_moved(AGENT);
            }
            Op::PowerOff => {
                engine.world_mut().unpowered.insert(gen_id);
                engine.set_powered(gen_id, false).unwrap();
            }
            Op::PowerOn => {
                engine.world_mut().unpowered.remove(&gen_id);
                engine.set_powered(gen_id, true).unwrap();
            }
            Op::Unanchor => {
                engine.request_unanchor(gen_id).unwrap();
            }
        }
    }
    engine
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Delay and processing time scale linearly with mass and vanish only at
    /// zero mass.
    #[test]
    fn delay_and_time_are_linear(mass in arb_mass()) {
        let config = GeneratorConfig::default();
        let m = fixed(mass);
        let delay = yield_calc::insertion_delay(&config, m);
        let time = yield_calc::processing_time_added(&config, m);

        prop_assert_eq!(delay, config.base_insertion_delay.saturating_mul(m));
        prop_assert_eq!(time, config.processing_time_per_unit_mass.saturating_mul(m));
        prop_assert_eq!(delay == Fixed64::ZERO, mass == 0.0);
        prop_assert_eq!(time == Fixed64::ZERO, mass == 0.0);

        let doubled = yield_calc::processing_time_added(&config, m + m);
        prop_assert_eq!(doubled, time + time);
    }

    /// Every unit of yield is emitted exactly once, whatever the completion
    /// cycles look like; only the fraction stays behind. The expectation is
    /// computed exactly from the configured decimal rates, not from the
    /// engine's fixed-point values.
    #[test]
    fn yield_is_conserved(
        rate_hundredths in 1u32..=150,
        multiplier_quarters in 0u32..=12,
        items in proptest::collection::vec((0u32..=80, any::<bool>(), 0u8..6), 1..12),
    ) {
        let mut engine = make_engine();
        let config = GeneratorConfig {
            yield_per_unit_mass: fixed(f64::from(rate_hundredths) / 100.0),
            produce_yield_multiplier: fixed(f64::from(multiplier_quarters) / 4.0),
            ..GeneratorConfig::default()
        };
        let gen_id = engine.add_device(config).unwrap();

        // Yield in units of 1/1600: mass quarters * rate hundredths * multiplier quarters.
        let mut total: u64 = 0;
        for (i, (mass_quarters, produce, idle_steps)) in items.iter().copied().enumerate() {
            let multiplier = if produce { multiplier_quarters } else { 4 };
            total += u64::from(mass_quarters * rate_hundredths * multiplier);
            let mass = f64::from(mass_quarters) * 0.25;
            let item = engine.world_mut().spawn_item(100 + i as u64, mass, produce);
            insert_and_commit(&mut engine, gen_id, AGENT, item);
            for _ in 0..idle_steps {
                engine.step(fixed(0.5));
            }
        }
        run_until_idle(&mut engine, fixed(0.5), 10_000);

        let whole = total / 1600;
        let fraction = (total % 1600) as f64 / 1600.0;
        prop_assert_eq!(engine.world().resource_total(gen_id, biomass()), whole);
        let rest = engine.device(gen_id).unwrap().expected_yield;
        prop_assert!(rest >= Fixed64::ZERO);
        prop_assert!((fixed64_to_f64(rest) - fraction).abs() < 1e-6);
        prop_assert!(!engine.is_active(gen_id));
    }

    /// Ineligible items never touch the device, whatever state it is in.
    #[test]
    fn rejection_is_idempotent(ops in arb_ops(20), rock_mass in arb_mass()) {
        let mut engine = apply_ops(&ops);
        let gen_id = engine.devices().next().map(|(id, _)| id).unwrap();
        let before = engine.snapshot_device(gen_id).unwrap();
        let hash = engine.state_hash();

        let rock = engine.world_mut().spawn_inert(9_000, rock_mass);
        let ghost = engine.world_mut().spawn_massless(9_001);
        for item in [rock, ghost] {
            let outcome = engine.begin_insertion(interact(gen_id, AGENT, item)).unwrap();
            prop_assert!(outcome.action().is_none());
        }

        prop_assert_eq!(engine.snapshot_device(gen_id).unwrap(), before);
        prop_assert_eq!(engine.state_hash(), hash);
    }

    /// The marker and the anchor veto always agree.
    #[test]
    fn anchor_veto_tracks_marker(ops in arb_ops(30)) {
        let mut engine = apply_ops(&ops);
        let gen_id = engine.devices().next().map(|(id, _)| id).unwrap();
        let active = engine.is_active(gen_id);
        let outcome = engine.request_unanchor(gen_id).unwrap();
        prop_assert_eq!(outcome == AnchorOutcome::Vetoed, active);
        prop_assert_eq!(engine.device(gen_id).unwrap().is_active(), active);
        prop_assert_eq!(engine.active_count(), usize::from(active));
    }

    /// Same signals, same state.
    #[test]
    fn replay_is_deterministic(ops in arb_ops(40)) {
        let a = apply_ops(&ops);
        let b = apply_ops(&ops);
        prop_assert_eq!(a.state_hash(), b.state_hash());
        prop_assert_eq!(&a.world().deposits, &b.world().deposits);
    }

    /// Deposits are never empty and only inserted items are destroyed.
    #[test]
    fn deposits_are_positive(ops in arb_ops(40)) {
        let engine = apply_ops(&ops);
        for (_, _, amount) in &engine.world().deposits {
            prop_assert!(*amount > 0);
        }
        for entity in &engine.world().destroyed {
            prop_assert!(entity.0 >= 1000);
        }
    }
}
