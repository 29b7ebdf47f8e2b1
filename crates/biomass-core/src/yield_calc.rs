//! Mass-to-time and mass-to-yield arithmetic.
//!
//! All functions are pure apart from logging. Multiplications saturate so an
//! absurd mass can never overflow the fixed-point range mid-tick; a
//! saturated result is logged at `warn`.

use tracing::warn;

use crate::device::GeneratorConfig;
use crate::fixed::{Fixed64, split_whole};

/// `a * b`, clamped to the fixed-point range.
pub(crate) fn saturating_product(a: Fixed64, b: Fixed64, quantity: &'static str) -> Fixed64 {
    a.checked_mul(b).unwrap_or_else(|| {
        let clamped = a.saturating_mul(b);
        warn!(quantity, lhs = %a, rhs = %b, %clamped, "fixed-point product saturated");
        clamped
    })
}

/// `a + b`, clamped to the fixed-point range.
pub(crate) fn saturating_sum(a: Fixed64, b: Fixed64, quantity: &'static str) -> Fixed64 {
    a.checked_add(b).unwrap_or_else(|| {
        let clamped = a.saturating_add(b);
        warn!(quantity, lhs = %a, rhs = %b, %clamped, "fixed-point sum saturated");
        clamped
    })
}

/// Seconds an agent must hold still to feed an item of `mass` in.
pub fn insertion_delay(config: &GeneratorConfig, mass: Fixed64) -> Fixed64 {
    saturating_product(config.base_insertion_delay, mass, "insertion delay")
}

/// Processing seconds an item of `mass` adds to the device timer.
pub fn processing_time_added(config: &GeneratorConfig, mass: Fixed64) -> Fixed64 {
    saturating_product(config.processing_time_per_unit_mass, mass, "processing time")
}

/// Resource units owed for consuming an item of `mass`. The produce
/// multiplier applies only when `is_produce` is set.
pub fn yield_for_mass(config: &GeneratorConfig, mass: Fixed64, is_produce: bool) -> Fixed64 {
    let rate = if is_produce {
        saturating_product(
            config.yield_per_unit_mass,
            config.produce_yield_multiplier,
            "produce yield rate",
        )
    } else {
        config.yield_per_unit_mass
    };
    saturating_product(mass, rate, "yield")
}

/// Take the whole units out of the accumulator, leaving the fraction behind.
pub fn drain_whole_units(expected_yield: &mut Fixed64) -> u32 {
    let (whole, rest) = split_whole(*expected_yield);
    *expected_yield = rest;
    whole
}
