//! Simulation strategy and state types.
//!
//! The engine is parameterized by a [`SimulationStrategy`] that determines how
//! elapsed time becomes ticks. Every tick runs the same pipeline; strategies
//! differ only in how many ticks an `advance()` call runs and how long each
//! one is.

use crate::fixed::{Fixed64, Ticks};
use crate::id::ActionId;
use crate::processing::ProcessReport;

// ---------------------------------------------------------------------------
// Simulation strategy
// ---------------------------------------------------------------------------

/// How the engine turns elapsed time into ticks. Chosen at construction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SimulationStrategy {
    /// Frame-driven. Each `advance(dt)` runs exactly one tick lasting `dt`.
    Variable,

    /// Fixed-length ticks. `advance(dt)` accumulates time and runs as many
    /// `timestep`-long ticks as fit, carrying the remainder forward.
    Fixed {
        /// Seconds per tick.
        timestep: Fixed64,
    },
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimState {
    /// Ticks run so far.
    pub tick: Ticks,

    /// Seconds carried between `advance` calls in fixed mode.
    pub accumulator: Fixed64,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Advance result
// ---------------------------------------------------------------------------

/// Result of an `Engine::advance()` or `Engine::step()` call.
#[derive(Debug, Default)]
pub struct AdvanceResult {
    /// Number of ticks actually executed.
    pub steps_run: u64,

    /// Insertions committed, in commit order.
    pub committed: Vec<ActionId>,

    /// Processing totals summed over every tick run.
    pub processing: ProcessReport,
}

impl AdvanceResult {
    pub(crate) fn absorb(&mut self, report: ProcessReport) {
        self.processing.ticked += report.ticked;
        self.processing.completed += report.completed;
        self.processing.emitted += report.emitted;
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_state_starts_at_zero() {
        let state = SimState::new();
        assert_eq!(state.tick, 0);
        assert_eq!(state.accumulator, Fixed64::ZERO);
    }

    #[test]
    fn state_hash_deterministic() {
        let mut h1 = StateHash::new();
        h1.write_u64(42);
        h1.write_fixed64(Fixed64::from_num(0.6));

        let mut h2 = StateHash::new();
        h2.write_u64(42);
        h2.write_fixed64(Fixed64::from_num(0.6));

        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn state_hash_order_matters() {
        let mut h1 = StateHash::new();
        h1.write_u8(1);
        h1.write_u8(2);

        let mut h2 = StateHash::new();
        h2.write_u8(2);
        h2.write_u8(1);

        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn absorb_sums_reports() {
        let mut result = AdvanceResult::default();
        let report = ProcessReport {
            ticked: 2,
            completed: 1,
            emitted: 3,
        };
        result.absorb(report);
        result.absorb(report);
        assert_eq!(result.processing.emitted, 6);
        assert_eq!(result.processing.completed, 2);
    }
}
