//! Read-only views of generator state.
//!
//! Snapshots are owned copies, safe to hand to UI or network code without
//! holding a borrow of the engine.

use crate::device::{GeneratorConfig, GeneratorStatus};
use crate::fixed::Fixed64;
use crate::id::DeviceId;

/// An aggregated view of one generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub id: DeviceId,
    pub config: GeneratorConfig,
    /// Seconds of processing left, clamped at zero.
    pub time_left: Fixed64,
    /// Resource units owed, including the carried fraction.
    pub expected_yield: Fixed64,
    /// Whether the device carries the active marker.
    pub active: bool,
    pub status: GeneratorStatus,
    /// Insertions currently in progress into this device.
    pub pending_insertions: usize,
}
