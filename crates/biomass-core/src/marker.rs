//! The active marker: "this device has unfinished processing".
//!
//! The marker is a flag on [`DeviceState`] mirrored by an ordered
//! [`ActiveIndex`] so the processing loop visits only active devices, in a
//! stable order. [`activate`] and [`deactivate`] are the only places either
//! side changes, and they fire the presentation cues tied to the marker.

use std::collections::BTreeSet;

use tracing::debug;

use crate::device::DeviceState;
use crate::event::{Event, EventBus};
use crate::fixed::Ticks;
use crate::id::DeviceId;
use crate::world::{Presentation, STARTUP_CUE};

/// Ordered set of devices carrying the marker.
#[derive(Debug, Clone, Default)]
pub struct ActiveIndex {
    devices: BTreeSet<DeviceId>,
}

impl ActiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, device: DeviceId) -> bool {
        self.devices.contains(&device)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Snapshot of the active devices in key order.
    pub fn to_vec(&self) -> Vec<DeviceId> {
        self.devices.iter().copied().collect()
    }

    pub(crate) fn forget(&mut self, device: DeviceId) {
        self.devices.remove(&device);
    }
}

/// Mutable engine state the per-device steps need besides the device itself.
pub(crate) struct DeviceContext<'a, W: ?Sized> {
    pub world: &'a mut W,
    pub active: &'a mut ActiveIndex,
    pub events: &'a mut EventBus,
    pub tick: Ticks,
}

/// Ensure the marker is present. Startup cues fire only on the transition.
pub(crate) fn activate<W: Presentation + ?Sized>(
    ctx: &mut DeviceContext<'_, W>,
    id: DeviceId,
    device: &mut DeviceState,
) -> bool {
    if device.active {
        return false;
    }
    device.active = true;
    ctx.active.devices.insert(id);
    ctx.world.play_one_shot(STARTUP_CUE, id);
    ctx.world.set_ambience(id, true);
    ctx.events.emit(Event::ProcessingStarted {
        device: id,
        tick: ctx.tick,
    });
    debug!(?id, timer = %device.processing_timer, "generator active");
    true
}

/// Remove the marker if present and silence the ambience.
pub(crate) fn deactivate<W: Presentation + ?Sized>(
    ctx: &mut DeviceContext<'_, W>,
    id: DeviceId,
    device: &mut DeviceState,
) -> bool {
    if !device.active {
        return false;
    }
    device.active = false;
    ctx.active.devices.remove(&id);
    ctx.world.set_ambience(id, false);
    ctx.events.emit(Event::ProcessingHalted {
        device: id,
        tick: ctx.tick,
    });
    debug!(?id, "generator idle");
    true
}
