//! The per-tick processing loop.
//!
//! For every device in the active index, in key order:
//!
//! 1. `processing_timer -= dt`.
//! 2. Unpowered devices stop here. The timer has already moved.
//! 3. A timer still above zero stops here.
//! 4. Otherwise the whole part of `expected_yield` is deposited, the
//!    fraction stays behind, and the marker is removed.

use slotmap::SlotMap;
use tracing::{trace, warn};

use crate::device::DeviceState;
use crate::event::Event;
use crate::fixed::Fixed64;
use crate::id::DeviceId;
use crate::marker::{self, DeviceContext};
use crate::world::{PowerSupply, Presentation, ResourceStore};
use crate::yield_calc;

/// Totals for one pass of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Devices that were ticked.
    pub ticked: usize,
    /// Devices that finished their work this pass.
    pub completed: usize,
    /// Resource units handed to the store.
    pub emitted: u64,
}

pub(crate) fn run<W>(
    devices: &mut SlotMap<DeviceId, DeviceState>,
    ctx: &mut DeviceContext<'_, W>,
    dt: Fixed64,
) -> ProcessReport
where
    W: PowerSupply + ResourceStore + Presentation + ?Sized,
{
    let mut report = ProcessReport::default();

    for id in ctx.active.to_vec() {
        let Some(device) = devices.get_mut(id) else {
            ctx.active.forget(id);
            continue;
        };
        report.ticked += 1;

        device.processing_timer = device.processing_timer.saturating_sub(dt);
        trace!(?id, timer = %device.processing_timer, "tick");

        if !ctx.world.is_powered(id) {
            continue;
        }
        if device.processing_timer > Fixed64::ZERO {
            continue;
        }

        let amount = yield_calc::drain_whole_units(&mut device.expected_yield);
        if amount > 0 {
            let kind = device.config.required_material;
            if !ctx.world.add_resource(id, kind, amount) {
                warn!(?id, ?kind, amount, "resource store refused deposit");
            }
            ctx.events.emit(Event::ResourceEmitted {
                device: id,
                kind,
                amount,
                tick: ctx.tick,
            });
            report.emitted += u64::from(amount);
        }
        marker::deactivate(ctx, id, device);
        report.completed += 1;
    }

    report
}
