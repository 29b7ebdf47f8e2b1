//! Reactions to power changes and relocation attempts.

use tracing::debug;

use crate::device::DeviceState;
use crate::event::Event;
use crate::fixed::Fixed64;
use crate::id::DeviceId;
use crate::marker::{self, DeviceContext};
use crate::world::Presentation;

/// Answer to an unanchor attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorOutcome {
    Allowed,
    Vetoed,
}

/// Power came back or went away.
///
/// Restored power resumes a device that still has time on its timer. Lost
/// power halts it unconditionally; the remaining timer is kept.
pub(crate) fn on_power_changed<W: Presentation + ?Sized>(
    ctx: &mut DeviceContext<'_, W>,
    id: DeviceId,
    device: &mut DeviceState,
    powered: bool,
) {
    debug!(?id, powered, "power changed");
    if powered {
        if device.processing_timer > Fixed64::ZERO {
            marker::activate(ctx, id, device);
        }
    } else {
        marker::deactivate(ctx, id, device);
    }
}

/// A processing device refuses to be unanchored.
pub(crate) fn on_unanchor_attempt<W: ?Sized>(
    ctx: &mut DeviceContext<'_, W>,
    id: DeviceId,
    device: &DeviceState,
) -> AnchorOutcome {
    if !device.is_active() {
        return AnchorOutcome::Allowed;
    }
    ctx.events.emit(Event::UnanchorVetoed {
        device: id,
        tick: ctx.tick,
    });
    AnchorOutcome::Vetoed
}
