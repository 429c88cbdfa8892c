//! Synthetic pointer injection and server clock synchronization.

use anyhow::Result;
use tracing::trace;

use super::{ServerEvent, ServerHandle};

/// The pointer button the probe drives (left button).
pub const POINTER_BUTTON: u8 = 1;

/// Whether an injected move carries a button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    None,
    Press,
    Release,
}

/// Obtain the server's current clock value via a property round trip.
///
/// Rewriting the reserved property forces the server to emit a change
/// notification stamped with its clock; this blocks until that notification
/// arrives. Unrelated events received in the interim are discarded, with
/// damage among them still acknowledged so reporting in that area is not
/// wedged for later waits.
pub fn sync_time<S: ServerHandle>(server: &mut S) -> Result<u32> {
    server.touch_timestamp()?;
    loop {
        match server.next_event(None)? {
            Some(ServerEvent::Timestamp(time)) => return Ok(time),
            Some(ServerEvent::Damage(notice)) => server.acknowledge(notice.damage)?,
            Some(ServerEvent::Other(kind)) => {
                trace!("discarding event type {kind} during time sync");
            }
            None => continue,
        }
    }
}

/// Drain already-queued notifications, acknowledging any damage among them.
pub fn drain_queued<S: ServerHandle>(server: &mut S) -> Result<()> {
    while let Some(event) = server.poll_event()? {
        if let ServerEvent::Damage(notice) = event {
            server.acknowledge(notice.damage)?;
        }
    }
    Ok(())
}

/// Fake a full click at (x, y), returning the synchronized start time.
///
/// Damage caused purely by the pointer motion is drained before the clock is
/// read; only the press/release pair is under measurement.
pub fn click<S: ServerHandle>(server: &mut S, x: i16, y: i16) -> Result<u32> {
    server.inject_motion(x, y)?;
    drain_queued(server)?;

    let start = sync_time(server)?;

    server.inject_button(POINTER_BUTTON, true)?;
    server.inject_button(POINTER_BUTTON, false)?;

    Ok(start)
}

/// Fake one step of a drag, returning the synchronized start time.
///
/// The clock is read before the motion here, unlike [`click`]: a drag
/// response is attributed to the motion itself, not to the state left
/// behind after it.
pub fn drag_step<S: ServerHandle>(
    server: &mut S,
    x: i16,
    y: i16,
    state: ButtonState,
) -> Result<u32> {
    let start = sync_time(server)?;

    server.inject_motion(x, y)?;

    match state {
        ButtonState::Press => {
            // First-motion damage is noise, shed it before the button goes down
            drain_queued(server)?;
            server.inject_button(POINTER_BUTTON, true)?;
        }
        ButtonState::Release => {
            server.inject_button(POINTER_BUTTON, false)?;
        }
        ButtonState::None => {}
    }

    Ok(start)
}
