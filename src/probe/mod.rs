//! Probe engine: correlates injected input with screen-change notifications.
//!
//! A probe issues one synthetic input sequence (click, or one drag step),
//! stamps it with a server-synchronized start time, then collects the
//! damage notifications the screen produces in response, filtered against
//! the monitored rectangle.

pub mod inject;
pub mod region;
pub mod wait;

use std::io::Write;
use std::time::Instant;

use anyhow::Result;
use thiserror::Error;
use tracing::debug;

pub use inject::ButtonState;
pub use region::Rect;

use crate::logger::LatencyLogger;

/// A damage notification translated out of the wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageNotice {
    /// The changed region, already merged into a bounding box by the server.
    pub area: Rect,
    /// Server clock value carried by the notification.
    pub time: u32,
    /// Opaque handle acknowledged back to the server after consumption.
    pub damage: u32,
}

/// One event out of the server's asynchronous stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    /// A screen region changed.
    Damage(DamageNotice),
    /// Change notification for the reserved timestamp property, carrying
    /// the server clock.
    Timestamp(u32),
    /// Anything else; carries the raw response type for diagnostics.
    Other(u8),
}

/// Connection surface the probe engine drives.
///
/// Implemented by the live X11 session; tests substitute a scripted double.
/// Protocol-level errors surface as `Err` from any of these calls; the
/// orchestrating layer decides to terminate, nothing is retried here.
pub trait ServerHandle {
    /// Block until an event arrives or the deadline passes. Already-queued
    /// events are returned immediately without waiting. A `None` deadline
    /// blocks indefinitely and never yields `Ok(None)`.
    fn next_event(&mut self, deadline: Option<Instant>) -> Result<Option<ServerEvent>>;

    /// Non-blocking receive of an already-queued event.
    fn poll_event(&mut self) -> Result<Option<ServerEvent>>;

    /// Move the pointer to absolute screen coordinates.
    fn inject_motion(&mut self, x: i16, y: i16) -> Result<()>;

    /// Press or release a pointer button.
    fn inject_button(&mut self, button: u8, pressed: bool) -> Result<()>;

    /// Rewrite the reserved timestamp property so the server emits a
    /// clock-stamped change notification.
    fn touch_timestamp(&mut self) -> Result<()>;

    /// Tell the server a damage region was seen so future damage in the
    /// same area is reported again.
    fn acknowledge(&mut self, damage: u32) -> Result<()>;
}

/// Configuration errors surfaced before any injection happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("a drag needs at least 2 points, got {0}")]
    TooFewDragPoints(usize),
}

/// Probe session state: the connection handle, monitored rectangle, wait
/// timeout and the measurement log. Single-threaded; one probe sequence
/// runs to completion before the next starts.
pub struct Probe<S: ServerHandle, W: Write> {
    server: S,
    logger: LatencyLogger<W>,
    monitor: Rect,
    wait_secs: u64,
}

impl<S: ServerHandle, W: Write> Probe<S, W> {
    pub fn new(server: S, logger: LatencyLogger<W>, monitor: Rect, wait_secs: u64) -> Self {
        Self {
            server,
            logger,
            monitor,
            wait_secs,
        }
    }

    /// Replace the monitored rectangle; applies to subsequent probes.
    pub fn set_monitor_rect(&mut self, rect: Rect) {
        debug!(
            "Monitoring {}x{}+{}+{} for damage",
            rect.width, rect.height, rect.x, rect.y
        );
        self.monitor = rect;
    }

    /// Replace the wait timeout; 0 waits forever. Applies to subsequent
    /// probes.
    pub fn set_wait_timeout(&mut self, secs: u64) {
        self.wait_secs = secs;
    }

    /// Click at (x, y) and collect the damage response.
    pub fn run_click(&mut self, x: i16, y: i16) -> Result<()> {
        let start = inject::click(&mut self.server, x, y)?;
        self.logger.log(start, &format!("Clicked {x}x{y}"))?;
        self.logger.set_baseline(start);
        self.wait_for_updates()?;
        Ok(())
    }

    /// Drag the pointer along `points`, collecting damage after every step.
    ///
    /// The first point goes in with the button pressed, interior points move
    /// with the button held, the last point releases it: exactly one press
    /// and one release per sequence, whatever the point count. Fewer than
    /// two points is a configuration error reported before anything is
    /// injected.
    pub fn run_drag(&mut self, points: &[(i16, i16)]) -> Result<()> {
        if points.len() < 2 {
            return Err(ProbeError::TooFewDragPoints(points.len()).into());
        }

        let last = points.len() - 1;
        for (i, &(x, y)) in points.iter().enumerate() {
            let state = if i == 0 {
                ButtonState::Press
            } else if i == last {
                ButtonState::Release
            } else {
                ButtonState::None
            };

            let start = inject::drag_step(&mut self.server, x, y, state)?;
            self.logger.log(start, &format!("Dragged to {x}x{y}"))?;
            self.logger.set_baseline(start);
            self.wait_for_updates()?;
        }

        Ok(())
    }

    /// Just collect and display damage events, no injection.
    pub fn run_inspect(&mut self) -> Result<usize> {
        self.wait_for_updates()
    }

    /// Write a free-form marker row to the measurement log.
    pub fn emit_stamp(&mut self, text: &str) -> Result<()> {
        self.logger.log_stamp(text)
    }
}
