//! Live X11 display session.
//!
//! Owns the connection, verifies the XTEST and DAMAGE extensions, and
//! exposes the event/injection surface the probe engine drives. The
//! deadline-bounded receive polls the connection's stream fd with mio; the
//! readiness mechanism stays private to this module.

use std::os::unix::io::AsRawFd;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::Event;
use x11rb::protocol::damage::{self, ConnectionExt as DamageExt, ReportLevel};
use x11rb::protocol::xproto::{
    AtomEnum, BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT, ChangeWindowAttributesAux,
    ConnectionExt as XprotoExt, EventMask, MOTION_NOTIFY_EVENT, PropMode,
};
use x11rb::protocol::xtest::{self, ConnectionExt as XTestExt};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::probe::{DamageNotice, Rect, ServerEvent, ServerHandle};

/// Reserved root-window property rewritten to provoke a clock-stamped
/// change notification.
const TIMESTAMP_PROPERTY: &[u8] = b"_XLATENCY_TIMESTAMP";

pub struct DisplaySession {
    conn: RustConnection,
    root: u32,
    screen_width: u16,
    screen_height: u16,
    timestamp_atom: u32,
    poll: mio::Poll,
    events: mio::Events,
}

impl DisplaySession {
    /// Connect to the X server and negotiate the required extensions.
    ///
    /// Missing XTEST or DAMAGE is fatal: without injection or change
    /// reporting there is nothing to measure.
    pub fn open() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("Failed to connect to X server")?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let screen_width = screen.width_in_pixels;
        let screen_height = screen.height_in_pixels;

        info!(
            "Connected to X server, screen {}, root window {}",
            screen_num, root
        );
        info!("Screen size: {}x{}", screen_width, screen_height);

        if conn
            .extension_information(xtest::X11_EXTENSION_NAME)?
            .is_none()
        {
            bail!("No XTest extension found");
        }
        let xtest_version = conn
            .xtest_get_version(2, 2)?
            .reply()
            .context("Failed to query XTest version")?;
        debug!(
            "XTest extension {}.{} available",
            xtest_version.major_version, xtest_version.minor_version
        );

        if conn
            .extension_information(damage::X11_EXTENSION_NAME)?
            .is_none()
        {
            bail!("No DAMAGE extension found");
        }
        let damage_version = conn
            .damage_query_version(1, 1)?
            .reply()
            .context("Failed to query Damage version")?;
        debug!(
            "Damage extension {}.{} available",
            damage_version.major_version, damage_version.minor_version
        );

        let timestamp_atom = conn
            .intern_atom(false, TIMESTAMP_PROPERTY)?
            .reply()
            .context("Failed to intern timestamp atom")?
            .atom;

        // PropertyNotify on the root carries the server clock after the
        // timestamp property round trip
        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?
        .check()
        .context("Failed to select property changes on the root window")?;

        // One damage object on the root. BOUNDING_BOX merges successive
        // changed regions into a single enclosing rectangle per report.
        let damage = conn.generate_id()?;
        conn.damage_create(damage, root, ReportLevel::BOUNDING_BOX)?
            .check()
            .context("Failed to create damage object")?;

        let poll = mio::Poll::new().context("Failed to create mio Poll")?;
        let fd = conn.stream().as_raw_fd();
        poll.registry()
            .register(
                &mut mio::unix::SourceFd(&fd),
                mio::Token(0),
                mio::Interest::READABLE,
            )
            .context("Failed to register X11 FD with mio")?;

        conn.flush()?;

        Ok(Self {
            conn,
            root,
            screen_width,
            screen_height,
            timestamp_atom,
            poll,
            events: mio::Events::with_capacity(1),
        })
    }

    /// Full-screen rectangle, the default monitored region.
    pub fn screen_rect(&self) -> Rect {
        Rect::new(0, 0, self.screen_width, self.screen_height)
    }

    /// Map a wire event onto the probe's event model. Protocol error events
    /// become `Err`; there is no recovery path for them.
    fn translate(&self, event: Event) -> Result<ServerEvent> {
        Ok(match event {
            Event::DamageNotify(e) => ServerEvent::Damage(DamageNotice {
                area: Rect::new(e.area.x, e.area.y, e.area.width, e.area.height),
                time: e.timestamp,
                damage: e.damage,
            }),
            Event::PropertyNotify(e) if e.atom == self.timestamp_atom => {
                ServerEvent::Timestamp(e.time)
            }
            Event::Error(e) => bail!(
                "X11 error: {:?} (error code {}, opcode {}:{})",
                e.error_kind,
                e.error_code,
                e.major_opcode,
                e.minor_opcode
            ),
            other => ServerEvent::Other(other.response_type()),
        })
    }
}

impl ServerHandle for DisplaySession {
    fn next_event(&mut self, deadline: Option<Instant>) -> Result<Option<ServerEvent>> {
        self.conn.flush()?;
        loop {
            if let Some(event) = self.conn.poll_for_event()? {
                return Ok(Some(self.translate(event)?));
            }

            // Queue is empty: wait for the socket, bounded by what is left
            // of the deadline
            let timeout = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    Some(deadline - now)
                }
                None => None,
            };
            self.poll
                .poll(&mut self.events, timeout)
                .context("Failed to poll X11 socket")?;
        }
    }

    fn poll_event(&mut self) -> Result<Option<ServerEvent>> {
        match self.conn.poll_for_event()? {
            Some(event) => Ok(Some(self.translate(event)?)),
            None => Ok(None),
        }
    }

    fn inject_motion(&mut self, x: i16, y: i16) -> Result<()> {
        // detail 0 = absolute coordinates
        self.conn
            .xtest_fake_input(MOTION_NOTIFY_EVENT, 0, x11rb::CURRENT_TIME, self.root, x, y, 0)?;
        self.conn.flush()?;
        Ok(())
    }

    fn inject_button(&mut self, button: u8, pressed: bool) -> Result<()> {
        let kind = if pressed {
            BUTTON_PRESS_EVENT
        } else {
            BUTTON_RELEASE_EVENT
        };
        self.conn
            .xtest_fake_input(kind, button, x11rb::CURRENT_TIME, self.root, 0, 0, 0)?;
        self.conn.flush()?;
        Ok(())
    }

    fn touch_timestamp(&mut self) -> Result<()> {
        self.conn.change_property8(
            PropMode::REPLACE,
            self.root,
            self.timestamp_atom,
            AtomEnum::STRING,
            b"a",
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn acknowledge(&mut self, damage: u32) -> Result<()> {
        self.conn
            .damage_subtract(damage, x11rb::NONE, x11rb::NONE)?;
        Ok(())
    }
}
