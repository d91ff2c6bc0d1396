//! XKB-backed bell connection
//!
//! Opens a dedicated X connection that only ever receives XKB `BellNotify`
//! events for the core keyboard. Window drawing happens on a separate
//! connection, so everything else arriving here can be discarded.

use log::{debug, info, trace, warn};
use std::os::fd::{AsFd, BorrowedFd};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xkb::{self, ConnectionExt as _};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::{BellConnection, BellNotification, ProtocolEvent};
use crate::error::{BellError, Result};

/// XKB protocol version we ask the server for
const XKB_MAJOR: u16 = 1;
const XKB_MINOR: u16 = 0;

/// X connection subscribed to bell notifications
pub struct XkbBellConnection {
    conn: RustConnection,
}

impl XkbBellConnection {
    /// Connect to `display` (or `$DISPLAY` when `None`) and subscribe to
    /// bell notifications on the core keyboard.
    pub fn open(display: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display)?;
        debug!("bell connection open on screen {}", screen_num);

        if conn
            .extension_information(xkb::X11_EXTENSION_NAME)?
            .is_none()
        {
            return Err(BellError::MissingExtension(xkb::X11_EXTENSION_NAME));
        }

        let version = conn.xkb_use_extension(XKB_MAJOR, XKB_MINOR)?.reply()?;
        if !version.supported {
            return Err(BellError::XkbUnsupported {
                major: version.server_major,
                minor: version.server_minor,
            });
        }

        conn.xkb_select_events(
            xkb::ID::USE_CORE_KBD.into(),
            xkb::EventType::from(0u16),
            xkb::EventType::BELL_NOTIFY,
            xkb::MapPart::from(0u16),
            xkb::MapPart::from(0u16),
            &xkb::SelectEventsAux::new(),
        )?
        .check()?;
        conn.flush()?;

        info!(
            "🔔 Listening for XKB bell notifications (server XKB {}.{})",
            version.server_major, version.server_minor
        );
        Ok(Self { conn })
    }
}

impl AsFd for XkbBellConnection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.conn.stream().as_fd()
    }
}

impl BellConnection for XkbBellConnection {
    fn poll_event(&mut self) -> Result<Option<ProtocolEvent>> {
        let event = match self.conn.poll_for_event()? {
            Some(event) => event,
            None => return Ok(None),
        };

        Ok(Some(match event {
            Event::XkbBellNotify(bell) => {
                let notification = BellNotification {
                    percent: bell.percent,
                    pitch: bell.pitch,
                    duration: bell.duration,
                    window: bell.window,
                };
                debug!(
                    "bell: {}% {}Hz {}ms window=0x{:x}",
                    notification.percent,
                    notification.pitch,
                    notification.duration,
                    notification.window
                );
                ProtocolEvent::Bell(notification)
            }
            Event::Error(e) => {
                warn!("X error on bell connection: {:?}", e);
                ProtocolEvent::Other
            }
            other => {
                trace!("ignoring {:?}", other);
                ProtocolEvent::Other
            }
        }))
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}
