//! Bell event source for calloop
//!
//! The display connection is a foreign channel: the event loop only knows its
//! file descriptor. [`BellSource`] teaches the loop how to use it:
//!
//! - **prepare** (`before_sleep`): flush outgoing requests and pick up events
//!   the client library already buffered in user space, which would never make
//!   the descriptor readable again. A bell found there wakes the loop at once.
//! - **check**: drain the whole backlog, FIFO, classifying every event. The
//!   descriptor only stops being readable once everything is consumed.
//! - **dispatch**: hand one aggregated [`Ring`] to the callback per cycle,
//!   however many bells were queued. The source never removes itself.
//!
//! A hang-up or read failure on the descriptor means the display went away.
//! That is returned as an error from the source, which ends the loop.

use calloop::generic::Generic;
use calloop::{
    EventSource, Interest, Mode, Poll, PostAction, Readiness, Token, TokenFactory,
};
use log::{error, trace};
use std::os::fd::{AsFd, OwnedFd};

use crate::error::{BellError, Result};

pub mod xkb;

pub use xkb::XkbBellConnection;

/// Details carried by a bell notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BellNotification {
    /// Volume, as a percentage of the base volume
    pub percent: u8,
    /// Pitch in Hz
    pub pitch: u16,
    /// Duration in milliseconds
    pub duration: u16,
    /// Window the bell was rung for, 0 if none
    pub window: u32,
}

/// One event read from the display connection, already classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolEvent {
    Bell(BellNotification),
    Other,
}

/// A display connection that can feed bell notifications into the loop
pub trait BellConnection: AsFd {
    /// Pop the next event without blocking, `None` once the backlog is empty
    fn poll_event(&mut self) -> Result<Option<ProtocolEvent>>;

    /// Push any queued requests to the server
    fn flush(&mut self) -> Result<()>;
}

/// Bells seen during one readiness cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ring {
    /// Number of bell notifications coalesced into this ring
    pub bells: usize,
    /// Most recent notification
    pub last: BellNotification,
}

impl Ring {
    fn single(bell: BellNotification) -> Self {
        Self { bells: 1, last: bell }
    }

    fn merge(earlier: Option<Ring>, later: Ring) -> Ring {
        match earlier {
            Some(earlier) => Ring {
                bells: earlier.bells + later.bells,
                last: later.last,
            },
            None => later,
        }
    }
}

/// Drain every event the connection can hand out right now
fn drain<C: BellConnection>(connection: &mut C) -> Result<Option<Ring>> {
    let mut ring: Option<Ring> = None;
    let mut discarded = 0usize;

    while let Some(event) = connection.poll_event()? {
        match event {
            ProtocolEvent::Bell(bell) => ring = Some(Ring::merge(ring, Ring::single(bell))),
            ProtocolEvent::Other => discarded += 1,
        }
    }

    if discarded > 0 {
        trace!("discarded {} unrelated events", discarded);
    }
    Ok(ring)
}

/// calloop source turning a [`BellConnection`] into [`Ring`] events
pub struct BellSource<C: BellConnection> {
    connection: C,
    fd: Generic<OwnedFd, BellError>,
    wake_token: Option<Token>,
    pending: Option<Ring>,
}

impl<C: BellConnection> BellSource<C> {
    /// Wrap a connection. The descriptor is duplicated so the loop can own
    /// its registration independently of the connection.
    pub fn new(connection: C) -> Result<Self> {
        let fd = connection.as_fd().try_clone_to_owned()?;
        Ok(Self {
            connection,
            fd: Generic::new_with_error(fd, Interest::READ, Mode::Level),
            wake_token: None,
            pending: None,
        })
    }

    /// Drain the backlog and report the bells found, if any.
    ///
    /// A wakeup with nothing to read returns `Ok(None)`.
    pub fn check(&mut self) -> Result<Option<Ring>> {
        drain(&mut self.connection)
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }
}

impl<C: BellConnection> EventSource for BellSource<C> {
    type Event = Ring;
    type Metadata = ();
    type Ret = ();
    type Error = BellError;

    const NEEDS_EXTRA_LIFECYCLE_EVENTS: bool = true;

    fn process_events<F>(
        &mut self,
        readiness: Readiness,
        token: Token,
        mut callback: F,
    ) -> Result<PostAction>
    where
        F: FnMut(Self::Event, &mut Self::Metadata) -> Self::Ret,
    {
        let connection = &mut self.connection;
        let pending = &mut self.pending;
        self.fd.process_events(readiness, token, |readiness, _| {
            if readiness.error {
                error!("❌ display connection reported an error condition");
                return Err(BellError::ConnectionLost);
            }
            if let Some(ring) = drain(connection)? {
                *pending = Some(Ring::merge(pending.take(), ring));
            }
            Ok(PostAction::Continue)
        })?;

        if let Some(ring) = self.pending.take() {
            callback(ring, &mut ());
        }
        Ok(PostAction::Continue)
    }

    fn register(&mut self, poll: &mut Poll, token_factory: &mut TokenFactory) -> calloop::Result<()> {
        self.wake_token = Some(token_factory.token());
        self.fd.register(poll, token_factory)
    }

    fn reregister(
        &mut self,
        poll: &mut Poll,
        token_factory: &mut TokenFactory,
    ) -> calloop::Result<()> {
        self.wake_token = Some(token_factory.token());
        self.fd.reregister(poll, token_factory)
    }

    fn unregister(&mut self, poll: &mut Poll) -> calloop::Result<()> {
        self.wake_token = None;
        self.fd.unregister(poll)
    }

    fn before_sleep(&mut self) -> calloop::Result<Option<(Readiness, Token)>> {
        self.connection
            .flush()
            .map_err(|e| calloop::Error::OtherError(Box::new(e)))?;

        if let Some(ring) =
            drain(&mut self.connection).map_err(|e| calloop::Error::OtherError(Box::new(e)))?
        {
            self.pending = Some(Ring::merge(self.pending.take(), ring));
        }

        Ok(match (self.pending, self.wake_token) {
            (Some(_), Some(token)) => Some((Readiness::EMPTY, token)),
            _ => None,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
