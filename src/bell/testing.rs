//! In-process stand-in for a display connection.
//!
//! The client half owns one end of a socket pair; every byte the server half
//! writes "delivers" one queued event, so readiness on the descriptor behaves
//! like a real connection. Events can also be placed straight into the
//! client-side buffer to mimic events read while waiting for a reply.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::rc::Rc;

use super::{BellConnection, BellNotification, ProtocolEvent};
use crate::error::{BellError, Result};

pub(crate) fn bell(percent: u8) -> ProtocolEvent {
    ProtocolEvent::Bell(BellNotification {
        percent,
        pitch: 400,
        duration: 100,
        window: 0,
    })
}

pub(crate) struct FakeConnection {
    stream: UnixStream,
    wire: Rc<RefCell<VecDeque<ProtocolEvent>>>,
    buffered: VecDeque<ProtocolEvent>,
    pub(crate) flushes: usize,
}

pub(crate) struct FakeServer {
    stream: UnixStream,
    wire: Rc<RefCell<VecDeque<ProtocolEvent>>>,
}

pub(crate) fn pair() -> (FakeConnection, FakeServer) {
    let (client, server) = UnixStream::pair().unwrap();
    client.set_nonblocking(true).unwrap();
    let wire = Rc::new(RefCell::new(VecDeque::new()));
    (
        FakeConnection {
            stream: client,
            wire: wire.clone(),
            buffered: VecDeque::new(),
            flushes: 0,
        },
        FakeServer {
            stream: server,
            wire,
        },
    )
}

impl FakeServer {
    /// Queue events and make the client descriptor readable
    pub(crate) fn send(&mut self, events: &[ProtocolEvent]) {
        self.wire.borrow_mut().extend(events.iter().copied());
        self.stream.write_all(&vec![0u8; events.len()]).unwrap();
    }
}

impl FakeConnection {
    /// Place events in the client-side buffer without touching the socket
    pub(crate) fn buffer(&mut self, events: &[ProtocolEvent]) {
        self.buffered.extend(events.iter().copied());
    }

    /// Events still waiting, on the wire or buffered
    pub(crate) fn backlog(&self) -> usize {
        self.buffered.len() + self.wire.borrow().len()
    }

    fn read_wire(&mut self) -> Result<()> {
        let mut buf = [0u8; 64];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Err(BellError::ConnectionLost),
                Ok(n) => {
                    let mut wire = self.wire.borrow_mut();
                    for _ in 0..n {
                        if let Some(event) = wire.pop_front() {
                            self.buffered.push_back(event);
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl AsFd for FakeConnection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl BellConnection for FakeConnection {
    fn poll_event(&mut self) -> Result<Option<ProtocolEvent>> {
        if self.buffered.is_empty() {
            self.read_wire()?;
        }
        Ok(self.buffered.pop_front())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
