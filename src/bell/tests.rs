//! Unit tests for the bell source
//!
//! Drives [`BellSource`] with an in-process connection, both directly and
//! through a real calloop loop.

use super::testing::{bell, pair};
use super::*;
use crate::presenter::{OverlayWindow, Presenter, Visibility};
use calloop::EventLoop;
use std::time::{Duration, Instant};

const WAIT: Option<Duration> = Some(Duration::from_millis(50));

#[test]
fn test_check_drains_whole_backlog_and_aggregates() {
    let (conn, mut server) = pair();
    let mut source = BellSource::new(conn).unwrap();

    server.send(&[
        bell(10),
        ProtocolEvent::Other,
        bell(20),
        ProtocolEvent::Other,
        bell(30),
    ]);

    let ring = source.check().unwrap().expect("bells were queued");
    assert_eq!(ring.bells, 3);
    assert_eq!(ring.last.percent, 30);
    assert_eq!(source.connection().backlog(), 0);

    assert_eq!(source.check().unwrap(), None);
}

#[test]
fn test_check_without_data_is_a_no_op() {
    let (conn, _server) = pair();
    let mut source = BellSource::new(conn).unwrap();
    assert_eq!(source.check().unwrap(), None);
}

#[test]
fn test_unrelated_events_are_discarded() {
    let (conn, mut server) = pair();
    let mut source = BellSource::new(conn).unwrap();

    server.send(&[ProtocolEvent::Other, ProtocolEvent::Other]);
    assert_eq!(source.check().unwrap(), None);
    assert_eq!(source.connection().backlog(), 0);
}

#[test]
fn test_check_reports_hang_up() {
    let (conn, server) = pair();
    let mut source = BellSource::new(conn).unwrap();
    drop(server);
    assert!(matches!(source.check(), Err(BellError::ConnectionLost)));
}

fn loop_with_source(
    source: BellSource<super::testing::FakeConnection>,
) -> EventLoop<'static, Vec<Ring>> {
    let event_loop: EventLoop<'static, Vec<Ring>> = EventLoop::try_new().unwrap();
    event_loop
        .handle()
        .insert_source(source, |ring, _, rings: &mut Vec<Ring>| rings.push(ring))
        .unwrap();
    event_loop
}

#[test]
fn test_loop_dispatches_once_per_readiness_cycle() {
    let (conn, mut server) = pair();
    let mut event_loop = loop_with_source(BellSource::new(conn).unwrap());
    let mut rings = Vec::new();

    event_loop.dispatch(Some(Duration::ZERO), &mut rings).unwrap();
    assert!(rings.is_empty());

    server.send(&[
        bell(1),
        ProtocolEvent::Other,
        bell(2),
        bell(3),
        ProtocolEvent::Other,
    ]);
    event_loop.dispatch(WAIT, &mut rings).unwrap();
    assert_eq!(rings.len(), 1);
    assert_eq!(rings[0].bells, 3);
    assert_eq!(rings[0].last.percent, 3);

    event_loop.dispatch(WAIT, &mut rings).unwrap();
    assert_eq!(rings.len(), 1);
}

#[test]
fn test_loop_ignores_cycles_without_bells() {
    let (conn, mut server) = pair();
    let mut event_loop = loop_with_source(BellSource::new(conn).unwrap());
    let mut rings = Vec::new();

    server.send(&[ProtocolEvent::Other; 4]);
    event_loop.dispatch(WAIT, &mut rings).unwrap();
    event_loop.dispatch(WAIT, &mut rings).unwrap();
    assert!(rings.is_empty());
}

#[test]
fn test_buffered_events_wake_the_loop() {
    let (mut conn, _server) = pair();
    conn.buffer(&[bell(5), ProtocolEvent::Other]);
    let mut event_loop = loop_with_source(BellSource::new(conn).unwrap());
    let mut rings = Vec::new();

    let start = Instant::now();
    event_loop
        .dispatch(Some(Duration::from_secs(2)), &mut rings)
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(1), "loop slept on buffered bell");
    assert_eq!(rings.len(), 1);
    assert_eq!(rings[0].bells, 1);
}

#[test]
fn test_hang_up_ends_the_loop() {
    let (conn, server) = pair();
    let mut event_loop = loop_with_source(BellSource::new(conn).unwrap());
    let mut rings = Vec::new();

    drop(server);
    assert!(event_loop.dispatch(WAIT, &mut rings).is_err());
    assert!(rings.is_empty());
}

#[derive(Default)]
struct Counting {
    shows: usize,
    hides: usize,
}

impl OverlayWindow for Counting {
    fn show(&mut self) {
        self.shows += 1;
    }

    fn hide(&mut self) {
        self.hides += 1;
    }
}

#[test]
fn test_ring_drives_presenter_through_one_visible_period() {
    let (conn, mut server) = pair();
    let mut event_loop: EventLoop<'static, Presenter<Counting>> = EventLoop::try_new().unwrap();
    let handle = event_loop.handle();
    let ring_handle = handle.clone();
    handle
        .insert_source(BellSource::new(conn).unwrap(), move |_ring, _, presenter| {
            presenter.ring(&ring_handle)
        })
        .unwrap();

    let mut presenter = Presenter::new(Counting::default(), Duration::from_millis(300));

    server.send(&[bell(1), bell(2)]);
    event_loop.dispatch(WAIT, &mut presenter).unwrap();
    assert_eq!(presenter.visibility(), Visibility::Visible);
    assert_eq!(presenter.counters().times_shown(), 1);

    server.send(&[bell(3)]);
    event_loop.dispatch(WAIT, &mut presenter).unwrap();
    assert_eq!(presenter.counters().times_shown(), 2);

    let deadline = Instant::now() + Duration::from_secs(5);
    while presenter.visibility() == Visibility::Visible {
        assert!(Instant::now() < deadline, "overlay never hid");
        event_loop.dispatch(WAIT, &mut presenter).unwrap();
    }
    assert_eq!(presenter.window().shows, 1);
    assert_eq!(presenter.window().hides, 1);
}

#[test]
fn test_prepare_flushes_and_collects_buffered_bells() {
    let (mut conn, _server) = pair();
    conn.buffer(&[bell(7), ProtocolEvent::Other]);
    let mut source = BellSource::new(conn).unwrap();

    // Not registered yet, so there is no token to wake; the ring stays pending
    assert!(source.before_sleep().unwrap().is_none());
    assert_eq!(source.connection().flushes, 1);
    assert_eq!(source.connection().backlog(), 0);
    assert_eq!(source.pending.map(|ring| ring.bells), Some(1));
}
