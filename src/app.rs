//! Startup and the main event loop
//!
//! Acquires the image, the bell connection and the overlay window, then hands
//! everything to a single calloop loop whose shared data is the presenter:
//!
//! - the overlay connection's descriptor feeds redraws and reconfiguration
//! - the bell source rings the presenter, which schedules its own hide timers

use anyhow::{anyhow, Context, Result};
use calloop::generic::Generic;
use calloop::{EventLoop, Interest, Mode, PostAction};
use log::{debug, info};
use std::os::fd::{AsFd, OwnedFd};

use crate::bell::{BellSource, XkbBellConnection};
use crate::config::OverlayConfig;
use crate::error::BellError;
use crate::overlay::{OverlaySurface, X11Overlay};
use crate::presenter::Presenter;

/// Loop data: the presenter owning the X11 overlay window
pub type OverlayPresenter = Presenter<X11Overlay>;

/// Level-triggered read source on a display connection descriptor
fn display_source(fd: OwnedFd) -> Generic<OwnedFd, BellError> {
    Generic::new_with_error::<BellError>(fd, Interest::READ, Mode::Level)
}

/// Acquire every resource up front; any failure here is fatal
pub fn start(
    config: &OverlayConfig,
) -> Result<(EventLoop<'static, OverlayPresenter>, OverlayPresenter)> {
    let surface = OverlaySurface::load(&config.image)?;

    let bell = XkbBellConnection::open(config.display_name()).context("Failed to init xkb")?;

    let overlay = X11Overlay::new(config.display_name(), surface)
        .context("Failed to create overlay window")?;

    let event_loop: EventLoop<'static, OverlayPresenter> =
        EventLoop::try_new().context("create calloop")?;
    let handle = event_loop.handle();

    let overlay_fd = overlay
        .as_fd()
        .try_clone_to_owned()
        .context("duplicate overlay connection descriptor")?;
    handle
        .insert_source(
            display_source(overlay_fd),
            |readiness, _, presenter: &mut OverlayPresenter| {
                if readiness.error {
                    return Err(BellError::ConnectionLost);
                }
                presenter.window_mut().process_pending()?;
                Ok(PostAction::Continue)
            },
        )
        .map_err(|e| anyhow!("register overlay source: {}", e.error))?;

    let ring_handle = handle.clone();
    handle
        .insert_source(
            BellSource::new(bell)?,
            move |ring, _, presenter: &mut OverlayPresenter| {
                debug!(
                    "🔔 {} bell(s), last at {}% for window 0x{:x}",
                    ring.bells, ring.last.percent, ring.last.window
                );
                presenter.ring(&ring_handle);
            },
        )
        .map_err(|e| anyhow!("register bell source: {}", e.error))?;

    let mut presenter = Presenter::new(overlay, config.hide_delay);
    // Events read while waiting for setup replies never wake the loop
    presenter.window_mut().process_pending()?;

    Ok((event_loop, presenter))
}

/// Run until the display connection fails. Never returns `Ok`.
pub fn run(config: &OverlayConfig) -> Result<()> {
    let (mut event_loop, mut presenter) = start(config)?;

    info!(
        "✨ Waiting for bells (hide delay {}ms)",
        presenter.hide_delay().as_millis()
    );
    loop {
        event_loop
            .dispatch(None, &mut presenter)
            .context("display connection failed")?;
    }
}
