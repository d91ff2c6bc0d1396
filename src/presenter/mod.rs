//! Debounced presentation of the overlay
//!
//! Bells can arrive in bursts. Every trigger shows the overlay (if it is not
//! already up) and schedules its own one-shot hide timer. Timers are never
//! cancelled: instead a pair of counters records how many shows and hide
//! votes have happened, and only the vote that balances the pair actually
//! hides the overlay. A burst therefore produces a single visible period that
//! ends one hide delay after the last bell.
//!
//! ```text
//! trigger ──► times_shown += 1 ──► Timer(hide_delay) ──► times_hidden += 1
//!                                                          │
//!                               shown == hidden ? hide : keep showing
//! ```

use calloop::timer::{TimeoutAction, Timer};
use calloop::LoopHandle;
use log::{debug, error, trace, warn};
use std::time::Duration;

use crate::config::DEFAULT_HIDE_DELAY_MS;

/// Default time the overlay lingers after the last trigger
pub const DEFAULT_HIDE_DELAY: Duration = Duration::from_millis(DEFAULT_HIDE_DELAY_MS);

/// Something that can be made visible and hidden again.
///
/// Implementations must not fail loudly: the presenter treats show and hide
/// as pure side effects and keeps its own bookkeeping regardless.
pub trait OverlayWindow {
    fn show(&mut self);
    fn hide(&mut self);
}

/// Visibility derived from the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

/// Show/hide bookkeeping. `times_shown >= times_hidden` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentationCounters {
    times_shown: u64,
    times_hidden: u64,
}

impl PresentationCounters {
    pub fn times_shown(&self) -> u64 {
        self.times_shown
    }

    pub fn times_hidden(&self) -> u64 {
        self.times_hidden
    }

    /// Hide votes still expected before the overlay goes away
    pub fn outstanding(&self) -> u64 {
        self.times_shown - self.times_hidden
    }

    pub fn visibility(&self) -> Visibility {
        if self.times_shown > self.times_hidden {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }
}

/// Owns the overlay window and decides when it is shown or hidden
pub struct Presenter<W> {
    window: W,
    counters: PresentationCounters,
    hide_delay: Duration,
}

impl<W: OverlayWindow> Presenter<W> {
    /// Create a presenter in the hidden state
    pub fn new(window: W, hide_delay: Duration) -> Self {
        Self {
            window,
            counters: PresentationCounters::default(),
            hide_delay,
        }
    }

    /// Record a trigger, showing the overlay if it was hidden.
    ///
    /// The caller is responsible for arranging a matching
    /// [`hide_timer_fired`](Self::hide_timer_fired) call later on.
    pub fn trigger(&mut self) {
        if self.counters.visibility() == Visibility::Hidden {
            debug!("🔔 showing overlay");
            self.window.show();
        }
        self.counters.times_shown += 1;
        trace!(
            "trigger: shown={} hidden={}",
            self.counters.times_shown,
            self.counters.times_hidden
        );
    }

    /// Cast one hide vote. Hides the overlay when it balances the counters.
    pub fn hide_timer_fired(&mut self) {
        if self.counters.visibility() == Visibility::Hidden {
            warn!("hide vote with no outstanding show, ignoring");
            return;
        }
        self.counters.times_hidden += 1;
        if self.counters.visibility() == Visibility::Hidden {
            debug!("🌙 hiding overlay");
            self.window.hide();
        } else {
            trace!(
                "hide vote deferred, {} still outstanding",
                self.counters.outstanding()
            );
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.counters.visibility()
    }

    pub fn counters(&self) -> PresentationCounters {
        self.counters
    }

    pub fn hide_delay(&self) -> Duration {
        self.hide_delay
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }
}

impl<W: OverlayWindow + 'static> Presenter<W> {
    /// Trigger and schedule the matching hide timer on the loop that owns
    /// this presenter.
    pub fn ring(&mut self, handle: &LoopHandle<'_, Self>) {
        self.trigger();

        let timer = Timer::from_duration(self.hide_delay);
        let inserted = handle.insert_source(timer, |_deadline, _, presenter: &mut Self| {
            presenter.hide_timer_fired();
            TimeoutAction::Drop
        });

        if let Err(e) = inserted {
            // Vote right away so the overlay cannot get stuck on screen
            error!("❌ Failed to schedule overlay hide: {}", e.error);
            self.hide_timer_fired();
        }
    }
}
