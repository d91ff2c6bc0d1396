//! Runtime configuration for anniebelle
//!
//! Everything the process needs to know comes from its arguments and two
//! environment variables. There are no configuration files.
//!
//! - `DISPLAY` names the X display to watch and must be present before any
//!   windowing code runs.
//! - `ANNIEBELLE_BACKEND` selects the windowing backend. When the caller leaves
//!   it unset or empty the process pins it to `x11`, the backend that supports
//!   input-transparent borderless popups. Nothing reads the variable back:
//!   the overlay only ever speaks X11. It exists to validate the caller's
//!   choice and to pin it for anything inspecting the environment.

use log::{debug, info};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{BellError, Result};

/// Variable naming the X display to connect to
pub const DISPLAY_VAR: &str = "DISPLAY";

/// Variable selecting the windowing backend
pub const BACKEND_VAR: &str = "ANNIEBELLE_BACKEND";

/// Hide delay used when none is given on the command line
pub const DEFAULT_HIDE_DELAY_MS: u64 = 200;

/// Windowing backends the overlay can be presented with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    X11,
}

impl Backend {
    /// Value written to the backend variable when the caller did not pick one
    pub const DEFAULT: Backend = Backend::X11;

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::X11 => "x11",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "x11" => Some(Backend::X11),
            _ => None,
        }
    }
}

/// Resolved configuration for one run of the overlay
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Image flashed when the bell rings
    pub image: PathBuf,

    /// How long the overlay stays up after the last bell
    pub hide_delay: Duration,

    /// X display name taken from the environment
    pub display: String,

    /// Windowing backend in effect
    pub backend: Backend,

    /// Whether the backend variable was filled in by us rather than the caller
    pub backend_defaulted: bool,
}

impl OverlayConfig {
    /// Build the configuration from the process environment.
    ///
    /// When the backend variable is unset or empty it is set to the default
    /// backend in the process environment so that anything started from here
    /// sees the same choice.
    pub fn from_env(image: PathBuf, hide_delay: Duration) -> Result<Self> {
        let config = Self::from_lookup(image, hide_delay, |key| std::env::var(key).ok())?;
        if config.backend_defaulted {
            std::env::set_var(BACKEND_VAR, config.backend.as_str());
            info!("🔧 {} not set, defaulting to {}", BACKEND_VAR, config.backend.as_str());
        }
        Ok(config)
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Checks the display variable first; nothing else is looked at when it is
    /// missing.
    pub fn from_lookup<F>(image: PathBuf, hide_delay: Duration, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let display = lookup(DISPLAY_VAR)
            .filter(|value| !value.is_empty())
            .ok_or(BellError::MissingDisplay(DISPLAY_VAR))?;

        let (backend, backend_defaulted) = match lookup(BACKEND_VAR) {
            Some(value) if !value.is_empty() => {
                let backend = Backend::parse(&value).ok_or_else(|| BellError::UnsupportedBackend {
                    var: BACKEND_VAR,
                    value: value.clone(),
                })?;
                (backend, false)
            }
            _ => (Backend::DEFAULT, true),
        };

        debug!(
            "display={} backend={} (defaulted: {})",
            display,
            backend.as_str(),
            backend_defaulted
        );

        Ok(Self {
            image,
            hide_delay,
            display,
            backend,
            backend_defaulted,
        })
    }

    /// Display name in the form `x11rb::connect` expects
    pub fn display_name(&self) -> Option<&str> {
        Some(self.display.as_str())
    }
}
