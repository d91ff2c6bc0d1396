//! # anniebelle
//!
//! Shows an image in the middle of the screen whenever the X11 bell rings,
//! then hides it again once the bells stop.
//!
//! ## Architecture
//!
//! - `bell`: XKB bell notifications adapted into a calloop event source
//! - `presenter`: debounced show/hide bookkeeping driven by hide timers
//! - `overlay`: the decoded image and the click-through X11 window showing it
//! - `config`: command-line and environment resolution
//! - `app`: startup and the main event loop
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::time::Duration;
//! use anniebelle::OverlayConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = OverlayConfig::from_env(PathBuf::from("bell.png"), Duration::from_millis(200))?;
//!     anniebelle::app::run(&config)
//! }
//! ```

pub mod app;
pub mod bell;
pub mod config;
pub mod error;
pub mod overlay;
pub mod presenter;

// Re-export main types for easy access
pub use bell::{BellConnection, BellSource, Ring, XkbBellConnection};
pub use config::OverlayConfig;
pub use error::BellError;
pub use overlay::{OverlaySurface, X11Overlay};
pub use presenter::{OverlayWindow, PresentationCounters, Presenter, Visibility};

/// Version information for anniebelle
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
