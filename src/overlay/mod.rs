//! Overlay surface and its on-screen window
//!
//! - `surface`: the decoded image, loaded once at startup
//! - `x11`: the click-through, always-on-top X11 window presenting it

pub mod surface;
pub mod x11;

pub use surface::OverlaySurface;
pub use x11::{centered_origin, choose_visual, find_argb_visual, VisualChoice, X11Overlay};
