//! Error types shared by the bell source, the overlay window and startup code.

use std::path::PathBuf;

use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ParseError, ReplyError, ReplyOrIdError};

/// Everything that can go wrong while watching the bell or presenting the overlay
#[derive(Debug, Error)]
pub enum BellError {
    /// The display-target variable is unset or empty
    #[error("{0} is not set; cannot tell which X display to watch")]
    MissingDisplay(&'static str),

    /// The caller asked for a windowing backend we do not implement
    #[error("unsupported windowing backend {value:?} in {var} (only \"x11\" is available)")]
    UnsupportedBackend { var: &'static str, value: String },

    #[error("failed to connect to the X server: {0}")]
    Connect(#[from] ConnectError),

    #[error("X connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("X request failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),

    #[error("malformed X data: {0}")]
    Parse(#[from] ParseError),

    /// A required X extension is missing on the server
    #[error("X server lacks the {0} extension")]
    MissingExtension(&'static str),

    /// The server does not speak a usable XKB version
    #[error("server only supports XKB {major}.{minor}")]
    XkbUnsupported { major: u16, minor: u16 },

    /// The image loader rejected the file
    #[error("Failed to load image {}: {message}", path.display())]
    ImageLoad { path: PathBuf, message: String },

    /// Decoded image with a zero dimension
    #[error("image has no pixels")]
    EmptyImage,

    /// X11 windows are limited to 16-bit dimensions
    #[error("image is {width}x{height}, larger than an X11 window can be")]
    ImageTooLarge { width: u32, height: u32 },

    /// The display connection hung up or reported an error condition
    #[error("display connection lost")]
    ConnectionLost,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = BellError> = std::result::Result<T, E>;
