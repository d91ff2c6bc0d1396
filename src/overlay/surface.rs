//! The image shown by the overlay
//!
//! Files are decoded with the `image` crate (PNG, JPEG, GIF, BMP, ICO, TIFF,
//! WebP, PNM, TGA; the format is sniffed from the content) and stored as a
//! premultiplied tiny-skia pixmap.

use image::io::Reader as ImageReader;
use image::RgbaImage;
use log::info;
use std::path::Path;
use tiny_skia::{ColorU8, Pixmap};

use crate::error::{BellError, Result};

/// Decoded overlay image, premultiplied RGBA, immutable after loading
#[derive(Debug, Clone)]
pub struct OverlaySurface {
    pixmap: Pixmap,
}

impl OverlaySurface {
    /// Decode an image file.
    ///
    /// Rejects empty images and images an X11 window could not hold.
    pub fn load(path: &Path) -> Result<Self> {
        let load_error = |message: String| BellError::ImageLoad {
            path: path.to_path_buf(),
            message,
        };

        let rgba = decode(path).map_err(load_error)?;
        let surface = Self::from_rgba(&rgba).map_err(|e| match e {
            BellError::EmptyImage => load_error(e.to_string()),
            other => other,
        })?;
        info!(
            "🖼️ Loaded {} ({}x{})",
            path.display(),
            surface.width(),
            surface.height()
        );
        Ok(surface)
    }

    /// Premultiply a straight-alpha RGBA8 buffer into a surface
    pub fn from_rgba(rgba: &RgbaImage) -> Result<Self> {
        let (width, height) = rgba.dimensions();
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(BellError::ImageTooLarge { width, height });
        }

        let mut pixmap = Pixmap::new(width, height).ok_or(BellError::EmptyImage)?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Self::from_pixmap(pixmap)
    }

    pub fn from_pixmap(pixmap: Pixmap) -> Result<Self> {
        let (width, height) = (pixmap.width(), pixmap.height());
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(BellError::ImageTooLarge { width, height });
        }
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Size as X11 window dimensions
    pub fn size(&self) -> (u16, u16) {
        // Bounded by from_pixmap
        (self.width() as u16, self.height() as u16)
    }

    /// Pixels as 32-bit little-endian ARGB words (bytes B, G, R, A), the
    /// layout of a ZPixmap on a TrueColor visual.
    pub fn to_bgra(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixmap.data().len());
        for px in self.pixmap.data().chunks_exact(4) {
            out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
        out
    }
}

fn decode(path: &Path) -> std::result::Result<RgbaImage, String> {
    let image = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| e.to_string())?
        .decode()
        .map_err(|e| e.to_string())?;
    Ok(image.to_rgba8())
}
