//! ChannelFE — RGB channel-shift glitch editor.
//!
//! The core pipeline splits a loaded image into its three color-channel
//! planes, lets the caller shift each plane toroidally and swap the content
//! of two planes, and additively recomposites the planes into a preview.
//! Everything on top (the egui app, the headless CLI) is plumbing around
//! [`pipeline::EditPipeline`].

#![allow(dead_code)] // API surface kept for the GUI and CLI front-ends
#![allow(clippy::too_many_arguments)]

pub mod app;
pub mod cli;
pub mod io;
pub mod logger;
pub mod ops;
pub mod pipeline;

/// Maximum canvas area in pixels. Platforms with hardware-backed canvases
/// (and our own preview textures) fail to allocate past roughly this point,
/// so larger images are rejected at load with a distinct error instead of
/// failing silently later.
pub const MAX_CANVAS_PIXELS: u64 = 256_000_000;

/// Error type for image loading, channel extraction, and saving.
#[derive(Debug)]
pub enum EditError {
    /// Zero-size raster, or a pixel buffer that does not match width×height×4.
    InvalidDimensions {
        width: u32,
        height: u32,
        buffer_len: usize,
    },
    /// The file could not be decoded as an image.
    UnsupportedFormat(String),
    /// The image exceeds [`MAX_CANVAS_PIXELS`].
    CanvasLimit { pixels: u64, max: u64 },
    /// I/O failure while reading or writing an image file.
    Io(std::io::Error),
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::InvalidDimensions {
                width,
                height,
                buffer_len,
            } => write!(
                f,
                "invalid image dimensions: {}×{} ({} bytes in buffer)",
                width, height, buffer_len
            ),
            EditError::UnsupportedFormat(e) => write!(f, "unsupported image format: {}", e),
            EditError::CanvasLimit { pixels, max } => write!(
                f,
                "image has {} pixels, exceeding the {} pixel canvas limit",
                pixels, max
            ),
            EditError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for EditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EditError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EditError {
    fn from(e: std::io::Error) -> Self {
        EditError::Io(e)
    }
}
