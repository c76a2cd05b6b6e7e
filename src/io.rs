// ============================================================================
// IMAGE I/O — decode on load, lossless encode on save, native file dialogs
// ============================================================================

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::bmp::BmpEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageError, RgbaImage};
use rfd::FileDialog;

use crate::EditError;
use crate::pipeline::check_canvas_limit;

/// Output formats offered on save. Only lossless encoders: exports must be
/// byte-faithful to the rendered result at native resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Bmp,
}

impl SaveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Bmp => "bmp",
        }
    }

    /// Parse a `--format` string or file extension. Unknown values fall
    /// back to PNG, matching the CLI default.
    pub fn parse(s: &str) -> SaveFormat {
        match s.to_lowercase().as_str() {
            "bmp" => SaveFormat::Bmp,
            _ => SaveFormat::Png,
        }
    }
}

/// Decode any supported image into an RGBA8 buffer.
///
/// The canvas limit is checked against the header dimensions *before* the
/// full decode, so an oversized file is rejected without first allocating
/// its pixel buffer.
pub fn load_image_sync(path: &Path) -> Result<RgbaImage, EditError> {
    let (width, height) = image::image_dimensions(path).map_err(decode_error)?;
    check_canvas_limit(width, height)?;

    let img = image::open(path).map_err(decode_error)?;
    Ok(img.into_rgba8())
}

/// Encode and write an image to a file. Standalone function (no `&mut
/// self`) so it can run off the UI thread if a caller wants to.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
) -> Result<(), EditError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(encode_error)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder
                .encode(
                    image.as_raw(),
                    image.width(),
                    image.height(),
                    image::ColorType::Rgba8,
                )
                .map_err(encode_error)?;
        }
    }
    Ok(())
}

/// Output filename for a save: derived from the current timestamp so
/// repeated saves never collide, e.g. `channelfe_1724800000.png`.
pub fn timestamp_filename(format: SaveFormat) -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("channelfe_{}.{}", secs, format.extension())
}

fn decode_error(e: ImageError) -> EditError {
    match e {
        ImageError::IoError(io) => EditError::Io(io),
        other => EditError::UnsupportedFormat(other.to_string()),
    }
}

fn encode_error(e: ImageError) -> EditError {
    match e {
        ImageError::IoError(io) => EditError::Io(io),
        other => EditError::Io(std::io::Error::other(other.to_string())),
    }
}

// ============================================================================
// FILE DIALOGS (GUI only — the CLI takes paths from arguments)
// ============================================================================

/// Thin wrapper around `rfd` that remembers the last-used directory for
/// the session.
#[derive(Default)]
pub struct FileHandler {
    last_dir: Option<PathBuf>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the Open dialog. Returns the picked path, or `None` on cancel.
    pub fn pick_open(&mut self) -> Option<PathBuf> {
        let mut dialog =
            FileDialog::new().add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp", "tga"]);
        if let Some(dir) = &self.last_dir {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.pick_file()?;
        self.remember_dir(&path);
        Some(path)
    }

    /// Show the Save dialog with a timestamp-derived default filename.
    pub fn pick_save(&mut self, format: SaveFormat) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .add_filter("PNG image", &["png"])
            .add_filter("BMP image", &["bmp"])
            .set_file_name(&timestamp_filename(format));
        if let Some(dir) = &self.last_dir {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.save_file()?;
        self.remember_dir(&path);
        Some(path)
    }

    fn remember_dir(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            self.last_dir = Some(parent.to_path_buf());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn timestamp_filename_carries_prefix_and_extension() {
        let name = timestamp_filename(SaveFormat::Png);
        assert!(name.starts_with("channelfe_"));
        assert!(name.ends_with(".png"));
        assert!(timestamp_filename(SaveFormat::Bmp).ends_with(".bmp"));
    }

    #[test]
    fn save_format_parse_defaults_to_png() {
        assert_eq!(SaveFormat::parse("bmp"), SaveFormat::Bmp);
        assert_eq!(SaveFormat::parse("BMP"), SaveFormat::Bmp);
        assert_eq!(SaveFormat::parse("png"), SaveFormat::Png);
        assert_eq!(SaveFormat::parse("tiff"), SaveFormat::Png);
    }

    #[test]
    fn png_round_trip_preserves_pixels() {
        let img =
            RgbaImage::from_fn(8, 6, |x, y| Rgba([(x * 30) as u8, (y * 40) as u8, 200, 255]));
        let path = std::env::temp_dir().join(format!(
            "channelfe_test_{}_{}.png",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));

        encode_and_write(&img, &path, SaveFormat::Png).unwrap();
        let loaded = load_image_sync(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.dimensions(), (8, 6));
        assert_eq!(loaded.as_raw(), img.as_raw());
    }

    #[test]
    fn load_rejects_non_image_bytes() {
        let path = std::env::temp_dir().join(format!(
            "channelfe_test_{}_not_an_image.png",
            std::process::id()
        ));
        std::fs::write(&path, b"definitely not a png").unwrap();
        let result = load_image_sync(&path);
        let _ = std::fs::remove_file(&path);

        match result {
            Err(EditError::UnsupportedFormat(_)) => {}
            other => panic!("expected UnsupportedFormat, got {:?}", other.map(|_| ())),
        }
    }
}
