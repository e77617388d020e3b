//! Pure Rust image source built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, TIFF, WebP) | `image` crate decoders, bounded by [`image::Limits`] |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with configured quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//!
//! Scanned newspaper canvases are far larger than the `image` crate's default
//! 512 MiB allocation limit. Instead of disabling the limit, every decode is
//! bounded by the configured `max_pixels` ceiling (see `[limits]` in config).

use super::backend::{BackendError, Dimensions, ImageSource};
use super::params::{Encoding, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ImageFormat, ImageReader, Limits, RgbImage};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::LazyLock;

/// Default decode ceiling: one gigapixel.
pub const DEFAULT_MAX_PIXELS: u64 = 1_000_000_000;

/// Worst-case bytes per decoded pixel (RGBA, 8 bits per channel).
const BYTES_PER_PIXEL: u64 = 4;

const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Image source backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct RustBackend {
    max_pixels: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::with_max_pixels(DEFAULT_MAX_PIXELS)
    }

    pub fn with_max_pixels(max_pixels: u64) -> Self {
        Self { max_pixels }
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.max_pixels.saturating_mul(BYTES_PER_PIXEL));
        limits
    }

    fn reader(&self, path: &Path) -> Result<ImageReader<BufReader<File>>, BackendError> {
        let mut reader = ImageReader::open(path)?.with_guessed_format()?;
        reader.limits(self.limits());
        Ok(reader)
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, err: impl std::fmt::Display) -> BackendError {
    BackendError::Decode {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn encode_error(path: &Path, err: impl std::fmt::Display) -> BackendError {
    BackendError::Encode {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

impl ImageSource for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = self
            .reader(path)?
            .into_dimensions()
            .map_err(|e| decode_error(path, e))?;
        Ok(Dimensions { width, height })
    }

    fn load(&self, path: &Path) -> Result<RgbImage, BackendError> {
        let img = self
            .reader(path)?
            .decode()
            .map_err(|e| decode_error(path, e))?;
        if img.width() == 0 || img.height() == 0 {
            return Err(decode_error(path, "image has no pixels"));
        }
        super::buffer::check_pixel_budget(img.width(), img.height(), self.max_pixels)?;
        Ok(img.into_rgb8())
    }

    fn save(&self, image: &RgbImage, path: &Path, encoding: Encoding) -> Result<(), BackendError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        let result = match encoding.format {
            OutputFormat::Jpeg => image.write_with_encoder(JpegEncoder::new_with_quality(
                writer,
                encoding.quality.value() as u8,
            )),
            OutputFormat::Png => image.write_with_encoder(PngEncoder::new(writer)),
        };
        result.map_err(|e| encode_error(path, e))
    }
}
