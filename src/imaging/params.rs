//! Parameter types for image encoding.
//!
//! These describe *how* a bitmap should be written, independent of where the
//! pixels came from. Stages build an [`Encoding`] once from configuration and
//! pass it to [`ImageSource::save`](super::ImageSource::save) for every file.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`]: Raster format of written strips, canvases and tiles.
//! - [`Encoding`]: Format plus quality, the full description of a write.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Raster format for every file the pipeline writes.
///
/// The manifest `Format` attribute and tile file extensions both use
/// [`OutputFormat::extension`], so `"jpeg"` in config is normalized to `jpg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Parse a user-supplied format name (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
            .ok_or_else(|| format!("unsupported format \"{s}\" (expected jpg, jpeg or png)"))
    }
}

// Config files spell formats as extensions: `format = "jpg"`.
impl Serialize for OutputFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.extension())
    }
}

impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Format and quality for a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding {
    pub format: OutputFormat,
    /// Ignored for lossless formats.
    pub quality: Quality,
}

impl Encoding {
    pub fn new(format: OutputFormat, quality: Quality) -> Self {
        Self { format, quality }
    }

    pub fn png() -> Self {
        Self::new(OutputFormat::Png, Quality::default())
    }
}
