//! Pipeline configuration.
//!
//! Handles loading, validating, and merging `pagezoom.toml`. Stock defaults
//! are serialized to a TOML table and the user file is deep-merged on top, so
//! a config file only needs the keys it changes. Command-line flags are
//! applied after that and the result is validated once more.
//!
//! ## Config File Location
//!
//! `pagezoom.toml` in the working directory, or any file passed with
//! `--config`. A missing default file means stock defaults; a missing
//! explicit file is an error.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [strips]
//! format = "png"            # Strip files (jpg | png)
//!
//! [canvas]
//! max_height = 20000        # Canvas height ceiling in pixels
//! format = "png"            # Canvas files (jpg | png)
//!
//! [pyramid]
//! tile_size = 256           # Tile edge in pixels
//! overlap = 1               # Recorded in manifests; tiles are not overlapped
//! format = "jpg"            # Tile files (jpg | png)
//! quality = 90              # JPEG quality (1-100) for every lossy write
//!
//! [composite]
//! max_height = 50000        # Height ceiling of the single-pyramid composite
//!
//! [limits]
//! max_pixels = 1000000000   # Largest bitmap decoded or allocated
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::rust_backend::DEFAULT_MAX_PIXELS;
use crate::imaging::{Encoding, OutputFormat, Quality};
use crate::pyramid::TileSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "pagezoom.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `pagezoom.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PagezoomConfig {
    /// Strip assembly output.
    pub strips: StripsConfig,
    /// Canvas packing limits and output.
    pub canvas: CanvasConfig,
    /// Tile pyramid geometry and encoding.
    pub pyramid: PyramidConfig,
    /// Single-pyramid mode limits.
    pub composite: CompositeConfig,
    /// Decode and allocation ceilings.
    pub limits: LimitsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PagezoomConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pyramid.tile_size == 0 {
            return Err(ConfigError::Validation(
                "pyramid.tile_size must be greater than 0".into(),
            ));
        }
        if !(1..=100).contains(&self.pyramid.quality) {
            return Err(ConfigError::Validation(
                "pyramid.quality must be 1-100".into(),
            ));
        }
        if self.canvas.max_height == 0 {
            return Err(ConfigError::Validation(
                "canvas.max_height must be greater than 0".into(),
            ));
        }
        if self.composite.max_height == 0 {
            return Err(ConfigError::Validation(
                "composite.max_height must be greater than 0".into(),
            ));
        }
        if self.limits.max_pixels == 0 {
            return Err(ConfigError::Validation(
                "limits.max_pixels must be greater than 0".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    fn quality(&self) -> Quality {
        Quality::new(self.pyramid.quality)
    }

    pub fn strip_encoding(&self) -> Encoding {
        Encoding::new(self.strips.format, self.quality())
    }

    pub fn canvas_encoding(&self) -> Encoding {
        Encoding::new(self.canvas.format, self.quality())
    }

    pub fn tile_settings(&self) -> TileSettings {
        TileSettings {
            tile_size: self.pyramid.tile_size,
            overlap: self.pyramid.overlap,
            encoding: Encoding::new(self.pyramid.format, self.quality()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StripsConfig {
    pub format: OutputFormat,
}

impl Default for StripsConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// A canvas is closed before a strip would push it past this height.
    pub max_height: u32,
    pub format: OutputFormat,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            max_height: 20_000,
            format: OutputFormat::Png,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PyramidConfig {
    pub tile_size: u32,
    /// Written to the manifest only.
    pub overlap: u32,
    pub format: OutputFormat,
    /// JPEG quality used for tiles, and for strips or canvases stored as JPEG.
    pub quality: u32,
}

impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            tile_size: 256,
            overlap: 1,
            format: OutputFormat::Jpeg,
            quality: Quality::default().value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositeConfig {
    pub max_height: u32,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self { max_height: 50_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest image (width × height) that may be decoded or allocated.
    pub max_pixels: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel tile encoding workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Stock defaults as a `toml::Value::Table`, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PagezoomConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value, or `None` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PagezoomConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PagezoomConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the pipeline config.
///
/// With `explicit`, that file must exist. Without it, [`CONFIG_FILE_NAME`] is
/// read from `dir` when present and stock defaults are used otherwise.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<PagezoomConfig, ConfigError> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => dir.join(CONFIG_FILE_NAME),
    };
    let overlay = load_raw_config(&path)?;
    if overlay.is_some() {
        debug!(path = %path.display(), "loaded config file");
    }
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `pagezoom.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pagezoom configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# pagezoom reads ./pagezoom.toml, or the file given with --config.
# Command-line flags override values from this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Strip assembly (make-strips)
# ---------------------------------------------------------------------------
[strips]
# File format of the per-issue strips: "png" (lossless) or "jpg".
format = "png"

# ---------------------------------------------------------------------------
# Canvas packing (combine)
# ---------------------------------------------------------------------------
[canvas]
# Strips are stacked until the next one would exceed this height.
# A single strip taller than this still gets its own (oversize) canvas.
max_height = 20000

# File format of the canvases: "png" (lossless) or "jpg".
format = "png"

# ---------------------------------------------------------------------------
# Tile pyramids (make-collection, make-single-pyramid)
# ---------------------------------------------------------------------------
[pyramid]
# Edge length of square tiles in pixels. Edge tiles are clipped, not padded.
tile_size = 256

# Overlap written to each .dzi manifest. Tiles are cut without overlap.
overlap = 1

# Tile format: "jpg" or "png".
format = "jpg"

# JPEG quality (1 = worst, 100 = best). Also used for JPEG strips and canvases.
quality = 90

# ---------------------------------------------------------------------------
# Single-pyramid mode (make-single-pyramid)
# ---------------------------------------------------------------------------
[composite]
# The stacked composite may not be taller than this.
max_height = 50000

# ---------------------------------------------------------------------------
# Safety limits
# ---------------------------------------------------------------------------
[limits]
# Largest bitmap (width x height) that may be decoded or allocated.
# Decoding holds about 4 bytes per pixel.
max_pixels = 1000000000

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of parallel tile encoding workers.
# Omit or comment out to use all CPU cores.
# Values above the core count are clamped down.
# max_processes = 4
"##
}
