//! Collection building: one pyramid per canvas plus a `.dzc` index.
//!
//! Stage 3 of the default pipeline. Every image in the canvases directory is
//! tiled with [`tile_file`] in lexicographic order, then a
//! [`CollectionManifest`] referencing every per-image manifest is written
//! next to them.
//!
//! Item ids are contiguous from 0 in input order. `MaxLevel` is derived from
//! the dimensions each tiling pass already returned; nothing is re-tiled or
//! re-measured to compute it.

use crate::imaging::calculations::collection_max_level;
use crate::imaging::ImageSource;
use crate::manifest::{COLLECTION_MANIFEST_EXTENSION, CollectionItem, CollectionManifest};
use crate::naming;
use crate::pyramid::{PyramidError, PyramidInfo, TileSettings, check_name, tile_file};
use crate::types::{StageEvent, emit};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Default collection manifest name, without extension.
pub const DEFAULT_COLLECTION_NAME: &str = "collection";

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Tiling failed: {0}")]
    Pyramid(#[from] PyramidError),
    #[error("Canvases directory not found: {0}")]
    MissingInput(PathBuf),
    #[error("No canvas images found in {0}")]
    NoCanvases(PathBuf),
}

#[derive(Debug)]
pub struct CollectionReport {
    pub pyramids: Vec<PyramidInfo>,
    pub manifest: CollectionManifest,
    pub manifest_path: PathBuf,
}

/// Assemble the collection index from tiled images, in order.
pub fn build_collection(pyramids: &[PyramidInfo], settings: &TileSettings) -> CollectionManifest {
    let items = pyramids
        .iter()
        .enumerate()
        .map(|(id, info)| CollectionItem {
            id,
            name: info.name.clone(),
            source: info.manifest_file_name(),
            width: info.width,
            height: info.height,
        })
        .collect();

    CollectionManifest {
        max_level: collection_max_level(pyramids.iter().map(|p| (p.width, p.height))),
        tile_size: settings.tile_size,
        format: settings.encoding.format,
        items,
    }
}

/// Tile every image in `canvases_dir` into `out_dir` and write
/// `{out_dir}/{name}.dzc`.
pub fn make_collection(
    source: &impl ImageSource,
    canvases_dir: &Path,
    out_dir: &Path,
    settings: &TileSettings,
    name: &str,
    progress: Option<Sender<StageEvent>>,
) -> Result<CollectionReport, CollectionError> {
    check_name(name)?;
    if !canvases_dir.is_dir() {
        return Err(CollectionError::MissingInput(canvases_dir.to_path_buf()));
    }
    let canvases = naming::list_images(canvases_dir)?;
    if canvases.is_empty() {
        return Err(CollectionError::NoCanvases(canvases_dir.to_path_buf()));
    }

    std::fs::create_dir_all(out_dir)?;
    let mut pyramids = Vec::with_capacity(canvases.len());
    for (index, path) in canvases.iter().enumerate() {
        let info = tile_file(source, path, out_dir, settings)?;
        emit(
            &progress,
            StageEvent::PyramidWritten {
                index: index + 1,
                name: info.name.clone(),
                width: info.width,
                height: info.height,
                levels: info.levels,
                tiles: info.tile_count,
            },
        );
        pyramids.push(info);
    }

    let manifest = build_collection(&pyramids, settings);
    let manifest_path = out_dir.join(format!("{name}.{COLLECTION_MANIFEST_EXTENSION}"));
    std::fs::write(&manifest_path, manifest.to_xml())?;

    Ok(CollectionReport {
        pyramids,
        manifest,
        manifest_path,
    })
}
