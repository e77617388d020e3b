//! Single-pyramid mode: merge every canvas into one image, tile it once.
//!
//! The alternative to [`make_collection`](crate::collection::make_collection)
//! for viewers that want one continuous image. Canvases are stacked top to
//! bottom, left-aligned on white, into a composite of
//! `max canvas width × sum of canvas heights`, which is then handed to
//! [`tile_image`] as a whole.
//!
//! The composite is fully resident while tiling, so memory grows with the
//! total scanned area. Two ceilings guard it: the composite's `max_height`
//! and the global `max_pixels` allocation limit. Exceeding either is an error
//! raised before any pixels are allocated.

use crate::imaging::{BackendError, ImageSource, PixelBuffer};
use crate::naming;
use crate::pyramid::{PyramidError, PyramidInfo, TileSettings, check_name, tile_image};
use crate::types::{StageEvent, emit};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::debug;

/// Default name of the single pyramid (`{out}/composite.dzi`).
pub const DEFAULT_COMPOSITE_NAME: &str = "composite";

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Imaging(#[from] BackendError),
    #[error("Tiling failed: {0}")]
    Pyramid(#[from] PyramidError),
    #[error("Canvases directory not found: {0}")]
    MissingInput(PathBuf),
    #[error("No canvas images found in {0}")]
    NoCanvases(PathBuf),
    #[error("Composite would be {height}px tall, above the {max_height}px limit")]
    TooTall { height: u64, max_height: u32 },
}

#[derive(Debug, Clone, Copy)]
pub struct CompositeSettings {
    pub tile: TileSettings,
    pub max_height: u32,
    pub max_pixels: u64,
}

#[derive(Debug)]
pub struct CompositeReport {
    /// Canvas file names in stacking order.
    pub canvases: Vec<String>,
    pub pyramid: PyramidInfo,
}

/// Stack every canvas in `canvases_dir` and tile the result as `name`.
pub fn make_single_pyramid(
    source: &impl ImageSource,
    canvases_dir: &Path,
    out_dir: &Path,
    settings: &CompositeSettings,
    name: &str,
    progress: Option<Sender<StageEvent>>,
) -> Result<CompositeReport, CompositeError> {
    check_name(name)?;
    if !canvases_dir.is_dir() {
        return Err(CompositeError::MissingInput(canvases_dir.to_path_buf()));
    }
    let canvases = naming::list_images(canvases_dir)?;
    if canvases.is_empty() {
        return Err(CompositeError::NoCanvases(canvases_dir.to_path_buf()));
    }

    let dims = canvases
        .iter()
        .map(|path| source.identify(path))
        .collect::<Result<Vec<_>, _>>()?;
    let width = dims.iter().map(|d| d.width).max().unwrap_or(0);
    let height: u64 = dims.iter().map(|d| d.height as u64).sum();
    if height > settings.max_height as u64 {
        return Err(CompositeError::TooTall {
            height,
            max_height: settings.max_height,
        });
    }
    let height = height as u32;

    let mut composite = PixelBuffer::white(width, height, settings.max_pixels)?;
    let mut y = 0;
    for path in &canvases {
        let canvas = source.load(path)?;
        composite.blit(&canvas, 0, y)?;
        y += canvas.height();
    }
    debug!(canvases = canvases.len(), width, height, "composite assembled");
    emit(
        &progress,
        StageEvent::CompositeAssembled {
            canvases: canvases.len(),
            width,
            height,
        },
    );

    std::fs::create_dir_all(out_dir)?;
    let pyramid = tile_image(source, composite.as_image(), out_dir, name, &settings.tile)?;
    emit(
        &progress,
        StageEvent::PyramidWritten {
            index: 1,
            name: pyramid.name.clone(),
            width: pyramid.width,
            height: pyramid.height,
            levels: pyramid.levels,
            tiles: pyramid.tile_count,
        },
    );

    Ok(CompositeReport {
        canvases: canvases.iter().map(|p| naming::file_name(p)).collect(),
        pyramid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockSource;
    use crate::imaging::{Encoding, RustBackend};
    use crate::test_helpers::{create_test_png, list_tree};
    use tempfile::TempDir;

    fn settings(max_height: u32) -> CompositeSettings {
        CompositeSettings {
            tile: TileSettings {
                tile_size: 64,
                overlap: 1,
                encoding: Encoding::png(),
            },
            max_height,
            max_pixels: 100_000_000,
        }
    }

    fn canvases_with(dir: &Path, sizes: &[(u32, u32)]) {
        std::fs::create_dir_all(dir).unwrap();
        for (i, &(w, h)) in sizes.iter().enumerate() {
            create_test_png(&dir.join(format!("page_{i:04}.png")), w, h, (i * 60) as u8);
        }
    }

    #[test]
    fn composite_stacks_canvases_and_tiles_once() {
        let tmp = TempDir::new().unwrap();
        let canvases = tmp.path().join("canvases");
        let out = tmp.path().join("out");
        canvases_with(&canvases, &[(100, 70), (80, 30)]);

        let (tx, rx) = std::sync::mpsc::channel();
        let report = make_single_pyramid(
            &RustBackend::new(),
            &canvases,
            &out,
            &settings(50_000),
            DEFAULT_COMPOSITE_NAME,
            Some(tx),
        )
        .unwrap();
        let events: Vec<StageEvent> = rx.iter().collect();

        assert_eq!(report.canvases, ["page_0000.png", "page_0001.png"]);
        assert_eq!((report.pyramid.width, report.pyramid.height), (100, 100));
        assert_eq!(report.pyramid.levels, 8);
        assert_eq!(
            events[0],
            StageEvent::CompositeAssembled {
                canvases: 2,
                width: 100,
                height: 100
            }
        );
        assert!(matches!(events[1], StageEvent::PyramidWritten { index: 1, .. }));

        let tree = list_tree(&out);
        assert!(tree.contains(&"composite.dzi".to_string()));
        assert!(tree.iter().all(|p| p == "composite.dzi" || p.starts_with("composite/")));

        // top level 100x100 at tile 64: 2x2
        let bottom_left = image::open(out.join("composite/7/0_1.png")).unwrap().to_rgb8();
        assert_eq!(bottom_left.dimensions(), (64, 36));
        // second canvas (gray 60) starts at y=70, i.e. row 6 of this tile
        assert_eq!(bottom_left.get_pixel(0, 5).0, [0, 0, 0]);
        assert_eq!(bottom_left.get_pixel(0, 6).0, [60, 60, 60]);
        // right of the narrower canvas is white
        let bottom_right = image::open(out.join("composite/7/1_1.png")).unwrap().to_rgb8();
        assert_eq!(bottom_right.get_pixel(30, 20).0, [255, 255, 255]);
    }

    #[test]
    fn composite_taller_than_limit_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let canvases = tmp.path().join("c");
        std::fs::create_dir_all(&canvases).unwrap();
        for name in ["page_0000.png", "page_0001.png"] {
            std::fs::write(canvases.join(name), b"").unwrap();
        }
        let source = MockSource::new()
            .with_image(canvases.join("page_0000.png"), 10, 600)
            .with_image(canvases.join("page_0001.png"), 10, 500);

        let result = make_single_pyramid(
            &source,
            &canvases,
            &tmp.path().join("out"),
            &settings(1000),
            DEFAULT_COMPOSITE_NAME,
            None,
        );
        assert!(matches!(
            result,
            Err(CompositeError::TooTall {
                height: 1100,
                max_height: 1000
            })
        ));
        assert!(source.saves().is_empty());
    }

    #[test]
    fn composite_over_pixel_budget_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let canvases = tmp.path().join("c");
        std::fs::create_dir_all(&canvases).unwrap();
        std::fs::write(canvases.join("page_0000.png"), b"").unwrap();
        let source = MockSource::new().with_image(canvases.join("page_0000.png"), 100, 100);

        let mut small = settings(50_000);
        small.max_pixels = 5_000;
        let result = make_single_pyramid(
            &source,
            &canvases,
            &tmp.path().join("out"),
            &small,
            DEFAULT_COMPOSITE_NAME,
            None,
        );
        assert!(matches!(
            result,
            Err(CompositeError::Imaging(BackendError::TooLarge { .. }))
        ));
    }

    #[test]
    fn name_outside_out_dir_is_rejected_before_loading() {
        let tmp = TempDir::new().unwrap();
        let canvases = tmp.path().join("c");
        std::fs::create_dir_all(&canvases).unwrap();
        std::fs::write(canvases.join("page_0000.png"), b"").unwrap();
        let source = MockSource::new().with_image(canvases.join("page_0000.png"), 10, 10);
        let out = tmp.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("keep.txt"), b"keep").unwrap();

        for name in ["", ".", "nested/composite"] {
            let result =
                make_single_pyramid(&source, &canvases, &out, &settings(50_000), name, None);
            assert!(matches!(
                result,
                Err(CompositeError::Pyramid(PyramidError::InvalidName(_)))
            ));
        }
        assert!(source.get_operations().is_empty());
        assert!(out.join("keep.txt").exists());
    }

    #[test]
    fn empty_canvases_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = make_single_pyramid(
            &RustBackend::new(),
            tmp.path(),
            &tmp.path().join("out"),
            &settings(50_000),
            DEFAULT_COMPOSITE_NAME,
            None,
        );
        assert!(matches!(result, Err(CompositeError::NoCanvases(_))));
    }
}
