//! Canvas packing: stack strips vertically into fixed-height pages.
//!
//! Stage 2 of the pyramid pipeline. Strips are read in lexicographic order
//! and placed top to bottom at native resolution. A canvas is closed as soon
//! as the next strip would push it past `max_height`, and the strip starts a
//! fresh canvas instead. Strips are never split or resampled.
//!
//! ```text
//! strips: 400, 450, 500 (max_height = 1000)
//!
//! page_0000.png          page_0001.png
//! ┌──────────────┐ 0     ┌──────────────┐ 0
//! │ strip 1      │       │ strip 3      │
//! ├──────────────┤ 400   │              │
//! │ strip 2      │       └──────────────┘ 500
//! └──────────────┘ 850
//! ```
//!
//! ## Canvas geometry
//!
//! - **Width**: the widest strip in the whole set (one identify pre-pass),
//!   so every canvas of a run has the same width. Narrower strips are
//!   left-aligned on white.
//! - **Height**: the filled height, not `max_height`. The last canvas is
//!   usually shorter.
//! - **Oversize**: a strip taller than `max_height` still goes whole into its
//!   own canvas, which then exceeds the limit. This is reported, not "fixed".
//!
//! Canvases left in `out_dir` by an earlier run (any `page_*` image) are
//! deleted before writing, so the directory holds exactly this run's pages.
//!
//! The layout is computed by the pure [`plan_canvases`] before any pixels are
//! touched, so packing is deterministic for a given set of strip heights.

use crate::imaging::{BackendError, Encoding, ImageSource, PixelBuffer};
use crate::naming;
use crate::types::{StageEvent, emit};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Imaging(#[from] BackendError),
    #[error("Strips directory not found: {0}")]
    MissingInput(PathBuf),
    #[error("No strip images found in {0}")]
    NoStrips(PathBuf),
}

/// One strip's position on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index into the input strip sequence.
    pub strip: usize,
    pub y: u32,
    pub height: u32,
}

/// Layout of a single canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasPlan {
    pub placements: Vec<Placement>,
    /// Filled height: the bottom edge of the last placement.
    pub height: u32,
}

impl CanvasPlan {
    pub fn exceeds(&self, max_height: u32) -> bool {
        self.height > max_height
    }
}

/// Assign strips (by height, in order) to canvases of at most `max_height`.
///
/// A canvas is closed only when it already holds something and the next
/// strip would overflow it, so a lone oversize strip gets its own canvas.
pub fn plan_canvases(heights: &[u32], max_height: u32) -> Vec<CanvasPlan> {
    let mut canvases = Vec::new();
    let mut current = CanvasPlan {
        placements: Vec::new(),
        height: 0,
    };

    for (strip, &height) in heights.iter().enumerate() {
        let y = current.height;
        if y > 0 && y as u64 + height as u64 > max_height as u64 {
            canvases.push(std::mem::replace(
                &mut current,
                CanvasPlan {
                    placements: Vec::new(),
                    height: 0,
                },
            ));
        }
        current.placements.push(Placement {
            strip,
            y: current.height,
            height,
        });
        current.height += height;
    }

    if current.height > 0 {
        canvases.push(current);
    }
    canvases
}

/// Settings for canvas packing.
#[derive(Debug, Clone, Copy)]
pub struct CombineSettings {
    pub max_height: u32,
    pub encoding: Encoding,
    pub max_pixels: u64,
}

/// Summary of one written canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasSummary {
    pub name: String,
    pub path: PathBuf,
    /// File names of the strips on this canvas, top to bottom.
    pub strips: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub oversize: bool,
}

#[derive(Debug, Default)]
pub struct CombineReport {
    pub canvases: Vec<CanvasSummary>,
    pub strip_count: usize,
}

/// Pack every strip in `strips_dir` into canvases written to `out_dir`.
pub fn combine(
    source: &impl ImageSource,
    strips_dir: &Path,
    out_dir: &Path,
    settings: &CombineSettings,
    progress: Option<Sender<StageEvent>>,
) -> Result<CombineReport, CombineError> {
    if !strips_dir.is_dir() {
        return Err(CombineError::MissingInput(strips_dir.to_path_buf()));
    }
    let strips = naming::list_images(strips_dir)?;
    if strips.is_empty() {
        return Err(CombineError::NoStrips(strips_dir.to_path_buf()));
    }

    let dims = strips
        .iter()
        .map(|path| source.identify(path))
        .collect::<Result<Vec<_>, _>>()?;
    let width = dims.iter().map(|d| d.width).max().unwrap_or(0);
    let heights: Vec<u32> = dims.iter().map(|d| d.height).collect();
    let plans = plan_canvases(&heights, settings.max_height);
    debug!(strips = strips.len(), canvases = plans.len(), width, "planned canvases");

    std::fs::create_dir_all(out_dir)?;
    let stale = naming::remove_images(out_dir, naming::is_canvas_stem)?;
    if stale > 0 {
        debug!(removed = stale, "removed canvases from previous run");
    }
    let mut report = CombineReport {
        canvases: Vec::with_capacity(plans.len()),
        strip_count: strips.len(),
    };

    for (index, plan) in plans.iter().enumerate() {
        let mut buffer = PixelBuffer::white(width, plan.height, settings.max_pixels)?;
        for placement in &plan.placements {
            let strip = source.load(&strips[placement.strip])?;
            buffer.blit(&strip, 0, placement.y)?;
        }

        let name = naming::canvas_file_name(index, plans.len(), settings.encoding.format);
        let path = out_dir.join(&name);
        source.save(buffer.as_image(), &path, settings.encoding)?;
        drop(buffer);

        let oversize = plan.exceeds(settings.max_height);
        if oversize {
            warn!(
                canvas = %name,
                height = plan.height,
                max_height = settings.max_height,
                "single strip exceeds max height; canvas is oversize"
            );
        }

        let summary = CanvasSummary {
            name: naming::stem(&path),
            path,
            strips: plan
                .placements
                .iter()
                .map(|p| naming::file_name(&strips[p.strip]))
                .collect(),
            width,
            height: plan.height,
            oversize,
        };
        emit(
            &progress,
            StageEvent::CanvasWritten {
                index: index + 1,
                name: summary.name.clone(),
                strips: summary.strips.len(),
                width,
                height: plan.height,
                oversize,
            },
        );
        report.canvases.push(summary);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::tests::MockSource;
    use crate::test_helpers::write_strips;
    use image::Rgb;
    use tempfile::TempDir;

    fn strip_indices(plan: &CanvasPlan) -> Vec<usize> {
        plan.placements.iter().map(|p| p.strip).collect()
    }

    // =========================================================================
    // plan_canvases (pure)
    // =========================================================================

    #[test]
    fn overflow_starts_new_canvas() {
        let plans = plan_canvases(&[400, 450, 500], 1000);

        assert_eq!(plans.len(), 2);
        assert_eq!(strip_indices(&plans[0]), [0, 1]);
        assert_eq!(plans[0].height, 850);
        assert_eq!(strip_indices(&plans[1]), [2]);
        assert_eq!(plans[1].height, 500);
        assert_eq!(plans[1].placements[0].y, 0);
    }

    #[test]
    fn exact_fit_stays_on_canvas() {
        let plans = plan_canvases(&[500, 500, 1], 1000);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].height, 1000);
        assert_eq!(strip_indices(&plans[1]), [2]);
    }

    #[test]
    fn placements_stack_at_increasing_offsets() {
        let plans = plan_canvases(&[100, 200, 300], 10_000);
        assert_eq!(plans.len(), 1);
        let offsets: Vec<u32> = plans[0].placements.iter().map(|p| p.y).collect();
        assert_eq!(offsets, [0, 100, 300]);
        assert_eq!(plans[0].height, 600);
    }

    #[test]
    fn oversize_strip_gets_own_canvas_exceeding_max() {
        let plans = plan_canvases(&[300, 1500, 200], 1000);

        assert_eq!(plans.len(), 3);
        assert_eq!(strip_indices(&plans[1]), [1]);
        assert_eq!(plans[1].height, 1500);
        assert!(plans[1].exceeds(1000));
        assert!(!plans[0].exceeds(1000));
        assert!(!plans[2].exceeds(1000));
    }

    #[test]
    fn oversize_first_strip_is_not_preceded_by_empty_canvas() {
        let plans = plan_canvases(&[5000], 1000);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].height, 5000);
    }

    #[test]
    fn content_preserved_in_order() {
        let heights = [120, 980, 45, 600, 600, 1, 999, 1000, 3000, 7];
        let plans = plan_canvases(&heights, 1000);

        let placed: Vec<usize> = plans.iter().flat_map(strip_indices).collect();
        assert_eq!(placed, (0..heights.len()).collect::<Vec<_>>());

        let placed_height: u32 = plans.iter().map(|p| p.height).sum();
        assert_eq!(placed_height, heights.iter().sum::<u32>());

        for plan in &plans {
            let sum: u32 = plan.placements.iter().map(|p| p.height).sum();
            assert_eq!(sum, plan.height);
            assert!(plan.height <= 1000 || plan.placements.len() == 1);
        }
    }

    #[test]
    fn planning_is_idempotent() {
        let heights = [400, 450, 500, 20, 990, 10];
        assert_eq!(plan_canvases(&heights, 1000), plan_canvases(&heights, 1000));
    }

    #[test]
    fn no_strips_no_canvases() {
        assert!(plan_canvases(&[], 1000).is_empty());
    }

    // =========================================================================
    // combine
    // =========================================================================

    fn settings(max_height: u32) -> CombineSettings {
        CombineSettings {
            max_height,
            encoding: Encoding::png(),
            max_pixels: 100_000_000,
        }
    }

    #[test]
    fn combine_writes_expected_canvases() {
        let tmp = TempDir::new().unwrap();
        let strips = tmp.path().join("strips");
        let out = tmp.path().join("canvases");
        write_strips(&strips, 30, &[40, 45, 50]);

        let report = combine(&RustBackend::new(), &strips, &out, &settings(100), None).unwrap();

        assert_eq!(report.strip_count, 3);
        assert_eq!(report.canvases.len(), 2);
        assert_eq!(report.canvases[0].name, "page_0000");
        assert_eq!(report.canvases[0].strips, ["001.png", "002.png"]);
        assert_eq!((report.canvases[0].width, report.canvases[0].height), (30, 85));
        assert_eq!(report.canvases[1].strips, ["003.png"]);

        let page0 = image::open(out.join("page_0000.png")).unwrap().to_rgb8();
        assert_eq!(page0.dimensions(), (30, 85));
        // write_strips fills strip i with gray value i*50
        assert_eq!(*page0.get_pixel(0, 39), Rgb([0, 0, 0]));
        assert_eq!(*page0.get_pixel(0, 40), Rgb([50, 50, 50]));
        assert!(out.join("page_0001.png").exists());
    }

    #[test]
    fn narrow_strips_left_aligned_on_white() {
        let tmp = TempDir::new().unwrap();
        let strips = tmp.path().join("strips");
        let out = tmp.path().join("canvases");
        write_strips(&strips, 10, &[5]);
        crate::test_helpers::create_test_png(&strips.join("002.png"), 20, 5, 50);

        let report = combine(&RustBackend::new(), &strips, &out, &settings(1000), None).unwrap();
        assert_eq!(report.canvases[0].width, 20);

        let page = image::open(out.join("page_0000.png")).unwrap().to_rgb8();
        assert_eq!(*page.get_pixel(9, 0), Rgb([0, 0, 0]));
        assert_eq!(*page.get_pixel(10, 0), Rgb([255, 255, 255]));
        assert_eq!(*page.get_pixel(19, 5), Rgb([50, 50, 50]));
    }

    #[test]
    fn combine_reports_oversize_canvas() {
        let tmp = TempDir::new().unwrap();
        let strips = tmp.path().join("s");
        std::fs::create_dir_all(&strips).unwrap();
        for name in ["a.png", "b.png"] {
            std::fs::write(strips.join(name), b"").unwrap();
        }
        let source = MockSource::new()
            .with_image(strips.join("a.png"), 100, 300)
            .with_image(strips.join("b.png"), 100, 2000);

        let (tx, rx) = std::sync::mpsc::channel();
        let report = combine(&source, &strips, &tmp.path().join("out"), &settings(1000), Some(tx))
            .unwrap();
        let events: Vec<StageEvent> = rx.iter().collect();

        assert_eq!(report.canvases.len(), 2);
        assert!(!report.canvases[0].oversize);
        assert!(report.canvases[1].oversize);
        assert_eq!(report.canvases[1].height, 2000);
        assert!(matches!(
            events[1],
            StageEvent::CanvasWritten {
                index: 2,
                oversize: true,
                height: 2000,
                ..
            }
        ));
        assert_eq!(source.saves().len(), 2);
    }

    #[test]
    fn rerun_produces_same_layout() {
        let tmp = TempDir::new().unwrap();
        let strips = tmp.path().join("strips");
        let out = tmp.path().join("canvases");
        write_strips(&strips, 8, &[40, 45, 50, 10, 90]);

        let backend = RustBackend::new();
        let first = combine(&backend, &strips, &out, &settings(100), None).unwrap();
        let second = combine(&backend, &strips, &out, &settings(100), None).unwrap();
        assert_eq!(first.canvases, second.canvases);
    }

    #[test]
    fn rerun_with_fewer_canvases_removes_stale_pages() {
        let tmp = TempDir::new().unwrap();
        let strips = tmp.path().join("strips");
        let out = tmp.path().join("canvases");
        write_strips(&strips, 8, &[40, 45, 50]);
        std::fs::create_dir_all(&out).unwrap();
        crate::test_helpers::create_test_png(&out.join("notes.png"), 2, 2, 9);

        let backend = RustBackend::new();
        let first = combine(&backend, &strips, &out, &settings(50), None).unwrap();
        assert_eq!(first.canvases.len(), 3);
        std::fs::write(out.join("page_0007.jpg"), b"older format").unwrap();

        let second = combine(&backend, &strips, &out, &settings(10_000), None).unwrap();
        assert_eq!(second.canvases.len(), 1);

        let canvases: Vec<String> = naming::list_images(&out)
            .unwrap()
            .iter()
            .map(|p| naming::file_name(p))
            .collect();
        assert_eq!(canvases, ["notes.png", "page_0000.png"]);
        let page = image::open(out.join("page_0000.png")).unwrap();
        assert_eq!(page.height(), 40 + 45 + 50);
    }

    #[test]
    fn combine_empty_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = combine(
            &RustBackend::new(),
            tmp.path(),
            &tmp.path().join("out"),
            &settings(1000),
            None,
        );
        assert!(matches!(result, Err(CombineError::NoStrips(_))));
    }

    #[test]
    fn combine_missing_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = combine(
            &RustBackend::new(),
            &tmp.path().join("missing"),
            &tmp.path().join("out"),
            &settings(1000),
            None,
        );
        assert!(matches!(result, Err(CombineError::MissingInput(_))));
    }
}
