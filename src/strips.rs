//! Strip assembly: one horizontal strip per issue.
//!
//! Stage 1 of the pyramid pipeline. Each immediate subdirectory of the scan
//! directory is one issue; its page images, in lexicographic order, are
//! scaled to a common height and laid left to right on a white background.
//!
//! ```text
//! scans/1951-03-02/001.jpg (800×1200) ┐
//! scans/1951-03-02/002.jpg (750×1100) ├─→ strips/1951-03-02.png (800+818 × 1200)
//!                                     ┘
//! ```
//!
//! ## Height normalization
//!
//! The strip height `H` is the tallest decodable page. Every page is resized
//! to `(round(w · H / h), H)` with Lanczos3, so shorter pages are upscaled.
//! A page already `H` tall is pasted as-is.
//!
//! ## Failure handling
//!
//! A page that fails to decode is skipped with a warning and the strip is
//! assembled from the rest. An issue with no decodable pages produces no
//! strip. Write failures abort the stage.
//!
//! Strips named after a current issue are deleted from `out_dir` before the
//! run, whatever their format, so a skipped issue or a format change leaves
//! no earlier strip behind.

use crate::imaging::calculations::scaled_width;
use crate::imaging::{BackendError, Encoding, ImageSource, PixelBuffer, resize_exact};
use crate::naming;
use crate::types::{StageEvent, emit};
use image::RgbImage;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StripError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Imaging(#[from] BackendError),
    #[error("Scan directory not found: {0}")]
    MissingInput(PathBuf),
    #[error("No issue directories found in {0}")]
    NoIssues(PathBuf),
}

/// Settings for strip assembly.
#[derive(Debug, Clone, Copy)]
pub struct StripSettings {
    pub encoding: Encoding,
    pub max_pixels: u64,
}

/// A page that was left out of its strip.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPage {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of assembling one issue.
#[derive(Debug)]
pub struct Assembly {
    /// `None` when no page could be decoded.
    pub strip: Option<RgbImage>,
    pub pages_used: usize,
    pub skipped: Vec<SkippedPage>,
}

/// Merge ordered page images into a single height-normalized strip.
///
/// Only decode failures are tolerated; a strip larger than `max_pixels`
/// is an error.
pub fn assemble_strip(
    source: &impl ImageSource,
    pages: &[PathBuf],
    max_pixels: u64,
) -> Result<Assembly, BackendError> {
    let mut loaded = Vec::with_capacity(pages.len());
    let mut skipped = Vec::new();

    for path in pages {
        match source.load(path) {
            Ok(img) => loaded.push(img),
            Err(e) => skipped.push(SkippedPage {
                path: path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    let Some(height) = loaded.iter().map(|img| img.height()).max() else {
        return Ok(Assembly {
            strip: None,
            pages_used: 0,
            skipped,
        });
    };

    let widths: Vec<u32> = loaded
        .iter()
        .map(|img| scaled_width(img.width(), img.height(), height))
        .collect();
    let total_width = widths
        .iter()
        .try_fold(0u32, |acc, &w| acc.checked_add(w))
        .ok_or_else(|| BackendError::ProcessingFailed("strip width overflows u32".into()))?;

    let mut buffer = PixelBuffer::white(total_width, height, max_pixels)?;
    let mut x = 0;
    for (img, width) in loaded.iter().zip(&widths) {
        let resized = resize_exact(img, *width, height);
        buffer.blit(&resized, x, 0)?;
        x += width;
    }

    Ok(Assembly {
        strip: Some(buffer.into_image()),
        pages_used: loaded.len(),
        skipped,
    })
}

/// Summary of one written strip.
#[derive(Debug, Clone, PartialEq)]
pub struct StripSummary {
    pub name: String,
    pub path: PathBuf,
    pub pages: usize,
    pub width: u32,
    pub height: u32,
}

/// Result of a full strip run.
#[derive(Debug, Default)]
pub struct StripsReport {
    pub written: Vec<StripSummary>,
    pub skipped_issues: Vec<String>,
    pub skipped_pages: usize,
}

/// Build one strip per issue directory under `base_dir` into `out_dir`.
pub fn make_strips(
    source: &impl ImageSource,
    base_dir: &Path,
    out_dir: &Path,
    settings: &StripSettings,
    progress: Option<Sender<StageEvent>>,
) -> Result<StripsReport, StripError> {
    if !base_dir.is_dir() {
        return Err(StripError::MissingInput(base_dir.to_path_buf()));
    }
    let issues = naming::list_subdirs(base_dir)?;
    if issues.is_empty() {
        return Err(StripError::NoIssues(base_dir.to_path_buf()));
    }

    std::fs::create_dir_all(out_dir)?;
    let names: HashSet<String> = issues.iter().map(|dir| naming::file_name(dir)).collect();
    let stale = naming::remove_images(out_dir, |stem| names.contains(stem))?;
    if stale > 0 {
        debug!(removed = stale, "removed strips from previous run");
    }
    let mut report = StripsReport::default();

    for issue_dir in &issues {
        let issue = naming::file_name(issue_dir);
        let pages = naming::list_images(issue_dir)?;
        debug!(issue = %issue, pages = pages.len(), "assembling strip");

        let assembly = assemble_strip(source, &pages, settings.max_pixels)?;
        report.skipped_pages += assembly.skipped.len();

        match assembly.strip {
            Some(strip) => {
                let path =
                    out_dir.join(format!("{}.{}", issue, settings.encoding.format.extension()));
                source.save(&strip, &path, settings.encoding)?;

                let summary = StripSummary {
                    name: issue.clone(),
                    path,
                    pages: assembly.pages_used,
                    width: strip.width(),
                    height: strip.height(),
                };
                emit(
                    &progress,
                    StageEvent::StripWritten {
                        index: report.written.len() + 1,
                        name: summary.name.clone(),
                        pages: summary.pages,
                        width: summary.width,
                        height: summary.height,
                    },
                );
                report.written.push(summary);
            }
            None => {
                warn!(issue = %issue, "no readable pages, no strip written");
                emit(&progress, StageEvent::IssueSkipped { issue: issue.clone() });
                report.skipped_issues.push(issue.clone());
            }
        }

        for page in assembly.skipped {
            warn!(issue = %issue, path = %page.path.display(), reason = %page.reason, "skipping unreadable page");
            emit(
                &progress,
                StageEvent::ImageSkipped {
                    issue: issue.clone(),
                    path: page.path,
                    reason: page.reason,
                },
            );
        }
    }

    Ok(report)
}
