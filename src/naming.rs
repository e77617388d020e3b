//! Ordered directory listings and output file naming.
//!
//! Every stage consumes directories of files whose order matters: pages
//! within an issue, strips within a run, canvases within a collection. The
//! contract is the same everywhere: entries are sorted lexicographically by
//! file name, never by filesystem enumeration order. Upstream acquisition
//! names pages with zero-padded numeric prefixes, so lexicographic order is
//! page order:
//!
//! ```text
//! scans/
//! ├── 1951-03-02/        # issue (strip name = directory name)
//! │   ├── 001.jpg
//! │   ├── 002.jpg
//! │   └── 010.jpg        # sorts after 002 because of the padding
//! └── 1951-03-09/
//!     └── ...
//! ```
//!
//! Hidden entries (leading `.`) are ignored, as are files whose extension
//! has no compiled-in decoder.

use crate::imaging::{OutputFormat, supported_input_extensions};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !is_hidden(&path) && keep(&path) {
            entries.push(path);
        }
    }
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

/// Immediate subdirectories of `dir`, lexicographically by name.
pub fn list_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    sorted_entries(dir, |p| p.is_dir())
}

/// Loadable raster files directly inside `dir`, lexicographically by name.
pub fn list_images(dir: &Path) -> io::Result<Vec<PathBuf>> {
    sorted_entries(dir, |p| p.is_file() && has_image_extension(p))
}

/// Full file or directory name, lossily converted to UTF-8.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name without extension, lossily converted to UTF-8.
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

const CANVAS_PREFIX: &str = "page_";
const MIN_CANVAS_DIGITS: usize = 4;

/// Canvas file name for a 0-based page index out of `total` canvases:
/// `page_0000.png`, `page_0001.png`, ...
///
/// Padding widens past 9999 canvases so every name of a run has the same
/// width and lexicographic order stays page order.
pub fn canvas_file_name(index: usize, total: usize, format: OutputFormat) -> String {
    let digits = total
        .saturating_sub(1)
        .to_string()
        .len()
        .max(MIN_CANVAS_DIGITS);
    format!(
        "{}{:0width$}.{}",
        CANVAS_PREFIX,
        index,
        format.extension(),
        width = digits
    )
}

/// Whether `stem` has the shape of a canvas name (`page_` followed by digits).
pub fn is_canvas_stem(stem: &str) -> bool {
    stem.strip_prefix(CANVAS_PREFIX)
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Delete the images directly inside `dir` whose stem satisfies `matches`.
///
/// A missing `dir` has nothing to remove. Returns the number of files deleted.
pub fn remove_images(dir: &Path, matches: impl Fn(&str) -> bool) -> io::Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for path in list_images(dir)? {
        if matches(&stem(&path)) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}
