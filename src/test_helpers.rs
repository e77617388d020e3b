//! Shared test utilities for the pagezoom test suite.
//!
//! Builds synthetic scan directories on disk so stage tests can run the real
//! `image` codecs without checked-in fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_issue(tmp.path(), "1951-03-02", &[(400, 600), (420, 600)]);
//! write_corrupt(&tmp.path().join("1951-03-02/003.png"));
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, Rgb, RgbImage};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

// =========================================================================
// Synthetic images
// =========================================================================

/// Gradient RGB image, so resized or cropped output is not uniform.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = BufWriter::new(file);
    JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a lossless PNG filled with one gray value.
pub fn create_test_png(path: &Path, width: u32, height: u32, value: u8) {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
        .save(path)
        .unwrap();
}

/// Write a file with an image extension but garbage content.
pub fn write_corrupt(path: &Path) {
    std::fs::write(path, b"not an image at all").unwrap();
}

// =========================================================================
// Directory fixtures
// =========================================================================

/// Create `base/name/` holding one PNG page per `(width, height)` entry,
/// named `001.png`, `002.png`, ... Returns the page paths in order.
pub fn write_issue(base: &Path, name: &str, pages: &[(u32, u32)]) -> Vec<PathBuf> {
    let dir = base.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    pages
        .iter()
        .enumerate()
        .map(|(i, &(w, h))| {
            let path = dir.join(format!("{:03}.png", i + 1));
            create_test_png(&path, w, h, (i * 40 % 200) as u8);
            path
        })
        .collect()
}

/// Write one PNG per height into `dir` as `NNN.png`, all `width` wide.
pub fn write_strips(dir: &Path, width: u32, heights: &[u32]) -> Vec<PathBuf> {
    std::fs::create_dir_all(dir).unwrap();
    heights
        .iter()
        .enumerate()
        .map(|(i, &h)| {
            let path = dir.join(format!("{:03}.png", i + 1));
            create_test_png(&path, width, h, (i * 50 % 250) as u8);
            path
        })
        .collect()
}

/// Sorted relative paths of every file under `root`.
pub fn list_tree(root: &Path) -> Vec<String> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                walk(&path, root, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
