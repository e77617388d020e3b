//! Image source trait and shared types.
//!
//! The [`ImageSource`] trait is the seam between the pipeline stages and the
//! pixel codecs: identify, load and save. Stages only ever hold an image for
//! the duration of the operation that needs it; the returned `RgbImage` is
//! owned by the caller and freed when it goes out of scope.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording `MockSource` below.

use super::params::Encoding;
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("Image of {width}x{height} exceeds the pixel limit of {max_pixels}")]
    TooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },
    #[error(
        "Paste of {width}x{height} at ({x}, {y}) falls outside a {buffer_width}x{buffer_height} buffer"
    )]
    OutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        buffer_width: u32,
        buffer_height: u32,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Loads and persists bitmaps for the pipeline.
///
/// `Sync` so a single source can be shared by rayon workers writing tiles.
pub trait ImageSource: Sync {
    /// Read image dimensions without decoding pixels.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode an image into an owned 8-bit RGB buffer.
    fn load(&self, path: &Path) -> Result<RgbImage, BackendError>;

    /// Encode `image` to `path`, overwriting any existing file.
    fn save(&self, image: &RgbImage, path: &Path, encoding: Encoding) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use image::Rgb;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock source serving synthetic bitmaps by path and recording every call.
    ///
    /// Paths that were never registered fail to load, standing in for corrupt
    /// files. Saves are recorded, not written. Uses Mutex so it is Sync.
    #[derive(Default)]
    pub struct MockSource {
        pub images: Mutex<HashMap<PathBuf, Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Load(String),
        Save {
            path: String,
            width: u32,
            height: u32,
        },
    }

    impl MockSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_image(self, path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
            self.images
                .lock()
                .unwrap()
                .insert(path.into(), Dimensions { width, height });
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn saves(&self) -> Vec<(String, u32, u32)> {
            self.get_operations()
                .into_iter()
                .filter_map(|op| match op {
                    RecordedOp::Save {
                        path,
                        width,
                        height,
                    } => Some((path, width, height)),
                    _ => None,
                })
                .collect()
        }

        fn lookup(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.images
                .lock()
                .unwrap()
                .get(path)
                .copied()
                .ok_or_else(|| BackendError::Decode {
                    path: path.to_path_buf(),
                    message: "not a registered mock image".to_string(),
                })
        }
    }

    impl ImageSource for MockSource {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));
            self.lookup(path)
        }

        fn load(&self, path: &Path) -> Result<RgbImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Load(path.to_string_lossy().to_string()));
            let dims = self.lookup(path)?;
            Ok(RgbImage::from_pixel(
                dims.width,
                dims.height,
                Rgb([128, 128, 128]),
            ))
        }

        fn save(
            &self,
            image: &RgbImage,
            path: &Path,
            _encoding: Encoding,
        ) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Save {
                path: path.to_string_lossy().to_string(),
                width: image.width(),
                height: image.height(),
            });
            Ok(())
        }
    }

    #[test]
    fn mock_serves_registered_images() {
        let source = MockSource::new().with_image("/scans/001.jpg", 800, 600);

        let dims = source.identify(Path::new("/scans/001.jpg")).unwrap();
        assert_eq!(dims, Dimensions { width: 800, height: 600 });

        let img = source.load(Path::new("/scans/001.jpg")).unwrap();
        assert_eq!(img.dimensions(), (800, 600));

        let ops = source.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/scans/001.jpg"));
        assert!(matches!(&ops[1], RecordedOp::Load(p) if p == "/scans/001.jpg"));
    }

    #[test]
    fn mock_fails_unregistered_paths() {
        let source = MockSource::new();
        let result = source.load(Path::new("/scans/corrupt.jpg"));
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn mock_records_saves() {
        let source = MockSource::new();
        let img = RgbImage::new(12, 7);
        source
            .save(&img, Path::new("/out/tile.jpg"), Encoding::png())
            .unwrap();

        assert_eq!(source.saves(), vec![("/out/tile.jpg".to_string(), 12, 7)]);
    }
}
