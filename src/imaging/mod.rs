//! Image handling in pure Rust, no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Load** | `image` decoders bounded by `image::Limits`, converted to RGB8 |
//! | **Resize** | `image::imageops::resize` with `Lanczos3` |
//! | **Paste** | [`PixelBuffer::blit`] over `image::imageops::replace` |
//! | **Save** | JPEG (quality-controlled) or PNG encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for level, tile and strip geometry (unit testable)
//! - **Parameters**: Output format and quality
//! - **Buffer**: Bounded, white-backed composition buffer
//! - **Backend**: [`ImageSource`] trait + [`RustBackend`]

pub mod backend;
pub mod buffer;
pub mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageSource};
pub use buffer::PixelBuffer;
pub use params::{Encoding, OutputFormat, Quality};
pub use rust_backend::{RustBackend, supported_input_extensions};

use image::RgbImage;
use image::imageops::FilterType;
use std::borrow::Cow;

/// Resample `image` to exactly `width × height` with Lanczos3.
///
/// Returns the input unchanged (borrowed) when the size already matches.
pub fn resize_exact(image: &RgbImage, width: u32, height: u32) -> Cow<'_, RgbImage> {
    if image.dimensions() == (width, height) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(image::imageops::resize(
            image,
            width,
            height,
            FilterType::Lanczos3,
        ))
    }
}
