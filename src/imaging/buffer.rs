//! Mutable white-backed RGB buffer used to compose strips, canvases and
//! composites.
//!
//! Every paste goes through [`PixelBuffer::blit`], which rejects a source that
//! would fall outside the buffer instead of silently clipping it. Allocation
//! is checked against the configured pixel ceiling before any memory is
//! reserved.

use super::backend::BackendError;
use image::{Rgb, RgbImage};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Refuse dimensions whose pixel count exceeds `max_pixels`.
pub fn check_pixel_budget(width: u32, height: u32, max_pixels: u64) -> Result<(), BackendError> {
    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(BackendError::TooLarge {
            width,
            height,
            max_pixels,
        });
    }
    Ok(())
}

#[derive(Debug)]
pub struct PixelBuffer {
    pixels: RgbImage,
}

impl PixelBuffer {
    /// Allocate a white buffer of `width × height`.
    pub fn white(width: u32, height: u32, max_pixels: u64) -> Result<Self, BackendError> {
        check_pixel_budget(width, height, max_pixels)?;
        Ok(Self {
            pixels: RgbImage::from_pixel(width, height, WHITE),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Copy `src` into the buffer with its top-left corner at `(x, y)`.
    pub fn blit(&mut self, src: &RgbImage, x: u32, y: u32) -> Result<(), BackendError> {
        let fits_x = (x as u64 + src.width() as u64) <= self.width() as u64;
        let fits_y = (y as u64 + src.height() as u64) <= self.height() as u64;
        if !fits_x || !fits_y {
            return Err(BackendError::OutOfBounds {
                x,
                y,
                width: src.width(),
                height: src.height(),
                buffer_width: self.width(),
                buffer_height: self.height(),
            });
        }
        image::imageops::replace(&mut self.pixels, src, x as i64, y as i64);
        Ok(())
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbImage {
        self.pixels
    }
}
