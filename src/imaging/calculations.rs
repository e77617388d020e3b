//! Pure calculation functions for pyramid and strip geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Level numbering follows the deep-zoom convention: level 0 is the coarsest
//! (a 1×1-ish thumbnail) and `levels - 1` is full resolution.

/// `ceil(log2(d))` for `d >= 1`, exact in integer arithmetic.
fn ceil_log2(d: u32) -> u32 {
    if d <= 1 {
        0
    } else {
        u32::BITS - (d - 1).leading_zeros()
    }
}

/// `floor(log2(d))` for `d >= 1`. Returns 0 for `d == 0`.
fn floor_log2(d: u32) -> u32 {
    if d == 0 {
        0
    } else {
        u32::BITS - 1 - d.leading_zeros()
    }
}

/// Width of an image after resizing it to `target_height`, preserving aspect.
///
/// Rounds to the nearest pixel and never returns 0.
///
/// ```
/// # use pagezoom::imaging::calculations::scaled_width;
/// assert_eq!(scaled_width(1000, 1500, 3000), 2000);
/// assert_eq!(scaled_width(333, 1000, 1000), 333);
/// ```
pub fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    if height == target_height {
        return width;
    }
    let w = (width as f64 * target_height as f64 / height as f64).round() as u32;
    w.max(1)
}

/// Number of pyramid levels for an image: `ceil(log2(max(w, h))) + 1`.
///
/// ```
/// # use pagezoom::imaging::calculations::level_count;
/// assert_eq!(level_count(256, 256), 9);
/// assert_eq!(level_count(300, 10), 10);
/// assert_eq!(level_count(1, 1), 1);
/// ```
pub fn level_count(width: u32, height: u32) -> u32 {
    ceil_log2(width.max(height)) + 1
}

/// Dimensions of pyramid level `level` out of `levels`.
///
/// The level is `2^(levels - 1 - level)` times smaller than the original,
/// rounding up, so the top level reproduces `(width, height)` exactly.
pub fn level_dimensions(width: u32, height: u32, level: u32, levels: u32) -> (u32, u32) {
    debug_assert!(level < levels);
    let scale = 1u64 << (levels - 1 - level);
    (
        (width as u64).div_ceil(scale) as u32,
        (height as u64).div_ceil(scale) as u32,
    )
}

/// Number of tile columns and rows covering a level.
pub fn tile_grid(level_width: u32, level_height: u32, tile_size: u32) -> (u32, u32) {
    (
        level_width.div_ceil(tile_size),
        level_height.div_ceil(tile_size),
    )
}

/// Pixel rectangle covered by one tile within its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub col: u32,
    pub row: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Rectangle of tile `(col, row)`. Edge tiles are clipped to the level, never padded.
pub fn tile_rect(col: u32, row: u32, level_width: u32, level_height: u32, tile_size: u32) -> TileRect {
    let x = col * tile_size;
    let y = row * tile_size;
    TileRect {
        col,
        row,
        x,
        y,
        width: (x + tile_size).min(level_width) - x,
        height: (y + tile_size).min(level_height) - y,
    }
}

/// All tile rectangles of a level, row-major.
pub fn tile_rects(level_width: u32, level_height: u32, tile_size: u32) -> Vec<TileRect> {
    let (cols, rows) = tile_grid(level_width, level_height, tile_size);
    (0..rows)
        .flat_map(|row| {
            (0..cols).map(move |col| tile_rect(col, row, level_width, level_height, tile_size))
        })
        .collect()
}

/// Collection-level `MaxLevel`: `floor(log2(d))` where `d` is the largest
/// dimension over every item. Returns 0 for an empty collection.
pub fn collection_max_level(dimensions: impl IntoIterator<Item = (u32, u32)>) -> u32 {
    let largest = dimensions
        .into_iter()
        .map(|(w, h)| w.max(h))
        .max()
        .unwrap_or(0);
    floor_log2(largest)
}
