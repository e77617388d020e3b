//! # pagezoom
//!
//! Turns a directory of scanned newspaper pages into Deep Zoom image
//! pyramids that OpenSeadragon-style viewers can pan and zoom.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! Each stage reads a directory of plain raster files and writes another,
//! so every intermediate result can be inspected and any stage rerun alone:
//!
//! ```text
//! 1. Strips     scans/{issue}/NNN.jpg  →  strips/{issue}.png       (pages side by side)
//! 2. Combine    strips/                →  canvases/page_NNNN.png   (strips stacked, height-capped)
//! 3. Tile       canvases/              →  out/{page}/L/C_R.jpg + {page}.dzi + collection.dzc
//! ```
//!
//! Stage 3 has an alternative, [`composite`], that stacks every canvas into
//! one image and tiles it once instead of building a collection.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`strips`] | Stage 1: height-normalize an issue's pages and lay them out horizontally |
//! | [`combine`] | Stage 2: pack strips into canvases below a height ceiling |
//! | [`pyramid`] | Level and tile generation for one image |
//! | [`collection`] | Stage 3: tile every canvas and write the `.dzc` index |
//! | [`composite`] | Stage 3 alternative: one pyramid over all canvases |
//! | [`manifest`] | `.dzi` / `.dzc` XML documents |
//! | [`imaging`] | Decode, resize, blit and encode through the [`imaging::ImageSource`] seam |
//! | [`naming`] | Ordered directory listings and output file names |
//! | [`config`] | `pagezoom.toml` loading, merging, and validation |
//! | [`types`] | Progress events shared between stages and the CLI |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Lexicographic Order Everywhere
//!
//! Pages, issues, strips and canvases are always processed sorted by file
//! name. Acquisition tools name pages `001.jpg`, `002.jpg`, ... so that order
//! is page order, and directory enumeration order never leaks into output.
//!
//! ## Independent Level Resampling
//!
//! Each pyramid level is resized straight from the source image with Lanczos3
//! instead of halving the level above. Levels are one filter pass from the
//! original pixels, at the cost of more resampling work on large canvases.
//!
//! ## Bounded Memory
//!
//! Every decode and every allocated buffer is checked against
//! `[limits] max_pixels`. Canvases cap the size of what stage 3 has to hold;
//! the single-pyramid mode trades that away and is guarded by its own height
//! ceiling.
//!
//! ## Rerun, Don't Resume
//!
//! Stages overwrite their outputs. Tiling removes an image's previous tile
//! tree before writing, so an interrupted run is fixed by running the stage
//! again.

pub mod collection;
pub mod combine;
pub mod composite;
pub mod config;
pub mod imaging;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod pyramid;
pub mod strips;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
