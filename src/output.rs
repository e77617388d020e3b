//! CLI output formatting for all pipeline stages.
//!
//! Every stage prints one line per produced item while it runs, then a
//! one-line summary. Items lead with their 1-based position and name; sizes
//! and counts follow, and anomalies appear as indented context lines.
//!
//! # Output Format
//!
//! ## make-strips
//!
//! ```text
//! 001 1951-03-02 (4 pages) 3310x1200
//!     skipped 003.jpg: Failed to decode ...
//! --- 1951-03-09: no readable pages
//!     skipped 001.jpg: Failed to decode ...
//! Wrote 1 strip (2 pages skipped, 1 issue skipped)
//! ```
//!
//! ## combine
//!
//! ```text
//! 001 page_0000 (12 strips) 4200x19840
//! 002 page_0001 (1 strip) 4200x23000
//!     oversize: taller than max height
//! Packed 13 strips into 2 canvases (1 oversize)
//! ```
//!
//! ## make-collection / make-single-pyramid
//!
//! ```text
//! 001 page_0000 4200x19840 → 16 levels, 1601 tiles
//! Tiled 2 images → out/collection.dzc
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::collection::CollectionReport;
use crate::combine::CombineReport;
use crate::composite::CompositeReport;
use crate::strips::StripsReport;
use crate::types::StageEvent;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 strip`, `2 strips`
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

fn canvases(count: usize) -> String {
    if count == 1 {
        "1 canvas".to_string()
    } else {
        format!("{count} canvases")
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Progress events
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_event(event: &StageEvent) -> Vec<String> {
    match event {
        StageEvent::ImageSkipped { path, reason, .. } => {
            vec![format!("{}skipped {}: {}", indent(1), file_label(path), reason)]
        }
        StageEvent::IssueSkipped { issue } => {
            vec![format!("--- {}: no readable pages", issue)]
        }
        StageEvent::StripWritten {
            index,
            name,
            pages,
            width,
            height,
        } => vec![format!(
            "{} {} ({}) {}x{}",
            format_index(*index),
            name,
            plural(*pages, "page"),
            width,
            height
        )],
        StageEvent::CanvasWritten {
            index,
            name,
            strips,
            width,
            height,
            oversize,
        } => {
            let mut lines = vec![format!(
                "{} {} ({}) {}x{}",
                format_index(*index),
                name,
                plural(*strips, "strip"),
                width,
                height
            )];
            if *oversize {
                lines.push(format!("{}oversize: taller than max height", indent(1)));
            }
            lines
        }
        StageEvent::CompositeAssembled {
            canvases: count,
            width,
            height,
        } => vec![format!(
            "Composite {}x{} from {}",
            width,
            height,
            canvases(*count)
        )],
        StageEvent::PyramidWritten {
            index,
            name,
            width,
            height,
            levels,
            tiles,
        } => vec![format!(
            "{} {} {}x{} \u{2192} {} levels, {}",
            format_index(*index),
            name,
            width,
            height,
            levels,
            plural(*tiles, "tile")
        )],
    }
}

// ============================================================================
// Stage summaries
// ============================================================================

pub fn format_strips_summary(report: &StripsReport) -> Vec<String> {
    let mut line = format!("Wrote {}", plural(report.written.len(), "strip"));
    let mut notes = Vec::new();
    if report.skipped_pages > 0 {
        notes.push(format!("{} skipped", plural(report.skipped_pages, "page")));
    }
    if !report.skipped_issues.is_empty() {
        notes.push(format!(
            "{} skipped",
            plural(report.skipped_issues.len(), "issue")
        ));
    }
    if !notes.is_empty() {
        line.push_str(&format!(" ({})", notes.join(", ")));
    }
    vec![line]
}

pub fn print_strips_summary(report: &StripsReport) {
    print_lines(format_strips_summary(report));
}

pub fn format_combine_summary(report: &CombineReport) -> Vec<String> {
    let oversize = report.canvases.iter().filter(|c| c.oversize).count();
    let mut line = format!(
        "Packed {} into {}",
        plural(report.strip_count, "strip"),
        canvases(report.canvases.len())
    );
    if oversize > 0 {
        line.push_str(&format!(" ({} oversize)", oversize));
    }
    vec![line]
}

pub fn print_combine_summary(report: &CombineReport) {
    print_lines(format_combine_summary(report));
}

pub fn format_collection_summary(report: &CollectionReport) -> Vec<String> {
    vec![format!(
        "Tiled {} \u{2192} {}",
        plural(report.pyramids.len(), "image"),
        report.manifest_path.display()
    )]
}

pub fn print_collection_summary(report: &CollectionReport) {
    print_lines(format_collection_summary(report));
}

pub fn format_composite_summary(report: &CompositeReport) -> Vec<String> {
    vec![format!(
        "Tiled {} as one image \u{2192} {}",
        canvases(report.canvases.len()),
        report.pyramid.manifest_path.display()
    )]
}

pub fn print_composite_summary(report: &CompositeReport) {
    print_lines(format_composite_summary(report));
}

// ============================================================================
// Tests
// ============================================================================
