//! Shared types used across all pipeline stages.
//!
//! Stages report progress as [`StageEvent`]s over an optional channel. The
//! binary renders them with [`output::format_event`](crate::output::format_event);
//! library callers and tests can pass `None` or collect them.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

/// Progress notification emitted while a stage runs.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    /// A page image could not be decoded and was left out of its strip.
    ImageSkipped {
        issue: String,
        path: PathBuf,
        reason: String,
    },
    /// No page of an issue could be decoded; no strip was written.
    IssueSkipped { issue: String },
    StripWritten {
        /// 1-based position among written strips
        index: usize,
        name: String,
        pages: usize,
        width: u32,
        height: u32,
    },
    CanvasWritten {
        /// 1-based position among written canvases
        index: usize,
        name: String,
        strips: usize,
        width: u32,
        height: u32,
        /// Taller than the configured maximum (a single oversize strip)
        oversize: bool,
    },
    CompositeAssembled {
        canvases: usize,
        width: u32,
        height: u32,
    },
    PyramidWritten {
        /// 1-based position among tiled images
        index: usize,
        name: String,
        width: u32,
        height: u32,
        levels: u32,
        tiles: usize,
    },
}

/// Send an event if a listener is attached. A dropped receiver is not an error.
pub(crate) fn emit(progress: &Option<Sender<StageEvent>>, event: StageEvent) {
    if let Some(tx) = progress {
        tx.send(event).ok();
    }
}
