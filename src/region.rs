//! Mark and region tracking
//!
//! The mark is an anchor offset set by the user. Together with the caret it
//! spans the region that kill/copy commands operate on.

use serde::{Deserialize, Serialize};

/// Zero-based character index into the document text
pub type Offset = usize;

/// A normalized span of text (`start <= end`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start: Offset,
    pub end: Offset,
}

impl Region {
    /// Build a region from two offsets in any order
    pub fn new(a: Offset, b: Offset) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Holds the optional mark and derives the active region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarkTracker {
    mark: Option<Offset>,
}

impl MarkTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mark(&mut self, offset: Offset) {
        self.mark = Some(offset);
    }

    pub fn clear_mark(&mut self) {
        self.mark = None;
    }

    pub fn mark(&self) -> Option<Offset> {
        self.mark
    }

    pub fn is_set(&self) -> bool {
        self.mark.is_some()
    }

    /// The region a region command should act on.
    ///
    /// A non-empty selection on the input surface wins. Otherwise the region
    /// spans mark and caret (`cursor_end`) when they differ.
    pub fn active_region(&self, cursor_start: Offset, cursor_end: Offset) -> Option<Region> {
        let selection = Region::new(cursor_start, cursor_end);
        if !selection.is_empty() {
            return Some(selection);
        }

        let mark = self.mark?;
        let region = Region::new(mark, cursor_end);
        (!region.is_empty()).then_some(region)
    }
}
