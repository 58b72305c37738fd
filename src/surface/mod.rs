//! The on-screen editing surface
//!
//! `EditorSurface` mirrors the last rendered snapshot: text laid out in soft
//! wrapped rows, the caret and selection, the scroll position and the status
//! line. It is also the caret oracle for visual line navigation, measuring
//! offsets in pixels derived from the font size.

pub mod layout;

use ratatui::layout::Rect;

use crate::engine::Snapshot;
use crate::region::{Offset, Region};
use crate::visual_line::{CaretMeasure, CaretOracle};

use layout::WrapLayout;

/// Row height as a multiple of the font size
const LINE_HEIGHT_FACTOR: f32 = 1.5;
/// Cell width as a multiple of the font size
const CELL_WIDTH_FACTOR: f32 = 0.6;

/// Where `C-l` puts the caret row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecenterMode {
    Center,
    Top,
    /// Also the starting state, so the first recenter centers
    #[default]
    Bottom,
}

impl RecenterMode {
    /// Next position in the center, top, bottom cycle
    pub fn next(self) -> Self {
        match self {
            RecenterMode::Center => RecenterMode::Top,
            RecenterMode::Top => RecenterMode::Bottom,
            RecenterMode::Bottom => RecenterMode::Center,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecenterMode::Center => "center",
            RecenterMode::Top => "top",
            RecenterMode::Bottom => "bottom",
        }
    }
}

/// Status line for a snapshot
pub fn status_line(snapshot: &Snapshot) -> String {
    let modified = if snapshot.modified { "Modified" } else { "Saved" };
    let file = snapshot
        .file_path
        .as_ref()
        .map_or_else(|| "No File".to_string(), |p| p.display().to_string());
    let message = snapshot
        .status_message
        .as_ref()
        .map(|m| format!("  |  {}", m))
        .unwrap_or_default();

    format!(
        "L:{} C:{}  |  {} chars  |  {} ({})  |  {}  |  {}{}",
        snapshot.line,
        snapshot.col,
        snapshot.char_count,
        snapshot.encoding,
        snapshot.line_ending,
        modified,
        file,
        message
    )
}

#[derive(Debug, Clone)]
pub struct EditorSurface {
    text: String,
    layout: WrapLayout,
    /// Selection anchor; equal to `caret` when nothing is selected
    anchor: Offset,
    caret: Offset,
    /// Text area on screen
    area: Rect,
    /// First visible row
    scroll: usize,
    tab_width: usize,
    font_size: u16,
    composing: bool,
    status: String,
}

impl EditorSurface {
    pub fn new(tab_width: usize, font_size: u16) -> Self {
        Self {
            text: String::new(),
            layout: WrapLayout::new("", 1, tab_width),
            anchor: 0,
            caret: 0,
            area: Rect::new(0, 0, 1, 1),
            scroll: 0,
            tab_width,
            font_size,
            composing: false,
            status: String::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.layout.char_len()
    }

    pub fn layout(&self) -> &WrapLayout {
        &self.layout
    }

    pub fn caret(&self) -> Offset {
        self.caret
    }

    pub fn anchor(&self) -> Offset {
        self.anchor
    }

    /// Normalized selection; empty when nothing is selected
    pub fn selection(&self) -> Region {
        Region::new(self.anchor, self.caret)
    }

    pub fn has_selection(&self) -> bool {
        self.anchor != self.caret
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn font_size(&self) -> u16 {
        self.font_size
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Caret position in screen cells, if it is inside the text area
    pub fn caret_cell(&self) -> Option<(u16, u16)> {
        let (row, col) = self.layout.position_of(self.caret);
        let visible_row = row.checked_sub(self.scroll)?;
        let height = usize::from(self.area.height);
        if visible_row >= height {
            return None;
        }
        let col = col.min(usize::from(self.area.width.saturating_sub(1)));
        Some((
            self.area.x + col as u16,
            self.area.y + visible_row as u16,
        ))
    }

    // ========================================================================
    // Updates
    // ========================================================================

    /// Show a snapshot: replace the text if it changed, collapse the
    /// selection onto the engine cursor, and refresh the status line
    pub fn render(&mut self, snapshot: &Snapshot, status_override: Option<&str>) {
        if self.text != snapshot.text {
            self.text = snapshot.text.clone();
            self.relayout();
        }
        let cursor = snapshot.cursor.min(self.char_len());
        self.anchor = cursor;
        self.caret = cursor;
        self.ensure_caret_visible();
        self.status = match status_override {
            Some(text) => text.to_string(),
            None => status_line(snapshot),
        };
    }

    /// Replace only the status line
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Select from `anchor` to the caret
    pub fn select_from(&mut self, anchor: Offset) {
        self.anchor = anchor.min(self.char_len());
    }

    /// Move the caret locally, dropping any selection
    pub fn set_caret(&mut self, offset: Offset) {
        let offset = offset.min(self.char_len());
        self.anchor = offset;
        self.caret = offset;
    }

    pub fn set_composing(&mut self, composing: bool) {
        self.composing = composing;
    }

    pub fn set_font_size(&mut self, font_size: u16) {
        self.font_size = font_size;
    }

    /// Move the text area, re-wrapping when the width changes
    pub fn resize(&mut self, area: Rect) {
        let width_changed = area.width != self.area.width;
        self.area = area;
        if width_changed {
            self.relayout();
        }
        self.clamp_scroll();
        self.ensure_caret_visible();
    }

    fn relayout(&mut self) {
        self.layout = WrapLayout::new(&self.text, self.area.width, self.tab_width);
    }

    fn max_scroll(&self) -> usize {
        self.layout
            .row_count()
            .saturating_sub(usize::from(self.area.height))
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.min(self.max_scroll());
    }

    pub fn ensure_caret_visible(&mut self) {
        let row = self.layout.row_of(self.caret);
        let height = usize::from(self.area.height.max(1));
        if row < self.scroll {
            self.scroll = row;
        } else if row >= self.scroll + height {
            self.scroll = row + 1 - height;
        }
    }

    /// Scroll by `delta` rows without moving the caret
    pub fn scroll_by(&mut self, delta: i32) {
        let target = self.scroll as i64 + i64::from(delta);
        self.scroll = target.clamp(0, self.max_scroll() as i64) as usize;
    }

    /// Scroll so the caret row lands at the center, top or bottom
    pub fn recenter(&mut self, mode: RecenterMode) {
        let row = self.layout.row_of(self.caret);
        let height = usize::from(self.area.height.max(1));
        let target = match mode {
            RecenterMode::Center => row.saturating_sub(height / 2),
            RecenterMode::Top => row,
            RecenterMode::Bottom => (row + 1).saturating_sub(height),
        };
        self.scroll = target.min(self.max_scroll());
    }

    /// Offset under a terminal cell, if the cell is inside the text area
    pub fn offset_at_cell(&self, column: u16, row: u16) -> Option<Offset> {
        let area = self.area;
        if column < area.x
            || row < area.y
            || column >= area.x + area.width
            || row >= area.y + area.height
        {
            return None;
        }
        let layout_row = self.scroll + usize::from(row - area.y);
        if layout_row >= self.layout.row_count() {
            return Some(self.char_len());
        }
        Some(self.layout.offset_at(layout_row, usize::from(column - area.x)))
    }

    fn line_height_px(&self) -> f32 {
        f32::from(self.font_size) * LINE_HEIGHT_FACTOR
    }

    fn cell_width_px(&self) -> f32 {
        f32::from(self.font_size) * CELL_WIDTH_FACTOR
    }
}

impl CaretOracle for EditorSurface {
    fn measure(&self, offset: Offset) -> CaretMeasure {
        let (row, col) = self.layout.position_of(offset);
        let top = (row as f32 - self.scroll as f32) * self.line_height_px();
        let left = col as f32 * self.cell_width_px();
        CaretMeasure::new(top, left)
    }

    fn line_height(&self) -> f32 {
        self.line_height_px()
    }
}
