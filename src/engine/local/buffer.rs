//! One open buffer: text, cursor, undo history and file binding
//!
//! All positions are character offsets. Line and column are 1-based.

use std::path::{Path, PathBuf};

use crate::engine::{LineEnding, Snapshot, TextPosition};
use crate::region::Offset;

use super::search::ReplaceState;

/// Maximum undo entries kept per buffer
const MAX_UNDO: usize = 1000;

/// Name of a buffer that is not bound to a file
pub const SCRATCH_NAME: &str = "*scratch*";

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte index of the `char_index`-th character (or the end of `text`)
pub fn char_to_byte(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(idx, _)| idx)
}

// ============================================================================
// Kill ring
// ============================================================================

/// Most recent kills first, bounded
#[derive(Debug, Clone)]
pub struct KillRing {
    entries: Vec<String>,
    capacity: usize,
}

impl KillRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Push a kill to the front; empty kills are ignored
    pub fn push(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.entries.insert(0, text);
        self.entries.truncate(self.capacity);
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Undo
// ============================================================================

#[derive(Debug, Clone)]
struct UndoEntry {
    text: String,
    cursor: Offset,
}

#[derive(Debug, Clone, Default)]
struct UndoHistory {
    undo: Vec<UndoEntry>,
    redo: Vec<UndoEntry>,
}

impl UndoHistory {
    fn push_bounded(stack: &mut Vec<UndoEntry>, entry: UndoEntry) {
        stack.push(entry);
        if stack.len() > MAX_UNDO {
            stack.remove(0);
        }
    }

    fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

// ============================================================================
// Buffer
// ============================================================================

#[derive(Debug, Clone)]
pub struct Buffer {
    text: String,
    cursor: Offset,
    history: UndoHistory,
    modified: bool,
    encoding: String,
    line_ending: LineEnding,
    file_path: Option<PathBuf>,
    status_message: Option<String>,
    pub(super) replace: Option<ReplaceState>,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    /// Empty scratch buffer
    pub fn new() -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            history: UndoHistory::default(),
            modified: false,
            encoding: "UTF-8".to_string(),
            line_ending: LineEnding::platform_default(),
            file_path: None,
            status_message: None,
            replace: None,
        }
    }

    /// Unbound buffer holding `text`, cursor at the start
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::new()
        }
    }

    /// Display name: the file name, or `*scratch*`
    pub fn name(&self) -> String {
        match &self.file_path {
            Some(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string()),
            None => SCRATCH_NAME.to_string(),
        }
    }

    /// Unbound, unmodified and empty
    pub fn is_pristine(&self) -> bool {
        self.file_path.is_none() && !self.modified && self.text.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> Offset {
        self.cursor
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Replace the whole buffer with freshly loaded file content
    pub fn load(&mut self, text: String, encoding: String, line_ending: LineEnding, path: PathBuf) {
        self.text = text;
        self.cursor = 0;
        self.modified = false;
        self.encoding = encoding;
        self.line_ending = line_ending;
        self.file_path = Some(path);
        self.history.clear();
        self.replace = None;
    }

    pub fn set_file_path(&mut self, path: PathBuf) {
        self.file_path = Some(path);
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn snapshot(&self) -> Snapshot {
        let pos = self.position_at(self.cursor);
        Snapshot {
            text: self.text.clone(),
            cursor: self.cursor,
            line: pos.line,
            col: pos.col,
            char_count: self.char_len(),
            modified: self.modified,
            encoding: self.encoding.clone(),
            line_ending: self.line_ending,
            file_path: self.file_path.clone(),
            status_message: self.status_message.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------------

    pub fn position_at(&self, offset: Offset) -> TextPosition {
        let mut line = 1;
        let mut col = 1;
        for (idx, ch) in self.text.chars().enumerate() {
            if idx == offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        TextPosition { line, col }
    }

    /// Offset of a 1-based position, clamping the column to the line's end
    pub fn offset_of(&self, target: TextPosition) -> Option<Offset> {
        if target.line == 0 || target.col == 0 {
            return None;
        }

        let chars: Vec<char> = self.text.chars().collect();
        let mut line = 1;
        let mut cursor = 0;
        while cursor < chars.len() && line < target.line {
            if chars[cursor] == '\n' {
                line += 1;
            }
            cursor += 1;
        }
        if line != target.line {
            return None;
        }

        let mut col = 1;
        while cursor < chars.len() && chars[cursor] != '\n' && col < target.col {
            cursor += 1;
            col += 1;
        }
        Some(cursor)
    }

    pub fn set_cursor(&mut self, cursor: Offset) {
        self.cursor = cursor.min(self.char_len());
    }

    // ------------------------------------------------------------------------
    // Motion
    // ------------------------------------------------------------------------

    pub fn move_forward(&mut self) {
        if self.cursor < self.char_len() {
            self.cursor += 1;
        }
    }

    pub fn move_backward(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_to_line_start(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        while self.cursor > 0 && chars[self.cursor - 1] != '\n' {
            self.cursor -= 1;
        }
    }

    pub fn move_to_line_end(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        while self.cursor < chars.len() && chars[self.cursor] != '\n' {
            self.cursor += 1;
        }
    }

    pub fn move_next_line(&mut self) {
        let pos = self.position_at(self.cursor);
        let target = TextPosition {
            line: pos.line + 1,
            col: pos.col,
        };
        if let Some(cursor) = self.offset_of(target) {
            self.cursor = cursor;
        }
    }

    pub fn move_previous_line(&mut self) {
        let pos = self.position_at(self.cursor);
        if pos.line <= 1 {
            return;
        }
        let target = TextPosition {
            line: pos.line - 1,
            col: pos.col,
        };
        if let Some(cursor) = self.offset_of(target) {
            self.cursor = cursor;
        }
    }

    pub fn move_forward_word(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        while self.cursor < chars.len() && is_word_char(chars[self.cursor]) {
            self.cursor += 1;
        }
        while self.cursor < chars.len() && !is_word_char(chars[self.cursor]) {
            self.cursor += 1;
        }
    }

    pub fn move_backward_word(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        if self.cursor == 0 || chars.is_empty() {
            return;
        }
        let mut pos = self.cursor.min(chars.len()) - 1;
        while pos > 0 && !is_word_char(chars[pos]) {
            pos -= 1;
        }
        while pos > 0 && is_word_char(chars[pos - 1]) {
            pos -= 1;
        }
        self.cursor = pos;
    }

    pub fn move_to_buffer_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_buffer_end(&mut self) {
        self.cursor = self.char_len();
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    fn record_undo(&mut self) {
        let entry = UndoEntry {
            text: self.text.clone(),
            cursor: self.cursor,
        };
        UndoHistory::push_bounded(&mut self.history.undo, entry);
        self.history.redo.clear();
    }

    pub(super) fn insert_at(&mut self, offset: Offset, s: &str) {
        let byte = char_to_byte(&self.text, offset);
        self.text.insert_str(byte, s);
    }

    pub(super) fn remove_range(&mut self, start: Offset, end: Offset) {
        if start >= end {
            return;
        }
        let start_byte = char_to_byte(&self.text, start);
        let end_byte = char_to_byte(&self.text, end);
        self.text.replace_range(start_byte..end_byte, "");
    }

    fn slice(&self, start: Offset, end: Offset) -> String {
        self.text.chars().skip(start).take(end.saturating_sub(start)).collect()
    }

    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.record_undo();
        self.insert_at(self.cursor, text);
        self.cursor += text.chars().count();
        self.modified = true;
        self.status_message = None;
    }

    pub fn delete_char(&mut self) {
        if self.cursor >= self.char_len() {
            return;
        }
        self.record_undo();
        self.remove_range(self.cursor, self.cursor + 1);
        self.modified = true;
        self.status_message = None;
    }

    pub fn delete_backward_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.record_undo();
        self.remove_range(self.cursor - 1, self.cursor);
        self.cursor -= 1;
        self.modified = true;
        self.status_message = None;
    }

    /// Kill to end of line, taking the newline too
    pub fn kill_line(&mut self, kill_ring: &mut KillRing) {
        let chars: Vec<char> = self.text.chars().collect();
        if self.cursor >= chars.len() {
            return;
        }

        let mut end = self.cursor;
        while end < chars.len() && chars[end] != '\n' {
            end += 1;
        }
        if end < chars.len() {
            end += 1;
        }

        let killed: String = chars[self.cursor..end].iter().collect();
        self.record_undo();
        self.remove_range(self.cursor, end);
        kill_ring.push(killed);
        self.modified = true;
        self.set_status("Killed line");
    }

    pub fn copy_region(&mut self, start: Offset, end: Offset, kill_ring: &mut KillRing) {
        let end = end.min(self.char_len());
        if start >= end {
            return;
        }
        kill_ring.push(self.slice(start, end));
        self.set_status("Copied region");
    }

    pub fn kill_region(&mut self, start: Offset, end: Offset, kill_ring: &mut KillRing) {
        let end = end.min(self.char_len());
        if start >= end {
            return;
        }
        let killed = self.slice(start, end);
        self.record_undo();
        self.remove_range(start, end);
        self.cursor = start.min(self.char_len());
        kill_ring.push(killed);
        self.modified = true;
        self.set_status("Killed region");
    }

    pub fn yank(&mut self, kill_ring: &KillRing) {
        let Some(text) = kill_ring.latest().map(str::to_string) else {
            self.set_status("Kill ring empty");
            return;
        };
        self.record_undo();
        self.insert_at(self.cursor, &text);
        self.cursor += text.chars().count();
        self.modified = true;
        self.set_status("Yank");
    }

    /// Replace `[start, end)` as one undoable step
    pub(super) fn replace_range(&mut self, start: Offset, end: Offset, replacement: &str) {
        self.record_undo();
        self.remove_range(start, end);
        self.insert_at(start, replacement);
        self.modified = true;
    }

    pub fn undo(&mut self) {
        let Some(prev) = self.history.undo.pop() else {
            self.set_status("Undo: no more changes");
            return;
        };
        let current = UndoEntry {
            text: std::mem::take(&mut self.text),
            cursor: self.cursor,
        };
        UndoHistory::push_bounded(&mut self.history.redo, current);
        self.text = prev.text;
        self.cursor = prev.cursor.min(self.char_len());
        self.modified = true;
        self.set_status("Undo");
    }

    pub fn redo(&mut self) {
        let Some(next) = self.history.redo.pop() else {
            self.set_status("Redo: no more changes");
            return;
        };
        let current = UndoEntry {
            text: std::mem::take(&mut self.text),
            cursor: self.cursor,
        };
        UndoHistory::push_bounded(&mut self.history.undo, current);
        self.text = next.text;
        self.cursor = next.cursor.min(self.char_len());
        self.modified = true;
        self.set_status("Redo");
    }
}
