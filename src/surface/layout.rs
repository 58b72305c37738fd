//! Soft-wrap layout
//!
//! Splits text into rendered rows no wider than the viewport. Wrapping is by
//! character using terminal display widths, tabs expand to the next tab
//! stop, and a newline always ends a row.

use unicode_width::UnicodeWidthChar;

use crate::region::Offset;

/// One rendered row: `start..end` are character offsets, `end` excludes any
/// terminating newline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub start: Offset,
    pub end: Offset,
    /// Zero-based logical line the row belongs to
    pub line: usize,
}

impl Row {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A character placed on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub offset: Offset,
    pub ch: char,
    /// Display column of the cell's left edge
    pub col: usize,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapLayout {
    chars: Vec<char>,
    rows: Vec<Row>,
    width: usize,
    tab_width: usize,
}

impl WrapLayout {
    pub fn new(text: &str, width: u16, tab_width: usize) -> Self {
        let mut layout = Self {
            chars: text.chars().collect(),
            rows: Vec::new(),
            width: usize::from(width.max(1)),
            tab_width: tab_width.max(1),
        };
        layout.rows = layout.compute_rows();
        layout
    }

    fn char_width(&self, ch: char, col: usize) -> usize {
        match ch {
            '\t' => self.tab_width - col % self.tab_width,
            _ => ch.width().unwrap_or(0).max(1),
        }
    }

    fn compute_rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut line = 0;
        let mut start = 0;
        let mut col = 0;

        for (offset, &ch) in self.chars.iter().enumerate() {
            if ch == '\n' {
                rows.push(Row { start, end: offset, line });
                line += 1;
                start = offset + 1;
                col = 0;
                continue;
            }

            let w = self.char_width(ch, col);
            if col > 0 && col + w > self.width {
                rows.push(Row { start, end: offset, line });
                start = offset;
                col = self.char_width(ch, 0);
            } else {
                col += w;
            }
        }

        rows.push(Row {
            start,
            end: self.chars.len(),
            line,
        });
        rows
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn char_len(&self) -> usize {
        self.chars.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Row holding the caret at `offset`. At a soft wrap the caret belongs
    /// to the start of the following row.
    pub fn row_of(&self, offset: Offset) -> usize {
        let offset = offset.min(self.chars.len());
        self.rows
            .partition_point(|row| row.start <= offset)
            .saturating_sub(1)
    }

    /// (row, display column) of the caret at `offset`
    pub fn position_of(&self, offset: Offset) -> (usize, usize) {
        let offset = offset.min(self.chars.len());
        let row_index = self.row_of(offset);
        let row = self.rows[row_index];
        let mut col = 0;
        for &ch in &self.chars[row.start..offset.min(row.end)] {
            col += self.char_width(ch, col);
        }
        (row_index, col)
    }

    /// Offset whose cell covers display column `col` of `row`; past the end
    /// of the row this is the row end
    pub fn offset_at(&self, row: usize, col: usize) -> Offset {
        let Some(row) = self.rows.get(row).or(self.rows.last()) else {
            return 0;
        };
        self.cells(row)
            .into_iter()
            .find(|cell| col < cell.col + cell.width)
            .map_or(row.end, |cell| cell.offset)
    }

    /// Cells of one row, tabs included with their expanded width
    pub fn cells(&self, row: &Row) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(row.len());
        let mut col = 0;
        for offset in row.start..row.end {
            let ch = self.chars[offset];
            let width = self.char_width(ch, col);
            cells.push(Cell {
                offset,
                ch,
                col,
                width,
            });
            col += width;
        }
        cells
    }
}
