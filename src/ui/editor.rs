//! Text area: wrapped rows with the selection highlighted

use std::mem;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::region::Region;
use crate::surface::layout::{Row, WrapLayout};
use crate::surface::EditorSurface;

const SELECTION_BG: Color = Color::Rgb(60, 70, 110);

/// Render the visible rows of the surface
pub fn render(frame: &mut Frame, area: Rect, surface: &EditorSurface) {
    let layout = surface.layout();
    let selection = surface.selection();

    let lines: Vec<Line> = layout
        .rows()
        .iter()
        .skip(surface.scroll())
        .take(usize::from(area.height))
        .map(|row| row_line(layout, row, selection))
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

/// One row as spans, split where the selection starts or ends
fn row_line(layout: &WrapLayout, row: &Row, selection: Region) -> Line<'static> {
    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_selected = false;

    for cell in layout.cells(row) {
        let selected = cell.offset >= selection.start && cell.offset < selection.end;
        if selected != run_selected && !run.is_empty() {
            spans.push(styled(mem::take(&mut run), run_selected));
        }
        run_selected = selected;

        match cell.ch {
            '\t' => run.extend(std::iter::repeat_n(' ', cell.width)),
            c if c.is_control() => run.push(' '),
            c => run.push(c),
        }
    }
    if !run.is_empty() {
        spans.push(styled(run, run_selected));
    }

    Line::from(spans)
}

fn styled(text: String, selected: bool) -> Span<'static> {
    if selected {
        Span::styled(text, Style::default().bg(SELECTION_BG))
    } else {
        Span::raw(text)
    }
}
