//! Echo line and completion panel

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::minibuffer::MinibufferSession;

/// Most candidates shown at once
const MAX_PANEL_ROWS: usize = 8;

/// Prompt label followed by the editable value, with the terminal cursor
pub fn render_prompt(frame: &mut Frame, area: Rect, session: &MinibufferSession) {
    let label = format!("{} ", session.prompt());
    let label_width = (label.width() as u16).min(area.width);

    let label_area = Rect {
        width: label_width,
        ..area
    };
    frame.render_widget(
        Paragraph::new(label).style(Style::default().fg(Color::Cyan)),
        label_area,
    );

    let input_area = Rect {
        x: area.x + label_width,
        width: area.width - label_width,
        ..area
    };
    if input_area.width == 0 {
        return;
    }

    // C-q can put newlines and tabs in the value
    let input = session.input();
    let shown: String = input
        .value()
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let scroll = input.visual_scroll(usize::from(input_area.width));
    frame.render_widget(Paragraph::new(shown).scroll((0, scroll as u16)), input_area);

    let cursor_x = input_area.x + input.visual_cursor().saturating_sub(scroll) as u16;
    frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(1)), input_area.y));
}

/// Plain text on the echo line
pub fn render_message(frame: &mut Frame, area: Rect, message: &str) {
    let line = Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::Yellow),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Candidate list, anchored to the bottom of `area`
pub fn render_candidates(frame: &mut Frame, area: Rect, session: &MinibufferSession) {
    let candidates = session.candidates();
    let rows = candidates
        .len()
        .min(MAX_PANEL_ROWS)
        .min(usize::from(area.height.saturating_sub(2)));
    if rows == 0 {
        return;
    }

    let height = rows as u16 + 2;
    let panel = Rect {
        x: area.x,
        y: area.bottom() - height,
        width: area.width,
        height,
    };
    frame.render_widget(Clear, panel);

    let block = Block::default()
        .title(format!(" {} candidates ", candidates.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(panel);
    frame.render_widget(block, panel);

    let first = window_start(session.selected(), rows);
    let lines: Vec<Line> = candidates
        .iter()
        .enumerate()
        .skip(first)
        .take(rows)
        .map(|(i, candidate)| {
            let style = if session.selected() == Some(i) {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(candidate.clone(), style))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

/// First visible candidate so that the selection stays in view
fn window_start(selected: Option<usize>, rows: usize) -> usize {
    match selected {
        Some(i) if i >= rows => i + 1 - rows,
        _ => 0,
    }
}
