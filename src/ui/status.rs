//! Status line

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::surface::EditorSurface;

pub fn render(frame: &mut Frame, area: Rect, surface: &EditorSurface) {
    let style = Style::default().fg(Color::White).bg(Color::DarkGray);

    let mut spans = vec![Span::raw(surface.status().to_string())];
    if surface.is_composing() {
        spans.push(Span::styled(
            "  [IME]",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(style), area);
}
