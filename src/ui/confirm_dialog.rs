//! Confirm dialog UI rendering

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::confirm_dialog::ConfirmDialog;

/// Render the confirm dialog centered in `area`
pub fn render(frame: &mut Frame, area: Rect, dialog: &ConfirmDialog) {
    if !dialog.visible {
        return;
    }

    let message: Vec<&str> = dialog.message.lines().collect();
    let longest = message.iter().map(|line| line.width()).max().unwrap_or(0);

    // Calculate centered popup dimensions
    let popup_width = (longest as u16 + 6).max(30).min(area.width);
    let popup_height = (message.len() as u16 + 5).min(area.height);
    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect {
        x: popup_x,
        y: popup_y,
        width: popup_width,
        height: popup_height,
    };

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Confirm ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let mut lines = vec![Line::from("")];
    lines.extend(message.iter().map(|text| {
        Line::from(Span::styled(
            text.to_string(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
    }));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("[y]", Style::default().fg(Color::Green)),
        Span::raw(" Yes  "),
        Span::styled("[n]", Style::default().fg(Color::Red)),
        Span::raw(" No"),
    ]));

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}
