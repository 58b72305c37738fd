//! UI rendering using ratatui
//!
//! Screen layout, top to bottom: the text area, one status line, and one
//! echo line for the minibuffer or the query-replace question. Candidate
//! panels and the confirm dialog are drawn over the text area.

mod confirm_dialog;
mod editor;
mod minibuffer;
mod status;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use crate::app::App;
use crate::dispatcher::Dispatcher;
use crate::engine::DocumentEngine;
use crate::mode::Modal;

/// The three screen regions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub editor: Rect,
    pub status: Rect,
    pub echo: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // Text
                Constraint::Length(1), // Status line
                Constraint::Length(1), // Echo line
            ])
            .split(area);

        Self {
            editor: chunks[0],
            status: chunks[1],
            echo: chunks[2],
        }
    }
}

/// Text area for a terminal of the given size
pub fn editor_area(area: Rect) -> Rect {
    ScreenLayout::new(area).editor
}

/// Main render function - draws the entire UI
pub fn render(frame: &mut Frame, app: &App) {
    draw(frame, app.dispatcher());
}

/// Draw one dispatcher's view
pub fn draw<E: DocumentEngine>(frame: &mut Frame, dispatcher: &Dispatcher<E>) {
    let layout = ScreenLayout::new(frame.area());
    let surface = dispatcher.surface();

    editor::render(frame, layout.editor, surface);
    status::render(frame, layout.status, surface);

    match dispatcher.modal() {
        Modal::Minibuffer { session, .. } => {
            minibuffer::render_prompt(frame, layout.echo, session);
            if session.shows_candidates() {
                minibuffer::render_candidates(frame, layout.editor, session);
            }
        }
        Modal::QueryReplace(session) => {
            minibuffer::render_message(frame, layout.echo, &session.prompt());
            place_caret(frame, dispatcher);
        }
        Modal::Confirm(dialog) => {
            confirm_dialog::render(frame, layout.editor, dialog);
        }
        Modal::None => {
            place_caret(frame, dispatcher);
        }
    }
}

fn place_caret<E: DocumentEngine>(frame: &mut Frame, dispatcher: &Dispatcher<E>) {
    if let Some(cell) = dispatcher.surface().caret_cell() {
        frame.set_cursor_position(cell);
    }
}
