//! Application state and core logic
//!
//! `App` owns the dispatcher (talking to the engine worker), the event queue
//! and the persisted UI state. The main loop pushes terminal events in,
//! calls `process_events` and draws.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::event::Event;
use ratatui::layout::Rect;
use tracing::{info, warn};

use crate::config::{Config, UiState};
use crate::dispatcher::{Dispatcher, EventOutcome};
use crate::engine::worker::EngineHandle;
use crate::engine::DocumentEngine;
use crate::input::{EventQueue, EventSender, InputEvent};
use crate::surface::EditorSurface;
use crate::ui;

/// Delay before a changed UI state is written out
const STATE_SAVE_DELAY: Duration = Duration::from_millis(500);

pub struct App {
    dispatcher: Dispatcher<EngineHandle>,
    queue: EventQueue,
    ui_state: UiState,
    /// Where `ui_state` is saved; `None` disables persistence
    state_path: Option<PathBuf>,
    /// Font size last seen on the dispatcher
    font_size: u16,
    /// UI state changed and is not saved yet
    dirty: bool,
    last_change: Instant,
}

impl App {
    /// Start `engine` on its worker thread and build the app around it
    pub fn new<E>(
        engine: E,
        config: &Config,
        ui_state: UiState,
        state_path: Option<PathBuf>,
    ) -> std::io::Result<Self>
    where
        E: DocumentEngine + Send + 'static,
    {
        let handle = EngineHandle::spawn(engine)?;
        let font_size = ui_state.font_size_or(config.font_size);
        let surface = EditorSurface::new(config.tab_width, font_size);

        Ok(Self {
            dispatcher: Dispatcher::new(handle, surface),
            queue: EventQueue::new(),
            ui_state,
            state_path,
            font_size,
            dirty: false,
            last_change: Instant::now(),
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher<EngineHandle> {
        &self.dispatcher
    }

    /// Handle for producers outside the main loop
    pub fn sender(&self) -> EventSender {
        self.queue.sender()
    }

    /// Load the first buffer. A failure is shown, not fatal.
    pub fn initialize(&mut self, width: u16, height: u16) {
        self.on_resize(width, height);
        if let Err(err) = self.dispatcher.initialize() {
            warn!(target: "dispatch", error = %err, "initial snapshot failed");
            self.dispatcher
                .surface_mut()
                .set_status(format!("Error: {}", err));
        }
    }

    /// Queue files named on the command line
    pub fn open_paths(&self, paths: &[PathBuf]) {
        for path in paths {
            self.queue.push(InputEvent::Open(path.clone()));
        }
    }

    /// Queue a terminal event
    pub fn push_terminal_event(&self, event: Event) {
        if let Some(event) = InputEvent::from_terminal(event) {
            self.queue.push(event);
        }
    }

    /// Handle everything queued so far. Returns true when the editor
    /// should quit.
    pub fn process_events(&mut self) -> bool {
        while let Some(event) = self.queue.try_pop() {
            if let InputEvent::Resize { width, height } = event {
                self.on_resize(width, height);
                continue;
            }

            let outcome = self.dispatcher.handle_event(event);
            self.track_font_size();
            if outcome == EventOutcome::Quit {
                info!(target: "dispatch", "quit");
                return true;
            }
        }
        false
    }

    /// Fit the text area to a new terminal size
    pub fn on_resize(&mut self, width: u16, height: u16) {
        let area = ui::editor_area(Rect::new(0, 0, width, height));
        self.dispatcher.surface_mut().resize(area);
    }

    /// Remember a font size changed with C-= / C--
    fn track_font_size(&mut self) {
        let size = self.dispatcher.state().font_size;
        if size == self.font_size {
            return;
        }
        self.font_size = size;
        self.ui_state.font_size = Some(size);
        self.dirty = true;
        self.last_change = Instant::now();
    }

    /// Save the UI state once changes have settled
    pub fn maybe_save_state(&mut self) {
        if self.dirty && self.last_change.elapsed() > STATE_SAVE_DELAY {
            self.save_state();
        }
    }

    /// Save the UI state now if it changed
    pub fn save_state(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        let Some(path) = &self.state_path else {
            return;
        };
        if let Err(err) = self.ui_state.save(path) {
            warn!(target: "config", path = %path.display(), error = %err, "failed to save UI state");
        }
    }
}
