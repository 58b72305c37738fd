//! Key dispatcher
//!
//! Turns input events into engine calls and keeps the session-local state
//! that sits between keystrokes: the C-x prefix, the mark, the last search,
//! the recenter cycle and the font size. Events are handled one at a time,
//! and every engine call finishes before the next event is looked at.
//!
//! Commands that need an answer from the user open a `Modal`; the modal
//! carries what to do with the answer, and the following keys go to it
//! until it resolves. See `prompts.rs` for those continuations and
//! `files.rs` for the C-x commands.

mod files;
mod prompts;


use std::path::PathBuf;

use tracing::{debug, warn};

use crate::command::EditorCommand;
use crate::config::clamp_font_size;
use crate::engine::{DocumentEngine, EngineError, EngineResult, Snapshot};
use crate::input::InputEvent;
use crate::keys::{self, Binding, KeyChord, SearchDirection};
use crate::minibuffer::PromptOptions;
use crate::mode::{DispatchMode, Modal, PromptPurpose};
use crate::region::{MarkTracker, Region};
use crate::surface::{EditorSurface, RecenterMode};
use crate::visual_line::{self, Direction};

/// Status shown while a C-x sequence is pending
const PREFIX_STATUS: &str = "C-x-";

/// State kept between keystrokes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub prefix_active: bool,
    pub mark: MarkTracker,
    pub last_search_query: Option<String>,
    pub last_search_direction: Option<SearchDirection>,
    /// File of the last rendered snapshot
    pub current_file_path: Option<PathBuf>,
    /// Engine's default save directory, fetched once
    pub default_dir_cache: Option<PathBuf>,
    pub composing: bool,
    /// Last recenter position applied
    pub recenter: RecenterMode,
    pub font_size: u16,
}

impl SessionState {
    pub fn new(font_size: u16) -> Self {
        Self {
            prefix_active: false,
            mark: MarkTracker::new(),
            last_search_query: None,
            last_search_direction: None,
            current_file_path: None,
            default_dir_cache: None,
            composing: false,
            recenter: RecenterMode::default(),
            font_size,
        }
    }

    pub fn mode(&self) -> DispatchMode {
        if self.composing {
            DispatchMode::Composing
        } else if self.prefix_active {
            DispatchMode::PrefixPending
        } else {
            DispatchMode::Idle
        }
    }
}

/// What the main loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    Quit,
}

pub struct Dispatcher<E: DocumentEngine> {
    engine: E,
    surface: EditorSurface,
    state: SessionState,
    modal: Modal,
    /// Last snapshot rendered, shown again when even a fallback fails
    last_snapshot: Snapshot,
}

impl<E: DocumentEngine> Dispatcher<E> {
    pub fn new(engine: E, surface: EditorSurface) -> Self {
        let state = SessionState::new(surface.font_size());
        Self {
            engine,
            surface,
            state,
            modal: Modal::None,
            last_snapshot: Snapshot::default(),
        }
    }

    /// Fetch and render the initial buffer
    pub fn initialize(&mut self) -> EngineResult<()> {
        let snapshot = self.engine.initialize()?;
        self.render_and_track(snapshot, None, false);
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn surface(&self) -> &EditorSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut EditorSurface {
        &mut self.surface
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn last_snapshot(&self) -> &Snapshot {
        &self.last_snapshot
    }

    pub fn mode(&self) -> DispatchMode {
        self.state.mode()
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Handle one event from the queue
    pub fn handle_event(&mut self, event: InputEvent) -> EventOutcome {
        match event {
            InputEvent::Key(chord) => self.handle_key(chord),
            InputEvent::CompositionStart => {
                self.state.composing = true;
                self.surface.set_composing(true);
                EventOutcome::Continue
            }
            InputEvent::CompositionEnd(text) => {
                self.state.composing = false;
                let result = match text {
                    Some(text) => self.typed_text(text),
                    None => Ok(EventOutcome::Continue),
                };
                self.surface.set_composing(false);
                self.finish(result)
            }
            InputEvent::InsertText(text) => {
                if self.state.composing {
                    return EventOutcome::Continue;
                }
                let result = self.typed_text(text);
                self.finish(result)
            }
            InputEvent::Click { column, row } => {
                self.click(column, row);
                EventOutcome::Continue
            }
            InputEvent::Scroll(delta) => {
                self.surface.scroll_by(delta);
                EventOutcome::Continue
            }
            InputEvent::Open(path) => {
                let result = self.open_external(path);
                self.finish(result)
            }
            // Layout is owned by the frontend
            InputEvent::Resize { .. } => EventOutcome::Continue,
        }
    }

    /// Handle one key press
    pub fn handle_key(&mut self, chord: KeyChord) -> EventOutcome {
        if self.state.composing {
            return EventOutcome::Continue;
        }

        let result = match self.modal.take() {
            Modal::None => self.dispatch_key(chord),
            Modal::Minibuffer { session, purpose } => self.minibuffer_key(session, purpose, chord),
            Modal::Confirm(dialog) => self.confirm_key(dialog, chord),
            Modal::QueryReplace(session) => self.query_replace_key(session, chord),
        };
        self.finish(result)
    }

    /// Report a failed handler on the status line
    fn finish(&mut self, result: EngineResult<EventOutcome>) -> EventOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.render_error(&err);
                EventOutcome::Continue
            }
        }
    }

    fn dispatch_key(&mut self, chord: KeyChord) -> EngineResult<EventOutcome> {
        if self.state.prefix_active {
            return self.dispatch_prefix(chord);
        }

        let Some(binding) = keys::lookup(&chord) else {
            return Ok(EventOutcome::Continue);
        };
        debug!(target: "dispatch", mode = self.state.mode().as_str(), ?binding, "key");

        match binding {
            Binding::Undo => self.edit(EditorCommand::Undo),
            Binding::Redo => self.edit(EditorCommand::Redo),
            Binding::KillLine => self.edit(EditorCommand::KillLine),
            Binding::Yank => self.edit(EditorCommand::Yank),
            Binding::DeleteBackward => self.edit(EditorCommand::DeleteBackwardChar),
            Binding::KillRegion => self.region_command(EditorCommand::kill_region),
            Binding::CopyRegion => self.region_command(EditorCommand::copy_region),
            Binding::Isearch(direction) => self.isearch(direction),
            Binding::KeyboardQuit => self.keyboard_quit(),
            Binding::Newline => {
                self.state.mark.clear_mark();
                self.sync_cursor()?;
                self.insert_text("\n".to_string())
            }
            Binding::OpenLine => self.open_line(),
            Binding::Recenter => self.recenter(),
            Binding::SetMark => self.set_mark(),
            Binding::Prefix => {
                self.state.prefix_active = true;
                self.render_with_prefix()?;
                Ok(EventOutcome::Continue)
            }
            Binding::FontSize(delta) => self.adjust_font_size(delta),
            Binding::QueryReplace => {
                self.state.mark.clear_mark();
                self.modal = Modal::prompt(
                    "Replace:",
                    "",
                    PromptOptions::untrimmed(),
                    PromptPurpose::ReplaceQuery,
                );
                Ok(EventOutcome::Continue)
            }
            Binding::VisualLine(direction) => self.visual_line(direction),
            Binding::Command(command) => self.motion_or_edit(command),
            Binding::Insert(text) => self.insert_text(text),
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Render a snapshot; with `preserve_mark` the mark-to-caret selection is
    /// drawn again
    fn render_and_track(&mut self, snapshot: Snapshot, status: Option<&str>, preserve_mark: bool) {
        self.state.current_file_path = snapshot.file_path.clone();
        self.surface.render(&snapshot, status);
        if preserve_mark {
            if let Some(mark) = self.state.mark.mark() {
                self.surface.select_from(mark);
            }
        }
        self.last_snapshot = snapshot;
    }

    /// Refresh from a `noop`, showing `C-x-` while the prefix is pending
    fn render_with_prefix(&mut self) -> EngineResult<()> {
        let snapshot = self.engine.run(EditorCommand::Noop)?;
        let status = self.state.prefix_active.then_some(PREFIX_STATUS);
        self.render_and_track(snapshot, status, false);
        Ok(())
    }

    /// Show `Error: ...` over a fresh snapshot, or over the last one if the
    /// engine cannot even answer a `noop`
    fn render_error(&mut self, err: &EngineError) {
        warn!(target: "dispatch", error = %err, kind = ?err.kind(), "command failed");
        let message = format!("Error: {}", err);
        match self.engine.run(EditorCommand::Noop) {
            Ok(snapshot) => self.render_and_track(snapshot, Some(&message), false),
            Err(fallback_err) => {
                warn!(target: "dispatch", error = %fallback_err, "fallback snapshot failed");
                self.surface.set_status(message);
            }
        }
    }

    /// Move the engine cursor to the caret shown on screen
    fn sync_cursor(&mut self) -> EngineResult<()> {
        let cursor = self.surface.caret();
        let snapshot = self.engine.run(EditorCommand::SetCursor { cursor })?;
        self.state.current_file_path = snapshot.file_path;
        Ok(())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Destructive command at the caret; always drops the mark
    fn edit(&mut self, command: EditorCommand) -> EngineResult<EventOutcome> {
        self.state.mark.clear_mark();
        self.sync_cursor()?;
        let snapshot = self.engine.run(command)?;
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }

    /// Pasted or composed text: goes to an open minibuffer, is dropped by
    /// other modals, and is inserted into the document otherwise
    fn typed_text(&mut self, text: String) -> EngineResult<EventOutcome> {
        match &mut self.modal {
            Modal::Minibuffer { session, .. } => {
                session.insert_str(&text);
                Ok(EventOutcome::Continue)
            }
            Modal::None => self.insert_text(text),
            _ => {
                debug!(target: "dispatch", chars = text.chars().count(), "text dropped while a prompt is open");
                Ok(EventOutcome::Continue)
            }
        }
    }

    fn insert_text(&mut self, text: String) -> EngineResult<EventOutcome> {
        if text.is_empty() {
            return Ok(EventOutcome::Continue);
        }
        self.state.mark.clear_mark();
        let snapshot = self.engine.run(EditorCommand::InsertText { text })?;
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }

    /// The region a kill/copy would act on
    pub fn active_region(&self) -> Option<Region> {
        self.state
            .mark
            .active_region(self.surface.anchor(), self.surface.caret())
    }

    fn region_command(&mut self, make: fn(Region) -> EditorCommand) -> EngineResult<EventOutcome> {
        let Some(region) = self.active_region() else {
            let snapshot = self.engine.run(EditorCommand::Noop)?;
            self.render_and_track(snapshot, Some("No active region"), false);
            return Ok(EventOutcome::Continue);
        };

        let snapshot = self.engine.run(make(region))?;
        self.state.mark.clear_mark();
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }

    /// Repeat the last search in the same direction, otherwise ask
    fn isearch(&mut self, direction: SearchDirection) -> EngineResult<EventOutcome> {
        self.state.mark.clear_mark();

        let repeat = self
            .state
            .last_search_query
            .clone()
            .filter(|q| !q.is_empty() && self.state.last_search_direction == Some(direction));

        match repeat {
            Some(query) => self.run_search(direction, query),
            None => {
                let initial = self.state.last_search_query.clone().unwrap_or_default();
                self.modal = Modal::prompt(
                    direction.prompt(),
                    initial,
                    PromptOptions::untrimmed(),
                    PromptPurpose::Search(direction),
                );
                Ok(EventOutcome::Continue)
            }
        }
    }

    fn run_search(&mut self, direction: SearchDirection, query: String) -> EngineResult<EventOutcome> {
        self.sync_cursor()?;
        let snapshot = self.engine.run(direction.command(query.clone()))?;
        self.state.last_search_query = Some(query);
        self.state.last_search_direction = Some(direction);
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }

    fn keyboard_quit(&mut self) -> EngineResult<EventOutcome> {
        self.state.prefix_active = false;
        self.state.mark.clear_mark();
        let snapshot = self.engine.run(EditorCommand::KeyboardQuit)?;
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }

    /// Insert a newline but leave the caret where it was
    fn open_line(&mut self) -> EngineResult<EventOutcome> {
        self.state.mark.clear_mark();
        self.sync_cursor()?;
        let cursor = self.surface.caret();
        self.engine.run(EditorCommand::insert("\n"))?;
        let snapshot = self.engine.run(EditorCommand::SetCursor { cursor })?;
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }

    fn recenter(&mut self) -> EngineResult<EventOutcome> {
        let mode = self.state.recenter.next();
        self.state.recenter = mode;
        let snapshot = self.engine.run(EditorCommand::Noop)?;
        let status = format!("Recenter: {}", mode.as_str());
        self.render_and_track(snapshot, Some(&status), true);
        self.surface.recenter(mode);
        Ok(EventOutcome::Continue)
    }

    fn set_mark(&mut self) -> EngineResult<EventOutcome> {
        self.state.mark.set_mark(self.surface.caret());
        let snapshot = self.engine.run(EditorCommand::Noop)?;
        self.render_and_track(snapshot, Some("Mark set"), false);
        Ok(EventOutcome::Continue)
    }

    fn adjust_font_size(&mut self, delta: i16) -> EngineResult<EventOutcome> {
        self.state.mark.clear_mark();
        let size = clamp_font_size(i32::from(self.state.font_size) + i32::from(delta));
        self.state.font_size = size;
        self.surface.set_font_size(size);
        let snapshot = self.engine.run(EditorCommand::Noop)?;
        let status = format!("Font size: {}px", size);
        self.render_and_track(snapshot, Some(&status), false);
        Ok(EventOutcome::Continue)
    }

    /// Move to the adjacent rendered row; keeps the mark like any motion
    fn visual_line(&mut self, direction: Direction) -> EngineResult<EventOutcome> {
        self.state.prefix_active = false;
        let target = visual_line::navigate(
            &self.surface,
            self.surface.caret(),
            self.surface.char_len(),
            direction,
        );
        let snapshot = self.engine.run(EditorCommand::SetCursor { cursor: target })?;
        self.render_and_track(snapshot, None, true);
        Ok(EventOutcome::Continue)
    }

    fn motion_or_edit(&mut self, command: EditorCommand) -> EngineResult<EventOutcome> {
        self.state.prefix_active = false;
        self.sync_cursor()?;
        let preserve = command.is_motion() && self.state.mark.is_set();
        let snapshot = self.engine.run(command)?;
        self.render_and_track(snapshot, None, preserve);
        if !preserve {
            self.state.mark.clear_mark();
        }
        Ok(EventOutcome::Continue)
    }

    /// Put the caret under a clicked cell and tell the engine
    fn click(&mut self, column: u16, row: u16) {
        if self.modal.is_open() {
            return;
        }
        let Some(offset) = self.surface.offset_at_cell(column, row) else {
            return;
        };
        self.surface.set_caret(offset);
        self.state.mark.clear_mark();
        if let Err(err) = self.sync_cursor() {
            debug!(target: "dispatch", error = %err, "cursor sync after click failed");
        }
    }
}
