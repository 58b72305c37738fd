//! In-process reference document engine
//!
//! Holds any number of buffers plus a shared kill ring. Exactly one buffer is
//! current; `C-x b` defaults to the previously current one.

mod buffer;
mod files;
mod search;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use buffer::{Buffer, KillRing, SCRATCH_NAME};
pub use files::{backup_path, path_completions, MAX_COMPLETIONS};

use super::{
    BufferList, DocumentEngine, EngineError, EngineResult, ReplaceResponse, Snapshot,
};
use crate::command::EditorCommand;
use crate::query_replace::ReplaceAction;

/// Kill ring capacity when none is configured
pub const DEFAULT_KILL_RING_SIZE: usize = 10;

/// Engine tunables, usually taken from `Config`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub kill_ring_size: usize,
    /// Overrides the home directory as the default save location
    pub default_save_dir: Option<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            kill_ring_size: DEFAULT_KILL_RING_SIZE,
            default_save_dir: None,
        }
    }
}

/// Multi-buffer engine living in this process
#[derive(Debug, Clone)]
pub struct LocalEngine {
    buffers: Vec<Buffer>,
    current: usize,
    previous: usize,
    kill_ring: KillRing,
    settings: EngineSettings,
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl LocalEngine {
    /// Engine with a single empty scratch buffer
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            buffers: vec![Buffer::new()],
            current: 0,
            previous: 0,
            kill_ring: KillRing::new(settings.kill_ring_size),
            settings,
        }
    }

    /// Engine whose scratch buffer already holds `text`
    pub fn with_text(text: &str) -> Self {
        let mut engine = Self::default();
        engine.buffers[0] = Buffer::with_text(text);
        engine
    }

    pub fn current(&self) -> &Buffer {
        &self.buffers[self.current]
    }

    fn current_mut(&mut self) -> &mut Buffer {
        &mut self.buffers[self.current]
    }

    pub fn kill_ring(&self) -> &KillRing {
        &self.kill_ring
    }

    pub fn buffer_names(&self) -> Vec<String> {
        self.buffers.iter().map(Buffer::name).collect()
    }

    fn switch_to_index(&mut self, index: usize) {
        if index != self.current {
            self.previous = self.current;
            self.current = index;
        }
    }

    fn find_buffer_by_path(&self, path: &Path) -> Option<usize> {
        self.buffers
            .iter()
            .position(|b| b.file_path() == Some(path))
    }

    /// Previously current buffer, else any other buffer, else this one
    pub fn default_switch_name(&self) -> String {
        if self.previous < self.buffers.len() && self.previous != self.current {
            return self.buffers[self.previous].name();
        }
        self.buffers
            .iter()
            .enumerate()
            .find(|(i, _)| *i != self.current)
            .map(|(_, b)| b.name())
            .unwrap_or_else(|| self.current().name())
    }

    fn snapshot(&self) -> Snapshot {
        self.current().snapshot()
    }

    fn apply(&mut self, command: EditorCommand) -> EngineResult<()> {
        let index = self.current;
        let buf = &mut self.buffers[index];
        let kill_ring = &mut self.kill_ring;

        match command {
            EditorCommand::Noop => {}
            EditorCommand::KeyboardQuit => {
                buf.cancel_replace();
                buf.set_status("Quit");
            }
            EditorCommand::MoveToLineStart => buf.move_to_line_start(),
            EditorCommand::MoveToLineEnd => buf.move_to_line_end(),
            EditorCommand::MoveForward => buf.move_forward(),
            EditorCommand::MoveBackward => buf.move_backward(),
            EditorCommand::MoveNextLine => buf.move_next_line(),
            EditorCommand::MovePreviousLine => buf.move_previous_line(),
            EditorCommand::MoveForwardWord => buf.move_forward_word(),
            EditorCommand::MoveBackwardWord => buf.move_backward_word(),
            EditorCommand::MoveToBufferStart => buf.move_to_buffer_start(),
            EditorCommand::MoveToBufferEnd => buf.move_to_buffer_end(),
            EditorCommand::SetCursor { cursor } => buf.set_cursor(cursor),
            EditorCommand::DeleteChar => buf.delete_char(),
            EditorCommand::DeleteBackwardChar => buf.delete_backward_char(),
            EditorCommand::KillLine => buf.kill_line(kill_ring),
            EditorCommand::Yank => buf.yank(kill_ring),
            EditorCommand::Undo => buf.undo(),
            EditorCommand::Redo => buf.redo(),
            EditorCommand::InsertText { text } => buf.insert_text(&text),
            EditorCommand::KillRegion { start, end } => buf.kill_region(start, end, kill_ring),
            EditorCommand::CopyRegion { start, end } => buf.copy_region(start, end, kill_ring),
            EditorCommand::IsearchForward { query } => buf.isearch_forward(&query)?,
            EditorCommand::IsearchBackward { query } => buf.isearch_backward(&query)?,
        }
        Ok(())
    }
}

impl DocumentEngine for LocalEngine {
    fn initialize(&mut self) -> EngineResult<Snapshot> {
        Ok(self.snapshot())
    }

    fn run(&mut self, command: EditorCommand) -> EngineResult<Snapshot> {
        self.apply(command)?;
        Ok(self.snapshot())
    }

    fn open(&mut self, path: &Path) -> EngineResult<Snapshot> {
        if let Some(index) = self.find_buffer_by_path(path) {
            self.switch_to_index(index);
            let name = self.current().name();
            self.current_mut().set_status(format!("Switched to {}", name));
            return Ok(self.snapshot());
        }

        let loaded = files::read_file(path)?;

        if !self.current().is_pristine() {
            self.buffers.push(Buffer::new());
            self.switch_to_index(self.buffers.len() - 1);
        }

        let buf = self.current_mut();
        match loaded {
            Some(decoded) => {
                buf.load(
                    decoded.text,
                    decoded.encoding,
                    decoded.line_ending,
                    path.to_path_buf(),
                );
                buf.set_status(format!("Opened {}", path.display()));
                info!(target: "engine", path = %path.display(), "opened file");
            }
            None => {
                buf.load(
                    String::new(),
                    files::ENCODING_UTF8.to_string(),
                    super::LineEnding::platform_default(),
                    path.to_path_buf(),
                );
                buf.set_status(format!("New file: {}", path.display()));
                info!(target: "engine", path = %path.display(), "new file");
            }
        }
        Ok(self.snapshot())
    }

    fn save(&mut self) -> EngineResult<Snapshot> {
        let buf = self.current();
        let path = buf.file_path().ok_or(EngineError::NoFilePath)?.to_path_buf();
        files::write_content(&path, buf.text(), buf.encoding(), buf.line_ending())?;

        let buf = self.current_mut();
        buf.mark_saved();
        buf.set_status(format!("Saved {}", path.display()));
        Ok(self.snapshot())
    }

    fn save_as(&mut self, path: &Path, overwrite: bool) -> EngineResult<Snapshot> {
        if files::path_exists(path) && !overwrite {
            return Err(EngineError::FileExists(path.to_path_buf()));
        }

        let buf = self.current();
        files::write_content(path, buf.text(), buf.encoding(), buf.line_ending())?;

        let buf = self.current_mut();
        buf.set_file_path(path.to_path_buf());
        buf.mark_saved();
        buf.set_status(format!("Saved {}", path.display()));
        Ok(self.snapshot())
    }

    fn file_exists(&mut self, path: &Path) -> EngineResult<bool> {
        Ok(files::path_exists(path))
    }

    fn default_save_directory(&mut self) -> EngineResult<PathBuf> {
        if let Some(dir) = self.settings.default_save_dir.clone() {
            return Ok(dir);
        }
        if let Some(home) = dirs::home_dir() {
            return Ok(home);
        }
        std::env::current_dir().map_err(|err| EngineError::io("failed to resolve current dir", err))
    }

    fn path_completions(&mut self, input: &str) -> EngineResult<Vec<String>> {
        files::path_completions(input)
    }

    fn start_replace(&mut self, query: &str, replacement: &str) -> EngineResult<ReplaceResponse> {
        let status = self.current_mut().start_replace(query, replacement)?;
        Ok(ReplaceResponse {
            snapshot: self.snapshot(),
            status,
        })
    }

    fn step_replace(&mut self, action: ReplaceAction) -> EngineResult<ReplaceResponse> {
        let status = self.current_mut().step_replace(action)?;
        Ok(ReplaceResponse {
            snapshot: self.snapshot(),
            status,
        })
    }

    fn list_buffers(&mut self) -> EngineResult<BufferList> {
        Ok(BufferList {
            names: self.buffer_names(),
            current: self.current().name(),
            default_switch_name: self.default_switch_name(),
        })
    }

    fn switch_buffer(&mut self, name: &str) -> EngineResult<Snapshot> {
        let index = self
            .buffers
            .iter()
            .position(|b| b.name() == name)
            .ok_or_else(|| EngineError::UnknownBuffer(name.to_string()))?;
        self.switch_to_index(index);
        self.current_mut().set_status(format!("Switched to {}", name));
        debug!(target: "engine", buffer = name, "switched buffer");
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineErrorKind, LineEnding};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_scratch() {
        let mut engine = LocalEngine::default();
        let snap = engine.initialize().unwrap();
        assert_eq!(snap.text, "");
        assert_eq!((snap.line, snap.col), (1, 1));
        assert!(!snap.modified);
        assert_eq!(snap.file_path, None);
    }

    #[test]
    fn test_run_insert_reports_position() {
        let mut engine = LocalEngine::default();
        let snap = engine.run(EditorCommand::insert("ab\nc")).unwrap();
        assert_eq!(snap.cursor, 4);
        assert_eq!((snap.line, snap.col), (2, 2));
        assert_eq!(snap.char_count, 4);
        assert!(snap.modified);
    }

    #[test]
    fn test_kill_ring_shared_across_buffers() {
        let dir = TempDir::new().unwrap();
        let mut engine = LocalEngine::with_text("hello");
        engine
            .run(EditorCommand::CopyRegion { start: 0, end: 5 })
            .unwrap();
        engine.open(&dir.path().join("other.txt")).unwrap();
        let snap = engine.run(EditorCommand::Yank).unwrap();
        assert_eq!(snap.text, "hello");
    }

    #[test]
    fn test_keyboard_quit_cancels_replace() {
        let mut engine = LocalEngine::with_text("aaa");
        engine.start_replace("a", "b").unwrap();
        let snap = engine.run(EditorCommand::KeyboardQuit).unwrap();
        assert_eq!(snap.status_message.as_deref(), Some("Quit"));
        assert_eq!(
            engine.step_replace(ReplaceAction::Accept).unwrap_err().kind(),
            EngineErrorKind::ReplaceInactive
        );
    }

    #[test]
    fn test_isearch_error_leaves_state() {
        let mut engine = LocalEngine::with_text("abc");
        let err = engine
            .run(EditorCommand::IsearchForward {
                query: "x".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::NotFound);
        assert_eq!(engine.current().cursor(), 0);
    }

    #[test]
    fn test_open_existing_file_replaces_pristine_scratch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\r\ntwo").unwrap();

        let mut engine = LocalEngine::default();
        let snap = engine.open(&path).unwrap();
        assert_eq!(snap.text, "one\ntwo");
        assert_eq!(snap.line_ending, LineEnding::CrLf);
        assert_eq!(snap.file_path.as_deref(), Some(path.as_path()));
        assert_eq!(engine.buffer_names(), vec!["a.txt".to_string()]);
    }

    #[test]
    fn test_open_missing_file_is_new_buffer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.txt");
        let mut engine = LocalEngine::with_text("keep me");
        let snap = engine.open(&path).unwrap();
        assert_eq!(snap.text, "");
        assert_eq!(
            snap.status_message,
            Some(format!("New file: {}", path.display()))
        );
        assert_eq!(
            engine.buffer_names(),
            vec![SCRATCH_NAME.to_string(), "new.txt".to_string()]
        );
    }

    #[test]
    fn test_open_same_path_twice_switches() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        let mut engine = LocalEngine::with_text("x");
        engine.open(&path).unwrap();
        engine.switch_buffer(SCRATCH_NAME).unwrap();
        engine.open(&path).unwrap();
        assert_eq!(engine.buffer_names().len(), 2);
        assert_eq!(engine.current().name(), "a.txt");
    }

    #[test]
    fn test_save_without_path_is_structured_error() {
        let mut engine = LocalEngine::with_text("x");
        let err = engine.save().unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::NoFilePath);
    }

    #[test]
    fn test_save_as_refuses_existing_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taken.txt");
        fs::write(&path, "old").unwrap();

        let mut engine = LocalEngine::with_text("new");
        let err = engine.save_as(&path, false).unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::FileExists);
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");

        let snap = engine.save_as(&path, true).unwrap();
        assert!(!snap.modified);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "old");
    }

    #[test]
    fn test_save_round_trip_keeps_line_ending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crlf.txt");
        fs::write(&path, "a\r\nb").unwrap();

        let mut engine = LocalEngine::default();
        engine.open(&path).unwrap();
        engine.run(EditorCommand::MoveToBufferEnd).unwrap();
        engine.run(EditorCommand::insert("\nc")).unwrap();
        let snap = engine.save().unwrap();

        assert!(!snap.modified);
        assert_eq!(fs::read(&path).unwrap(), b"a\r\nb\r\nc");
    }

    #[test]
    fn test_default_save_directory_prefers_setting() {
        let dir = TempDir::new().unwrap();
        let mut engine = LocalEngine::new(EngineSettings {
            default_save_dir: Some(dir.path().to_path_buf()),
            ..EngineSettings::default()
        });
        assert_eq!(engine.default_save_directory().unwrap(), dir.path());
    }

    #[test]
    fn test_buffer_list_and_default_switch() {
        let dir = TempDir::new().unwrap();
        let mut engine = LocalEngine::with_text("scratch text");
        engine.open(&dir.path().join("one.txt")).unwrap();
        engine.open(&dir.path().join("two.txt")).unwrap();

        let list = engine.list_buffers().unwrap();
        assert_eq!(list.names.len(), 3);
        assert_eq!(list.current, "two.txt");
        assert_eq!(list.default_switch_name, "one.txt");

        engine.switch_buffer("*scratch*").unwrap();
        assert_eq!(engine.default_switch_name(), "two.txt");
    }

    #[test]
    fn test_single_buffer_default_is_itself() {
        let engine = LocalEngine::default();
        assert_eq!(engine.default_switch_name(), SCRATCH_NAME);
    }

    #[test]
    fn test_switch_unknown_buffer() {
        let mut engine = LocalEngine::default();
        let err = engine.switch_buffer("nope").unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::UnknownBuffer);
        assert_eq!(err.to_string(), "No buffer named 'nope'");
    }

    #[test]
    fn test_kill_ring_size_setting() {
        let mut engine = LocalEngine::new(EngineSettings {
            kill_ring_size: 1,
            ..EngineSettings::default()
        });
        engine.run(EditorCommand::insert("ab")).unwrap();
        engine
            .run(EditorCommand::CopyRegion { start: 0, end: 1 })
            .unwrap();
        engine
            .run(EditorCommand::CopyRegion { start: 1, end: 2 })
            .unwrap();
        assert_eq!(engine.kill_ring().len(), 1);
        assert_eq!(engine.kill_ring().latest(), Some("b"));
    }
}
