//! Document engine contract
//!
//! The engine owns the text, cursor, undo history, kill ring and files. The
//! interaction layer only ever talks to it through `DocumentEngine`, and
//! every call answers with a fresh `Snapshot` of the current buffer.
//!
//! - `local::LocalEngine` is the in-process reference engine
//! - `worker::EngineHandle` runs any engine on its own thread
//! - `mock::MockEngine` records calls for tests

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::command::EditorCommand;
use crate::query_replace::ReplaceAction;
use crate::region::Offset;

pub mod local;
#[cfg(test)]
pub mod mock;
pub mod worker;

/// Result alias for engine calls
pub type EngineResult<T> = Result<T, EngineError>;

// ============================================================================
// Snapshot types
// ============================================================================

/// Line terminator used when writing a buffer back to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    /// Terminator for new buffers on this platform
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LineEnding::Lf => "LF",
            LineEnding::CrLf => "CRLF",
            LineEnding::Cr => "CR",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Read-only view of the current buffer after an engine call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub text: String,
    pub cursor: Offset,
    /// 1-based
    pub line: usize,
    /// 1-based
    pub col: usize,
    pub char_count: usize,
    pub modified: bool,
    pub encoding: String,
    pub line_ending: LineEnding,
    pub file_path: Option<PathBuf>,
    pub status_message: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            line: 1,
            col: 1,
            char_count: 0,
            modified: false,
            encoding: "UTF-8".to_string(),
            line_ending: LineEnding::platform_default(),
            file_path: None,
            status_message: None,
        }
    }
}

/// 1-based line/column of a text position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPosition {
    pub line: usize,
    pub col: usize,
}

/// Progress of an engine-side query-replace session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceStatus {
    pub done: bool,
    pub replaced_count: usize,
    /// Position of the occurrence awaiting an answer
    pub next_position: Option<TextPosition>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceResponse {
    pub snapshot: Snapshot,
    pub status: ReplaceStatus,
}

/// Open buffers, for C-x b
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferList {
    pub names: Vec<String>,
    pub current: String,
    pub default_switch_name: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Discriminant of an `EngineError`, for callers that branch on the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    NoFilePath,
    FileExists,
    Io,
    InvalidCommand,
    NotFound,
    ReplaceInactive,
    UnknownBuffer,
    Disconnected,
}

/// Engine failures
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("No file path. Use save as.")]
    NoFilePath,
    #[error("File exists: {}", .0.display())]
    FileExists(PathBuf),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    InvalidCommand(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Query replace is not active")]
    ReplaceInactive,
    #[error("No buffer named '{0}'")]
    UnknownBuffer(String),
    #[error("Document engine is not running")]
    Disconnected,
}

impl EngineError {
    pub fn kind(&self) -> EngineErrorKind {
        match self {
            EngineError::NoFilePath => EngineErrorKind::NoFilePath,
            EngineError::FileExists(_) => EngineErrorKind::FileExists,
            EngineError::Io { .. } => EngineErrorKind::Io,
            EngineError::InvalidCommand(_) => EngineErrorKind::InvalidCommand,
            EngineError::NotFound(_) => EngineErrorKind::NotFound,
            EngineError::ReplaceInactive => EngineErrorKind::ReplaceInactive,
            EngineError::UnknownBuffer(_) => EngineErrorKind::UnknownBuffer,
            EngineError::Disconnected => EngineErrorKind::Disconnected,
        }
    }

    /// Wrap an I/O error with what was being attempted
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        EngineError::Io {
            context: context.into(),
            source,
        }
    }
}

// ============================================================================
// Contract
// ============================================================================

/// Operations the interaction layer needs from a document engine
pub trait DocumentEngine {
    /// Snapshot of the initial buffer
    fn initialize(&mut self) -> EngineResult<Snapshot>;

    /// Run one editor command against the current buffer
    fn run(&mut self, command: EditorCommand) -> EngineResult<Snapshot>;

    /// Open `path` (a missing file opens an empty buffer bound to it)
    fn open(&mut self, path: &Path) -> EngineResult<Snapshot>;

    /// Save to the buffer's own path; `EngineError::NoFilePath` if it has none
    fn save(&mut self) -> EngineResult<Snapshot>;

    /// Save to `path`; `EngineError::FileExists` if it exists and `overwrite`
    /// is false
    fn save_as(&mut self, path: &Path, overwrite: bool) -> EngineResult<Snapshot>;

    fn file_exists(&mut self, path: &Path) -> EngineResult<bool>;

    fn default_save_directory(&mut self) -> EngineResult<PathBuf>;

    /// Candidates completing a partially typed path
    fn path_completions(&mut self, input: &str) -> EngineResult<Vec<String>>;

    fn start_replace(&mut self, query: &str, replacement: &str) -> EngineResult<ReplaceResponse>;

    fn step_replace(&mut self, action: ReplaceAction) -> EngineResult<ReplaceResponse>;

    fn list_buffers(&mut self) -> EngineResult<BufferList>;

    fn switch_buffer(&mut self, name: &str) -> EngineResult<Snapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(EngineError::NoFilePath.kind(), EngineErrorKind::NoFilePath);
        assert_eq!(
            EngineError::FileExists(PathBuf::from("/tmp/x")).kind(),
            EngineErrorKind::FileExists
        );
        let io_err = EngineError::io("failed to read file", io::Error::other("boom"));
        assert_eq!(io_err.kind(), EngineErrorKind::Io);
        assert_eq!(io_err.to_string(), "failed to read file: boom");
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            EngineError::NotFound("needle".to_string()).to_string(),
            "Not found: needle"
        );
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let value = serde_json::to_value(Snapshot::default()).unwrap();
        assert!(value.get("charCount").is_some());
        assert!(value.get("statusMessage").is_some());
        assert_eq!(value["line"], 1);
    }

    #[test]
    fn test_line_ending_labels() {
        assert_eq!(LineEnding::CrLf.to_string(), "CRLF");
        assert_eq!(LineEnding::Lf.as_str(), "\n");
    }
}
