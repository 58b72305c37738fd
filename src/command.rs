//! Editor command vocabulary
//!
//! Every request to the document engine's generic `run` entry point is one of
//! these commands. Key bindings produce commands, the dispatcher sends them,
//! and the engine answers with a fresh snapshot.

use serde::{Deserialize, Serialize};

use crate::region::{Offset, Region};

/// Commands understood by the document engine.
///
/// Serializes to the wire form `{"command": "<name>", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum EditorCommand {
    // ========================================================================
    // Housekeeping
    // ========================================================================
    /// Fetch a snapshot without changing anything
    Noop,

    /// Abort whatever is pending in the engine (e.g. a replace session)
    KeyboardQuit,

    // ========================================================================
    // Motion
    // ========================================================================
    MoveToLineStart,
    MoveToLineEnd,
    MoveForward,
    MoveBackward,
    /// Logical line motion (newline-delimited)
    MoveNextLine,
    MovePreviousLine,
    MoveForwardWord,
    MoveBackwardWord,
    MoveToBufferStart,
    MoveToBufferEnd,

    /// Place the cursor at an absolute offset
    SetCursor { cursor: Offset },

    // ========================================================================
    // Editing
    // ========================================================================
    DeleteChar,
    DeleteBackwardChar,
    KillLine,
    Yank,
    Undo,
    Redo,
    InsertText { text: String },
    KillRegion { start: Offset, end: Offset },
    CopyRegion { start: Offset, end: Offset },

    // ========================================================================
    // Search
    // ========================================================================
    IsearchForward { query: String },
    IsearchBackward { query: String },
}

impl EditorCommand {
    pub fn kill_region(region: Region) -> Self {
        EditorCommand::KillRegion {
            start: region.start,
            end: region.end,
        }
    }

    pub fn copy_region(region: Region) -> Self {
        EditorCommand::CopyRegion {
            start: region.start,
            end: region.end,
        }
    }

    pub fn insert(text: impl Into<String>) -> Self {
        EditorCommand::InsertText { text: text.into() }
    }

    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            EditorCommand::Noop => "noop",
            EditorCommand::KeyboardQuit => "keyboard_quit",
            EditorCommand::MoveToLineStart => "move_to_line_start",
            EditorCommand::MoveToLineEnd => "move_to_line_end",
            EditorCommand::MoveForward => "move_forward",
            EditorCommand::MoveBackward => "move_backward",
            EditorCommand::MoveNextLine => "move_next_line",
            EditorCommand::MovePreviousLine => "move_previous_line",
            EditorCommand::MoveForwardWord => "move_forward_word",
            EditorCommand::MoveBackwardWord => "move_backward_word",
            EditorCommand::MoveToBufferStart => "move_to_buffer_start",
            EditorCommand::MoveToBufferEnd => "move_to_buffer_end",
            EditorCommand::SetCursor { .. } => "set_cursor",
            EditorCommand::DeleteChar => "delete_char",
            EditorCommand::DeleteBackwardChar => "delete_backward_char",
            EditorCommand::KillLine => "kill_line",
            EditorCommand::Yank => "yank",
            EditorCommand::Undo => "undo",
            EditorCommand::Redo => "redo",
            EditorCommand::InsertText { .. } => "insert_text",
            EditorCommand::KillRegion { .. } => "kill_region",
            EditorCommand::CopyRegion { .. } => "copy_region",
            EditorCommand::IsearchForward { .. } => "isearch_forward",
            EditorCommand::IsearchBackward { .. } => "isearch_backward",
        }
    }

    /// Pure cursor motion: keeps the mark and its highlighted region alive
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            EditorCommand::MoveToLineStart
                | EditorCommand::MoveToLineEnd
                | EditorCommand::MoveForward
                | EditorCommand::MoveBackward
                | EditorCommand::MoveNextLine
                | EditorCommand::MovePreviousLine
                | EditorCommand::MoveForwardWord
                | EditorCommand::MoveBackwardWord
                | EditorCommand::MoveToBufferStart
                | EditorCommand::MoveToBufferEnd
                | EditorCommand::SetCursor { .. }
        )
    }

    /// Changes document text (or its undo state)
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            EditorCommand::DeleteChar
                | EditorCommand::DeleteBackwardChar
                | EditorCommand::KillLine
                | EditorCommand::Yank
                | EditorCommand::Undo
                | EditorCommand::Redo
                | EditorCommand::InsertText { .. }
                | EditorCommand::KillRegion { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_command_wire_form() {
        let value = serde_json::to_value(EditorCommand::MoveForwardWord).unwrap();
        assert_eq!(value, json!({ "command": "move_forward_word" }));
    }

    #[test]
    fn test_payload_command_wire_form() {
        let value = serde_json::to_value(EditorCommand::kill_region(Region::new(9, 2))).unwrap();
        assert_eq!(
            value,
            json!({ "command": "kill_region", "payload": { "start": 2, "end": 9 } })
        );
    }

    #[test]
    fn test_wire_form_parses_back() {
        let parsed: EditorCommand =
            serde_json::from_str(r#"{"command":"set_cursor","payload":{"cursor":12}}"#).unwrap();
        assert_eq!(parsed, EditorCommand::SetCursor { cursor: 12 });
    }

    #[test]
    fn test_name_matches_serialized_tag() {
        let commands = [
            EditorCommand::Noop,
            EditorCommand::insert("x"),
            EditorCommand::IsearchBackward {
                query: "q".to_string(),
            },
            EditorCommand::copy_region(Region::new(0, 1)),
        ];
        for cmd in commands {
            let value = serde_json::to_value(&cmd).unwrap();
            assert_eq!(value["command"], cmd.name());
        }
    }

    #[test]
    fn test_motion_and_destructive_are_disjoint() {
        let commands = [
            EditorCommand::MoveForward,
            EditorCommand::SetCursor { cursor: 0 },
            EditorCommand::Yank,
            EditorCommand::Undo,
            EditorCommand::insert("a"),
            EditorCommand::CopyRegion { start: 0, end: 1 },
        ];
        for cmd in commands {
            assert!(!(cmd.is_motion() && cmd.is_destructive()), "{cmd:?}");
        }
        assert!(!EditorCommand::CopyRegion { start: 0, end: 1 }.is_motion());
        assert!(!EditorCommand::Noop.is_destructive());
    }
}
