//! Incremental search and engine-side query-replace

use crate::engine::{EngineError, EngineResult, ReplaceStatus};
use crate::query_replace::ReplaceAction;
use crate::region::Offset;

use super::buffer::{char_to_byte, Buffer};

/// Replace progress stored on the buffer between steps
#[derive(Debug, Clone)]
pub struct ReplaceState {
    query: String,
    replacement: String,
    search_from: Offset,
    replaced_count: usize,
}

fn finished(replaced_count: usize, message: String) -> ReplaceStatus {
    ReplaceStatus {
        done: true,
        replaced_count,
        next_position: None,
        message,
    }
}

impl Buffer {
    fn find_next(&self, from: Offset, query: &str) -> Option<Offset> {
        let text = self.text();
        let start = char_to_byte(text, from);
        let relative = text.get(start..)?.find(query)?;
        Some(text[..start + relative].chars().count())
    }

    fn find_prev(&self, before: Offset, query: &str) -> Option<Offset> {
        let text = self.text();
        let end = char_to_byte(text, before);
        let byte_pos = text.get(..end)?.rfind(query)?;
        Some(text[..byte_pos].chars().count())
    }

    /// Jump to the next match after the cursor, wrapping to the start
    pub fn isearch_forward(&mut self, query: &str) -> EngineResult<()> {
        if query.is_empty() {
            return Err(EngineError::InvalidCommand("search query is empty".to_string()));
        }

        let start = (self.cursor() + 1).min(self.char_len());
        if let Some(pos) = self.find_next(start, query) {
            self.set_cursor(pos);
            self.set_status(format!("I-Search forward: {}", query));
            return Ok(());
        }

        if let Some(pos) = self.find_next(0, query) {
            self.set_cursor(pos);
            self.set_status(format!("I-Search wrapped: {}", query));
            return Ok(());
        }

        Err(EngineError::NotFound(query.to_string()))
    }

    /// Jump to the previous match before the cursor, wrapping to the end
    pub fn isearch_backward(&mut self, query: &str) -> EngineResult<()> {
        if query.is_empty() {
            return Err(EngineError::InvalidCommand("search query is empty".to_string()));
        }

        let start = self.cursor().saturating_sub(1);
        if let Some(pos) = self.find_prev(start, query) {
            self.set_cursor(pos);
            self.set_status(format!("I-Search backward: {}", query));
            return Ok(());
        }

        if let Some(pos) = self.find_prev(self.char_len(), query) {
            self.set_cursor(pos);
            self.set_status(format!("I-Search wrapped: {}", query));
            return Ok(());
        }

        Err(EngineError::NotFound(query.to_string()))
    }

    pub fn start_replace(&mut self, query: &str, replacement: &str) -> EngineResult<ReplaceStatus> {
        if query.is_empty() {
            return Err(EngineError::InvalidCommand("query must not be empty".to_string()));
        }

        self.replace = Some(ReplaceState {
            query: query.to_string(),
            replacement: replacement.to_string(),
            search_from: 0,
            replaced_count: 0,
        });
        Ok(self.next_replace_status())
    }

    pub fn step_replace(&mut self, action: ReplaceAction) -> EngineResult<ReplaceStatus> {
        if action == ReplaceAction::Quit {
            let replaced = self.replace.take().map_or(0, |state| state.replaced_count);
            self.set_status(format!("Query replace cancelled ({} replaced)", replaced));
            return Ok(finished(replaced, "Cancelled".to_string()));
        }

        let state = self.replace.clone().ok_or(EngineError::ReplaceInactive)?;
        let query_len = state.query.chars().count();
        let replace_len = state.replacement.chars().count();

        let Some(pos) = self.find_next(state.search_from, &state.query) else {
            return Ok(self.finish_replace(state.replaced_count));
        };

        match action {
            ReplaceAction::ReplaceAll => {
                let mut count = state.replaced_count;
                let mut from = pos;
                while let Some(found) = self.find_next(from, &state.query) {
                    self.replace_range(found, found + query_len, &state.replacement);
                    count += 1;
                    from = found + replace_len;
                    self.set_cursor(from);
                }
                Ok(self.finish_replace(count))
            }
            ReplaceAction::Accept => {
                self.replace_range(pos, pos + query_len, &state.replacement);
                self.set_cursor(pos + replace_len);
                self.update_replace(pos + replace_len, state.replaced_count + 1);
                Ok(self.next_replace_status())
            }
            _ => {
                self.update_replace(pos + query_len, state.replaced_count);
                Ok(self.next_replace_status())
            }
        }
    }

    fn update_replace(&mut self, search_from: Offset, replaced_count: usize) {
        if let Some(state) = self.replace.as_mut() {
            state.search_from = search_from;
            state.replaced_count = replaced_count;
        }
    }

    fn finish_replace(&mut self, replaced: usize) -> ReplaceStatus {
        self.replace = None;
        let message = format!("Replaced {} occurrences", replaced);
        self.set_status(message.clone());
        finished(replaced, message)
    }

    /// Move to the next occurrence and describe it, or finish
    fn next_replace_status(&mut self) -> ReplaceStatus {
        let Some(state) = self.replace.clone() else {
            return finished(0, "No active query replace".to_string());
        };

        match self.find_next(state.search_from, &state.query) {
            Some(pos) => {
                self.set_cursor(pos);
                let position = self.position_at(pos);
                ReplaceStatus {
                    done: false,
                    replaced_count: state.replaced_count,
                    next_position: Some(position),
                    message: format!("Replace at L:{} C:{}? (y/n/!/q)", position.line, position.col),
                }
            }
            None => self.finish_replace(state.replaced_count),
        }
    }

    /// Abandon any replace in progress
    pub fn cancel_replace(&mut self) {
        self.replace = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineErrorKind, TextPosition};

    fn at(text: &str, cursor: Offset) -> Buffer {
        let mut buf = Buffer::with_text(text);
        buf.set_cursor(cursor);
        buf
    }

    #[test]
    fn test_isearch_forward_skips_match_at_cursor() {
        let mut buf = at("foo bar foo", 0);
        buf.isearch_forward("foo").unwrap();
        assert_eq!(buf.cursor(), 8);
        assert_eq!(buf.status_message(), Some("I-Search forward: foo"));
    }

    #[test]
    fn test_isearch_forward_wraps() {
        let mut buf = at("foo bar foo", 8);
        buf.isearch_forward("foo").unwrap();
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.status_message(), Some("I-Search wrapped: foo"));
    }

    #[test]
    fn test_isearch_backward_and_wrap() {
        let mut buf = at("ab ab ab", 6);
        buf.isearch_backward("ab").unwrap();
        assert_eq!(buf.cursor(), 3);
        buf.set_cursor(0);
        buf.isearch_backward("ab").unwrap();
        assert_eq!(buf.cursor(), 6);
        assert_eq!(buf.status_message(), Some("I-Search wrapped: ab"));
    }

    #[test]
    fn test_isearch_not_found() {
        let mut buf = at("abc", 1);
        let err = buf.isearch_forward("zz").unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::NotFound);
        assert_eq!(err.to_string(), "Not found: zz");
        assert_eq!(buf.cursor(), 1);
    }

    #[test]
    fn test_isearch_multibyte_offsets() {
        let mut buf = at("日本語 text 日本", 0);
        buf.isearch_forward("日本").unwrap();
        assert_eq!(buf.cursor(), 9);
    }

    #[test]
    fn test_empty_query_rejected() {
        let mut buf = at("abc", 0);
        assert_eq!(
            buf.isearch_forward("").unwrap_err().kind(),
            EngineErrorKind::InvalidCommand
        );
        assert_eq!(
            buf.start_replace("", "x").unwrap_err().kind(),
            EngineErrorKind::InvalidCommand
        );
    }

    #[test]
    fn test_replace_accept_moves_past_replacement() {
        let mut buf = at("aa aa", 0);
        let status = buf.start_replace("aa", "aaa").unwrap();
        assert_eq!(status.next_position, Some(TextPosition { line: 1, col: 1 }));

        let status = buf.step_replace(ReplaceAction::Accept).unwrap();
        assert_eq!(buf.text(), "aaa aa");
        assert_eq!(status.replaced_count, 1);
        assert_eq!(status.next_position, Some(TextPosition { line: 1, col: 5 }));
    }

    #[test]
    fn test_replace_all_does_not_rescan_replacement() {
        let mut buf = at("a a a", 0);
        buf.start_replace("a", "aa").unwrap();
        let status = buf.step_replace(ReplaceAction::ReplaceAll).unwrap();
        assert!(status.done);
        assert_eq!(status.replaced_count, 3);
        assert_eq!(buf.text(), "aa aa aa");
        assert_eq!(status.message, "Replaced 3 occurrences");
        assert!(buf.is_modified());
    }

    #[test]
    fn test_replace_all_after_skip_keeps_earlier_text() {
        let mut buf = at("x x x", 0);
        buf.start_replace("x", "y").unwrap();
        buf.step_replace(ReplaceAction::Skip).unwrap();
        let status = buf.step_replace(ReplaceAction::ReplaceAll).unwrap();
        assert_eq!(buf.text(), "x y y");
        assert_eq!(status.replaced_count, 2);
    }

    #[test]
    fn test_step_without_session() {
        let mut buf = at("abc", 0);
        assert_eq!(
            buf.step_replace(ReplaceAction::Accept).unwrap_err().kind(),
            EngineErrorKind::ReplaceInactive
        );
        let status = buf.step_replace(ReplaceAction::Quit).unwrap();
        assert!(status.done);
    }

    #[test]
    fn test_replace_is_undoable() {
        let mut buf = at("cat", 0);
        buf.start_replace("cat", "dog").unwrap();
        buf.step_replace(ReplaceAction::Accept).unwrap();
        assert_eq!(buf.text(), "dog");
        buf.undo();
        assert_eq!(buf.text(), "cat");
    }
}
