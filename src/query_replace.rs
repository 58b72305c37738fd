//! Interactive query-replace
//!
//! The engine keeps the authoritative replace state. This side only tracks
//! the latest `ReplaceStatus` and turns answers into `step_replace` calls
//! until the engine reports `done`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{DocumentEngine, EngineError, EngineResult, ReplaceStatus, Snapshot};
use crate::keys::{Key, KeyChord};

/// Answer to "Replace at L:x C:y?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplaceAction {
    /// Replace this occurrence and move on
    #[serde(rename = "y")]
    Accept,
    /// Leave this occurrence and move on
    #[serde(rename = "n")]
    Skip,
    /// Replace this and every following occurrence
    #[serde(rename = "!")]
    ReplaceAll,
    /// Stop
    #[serde(rename = "q")]
    Quit,
}

impl ReplaceAction {
    /// Parse a typed answer; anything unrecognized quits
    pub fn from_answer(answer: &str) -> Self {
        match answer.trim().to_lowercase().as_str() {
            "y" => ReplaceAction::Accept,
            "n" => ReplaceAction::Skip,
            "!" => ReplaceAction::ReplaceAll,
            _ => ReplaceAction::Quit,
        }
    }

    /// Single-key answer. Enter takes the default answer, `y`.
    pub fn from_key(chord: &KeyChord) -> Self {
        if !chord.is_unmodified() {
            return ReplaceAction::Quit;
        }
        match chord.key {
            Key::Enter | Key::Char(' ') => ReplaceAction::Accept,
            Key::Char(c) => Self::from_answer(&c.to_string()),
            _ => ReplaceAction::Quit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReplaceAction::Accept => "y",
            ReplaceAction::Skip => "n",
            ReplaceAction::ReplaceAll => "!",
            ReplaceAction::Quit => "q",
        }
    }
}

/// M-% or C-M-% (C-M-5 on terminals that drop the shift)
pub fn is_shortcut(chord: &KeyChord) -> bool {
    let Some(c) = chord.char_lower() else {
        return false;
    };
    let alt_percent = chord.alt && !chord.ctrl && c == '%';
    let ctrl_alt_five = chord.ctrl && chord.alt && (c == '5' || c == '%');
    alt_percent || ctrl_alt_five
}

/// Client side of one query-replace run
#[derive(Debug, Clone)]
pub struct QueryReplaceSession {
    status: ReplaceStatus,
}

impl QueryReplaceSession {
    /// Ask the engine to start replacing `query` with `replacement`
    pub fn start<E: DocumentEngine + ?Sized>(
        engine: &mut E,
        query: &str,
        replacement: &str,
    ) -> EngineResult<(Self, Snapshot)> {
        let response = engine.start_replace(query, replacement)?;
        debug!(
            target: "dispatch",
            query,
            replacement,
            done = response.status.done,
            "query replace started"
        );
        let session = Self {
            status: response.status,
        };
        Ok((session, response.snapshot))
    }

    /// Send one answer. A finished session refuses further steps.
    pub fn step<E: DocumentEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        action: ReplaceAction,
    ) -> EngineResult<Snapshot> {
        if self.status.done {
            return Err(EngineError::ReplaceInactive);
        }

        let response = engine.step_replace(action)?;
        if response.status.replaced_count < self.status.replaced_count {
            warn!(
                target: "dispatch",
                before = self.status.replaced_count,
                after = response.status.replaced_count,
                "replace count went backwards"
            );
        }
        debug!(
            target: "dispatch",
            action = action.as_str(),
            replaced = response.status.replaced_count,
            done = response.status.done,
            "query replace step"
        );
        self.status = response.status;
        Ok(response.snapshot)
    }

    pub fn is_done(&self) -> bool {
        self.status.done
    }

    pub fn status(&self) -> &ReplaceStatus {
        &self.status
    }

    /// Question shown while waiting for an answer
    pub fn prompt(&self) -> String {
        let (line, col) = self
            .status
            .next_position
            .map_or((0, 0), |pos| (pos.line, pos.col));
        format!("Replace at L:{} C:{}? (y/n/!/q)", line, col)
    }
}
