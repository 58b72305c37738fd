//! Dispatcher mode state machine.
//!
//! Key dispatch is in exactly one `DispatchMode`. On top of that, at most one
//! modal sub-session (a minibuffer prompt, a yes/no confirmation or a
//! query-replace loop) may be open; while one is, it receives every key.
//! Each open modal carries what to do once it resolves.

use crate::confirm_dialog::{ConfirmAction, ConfirmDialog};
use crate::keys::SearchDirection;
use crate::minibuffer::{MinibufferSession, PromptOptions};
use crate::query_replace::QueryReplaceSession;

/// How the next key press is interpreted when no modal is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Keys go through the global binding table
    #[default]
    Idle,
    /// `C-x` was pressed; the next key completes a two-key command
    PrefixPending,
    /// An input method is composing; key presses are ignored
    Composing,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PrefixPending => "prefix",
            Self::Composing => "composing",
        }
    }
}

/// What a minibuffer prompt's answer will be used for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPurpose {
    /// `C-x C-f` style open
    FindFile,
    /// Destination for a save. `from_save` is set when `C-x s` found no path,
    /// in which case a new file is written with overwrite already allowed.
    WriteFile { from_save: bool },
    Search(SearchDirection),
    /// First query-replace prompt
    ReplaceQuery,
    /// Second query-replace prompt
    ReplaceWith { query: String },
    /// `C-x b`; an empty answer selects `default`
    SwitchBuffer { default: String },
}

impl PromptPurpose {
    /// Whether an empty answer still counts as an answer
    pub fn accepts_empty(&self) -> bool {
        matches!(self, Self::SwitchBuffer { .. })
    }
}

/// The open modal sub-session, if any
#[derive(Debug, Default)]
pub enum Modal {
    #[default]
    None,
    Minibuffer {
        session: MinibufferSession,
        purpose: PromptPurpose,
    },
    Confirm(ConfirmDialog),
    QueryReplace(QueryReplaceSession),
}

impl Modal {
    /// Open a minibuffer prompt
    pub fn prompt(
        prompt: impl Into<String>,
        initial: impl Into<String>,
        options: PromptOptions,
        purpose: PromptPurpose,
    ) -> Self {
        Self::Minibuffer {
            session: MinibufferSession::new(prompt, initial, options),
            purpose,
        }
    }

    /// Open a yes/no dialog for `action`
    pub fn confirm(action: ConfirmAction) -> Self {
        Self::Confirm(ConfirmDialog::asking(action))
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn is_minibuffer(&self) -> bool {
        matches!(self, Self::Minibuffer { .. })
    }

    pub fn is_confirm(&self) -> bool {
        matches!(self, Self::Confirm(_))
    }

    pub fn is_query_replace(&self) -> bool {
        matches!(self, Self::QueryReplace(_))
    }

    pub fn minibuffer(&self) -> Option<&MinibufferSession> {
        match self {
            Self::Minibuffer { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn purpose(&self) -> Option<&PromptPurpose> {
        match self {
            Self::Minibuffer { purpose, .. } => Some(purpose),
            _ => None,
        }
    }

    pub fn confirm_dialog(&self) -> Option<&ConfirmDialog> {
        match self {
            Self::Confirm(dialog) => Some(dialog),
            _ => None,
        }
    }

    pub fn query_replace(&self) -> Option<&QueryReplaceSession> {
        match self {
            Self::QueryReplace(session) => Some(session),
            _ => None,
        }
    }

    /// Close the modal, handing back whatever was open
    pub fn take(&mut self) -> Modal {
        std::mem::take(self)
    }
}
