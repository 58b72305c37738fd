//! Reusable confirmation dialog
//!
//! A yes/no modal asked before overwriting a file or quitting with unsaved
//! changes.

use std::path::PathBuf;

use crate::keys::{Key, KeyChord};

/// Action to perform when the user confirms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    /// Write the buffer over an existing file
    OverwriteFile(PathBuf),
    /// Close the editor and drop unsaved changes
    QuitWithoutSaving,
}

impl ConfirmAction {
    /// Question shown for this action
    pub fn message(&self) -> String {
        match self {
            ConfirmAction::OverwriteFile(path) => {
                format!("File already exists. Overwrite?\n{}", path.display())
            }
            ConfirmAction::QuitWithoutSaving => "Buffer is modified. Quit without saving?".to_string(),
        }
    }
}

/// Result of a key press while the dialog is open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Key ignored, still waiting
    Pending,
    Confirmed(ConfirmAction),
    Cancelled,
}

/// Reusable confirmation dialog state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmDialog {
    /// Whether the dialog is visible
    pub visible: bool,
    /// Message to display
    pub message: String,
    /// Action to perform on confirmation
    pub action: Option<ConfirmAction>,
}

impl ConfirmDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dialog already showing `action`'s question
    pub fn asking(action: ConfirmAction) -> Self {
        let mut dialog = Self::new();
        dialog.show(action.message(), action);
        dialog
    }

    /// Show the dialog with a message and action
    pub fn show(&mut self, message: impl Into<String>, action: ConfirmAction) {
        self.visible = true;
        self.message = message.into();
        self.action = Some(action);
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.message.clear();
        self.action = None;
    }

    /// Confirm and return the action to carry out
    pub fn confirm(&mut self) -> Option<ConfirmAction> {
        let action = self.action.take();
        self.hide();
        action
    }

    /// Cancel without executing
    pub fn cancel(&mut self) {
        self.hide();
    }

    /// `y` confirms; `n`, Esc and C-g cancel; anything else is ignored
    pub fn handle_key(&mut self, chord: &KeyChord) -> ConfirmOutcome {
        if chord.is_ctrl('g') || chord.key == Key::Esc {
            self.cancel();
            return ConfirmOutcome::Cancelled;
        }
        if chord.ctrl || chord.alt {
            return ConfirmOutcome::Pending;
        }

        match chord.char_lower() {
            Some('y') => match self.confirm() {
                Some(action) => ConfirmOutcome::Confirmed(action),
                None => ConfirmOutcome::Cancelled,
            },
            Some('n') => {
                self.cancel();
                ConfirmOutcome::Cancelled
            }
            _ => ConfirmOutcome::Pending,
        }
    }
}
