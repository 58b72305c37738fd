//! C-x commands: files, buffers and quitting

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use tracing::info;

use super::{Dispatcher, EventOutcome};
use crate::command::EditorCommand;
use crate::confirm_dialog::ConfirmAction;
use crate::engine::{DocumentEngine, EngineErrorKind, EngineResult};
use crate::keys::{self, KeyChord, PrefixBinding};
use crate::minibuffer::{Completer, PromptOptions};
use crate::mode::{Modal, PromptPurpose};

/// `path` as typed text ending in a separator
fn with_trailing_separator(path: &Path) -> String {
    let mut text = path.display().to_string();
    if !text.ends_with(MAIN_SEPARATOR) && !text.ends_with('/') {
        text.push(MAIN_SEPARATOR);
    }
    text
}

impl<E: DocumentEngine> Dispatcher<E> {
    /// Second key of a C-x sequence
    pub(super) fn dispatch_prefix(&mut self, chord: KeyChord) -> EngineResult<EventOutcome> {
        self.state.prefix_active = false;

        match keys::lookup_prefix(&chord) {
            Some(PrefixBinding::FindFile) => {
                let initial = self.default_find_path()?;
                self.modal = Modal::prompt(
                    "Find file:",
                    initial,
                    PromptOptions::with_completer(Completer::Paths),
                    PromptPurpose::FindFile,
                );
                Ok(EventOutcome::Continue)
            }
            Some(PrefixBinding::Save) => self.save(),
            Some(PrefixBinding::WriteFile) => self.prompt_write_file(false),
            Some(PrefixBinding::Quit) => self.quit(),
            Some(PrefixBinding::SwitchBuffer) => {
                let buffers = self.engine.list_buffers()?;
                let default = buffers.default_switch_name;
                self.modal = Modal::prompt(
                    format!("Switch to buffer (default {}):", default),
                    "",
                    PromptOptions::with_completer(Completer::Names(buffers.names)),
                    PromptPurpose::SwitchBuffer { default },
                );
                Ok(EventOutcome::Continue)
            }
            None => {
                self.render_with_prefix()?;
                Ok(EventOutcome::Continue)
            }
        }
    }

    /// Where a new file goes: the current file, else the default directory
    pub(super) fn default_write_path(&mut self) -> EngineResult<String> {
        if let Some(path) = &self.state.current_file_path {
            return Ok(path.display().to_string());
        }

        let dir = match &self.state.default_dir_cache {
            Some(dir) => dir.clone(),
            None => {
                let dir = self.engine.default_save_directory()?;
                self.state.default_dir_cache = Some(dir.clone());
                dir
            }
        };
        Ok(with_trailing_separator(&dir))
    }

    /// Directory of the current file, else the default write path
    pub(super) fn default_find_path(&mut self) -> EngineResult<String> {
        let parent = self
            .state
            .current_file_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(with_trailing_separator);

        match parent {
            Some(dir) => Ok(dir),
            None => self.default_write_path(),
        }
    }

    pub(super) fn open_path(&mut self, path: String) -> EngineResult<EventOutcome> {
        let path = PathBuf::from(path);
        self.state.mark.clear_mark();
        let snapshot = self.engine.open(&path)?;
        info!(target: "dispatch", path = %path.display(), "find file");
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }

    /// Open a file named outside the key loop, e.g. on the command line
    pub(super) fn open_external(&mut self, path: PathBuf) -> EngineResult<EventOutcome> {
        self.state.mark.clear_mark();
        let snapshot = self.engine.open(&path)?;
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }

    fn save(&mut self) -> EngineResult<EventOutcome> {
        match self.engine.save() {
            Ok(snapshot) => {
                self.render_and_track(snapshot, None, false);
                Ok(EventOutcome::Continue)
            }
            Err(err) if err.kind() == EngineErrorKind::NoFilePath => self.prompt_write_file(true),
            Err(err) => Err(err),
        }
    }

    fn prompt_write_file(&mut self, from_save: bool) -> EngineResult<EventOutcome> {
        let initial = self.default_write_path()?;
        self.modal = Modal::prompt(
            "Write file:",
            initial,
            PromptOptions::with_completer(Completer::Paths),
            PromptPurpose::WriteFile { from_save },
        );
        Ok(EventOutcome::Continue)
    }

    /// Save to `path`, asking first if it would overwrite a file
    pub(super) fn write_file(&mut self, path: String, from_save: bool) -> EngineResult<EventOutcome> {
        let path = PathBuf::from(path);
        if self.engine.file_exists(&path)? {
            self.modal = Modal::confirm(ConfirmAction::OverwriteFile(path));
            return Ok(EventOutcome::Continue);
        }

        let snapshot = self.engine.save_as(&path, from_save)?;
        info!(target: "dispatch", path = %path.display(), "wrote file");
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }

    fn quit(&mut self) -> EngineResult<EventOutcome> {
        let snapshot = self.engine.run(EditorCommand::Noop)?;
        if snapshot.modified {
            self.modal = Modal::confirm(ConfirmAction::QuitWithoutSaving);
            return Ok(EventOutcome::Continue);
        }
        Ok(EventOutcome::Quit)
    }

    pub(super) fn switch_buffer(&mut self, name: String) -> EngineResult<EventOutcome> {
        self.state.mark.clear_mark();
        let snapshot = self.engine.switch_buffer(&name)?;
        self.render_and_track(snapshot, None, false);
        Ok(EventOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_separator_added_once() {
        let dir = std::env::temp_dir();
        let text = with_trailing_separator(&dir);
        assert!(text.ends_with(MAIN_SEPARATOR) || text.ends_with('/'));
        assert_eq!(with_trailing_separator(Path::new(&text)), text);
    }
}
