//! Modal continuations: what happens when a prompt, a confirmation or a
//! query-replace question gets its answer

use tracing::{debug, warn};

use super::{Dispatcher, EventOutcome};
use crate::confirm_dialog::{ConfirmAction, ConfirmDialog, ConfirmOutcome};
use crate::engine::{DocumentEngine, EngineResult};
use crate::keys::KeyChord;
use crate::minibuffer::{Completer, MinibufferEvent, MinibufferSession, PromptOptions};
use crate::mode::{Modal, PromptPurpose};
use crate::query_replace::{QueryReplaceSession, ReplaceAction};

/// How a prompt ended
#[derive(Debug, Clone, PartialEq, Eq)]
enum PromptResult {
    Cancelled,
    /// Committed; `None` when the value was empty
    Committed(Option<String>),
}

impl PromptResult {
    /// The answer, if there is a non-empty one
    fn value(self) -> Option<String> {
        match self {
            PromptResult::Cancelled => None,
            PromptResult::Committed(value) => value,
        }
    }
}

impl<E: DocumentEngine> Dispatcher<E> {
    pub(super) fn minibuffer_key(
        &mut self,
        mut session: MinibufferSession,
        purpose: PromptPurpose,
        chord: KeyChord,
    ) -> EngineResult<EventOutcome> {
        match session.handle_key(chord) {
            MinibufferEvent::Continue => {
                self.modal = Modal::Minibuffer { session, purpose };
                Ok(EventOutcome::Continue)
            }
            MinibufferEvent::FetchCompletions(base) => {
                let candidates = self.completions_for(session.completer(), &base);
                session.receive_completions(&base, candidates);
                self.modal = Modal::Minibuffer { session, purpose };
                Ok(EventOutcome::Continue)
            }
            MinibufferEvent::Cancel => self.resolve_prompt(purpose, PromptResult::Cancelled),
            MinibufferEvent::Commit(value) => {
                self.resolve_prompt(purpose, PromptResult::Committed(value))
            }
        }
    }

    /// Candidates for `base`; a failed lookup just offers nothing
    fn completions_for(&mut self, completer: Option<&Completer>, base: &str) -> Vec<String> {
        let Some(completer) = completer else {
            return Vec::new();
        };
        if let Some(local) = completer.complete_locally(base) {
            return local;
        }
        match self.engine.path_completions(base) {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(target: "dispatch", error = %err, base, "path completion failed");
                Vec::new()
            }
        }
    }

    fn resolve_prompt(
        &mut self,
        purpose: PromptPurpose,
        result: PromptResult,
    ) -> EngineResult<EventOutcome> {
        let result = match result {
            PromptResult::Committed(None) if !purpose.accepts_empty() => PromptResult::Cancelled,
            other => other,
        };
        debug!(target: "dispatch", ?purpose, ?result, "prompt resolved");

        match purpose {
            PromptPurpose::FindFile => match result.value() {
                Some(path) => self.open_path(path),
                None => self.prompt_aborted(),
            },
            PromptPurpose::WriteFile { from_save } => match result.value() {
                Some(path) => self.write_file(path, from_save),
                None => self.prompt_aborted(),
            },
            PromptPurpose::Search(direction) => match result.value() {
                Some(query) => self.run_search(direction, query),
                None => Ok(EventOutcome::Continue),
            },
            PromptPurpose::ReplaceQuery => match result.value() {
                Some(query) => {
                    self.modal = Modal::prompt(
                        format!("Replace {} with:", query),
                        "",
                        PromptOptions::untrimmed(),
                        PromptPurpose::ReplaceWith { query },
                    );
                    Ok(EventOutcome::Continue)
                }
                None => Ok(EventOutcome::Continue),
            },
            PromptPurpose::ReplaceWith { query } => match result.value() {
                Some(replacement) => self.start_query_replace(&query, &replacement),
                None => Ok(EventOutcome::Continue),
            },
            PromptPurpose::SwitchBuffer { default } => match result {
                PromptResult::Cancelled => self.prompt_aborted(),
                PromptResult::Committed(name) => self.switch_buffer(name.unwrap_or(default)),
            },
        }
    }

    /// A C-x prompt was dismissed: just refresh
    fn prompt_aborted(&mut self) -> EngineResult<EventOutcome> {
        self.render_with_prefix()?;
        Ok(EventOutcome::Continue)
    }

    pub(super) fn confirm_key(
        &mut self,
        mut dialog: ConfirmDialog,
        chord: KeyChord,
    ) -> EngineResult<EventOutcome> {
        match dialog.handle_key(&chord) {
            ConfirmOutcome::Pending => {
                self.modal = Modal::Confirm(dialog);
                Ok(EventOutcome::Continue)
            }
            ConfirmOutcome::Cancelled => self.prompt_aborted(),
            ConfirmOutcome::Confirmed(ConfirmAction::OverwriteFile(path)) => {
                let snapshot = self.engine.save_as(&path, true)?;
                self.render_and_track(snapshot, None, false);
                Ok(EventOutcome::Continue)
            }
            ConfirmOutcome::Confirmed(ConfirmAction::QuitWithoutSaving) => Ok(EventOutcome::Quit),
        }
    }

    fn start_query_replace(&mut self, query: &str, replacement: &str) -> EngineResult<EventOutcome> {
        let (session, snapshot) = QueryReplaceSession::start(&mut self.engine, query, replacement)?;
        self.render_and_track(snapshot, None, false);
        if !session.is_done() {
            self.modal = Modal::QueryReplace(session);
        }
        Ok(EventOutcome::Continue)
    }

    pub(super) fn query_replace_key(
        &mut self,
        mut session: QueryReplaceSession,
        chord: KeyChord,
    ) -> EngineResult<EventOutcome> {
        let action = ReplaceAction::from_key(&chord);
        let snapshot = session.step(&mut self.engine, action)?;
        self.render_and_track(snapshot, None, false);
        if !session.is_done() {
            self.modal = Modal::QueryReplace(session);
        }
        Ok(EventOutcome::Continue)
    }
}
