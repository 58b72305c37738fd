//! Mock document engine for testing
//!
//! MockEngine forwards every call to a real `LocalEngine` and records it, so
//! dispatcher tests can check both the resulting text and exactly which
//! engine calls were made. Failures can be queued for the next matching call.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::local::{EngineSettings, LocalEngine};
use super::{BufferList, DocumentEngine, EngineError, EngineResult, ReplaceResponse, Snapshot};
use crate::command::EditorCommand;
use crate::query_replace::ReplaceAction;

/// One recorded engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Initialize,
    Run(EditorCommand),
    Open(PathBuf),
    Save,
    SaveAs { path: PathBuf, overwrite: bool },
    FileExists(PathBuf),
    DefaultSaveDirectory,
    PathCompletions(String),
    StartReplace { query: String, replacement: String },
    StepReplace(ReplaceAction),
    ListBuffers,
    SwitchBuffer(String),
}

type CallMatcher = Box<dyn Fn(&EngineCall) -> bool + Send>;

/// A recording engine backed by a real `LocalEngine`
pub struct MockEngine {
    inner: LocalEngine,
    /// All calls made (newest last)
    calls: Arc<Mutex<Vec<EngineCall>>>,
    /// Queued failures, consumed by the first call they match
    failures: Vec<(CallMatcher, EngineError)>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::from_engine(LocalEngine::default())
    }

    /// Scratch buffer preloaded with `text`, cursor at 0
    pub fn with_text(text: &str) -> Self {
        Self::from_engine(LocalEngine::with_text(text))
    }

    /// Empty engine whose default save directory is `dir`
    pub fn with_save_dir(dir: &Path) -> Self {
        Self::from_engine(LocalEngine::new(EngineSettings {
            default_save_dir: Some(dir.to_path_buf()),
            ..EngineSettings::default()
        }))
    }

    pub fn from_engine(inner: LocalEngine) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Vec::new(),
        }
    }

    pub fn inner(&self) -> &LocalEngine {
        &self.inner
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<EngineCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Check if any recorded call matches
    pub fn has_call<F>(&self, predicate: F) -> bool
    where
        F: Fn(&EngineCall) -> bool,
    {
        self.calls.lock().unwrap().iter().any(predicate)
    }

    /// Recorded `run` commands only
    pub fn commands(&self) -> Vec<EditorCommand> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Run(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    /// Make the next call matching `predicate` fail with `error`
    pub fn fail_next<F>(&mut self, predicate: F, error: EngineError)
    where
        F: Fn(&EngineCall) -> bool + Send + 'static,
    {
        self.failures.push((Box::new(predicate), error));
    }

    /// Record the call and return a queued failure if one matches
    fn record(&mut self, call: EngineCall) -> EngineResult<()> {
        let matched = self.failures.iter().position(|(matcher, _)| matcher(&call));
        self.calls.lock().unwrap().push(call);
        match matched {
            Some(index) => Err(self.failures.remove(index).1),
            None => Ok(()),
        }
    }
}

impl DocumentEngine for MockEngine {
    fn initialize(&mut self) -> EngineResult<Snapshot> {
        self.record(EngineCall::Initialize)?;
        self.inner.initialize()
    }

    fn run(&mut self, command: EditorCommand) -> EngineResult<Snapshot> {
        self.record(EngineCall::Run(command.clone()))?;
        self.inner.run(command)
    }

    fn open(&mut self, path: &Path) -> EngineResult<Snapshot> {
        self.record(EngineCall::Open(path.to_path_buf()))?;
        self.inner.open(path)
    }

    fn save(&mut self) -> EngineResult<Snapshot> {
        self.record(EngineCall::Save)?;
        self.inner.save()
    }

    fn save_as(&mut self, path: &Path, overwrite: bool) -> EngineResult<Snapshot> {
        self.record(EngineCall::SaveAs {
            path: path.to_path_buf(),
            overwrite,
        })?;
        self.inner.save_as(path, overwrite)
    }

    fn file_exists(&mut self, path: &Path) -> EngineResult<bool> {
        self.record(EngineCall::FileExists(path.to_path_buf()))?;
        self.inner.file_exists(path)
    }

    fn default_save_directory(&mut self) -> EngineResult<PathBuf> {
        self.record(EngineCall::DefaultSaveDirectory)?;
        self.inner.default_save_directory()
    }

    fn path_completions(&mut self, input: &str) -> EngineResult<Vec<String>> {
        self.record(EngineCall::PathCompletions(input.to_string()))?;
        self.inner.path_completions(input)
    }

    fn start_replace(&mut self, query: &str, replacement: &str) -> EngineResult<ReplaceResponse> {
        self.record(EngineCall::StartReplace {
            query: query.to_string(),
            replacement: replacement.to_string(),
        })?;
        self.inner.start_replace(query, replacement)
    }

    fn step_replace(&mut self, action: ReplaceAction) -> EngineResult<ReplaceResponse> {
        self.record(EngineCall::StepReplace(action))?;
        self.inner.step_replace(action)
    }

    fn list_buffers(&mut self) -> EngineResult<BufferList> {
        self.record(EngineCall::ListBuffers)?;
        self.inner.list_buffers()
    }

    fn switch_buffer(&mut self, name: &str) -> EngineResult<Snapshot> {
        self.record(EngineCall::SwitchBuffer(name.to_string()))?;
        self.inner.switch_buffer(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineErrorKind;

    #[test]
    fn test_mock_records_calls() {
        let mut mock = MockEngine::with_text("abc");
        mock.initialize().unwrap();
        mock.run(EditorCommand::MoveToLineEnd).unwrap();

        assert_eq!(mock.call_count(), 2);
        assert_eq!(
            mock.last_call(),
            Some(EngineCall::Run(EditorCommand::MoveToLineEnd))
        );
        assert_eq!(mock.inner().current().cursor(), 3);
    }

    #[test]
    fn test_mock_clear_calls() {
        let mut mock = MockEngine::new();
        mock.initialize().unwrap();
        mock.clear_calls();
        assert_eq!(mock.call_count(), 0);
        assert!(mock.last_call().is_none());
    }

    #[test]
    fn test_mock_has_call_and_commands() {
        let mut mock = MockEngine::new();
        mock.run(EditorCommand::insert("x")).unwrap();
        mock.list_buffers().unwrap();

        assert!(mock.has_call(|c| matches!(c, EngineCall::ListBuffers)));
        assert!(!mock.has_call(|c| matches!(c, EngineCall::Save)));
        assert_eq!(mock.commands(), vec![EditorCommand::insert("x")]);
    }

    #[test]
    fn test_mock_injected_failure_is_consumed() {
        let mut mock = MockEngine::new();
        mock.fail_next(
            |c| matches!(c, EngineCall::Run(_)),
            EngineError::InvalidCommand("boom".to_string()),
        );

        assert!(mock.initialize().is_ok());
        let err = mock.run(EditorCommand::Noop).unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::InvalidCommand);
        assert!(mock.run(EditorCommand::Noop).is_ok());
        assert_eq!(mock.call_count(), 3);
    }
}
