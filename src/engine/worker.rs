//! Engine worker thread
//!
//! `EngineHandle` owns a document engine running on its own thread. Every
//! call sends one request tagged with a sequence number and blocks until the
//! reply carrying the same number arrives, so engine calls are strictly
//! serialized and snapshots are applied in the order they were requested.

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use super::{
    BufferList, DocumentEngine, EngineError, EngineResult, ReplaceResponse, Snapshot,
};
use crate::command::EditorCommand;
use crate::query_replace::ReplaceAction;

/// A message plus the sequence number that pairs requests with replies
#[derive(Debug)]
struct Envelope<T> {
    seq: u64,
    body: T,
}

/// Requests sent to the engine thread
#[derive(Debug)]
enum Request {
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
    Shutdown,
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Request::Initialize => "initialize",
            Request::Run(cmd) => cmd.name(),
            Request::Open(_) => "open",
            Request::Save => "save",
            Request::SaveAs { .. } => "save_as",
            Request::FileExists(_) => "file_exists",
            Request::DefaultSaveDirectory => "default_save_directory",
            Request::PathCompletions(_) => "path_completions",
            Request::StartReplace { .. } => "start_replace",
            Request::StepReplace(_) => "step_replace",
            Request::ListBuffers => "list_buffers",
            Request::SwitchBuffer(_) => "switch_buffer",
            Request::Shutdown => "shutdown",
        }
    }
}

/// Replies from the engine thread
#[derive(Debug)]
enum Reply {
    Snapshot(EngineResult<Snapshot>),
    Exists(EngineResult<bool>),
    Directory(EngineResult<PathBuf>),
    Completions(EngineResult<Vec<String>>),
    Replace(EngineResult<ReplaceResponse>),
    Buffers(EngineResult<BufferList>),
}

/// Handle for talking to an engine on a worker thread
pub struct EngineHandle {
    tx: Sender<Envelope<Request>>,
    rx: Receiver<Envelope<Reply>>,
    next_seq: u64,
    worker: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Move `engine` onto a new thread and return a handle to it
    pub fn spawn<E>(engine: E) -> std::io::Result<Self>
    where
        E: DocumentEngine + Send + 'static,
    {
        let (req_tx, req_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();

        let worker = thread::Builder::new()
            .name("keyline-engine".to_string())
            .spawn(move || serve(engine, req_rx, reply_tx))?;

        Ok(Self {
            tx: req_tx,
            rx: reply_rx,
            next_seq: 0,
            worker: Some(worker),
        })
    }

    /// Send one request and wait for its reply, discarding stale replies
    fn call(&mut self, request: Request) -> EngineResult<Reply> {
        let seq = self.next_seq;
        self.next_seq += 1;

        debug!(target: "engine", seq, request = request.name(), "request");
        self.tx
            .send(Envelope { seq, body: request })
            .map_err(|_| EngineError::Disconnected)?;

        loop {
            let reply = self.rx.recv().map_err(|_| EngineError::Disconnected)?;
            if reply.seq == seq {
                return Ok(reply.body);
            }
            warn!(target: "engine", expected = seq, got = reply.seq, "discarding stale reply");
        }
    }

    fn call_snapshot(&mut self, request: Request) -> EngineResult<Snapshot> {
        match self.call(request)? {
            Reply::Snapshot(result) => result,
            other => Err(mismatch(other)),
        }
    }

    fn call_replace(&mut self, request: Request) -> EngineResult<ReplaceResponse> {
        match self.call(request)? {
            Reply::Replace(result) => result,
            other => Err(mismatch(other)),
        }
    }
}

fn mismatch(reply: Reply) -> EngineError {
    EngineError::InvalidCommand(format!("unexpected engine reply: {:?}", reply))
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        let _ = self.tx.send(Envelope {
            seq: self.next_seq,
            body: Request::Shutdown,
        });
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(target: "engine", "engine thread panicked");
            }
        }
    }
}

impl DocumentEngine for EngineHandle {
    fn initialize(&mut self) -> EngineResult<Snapshot> {
        self.call_snapshot(Request::Initialize)
    }

    fn run(&mut self, command: EditorCommand) -> EngineResult<Snapshot> {
        self.call_snapshot(Request::Run(command))
    }

    fn open(&mut self, path: &Path) -> EngineResult<Snapshot> {
        self.call_snapshot(Request::Open(path.to_path_buf()))
    }

    fn save(&mut self) -> EngineResult<Snapshot> {
        self.call_snapshot(Request::Save)
    }

    fn save_as(&mut self, path: &Path, overwrite: bool) -> EngineResult<Snapshot> {
        self.call_snapshot(Request::SaveAs {
            path: path.to_path_buf(),
            overwrite,
        })
    }

    fn file_exists(&mut self, path: &Path) -> EngineResult<bool> {
        match self.call(Request::FileExists(path.to_path_buf()))? {
            Reply::Exists(result) => result,
            other => Err(mismatch(other)),
        }
    }

    fn default_save_directory(&mut self) -> EngineResult<PathBuf> {
        match self.call(Request::DefaultSaveDirectory)? {
            Reply::Directory(result) => result,
            other => Err(mismatch(other)),
        }
    }

    fn path_completions(&mut self, input: &str) -> EngineResult<Vec<String>> {
        match self.call(Request::PathCompletions(input.to_string()))? {
            Reply::Completions(result) => result,
            other => Err(mismatch(other)),
        }
    }

    fn start_replace(&mut self, query: &str, replacement: &str) -> EngineResult<ReplaceResponse> {
        self.call_replace(Request::StartReplace {
            query: query.to_string(),
            replacement: replacement.to_string(),
        })
    }

    fn step_replace(&mut self, action: ReplaceAction) -> EngineResult<ReplaceResponse> {
        self.call_replace(Request::StepReplace(action))
    }

    fn list_buffers(&mut self) -> EngineResult<BufferList> {
        match self.call(Request::ListBuffers)? {
            Reply::Buffers(result) => result,
            other => Err(mismatch(other)),
        }
    }

    fn switch_buffer(&mut self, name: &str) -> EngineResult<Snapshot> {
        self.call_snapshot(Request::SwitchBuffer(name.to_string()))
    }
}

/// Engine thread main loop
fn serve<E: DocumentEngine>(
    mut engine: E,
    requests: Receiver<Envelope<Request>>,
    replies: Sender<Envelope<Reply>>,
) {
    while let Ok(Envelope { seq, body }) = requests.recv() {
        let reply = match body {
            Request::Shutdown => break,
            Request::Initialize => Reply::Snapshot(engine.initialize()),
            Request::Run(cmd) => Reply::Snapshot(engine.run(cmd)),
            Request::Open(path) => Reply::Snapshot(engine.open(&path)),
            Request::Save => Reply::Snapshot(engine.save()),
            Request::SaveAs { path, overwrite } => Reply::Snapshot(engine.save_as(&path, overwrite)),
            Request::FileExists(path) => Reply::Exists(engine.file_exists(&path)),
            Request::DefaultSaveDirectory => Reply::Directory(engine.default_save_directory()),
            Request::PathCompletions(input) => Reply::Completions(engine.path_completions(&input)),
            Request::StartReplace { query, replacement } => {
                Reply::Replace(engine.start_replace(&query, &replacement))
            }
            Request::StepReplace(action) => Reply::Replace(engine.step_replace(action)),
            Request::ListBuffers => Reply::Buffers(engine.list_buffers()),
            Request::SwitchBuffer(name) => Reply::Snapshot(engine.switch_buffer(&name)),
        };

        if replies.send(Envelope { seq, body: reply }).is_err() {
            break;
        }
    }
    debug!(target: "engine", "engine thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::local::LocalEngine;
    use crate::engine::EngineErrorKind;

    #[test]
    fn test_round_trip_through_worker() {
        let mut handle = EngineHandle::spawn(LocalEngine::default()).unwrap();
        handle.initialize().unwrap();
        handle.run(EditorCommand::insert("abc")).unwrap();
        let snap = handle.run(EditorCommand::MoveToBufferStart).unwrap();
        assert_eq!(snap.text, "abc");
        assert_eq!(snap.cursor, 0);
        assert_eq!(handle.next_seq, 3);
    }

    #[test]
    fn test_errors_cross_the_thread() {
        let mut handle = EngineHandle::spawn(LocalEngine::default()).unwrap();
        let err = handle.save().unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::NoFilePath);
    }

    #[test]
    fn test_replace_through_worker() {
        let mut handle = EngineHandle::spawn(LocalEngine::with_text("a b a")).unwrap();
        let start = handle.start_replace("a", "x").unwrap();
        assert!(!start.status.done);
        let done = handle.step_replace(ReplaceAction::ReplaceAll).unwrap();
        assert!(done.status.done);
        assert_eq!(done.snapshot.text, "x b x");
    }

    #[test]
    fn test_disconnected_engine() {
        let (tx, req_rx) = unbounded();
        let (_reply_tx, rx) = unbounded();
        drop(req_rx);
        let mut handle = EngineHandle {
            tx,
            rx,
            next_seq: 0,
            worker: None,
        };
        let err = handle.initialize().unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::Disconnected);
    }

    #[test]
    fn test_stale_replies_are_skipped() {
        let (tx, req_rx) = unbounded::<Envelope<Request>>();
        let (reply_tx, rx) = unbounded();
        let fake = thread::spawn(move || {
            if let Ok(request) = req_rx.recv() {
                let _ = reply_tx.send(Envelope {
                    seq: request.seq + 100,
                    body: Reply::Exists(Ok(false)),
                });
                let _ = reply_tx.send(Envelope {
                    seq: request.seq,
                    body: Reply::Exists(Ok(true)),
                });
            }
        });

        let mut handle = EngineHandle {
            tx,
            rx,
            next_seq: 7,
            worker: None,
        };
        assert!(handle.file_exists(Path::new("/anything")).unwrap());
        fake.join().unwrap();
    }

    #[test]
    fn test_mismatched_reply_is_an_error() {
        let (tx, req_rx) = unbounded::<Envelope<Request>>();
        let (reply_tx, rx) = unbounded();
        let fake = thread::spawn(move || {
            if let Ok(request) = req_rx.recv() {
                let _ = reply_tx.send(Envelope {
                    seq: request.seq,
                    body: Reply::Exists(Ok(true)),
                });
            }
        });

        let mut handle = EngineHandle {
            tx,
            rx,
            next_seq: 0,
            worker: None,
        };
        let err = handle.initialize().unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::InvalidCommand);
        fake.join().unwrap();
    }
}
