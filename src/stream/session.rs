//! Stream session controller.
//!
//! One session is one attempt to read a [`ChunkSource`] from the start. The controller owns the
//! active session's cancellation token and drives the read loop on a tokio task:
//!
//! ```text
//! Idle -> Connecting -> Streaming -> { Completed | Aborted | Failed }
//!            ^                                    |
//!            +------------- retry() --------------+
//! ```
//!
//! Every mutation the read loop makes (byte counters, store appends, state transitions) happens
//! under a single lock and only while the session is still current: same session id, token not
//! cancelled, state still active. A read that resolves after `abort()` or `retry()` therefore
//! changes nothing.

use crate::error::NdjviewError;
use crate::metrics::PerformanceMarks;
use crate::record::LogRecord;
use crate::store::LogStore;
use crate::stream::parser::NdjsonDecoder;
use crate::stream::source::ChunkSource;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one ingestion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Aborted,
    Failed,
}

impl SessionState {
    /// Connecting or streaming
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Aborted | SessionState::Failed
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Connecting => "Connecting",
            SessionState::Streaming => "Streaming",
            SessionState::Completed => "Complete",
            SessionState::Aborted => "Aborted",
            SessionState::Failed => "Failed",
        }
    }
}

/// Consumer-facing snapshot of the current session.
#[derive(Debug, Clone)]
pub struct StreamStatus {
    pub session_id: u64,
    pub state: SessionState,
    pub record_count: usize,
    pub bytes_loaded: u64,
    pub total_bytes: Option<u64>,
    pub error: Option<Arc<NdjviewError>>,
    pub ttfb: Option<Duration>,
    pub ttfr: Option<Duration>,
}

impl StreamStatus {
    pub fn is_loading(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Completed
    }
}

#[derive(Debug)]
struct SessionShared {
    session_id: u64,
    state: SessionState,
    bytes_loaded: u64,
    total_bytes: Option<u64>,
    error: Option<Arc<NdjviewError>>,
    marks: PerformanceMarks,
}

/// Owns the active session and exposes abort/retry.
pub struct StreamController {
    source: Arc<dyn ChunkSource>,
    store: LogStore,
    shared: Arc<Mutex<SessionShared>>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StreamController {
    pub fn new(source: Arc<dyn ChunkSource>, store: LogStore) -> Self {
        Self {
            source,
            store,
            shared: Arc::new(Mutex::new(SessionShared {
                session_id: 0,
                state: SessionState::Idle,
                bytes_loaded: 0,
                total_bytes: None,
                error: None,
                marks: PerformanceMarks::new(),
            })),
            token: CancellationToken::new(),
            task: None,
        }
    }

    /// Begin ingestion. Equivalent to [`retry`](Self::retry).
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.retry();
    }

    /// Cancel whatever is running, clear all accumulated state, and start over.
    pub fn retry(&mut self) {
        self.token.cancel();
        let token = CancellationToken::new();

        let session_id = {
            let mut shared = self.shared.lock();
            if shared.state.is_active() {
                shared.state = SessionState::Aborted;
            }
            shared.session_id += 1;
            shared.state = SessionState::Connecting;
            shared.bytes_loaded = 0;
            shared.total_bytes = None;
            shared.error = None;
            shared.marks.mark_fetch_start();
            self.store.reset();
            shared.session_id
        };

        log::info!(
            "Starting stream session {} for {}",
            session_id,
            self.source.describe()
        );

        self.token = token.clone();
        let task = SessionTask {
            session_id,
            source: Arc::clone(&self.source),
            shared: Arc::clone(&self.shared),
            store: self.store.clone(),
            token,
        };
        self.task = Some(tokio::spawn(run_session(task)));
    }

    /// Stop the active session, keeping whatever was already appended.
    ///
    /// Idempotent; aborting a finished session does nothing.
    pub fn abort(&self) {
        let mut shared = self.shared.lock();
        self.token.cancel();
        if shared.state.is_active() {
            shared.state = SessionState::Aborted;
            log::info!(
                "Stream session {} aborted after {} bytes",
                shared.session_id,
                shared.bytes_loaded
            );
        }
    }

    pub fn status(&self) -> StreamStatus {
        let shared = self.shared.lock();
        StreamStatus {
            session_id: shared.session_id,
            state: shared.state,
            record_count: self.store.len(),
            bytes_loaded: shared.bytes_loaded,
            total_bytes: shared.total_bytes,
            error: shared.error.clone(),
            ttfb: shared.marks.ttfb(),
            ttfr: shared.marks.ttfr(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn source_label(&self) -> String {
        self.source.describe()
    }

    /// Note that the first row of this session has been drawn.
    pub fn record_first_render(&self) -> Option<Duration> {
        self.shared.lock().marks.record_first_render()
    }

    /// Wait for the most recently started read loop to exit.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                log::warn!("Stream task ended abnormally: {}", err);
            }
        }
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

struct SessionTask {
    session_id: u64,
    source: Arc<dyn ChunkSource>,
    shared: Arc<Mutex<SessionShared>>,
    store: LogStore,
    token: CancellationToken,
}

impl SessionTask {
    fn is_current(&self, shared: &SessionShared) -> bool {
        shared.session_id == self.session_id
            && !self.token.is_cancelled()
            && shared.state.is_active()
    }

    fn enter_streaming(&self, total_bytes: Option<u64>) -> bool {
        let mut shared = self.shared.lock();
        if !self.is_current(&shared) {
            return false;
        }
        shared.state = SessionState::Streaming;
        shared.total_bytes = total_bytes;
        true
    }

    fn commit_chunk(&self, byte_len: u64, records: Vec<LogRecord>) -> bool {
        let mut shared = self.shared.lock();
        if !self.is_current(&shared) {
            return false;
        }
        shared.marks.record_first_byte();
        shared.bytes_loaded += byte_len;
        log::debug!(
            "Session {}: chunk of {} bytes, {} records",
            self.session_id,
            byte_len,
            records.len()
        );
        self.store.append(records);
        true
    }

    fn complete(&self, tail: Vec<LogRecord>) {
        let mut shared = self.shared.lock();
        if !self.is_current(&shared) {
            return;
        }
        self.store.append(tail);
        shared.state = SessionState::Completed;
        log::info!(
            "Stream session {} complete: {} records, {} bytes",
            self.session_id,
            self.store.len(),
            shared.bytes_loaded
        );
    }

    fn fail(&self, error: NdjviewError) {
        let mut shared = self.shared.lock();
        if !self.is_current(&shared) {
            return;
        }
        log::warn!("Stream session {} failed: {}", self.session_id, error);
        shared.state = SessionState::Failed;
        shared.error = Some(Arc::new(error));
    }
}

async fn run_session(task: SessionTask) {
    let opened = tokio::select! {
        biased;
        _ = task.token.cancelled() => return,
        result = task.source.open() => result,
    };

    let response = match opened {
        Ok(response) => response,
        Err(error) => {
            task.fail(error);
            return;
        }
    };

    if !task.enter_streaming(response.total_bytes) {
        return;
    }

    let mut body = response.body;
    let mut decoder = NdjsonDecoder::<LogRecord>::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = task.token.cancelled() => return,
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                let records = decoder.push(&chunk);
                if !task.commit_chunk(chunk.len() as u64, records) {
                    return;
                }
            }
            Some(Err(error)) => {
                task.fail(error);
                return;
            }
            None => break,
        }
    }

    task.complete(decoder.finish());
}
