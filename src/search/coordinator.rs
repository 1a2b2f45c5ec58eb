//! Main-side half of the search protocol.
//!
//! The coordinator owns the worker task and a single response channel that outlives every
//! worker it creates. Each [`load`](SearchCoordinator::load) replaces the worker and bumps the
//! generation, so replies from a replaced worker (or for a superseded request) are recognised
//! and dropped in [`handle_response`](SearchCoordinator::handle_response).

use crate::error::{NdjviewError, Result};
use crate::record::LogRecord;
use crate::search::protocol::{Generation, RecordSet, RequestId, WorkerRequest, WorkerResponse};
use crate::search::worker::search_worker_loop;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::JoinHandle;

const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Readiness of the worker's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// Nothing loaded yet
    Idle,
    /// `LoadData` sent, waiting for `Ready`
    Loading { generation: Generation },
    Ready { generation: Generation, count: usize },
}

struct WorkerHandle {
    tx: Sender<WorkerRequest>,
    task: JoinHandle<()>,
}

pub struct SearchCoordinator {
    worker: Option<WorkerHandle>,
    response_tx: Sender<WorkerResponse>,
    response_rx: Receiver<WorkerResponse>,
    capacity: usize,
    generation: Generation,
    status: IndexStatus,
    next_request_id: RequestId,
    pending_request: Option<RequestId>,
    /// Query carried by the pending request
    pending_query: Arc<str>,
    query: Arc<str>,
    loaded: RecordSet,
    results: RecordSet,
    /// Generation and query that `results` answer
    results_for: Option<(Generation, Arc<str>)>,
}

impl SearchCoordinator {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (response_tx, response_rx) = mpsc::channel(capacity);
        let empty: RecordSet = Arc::from(Vec::new());
        Self {
            worker: None,
            response_tx,
            response_rx,
            capacity,
            generation: 0,
            status: IndexStatus::Idle,
            next_request_id: 0,
            pending_request: None,
            pending_query: Arc::from(""),
            query: Arc::from(""),
            loaded: Arc::clone(&empty),
            results: empty,
            results_for: None,
        }
    }

    /// Replace the worker with a fresh one indexing `records`. Must run inside a tokio runtime.
    ///
    /// Until the new worker answers `Ready`, searches are dropped and [`is_indexing`](Self::is_indexing)
    /// is true. Returns the generation of the new load.
    pub fn load(&mut self, records: Vec<Arc<LogRecord>>) -> Result<Generation> {
        self.stop_worker();

        self.generation += 1;
        let generation = self.generation;
        self.loaded = Arc::from(records.clone());
        self.pending_request = None;
        self.status = IndexStatus::Loading { generation };

        let (tx, rx) = mpsc::channel(self.capacity);
        let task = tokio::spawn(search_worker_loop(rx, self.response_tx.clone()));
        tx.try_send(WorkerRequest::LoadData {
            generation,
            records,
        })
        .map_err(|_| NdjviewError::search("search worker rejected its data"))?;
        self.worker = Some(WorkerHandle { tx, task });

        log::debug!(
            "search index generation {generation} loading {} records",
            self.loaded.len()
        );
        Ok(generation)
    }

    /// Record `query` as the current filter and dispatch it if the index is ready.
    ///
    /// Returns `false` when the search was dropped because the index is still loading (or was
    /// never loaded). The query is kept either way and re-issued once the index is ready.
    pub fn search(&mut self, query: &str) -> bool {
        self.query = Arc::from(query);
        if !matches!(self.status, IndexStatus::Ready { .. }) {
            log::debug!("search {query:?} dropped: index not ready");
            return false;
        }
        match self.dispatch() {
            Ok(()) => true,
            Err(error) => {
                log::warn!("search {query:?} not sent: {error}");
                false
            }
        }
    }

    /// Apply one worker reply. Returns whether visible state changed.
    pub fn handle_response(&mut self, response: WorkerResponse) -> Result<bool> {
        if response.generation() != self.generation {
            log::debug!(
                "discarding reply for generation {} (current {})",
                response.generation(),
                self.generation
            );
            return Ok(false);
        }

        match response {
            WorkerResponse::Ready { generation, count } => {
                self.status = IndexStatus::Ready { generation, count };
                if self.query.is_empty() {
                    self.results = Arc::clone(&self.loaded);
                    self.results_for = Some((generation, Arc::clone(&self.query)));
                } else {
                    // Previous results stay until the re-issued query is answered.
                    self.dispatch()?;
                }
                Ok(true)
            }
            WorkerResponse::Results {
                request_id,
                records,
                ..
            } => {
                if self.pending_request != Some(request_id) {
                    log::debug!("discarding results for superseded request {request_id}");
                    return Ok(false);
                }
                self.pending_request = None;
                self.results = records;
                self.results_for = Some((self.generation, Arc::clone(&self.pending_query)));
                Ok(true)
            }
        }
    }

    /// Wait for the next worker reply.
    pub async fn next_response(&mut self) -> Option<WorkerResponse> {
        self.response_rx.recv().await
    }

    pub fn try_next_response(&mut self) -> Option<WorkerResponse> {
        self.response_rx.try_recv().ok()
    }

    pub fn is_indexing(&self) -> bool {
        matches!(self.status, IndexStatus::Loading { .. })
    }

    /// Whether a dispatched search has not been answered yet.
    pub fn is_searching(&self) -> bool {
        self.pending_request.is_some()
    }

    pub fn status(&self) -> IndexStatus {
        self.status
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Records from the latest applied reply. They may belong to an earlier generation or
    /// query; see [`results_query`](Self::results_query).
    pub fn results(&self) -> RecordSet {
        Arc::clone(&self.results)
    }

    /// The query [`results`](Self::results) answer, if they come from the current generation.
    pub fn results_query(&self) -> Option<&str> {
        match &self.results_for {
            Some((generation, query)) if *generation == self.generation => Some(query),
            _ => None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.tx.send(WorkerRequest::Shutdown).await;
            if let Err(error) = worker.task.await {
                log::warn!("search worker ended abnormally: {error}");
            }
        }
        self.status = IndexStatus::Idle;
        self.pending_request = None;
    }

    fn dispatch(&mut self) -> Result<()> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| NdjviewError::search("no search worker running"))?;

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        worker
            .tx
            .try_send(WorkerRequest::Search {
                generation: self.generation,
                request_id,
                query: Arc::clone(&self.query),
            })
            .map_err(|error| NdjviewError::search(format!("search request not sent: {error}")))?;
        self.pending_request = Some(request_id);
        self.pending_query = Arc::clone(&self.query);
        Ok(())
    }

    fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.tx.try_send(WorkerRequest::Shutdown).is_err() {
                worker.task.abort();
            }
        }
    }
}

impl Default for SearchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use tokio::time::{timeout, Duration};

    fn record(time: i64, fields: Value) -> Arc<LogRecord> {
        let fields: Map<String, Value> = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Arc::new(LogRecord::new(time, fields))
    }

    fn sample() -> Vec<Arc<LogRecord>> {
        vec![
            record(1, json!({"level": "error"})),
            record(2, json!({"level": "info"})),
        ]
    }

    async fn pump(coordinator: &mut SearchCoordinator) -> bool {
        let response = timeout(Duration::from_secs(1), coordinator.next_response())
            .await
            .expect("worker reply timed out")
            .expect("response channel closed");
        coordinator.handle_response(response).unwrap()
    }

    #[tokio::test]
    async fn search_before_ready_is_dropped() {
        let mut coordinator = SearchCoordinator::new();
        assert!(!coordinator.search("error"));

        coordinator.load(sample()).unwrap();
        assert!(coordinator.is_indexing());
        assert!(!coordinator.search("error"));
        assert!(!coordinator.is_searching());
    }

    #[tokio::test]
    async fn ready_with_empty_query_applies_full_set() {
        let mut coordinator = SearchCoordinator::new();
        coordinator.load(sample()).unwrap();
        assert_eq!(coordinator.results_query(), None);

        assert!(pump(&mut coordinator).await);
        assert_eq!(coordinator.results().len(), 2);
        assert_eq!(coordinator.results_query(), Some(""));
        assert!(!coordinator.is_searching());
    }

    #[tokio::test]
    async fn ready_with_query_waits_for_filtered_results() {
        let mut coordinator = SearchCoordinator::new();
        coordinator.load(sample()).unwrap();
        coordinator.search("error");

        assert!(pump(&mut coordinator).await);
        assert_eq!(
            coordinator.status(),
            IndexStatus::Ready {
                generation: 1,
                count: 2
            }
        );
        assert!(coordinator.is_searching());
        // The unfiltered set is never presented as the answer to "error".
        assert_eq!(coordinator.results_query(), None);
        assert!(coordinator.results().is_empty());

        assert!(pump(&mut coordinator).await);
        let results = coordinator.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].str_field("level"), Some("error"));
        assert_eq!(coordinator.results_query(), Some("error"));
    }

    #[tokio::test]
    async fn reload_marks_previous_results_stale() {
        let mut coordinator = SearchCoordinator::new();
        coordinator.load(sample()).unwrap();
        coordinator.search("info");
        assert!(pump(&mut coordinator).await);
        assert!(pump(&mut coordinator).await);
        assert_eq!(coordinator.results_query(), Some("info"));

        coordinator.load(sample()).unwrap();
        assert_eq!(coordinator.results_query(), None);
        assert!(pump(&mut coordinator).await);
        assert_eq!(coordinator.results_query(), None);
        assert!(pump(&mut coordinator).await);
        assert_eq!(coordinator.results_query(), Some("info"));
    }

    #[tokio::test]
    async fn stale_generation_is_discarded() {
        let mut coordinator = SearchCoordinator::new();
        coordinator.load(sample()).unwrap();
        coordinator.load(vec![record(5, json!({"level": "warn"}))]).unwrap();

        let stale = WorkerResponse::Ready {
            generation: 1,
            count: 2,
        };
        assert!(!coordinator.handle_response(stale).unwrap());
        assert!(coordinator.is_indexing());
    }

    #[tokio::test]
    async fn only_latest_request_is_applied() {
        let mut coordinator = SearchCoordinator::new();
        coordinator.load(sample()).unwrap();
        assert!(pump(&mut coordinator).await);

        assert!(coordinator.search("error"));
        assert!(coordinator.search("info"));

        let first = timeout(Duration::from_secs(1), coordinator.next_response())
            .await
            .unwrap()
            .unwrap();
        assert!(!coordinator.handle_response(first).unwrap());

        assert!(pump(&mut coordinator).await);
        let results = coordinator.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].str_field("level"), Some("info"));
    }

    #[tokio::test]
    async fn shutdown_returns_to_idle() {
        let mut coordinator = SearchCoordinator::new();
        coordinator.load(sample()).unwrap();
        coordinator.shutdown().await;
        assert_eq!(coordinator.status(), IndexStatus::Idle);
        assert!(!coordinator.search("x"));
    }
}
