use crate::record::LogRecord;
use crate::search::protocol::{Generation, RecordSet, RequestId, WorkerRequest, WorkerResponse};
use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};

/// A record paired with the text queries run against.
#[derive(Debug, Clone)]
pub struct SearchIndexEntry {
    pub record: Arc<LogRecord>,
    pub text: String,
}

impl SearchIndexEntry {
    pub fn new(record: Arc<LogRecord>) -> Self {
        let text = record.summary();
        Self { record, text }
    }
}

/// Worker-owned index over one loaded record set.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    generation: Generation,
    entries: Vec<SearchIndexEntry>,
    all: RecordSet,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self {
            generation: 0,
            entries: Vec::new(),
            all: Arc::from(Vec::new()),
        }
    }
}

impl SearchIndex {
    /// Build the searchable text for every record up front so queries never re-serialize.
    pub fn build(generation: Generation, records: Vec<Arc<LogRecord>>) -> Self {
        let entries = records
            .iter()
            .map(|record| SearchIndexEntry::new(Arc::clone(record)))
            .collect();
        Self {
            generation,
            entries,
            all: Arc::from(records),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records whose text matches `query` case-insensitively, in load order.
    ///
    /// An empty or invalid pattern matches everything.
    pub fn search(&self, query: &str) -> RecordSet {
        if query.is_empty() {
            return Arc::clone(&self.all);
        }

        let matcher = match compile_query(query) {
            Some(matcher) => matcher,
            None => return Arc::clone(&self.all),
        };

        self.entries
            .iter()
            .filter(|entry| matcher.is_match(entry.text.as_bytes()).unwrap_or(false))
            .map(|entry| Arc::clone(&entry.record))
            .collect()
    }
}

fn compile_query(query: &str) -> Option<RegexMatcher> {
    match RegexMatcherBuilder::new()
        .case_insensitive(true)
        .build(query)
    {
        Ok(matcher) => Some(matcher),
        Err(error) => {
            log::debug!("invalid search pattern {query:?}, returning all records: {error}");
            None
        }
    }
}

/// Run the search worker until `Shutdown` or until either channel closes.
pub async fn search_worker_loop(mut rx: Receiver<WorkerRequest>, tx: Sender<WorkerResponse>) {
    let mut state = WorkerState::default();

    while let Some(request) = rx.recv().await {
        let outcome = state.handle_request(request);
        if let Some(response) = outcome.response {
            if tx.send(response).await.is_err() {
                break;
            }
        }

        if outcome.done {
            break;
        }
    }
}

#[derive(Default)]
struct WorkerState {
    index: SearchIndex,
}

impl WorkerState {
    fn handle_request(&mut self, request: WorkerRequest) -> HandlerOutcome {
        match request {
            WorkerRequest::LoadData {
                generation,
                records,
            } => {
                self.index = SearchIndex::build(generation, records);
                log::debug!(
                    "search index generation {generation} built with {} records",
                    self.index.len()
                );
                HandlerOutcome::respond(WorkerResponse::Ready {
                    generation,
                    count: self.index.len(),
                })
            }
            WorkerRequest::Search {
                generation,
                request_id,
                query,
            } => HandlerOutcome::respond(self.search(generation, request_id, &query)),
            WorkerRequest::Shutdown => HandlerOutcome::exit(),
        }
    }

    fn search(&self, generation: Generation, request_id: RequestId, query: &str) -> WorkerResponse {
        if generation != self.index.generation() {
            log::debug!(
                "search {request_id} targets generation {generation}, index is at {}",
                self.index.generation()
            );
        }
        // Replies carry the index's own generation so the coordinator can spot mismatches.
        WorkerResponse::Results {
            generation: self.index.generation(),
            request_id,
            records: self.index.search(query),
        }
    }
}

struct HandlerOutcome {
    response: Option<WorkerResponse>,
    done: bool,
}

impl HandlerOutcome {
    fn respond(response: WorkerResponse) -> Self {
        Self {
            response: Some(response),
            done: false,
        }
    }

    fn exit() -> Self {
        Self {
            response: None,
            done: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn record(time: i64, fields: Value) -> Arc<LogRecord> {
        let fields: Map<String, Value> = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Arc::new(LogRecord::new(time, fields))
    }

    fn sample() -> Vec<Arc<LogRecord>> {
        vec![
            record(1, json!({"level": "error", "msg": "disk full"})),
            record(2, json!({"level": "info", "msg": "started"})),
            record(3, json!({"level": "ERROR", "msg": "timeout"})),
        ]
    }

    fn times(records: &RecordSet) -> Vec<f64> {
        records.iter().map(|r| r.timestamp_ms()).collect()
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let index = SearchIndex::build(1, sample());
        assert_eq!(times(&index.search("")), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn query_is_case_insensitive() {
        let index = SearchIndex::build(1, sample());
        assert_eq!(times(&index.search("error")), vec![1.0, 3.0]);
    }

    #[test]
    fn regex_queries_are_supported() {
        let index = SearchIndex::build(1, sample());
        assert_eq!(times(&index.search("disk|timeout")), vec![1.0, 3.0]);
    }

    #[test]
    fn invalid_pattern_fails_open() {
        let index = SearchIndex::build(1, sample());
        assert_eq!(times(&index.search("([")), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn keys_are_searchable() {
        let index = SearchIndex::build(1, sample());
        assert_eq!(index.search("\"msg\"").len(), 3);
        assert_eq!(index.search("nomatch-here").len(), 0);
    }

    #[test]
    fn load_replaces_previous_index() {
        let mut state = WorkerState::default();
        state.handle_request(WorkerRequest::LoadData {
            generation: 1,
            records: sample(),
        });
        let outcome = state.handle_request(WorkerRequest::LoadData {
            generation: 2,
            records: vec![record(9, json!({"level": "warn"}))],
        });

        match outcome.response {
            Some(WorkerResponse::Ready { generation, count }) => {
                assert_eq!(generation, 2);
                assert_eq!(count, 1);
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert!(!outcome.done);
        assert_eq!(state.index.search("error").len(), 0);
    }

    #[test]
    fn search_before_load_is_empty() {
        let state = WorkerState::default();
        match state.search(3, 7, "x") {
            WorkerResponse::Results {
                generation,
                request_id,
                records,
            } => {
                assert_eq!(generation, 0);
                assert_eq!(request_id, 7);
                assert!(records.is_empty());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn shutdown_ends_the_loop() {
        let mut state = WorkerState::default();
        let outcome = state.handle_request(WorkerRequest::Shutdown);
        assert!(outcome.done);
        assert!(outcome.response.is_none());
    }
}
