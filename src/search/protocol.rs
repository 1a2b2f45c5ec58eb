//! Messages exchanged between the [`SearchCoordinator`](crate::search::SearchCoordinator) and the
//! search worker task.

use crate::record::LogRecord;
use std::sync::Arc;

/// Identifies one full load of the worker's index.
pub type Generation = u64;

/// Identifies one search request within a generation.
pub type RequestId = u64;

/// Records handed to the worker. The `Arc`s are shared, never mutated, so handing them over is a
/// move of ownership for all practical purposes.
pub type RecordSet = Arc<[Arc<LogRecord>]>;

/// Requests sent to the worker.
#[derive(Debug, Clone)]
pub enum WorkerRequest {
    /// Replace the index with `records`
    LoadData {
        generation: Generation,
        records: Vec<Arc<LogRecord>>,
    },
    /// Filter the current index
    Search {
        generation: Generation,
        request_id: RequestId,
        query: Arc<str>,
    },
    Shutdown,
}

/// Replies sent back by the worker.
#[derive(Debug, Clone)]
pub enum WorkerResponse {
    /// The index for `generation` is built
    Ready { generation: Generation, count: usize },
    /// Matching records, in original order
    Results {
        generation: Generation,
        request_id: RequestId,
        records: RecordSet,
    },
}

impl WorkerResponse {
    pub fn generation(&self) -> Generation {
        match self {
            WorkerResponse::Ready { generation, .. } | WorkerResponse::Results { generation, .. } => {
                *generation
            }
        }
    }
}
