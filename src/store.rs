//! Append-only log store.
//!
//! The store holds every record parsed by the active session in arrival order. Indices are
//! stable once assigned: there is no deletion, reordering, or in-place mutation. The only
//! way back to an empty store is a session retry, which bumps [`LogStore::generation`] so
//! readers can tell the sequence changed identity.

use crate::record::LogRecord;
use parking_lot::RwLock;
use std::ops::Range;
use std::sync::Arc;

#[derive(Debug, Default)]
struct StoreInner {
    records: Vec<Arc<LogRecord>>,
    generation: u64,
}

/// Shared handle to the record sequence. Cloning is cheap.
#[derive(Debug, Clone, Default)]
pub struct LogStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended so far
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Incremented every time the store is reset for a new session.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    pub fn get(&self, index: usize) -> Option<Arc<LogRecord>> {
        self.inner.read().records.get(index).cloned()
    }

    /// Records in `range`, clamped to the current length.
    pub fn range(&self, range: Range<usize>) -> Vec<Arc<LogRecord>> {
        let inner = self.inner.read();
        let end = range.end.min(inner.records.len());
        let start = range.start.min(end);
        inner.records[start..end].to_vec()
    }

    /// Copy of the full sequence (record bodies are shared, not cloned).
    pub fn snapshot(&self) -> Vec<Arc<LogRecord>> {
        self.inner.read().records.clone()
    }

    /// `(generation, len)` read under one lock.
    pub fn version(&self) -> (u64, usize) {
        let inner = self.inner.read();
        (inner.generation, inner.records.len())
    }

    pub(crate) fn append(&self, records: Vec<LogRecord>) {
        if records.is_empty() {
            return;
        }
        let mut inner = self.inner.write();
        inner.records.extend(records.into_iter().map(Arc::new));
    }

    pub(crate) fn reset(&self) {
        let mut inner = self.inner.write();
        inner.records = Vec::new();
        inner.generation += 1;
    }
}
