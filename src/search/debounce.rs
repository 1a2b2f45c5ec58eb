//! Collapses bursts of query edits into one search.

use std::time::{Duration, Instant};

/// Default quiet period before a query is dispatched.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Holds the latest value until it has gone `window` without being replaced.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    last_update: Instant,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn with_default_window() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending value and restart the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            last_update: now,
        });
    }

    /// Take the pending value if it has been stable for the full window.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|p| now.saturating_duration_since(p.last_update) >= self.window);
        if ready {
            self.flush()
        } else {
            None
        }
    }

    /// When the pending value becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.last_update + self.window)
    }

    /// Take the pending value immediately (e.g. on Enter).
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::with_default_window()
    }
}
