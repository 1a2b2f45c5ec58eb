//! Time-to-first-byte and time-to-first-render capture.
//!
//! Each value is recorded at most once per fetch; [`PerformanceMarks::mark_fetch_start`]
//! clears both so a retry is measured from its own start.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct PerformanceMarks {
    fetch_start: Option<Instant>,
    ttfb: Option<Duration>,
    ttfr: Option<Duration>,
}

impl PerformanceMarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_fetch_start(&mut self) {
        self.mark_fetch_start_at(Instant::now());
    }

    pub fn mark_fetch_start_at(&mut self, now: Instant) {
        self.fetch_start = Some(now);
        self.ttfb = None;
        self.ttfr = None;
    }

    /// Record the first chunk's arrival. Returns the value only the first time.
    pub fn record_first_byte(&mut self) -> Option<Duration> {
        self.record_first_byte_at(Instant::now())
    }

    pub fn record_first_byte_at(&mut self, now: Instant) -> Option<Duration> {
        Self::record_once(&mut self.ttfb, self.fetch_start, now)
    }

    /// Record the first drawn row. Returns the value only the first time.
    pub fn record_first_render(&mut self) -> Option<Duration> {
        self.record_first_render_at(Instant::now())
    }

    pub fn record_first_render_at(&mut self, now: Instant) -> Option<Duration> {
        Self::record_once(&mut self.ttfr, self.fetch_start, now)
    }

    pub fn ttfb(&self) -> Option<Duration> {
        self.ttfb
    }

    pub fn ttfr(&self) -> Option<Duration> {
        self.ttfr
    }

    fn record_once(
        slot: &mut Option<Duration>,
        start: Option<Instant>,
        now: Instant,
    ) -> Option<Duration> {
        if slot.is_some() {
            return None;
        }
        let elapsed = now.saturating_duration_since(start?);
        *slot = Some(elapsed);
        Some(elapsed)
    }
}

/// Format a duration as whole milliseconds for the status bar.
pub fn format_millis(duration: Duration) -> String {
    format!("{}ms", duration.as_millis())
}
