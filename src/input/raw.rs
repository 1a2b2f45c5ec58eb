//! Terminal event collection: crossterm polling and mouse-wheel coalescing.
//!
//! Wheel ticks arrive far faster than frames are drawn, so consecutive ticks in one direction are
//! merged into a single scroll of several lines.

use crate::error::Result;
use ratatui::crossterm::event::{self, Event, KeyEvent, MouseEvent, MouseEventKind};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_COALESCE_WINDOW_MS: u64 = 12;
/// Lines per wheel tick
const WHEEL_LINES: u64 = 3;
const DEFAULT_POLL_TIMEOUT_MS: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Signed line delta for `lines` in this direction.
    pub fn delta(self, lines: u64) -> i64 {
        let lines = lines.min(i64::MAX as u64) as i64;
        match self {
            ScrollDirection::Up => -lines,
            ScrollDirection::Down => lines,
        }
    }
}

/// Events after coalescing, before key bindings are applied.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInputEvent {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
    Scroll { direction: ScrollDirection, lines: u64 },
}

/// Merges same-direction wheel ticks that arrive within `window` of each other.
#[derive(Debug, Clone)]
pub struct InputCoalescer {
    window: Duration,
    pending: Option<PendingScroll>,
}

#[derive(Debug, Clone)]
struct PendingScroll {
    direction: ScrollDirection,
    lines: u64,
    last_event: Instant,
}

impl InputCoalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn with_default_window() -> Self {
        Self::new(Duration::from_millis(DEFAULT_COALESCE_WINDOW_MS))
    }

    /// Add a tick. A direction change flushes and returns the previous accumulation.
    pub fn push(
        &mut self,
        direction: ScrollDirection,
        lines: u64,
        now: Instant,
    ) -> Option<(ScrollDirection, u64)> {
        if let Some(pending) = self.pending.as_mut() {
            if pending.direction == direction {
                pending.lines = pending.lines.saturating_add(lines);
                pending.last_event = now;
                return None;
            }
        }
        self.pending
            .replace(PendingScroll {
                direction,
                lines,
                last_event: now,
            })
            .map(|previous| (previous.direction, previous.lines))
    }

    /// Flush once no tick has arrived for a full window.
    pub fn flush_if_stale(&mut self, now: Instant) -> Option<(ScrollDirection, u64)> {
        let stale = self
            .pending
            .as_ref()
            .is_some_and(|p| now.saturating_duration_since(p.last_event) >= self.window);
        if stale {
            self.flush()
        } else {
            None
        }
    }

    pub fn flush(&mut self) -> Option<(ScrollDirection, u64)> {
        self.pending.take().map(|p| (p.direction, p.lines))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }
}

/// Polls crossterm and queues coalesced events in arrival order.
#[derive(Debug)]
pub struct RawInputCollector {
    coalescer: InputCoalescer,
    queue: VecDeque<RawInputEvent>,
}

impl RawInputCollector {
    pub fn new() -> Self {
        Self::with_window(Duration::from_millis(DEFAULT_COALESCE_WINDOW_MS))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            coalescer: InputCoalescer::new(window),
            queue: VecDeque::new(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.coalescer.is_empty()
    }

    /// Feed an event without polling the terminal.
    pub fn process_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => self.queue.push_back(RawInputEvent::Key(key)),
            Event::Resize(width, height) => {
                self.flush_scroll();
                self.queue.push_back(RawInputEvent::Resize { width, height });
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    /// Next ready event without blocking: a stale scroll first, then queued events.
    pub fn try_next(&mut self) -> Option<RawInputEvent> {
        if let Some(event) = self.queue.pop_front() {
            return Some(event);
        }
        self.coalescer
            .flush_if_stale(Instant::now())
            .map(|(direction, lines)| RawInputEvent::Scroll { direction, lines })
    }

    /// Wait up to `timeout` for the next event.
    pub fn poll_event(&mut self, timeout: Option<Duration>) -> Result<Option<RawInputEvent>> {
        if let Some(event) = self.try_next() {
            return Ok(Some(event));
        }

        let timeout = timeout.unwrap_or(Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS));
        if event::poll(timeout)? {
            self.process_event(event::read()?);
        }
        Ok(self.try_next())
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let direction = match mouse.kind {
            MouseEventKind::ScrollUp => ScrollDirection::Up,
            MouseEventKind::ScrollDown => ScrollDirection::Down,
            _ => return,
        };
        if let Some((direction, lines)) = self.coalescer.push(direction, WHEEL_LINES, Instant::now())
        {
            self.queue
                .push_back(RawInputEvent::Scroll { direction, lines });
        }
    }

    fn flush_scroll(&mut self) {
        if let Some((direction, lines)) = self.coalescer.flush() {
            self.queue
                .push_back(RawInputEvent::Scroll { direction, lines });
        }
    }
}

impl Default for RawInputCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn wheel(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn same_direction_ticks_accumulate() {
        let mut coalescer = InputCoalescer::new(Duration::from_millis(10));
        let now = Instant::now();
        assert_eq!(coalescer.push(ScrollDirection::Down, 1, now), None);
        assert_eq!(
            coalescer.push(ScrollDirection::Down, 2, now + Duration::from_millis(5)),
            None
        );

        assert_eq!(
            coalescer.flush_if_stale(now + Duration::from_millis(9)),
            None
        );
        assert_eq!(
            coalescer.flush_if_stale(now + Duration::from_millis(15)),
            Some((ScrollDirection::Down, 3))
        );
        assert!(coalescer.is_empty());
    }

    #[test]
    fn direction_change_flushes_previous() {
        let mut coalescer = InputCoalescer::new(Duration::from_millis(10));
        let now = Instant::now();
        coalescer.push(ScrollDirection::Up, 1, now);
        assert_eq!(
            coalescer.push(ScrollDirection::Down, 1, now),
            Some((ScrollDirection::Up, 1))
        );
        assert_eq!(coalescer.flush(), Some((ScrollDirection::Down, 1)));
    }

    #[test]
    fn resize_flushes_pending_scroll_first() {
        let mut collector = RawInputCollector::new();
        collector.process_event(wheel(MouseEventKind::ScrollDown));
        collector.process_event(Event::Resize(80, 40));

        assert_eq!(
            collector.try_next(),
            Some(RawInputEvent::Scroll {
                direction: ScrollDirection::Down,
                lines: 3
            })
        );
        assert_eq!(
            collector.try_next(),
            Some(RawInputEvent::Resize {
                width: 80,
                height: 40
            })
        );
        assert!(collector.is_idle());
    }

    #[test]
    fn keys_are_queued_in_order() {
        let mut collector = RawInputCollector::new();
        collector.process_event(Event::Key(KeyEvent::new(
            KeyCode::Char('j'),
            KeyModifiers::NONE,
        )));
        match collector.try_next() {
            Some(RawInputEvent::Key(key)) => assert_eq!(key.code, KeyCode::Char('j')),
            other => panic!("expected key event, got {other:?}"),
        }
    }

    #[test]
    fn deltas_are_signed() {
        assert_eq!(ScrollDirection::Up.delta(3), -3);
        assert_eq!(ScrollDirection::Down.delta(2), 2);
    }
}
