//! Visible-window computation over variable-height rows.
//!
//! [`compute_window`] is the pure form: everything it needs is passed in, and it walks only the
//! measured entries of the height map, so cost does not depend on the record count.
//! [`Virtualizer`] is the stateful form used by the viewer: it keeps a [`HeightIndex`] up to date
//! as records arrive and rows are measured, and holds the scroll position steady when rows
//! above the viewport change height.

use crate::window::heights::{HeightIndex, RowLayout};
use std::collections::BTreeMap;

/// The renderable slice of the record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    /// First row to render (inclusive)
    pub start_index: usize,
    /// One past the last row to render
    pub end_index: usize,
    /// Height of every row, measured or estimated
    pub total_height: u64,
    /// Height of all rows before `start_index`
    pub top_offset: u64,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..self.end_index).contains(&index)
    }
}

/// Compute the window covering `[scroll_offset, scroll_offset + viewport_height)`,
/// widened by `overscan` rows on each side.
///
/// Rows missing from `height_map` use `estimated_height` (clamped to at least 1).
/// Entries at or beyond `record_count` are ignored.
pub fn compute_window(
    scroll_offset: u64,
    viewport_height: u64,
    record_count: usize,
    height_map: &BTreeMap<usize, u32>,
    estimated_height: u32,
    overscan: usize,
) -> Window {
    let layout = SparseLayout {
        len: record_count,
        estimated: estimated_height.max(1) as u64,
        measured: height_map,
    };
    window_over(&layout, scroll_offset, viewport_height, overscan)
}

/// Window computation shared by the pure and incremental layouts.
pub fn window_over<L: RowLayout>(
    layout: &L,
    scroll_offset: u64,
    viewport_height: u64,
    overscan: usize,
) -> Window {
    let count = layout.row_count();
    if count == 0 {
        return Window::default();
    }

    let first_visible = layout.row_at(scroll_offset);
    let last_offset = scroll_offset.saturating_add(viewport_height.saturating_sub(1));
    let last_visible = layout.row_at(last_offset).max(first_visible);

    let start_index = first_visible.saturating_sub(overscan);
    let end_index = last_visible
        .saturating_add(1)
        .saturating_add(overscan)
        .min(count);

    Window {
        start_index,
        end_index,
        total_height: layout.total_height(),
        top_offset: layout.offset_of(start_index),
    }
}

struct SparseLayout<'a> {
    len: usize,
    estimated: u64,
    measured: &'a BTreeMap<usize, u32>,
}

impl RowLayout for SparseLayout<'_> {
    fn row_count(&self) -> usize {
        self.len
    }

    fn offset_of(&self, index: usize) -> u64 {
        let count = index.min(self.len);
        let mut offset = count as u64 * self.estimated;
        for &height in self.measured.range(..count).map(|(_, h)| h) {
            offset = offset + height as u64 - self.estimated;
        }
        offset
    }

    fn row_at(&self, offset: u64) -> usize {
        if self.len == 0 {
            return 0;
        }

        let mut row = 0usize;
        let mut acc = 0u64;
        for (&index, &height) in self.measured.range(..self.len) {
            let span = (index - row) as u64 * self.estimated;
            if acc + span > offset {
                return row + ((offset - acc) / self.estimated) as usize;
            }
            acc += span;
            if acc + height as u64 > offset {
                return index;
            }
            acc += height as u64;
            row = index + 1;
        }

        let tail = (offset.saturating_sub(acc) / self.estimated) as usize;
        row.saturating_add(tail).min(self.len - 1)
    }
}

/// Scroll state plus incrementally maintained row heights.
#[derive(Debug, Clone)]
pub struct Virtualizer {
    heights: HeightIndex,
    scroll_offset: u64,
    viewport_height: u64,
    overscan: usize,
}

impl Virtualizer {
    pub fn new(estimated_height: u32, overscan: usize) -> Self {
        Self {
            heights: HeightIndex::new(estimated_height),
            scroll_offset: 0,
            viewport_height: 0,
            overscan,
        }
    }

    pub fn heights(&self) -> &HeightIndex {
        &self.heights
    }

    pub fn record_count(&self) -> usize {
        self.heights.len()
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> u64 {
        self.viewport_height
    }

    pub fn total_height(&self) -> u64 {
        self.heights.total_height()
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Largest scroll offset that still fills the viewport.
    pub fn max_scroll(&self) -> u64 {
        self.total_height().saturating_sub(self.viewport_height)
    }

    pub fn is_at_end(&self) -> bool {
        self.scroll_offset >= self.max_scroll()
    }

    /// Track growth of the record list. Shrinking only happens on a reset.
    pub fn set_record_count(&mut self, count: usize) {
        if count != self.heights.len() {
            self.heights.set_len(count);
            self.clamp_scroll();
        }
    }

    pub fn set_viewport_height(&mut self, height: u64) {
        self.viewport_height = height;
        self.clamp_scroll();
    }

    pub fn scroll_to(&mut self, offset: u64) {
        self.scroll_offset = offset;
        self.clamp_scroll();
    }

    pub fn scroll_by(&mut self, delta: i64) {
        let target = if delta < 0 {
            self.scroll_offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.scroll_offset.saturating_add(delta as u64)
        };
        self.scroll_to(target);
    }

    /// Put the top of row `index` at the top of the viewport (as far as scrolling allows).
    pub fn scroll_to_index(&mut self, index: usize) {
        self.scroll_to(self.heights.offset_of(index));
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    /// First row intersecting the viewport, ignoring overscan.
    pub fn first_visible_index(&self) -> usize {
        self.heights.row_at(self.scroll_offset)
    }

    /// Accept a row's real height.
    ///
    /// When the row lies entirely above the viewport the scroll offset moves by the same
    /// amount, so the rows currently on screen stay where they are. Returns whether the
    /// layout changed.
    pub fn report_measured_height(&mut self, index: usize, height: u32) -> bool {
        if index >= self.heights.len() {
            return false;
        }
        let row_bottom = self.heights.offset_of(index + 1);
        let above_viewport = row_bottom <= self.scroll_offset;

        let delta = self.heights.set_measured(index, height);
        if delta == 0 {
            return false;
        }
        if above_viewport {
            self.scroll_offset = if delta < 0 {
                self.scroll_offset.saturating_sub(delta.unsigned_abs())
            } else {
                self.scroll_offset.saturating_add(delta as u64)
            };
        }
        self.clamp_scroll();
        true
    }

    /// Drop all measurements, keeping the first visible row at the top.
    pub fn clear_measurements(&mut self) {
        let anchor = self.first_visible_index();
        self.heights.clear_measurements();
        self.scroll_to_index(anchor);
    }

    /// Back to an empty list at the top.
    pub fn reset(&mut self) {
        self.heights.set_len(0);
        self.heights.clear_measurements();
        self.scroll_offset = 0;
    }

    pub fn window(&self) -> Window {
        window_over(
            &self.heights,
            self.scroll_offset,
            self.viewport_height,
            self.overscan,
        )
    }

    fn clamp_scroll(&mut self) {
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }
}
