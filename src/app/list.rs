//! Scroll, selection and row layout for the record list.

use crate::config::ViewerConfig;
use crate::record::LogRecord;
use crate::render::ui::RowView;
use crate::search::RecordSet;
use crate::store::LogStore;
use crate::window::{RowLayout, Virtualizer};
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

/// Upper bound on measure-and-relayout passes per frame.
const MAX_LAYOUT_PASSES: usize = 4;

/// What the list is showing.
#[derive(Debug, Clone)]
pub enum DisplaySource {
    /// Every record of the store, growing while the session streams
    Live(LogStore),
    /// A search result set
    Filtered(RecordSet),
}

/// Holding the result set keeps its allocation alive, so pointer equality cannot be fooled by
/// a new set reusing the address.
#[derive(Debug, Clone)]
enum DisplayIdentity {
    Live { generation: u64 },
    Filtered(RecordSet),
}

impl PartialEq for DisplayIdentity {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DisplayIdentity::Live { generation: a }, DisplayIdentity::Live { generation: b }) => {
                a == b
            }
            (DisplayIdentity::Filtered(a), DisplayIdentity::Filtered(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl DisplaySource {
    pub fn len(&self) -> usize {
        match self {
            DisplaySource::Live(store) => store.len(),
            DisplaySource::Filtered(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self, range: Range<usize>) -> Vec<Arc<LogRecord>> {
        match self {
            DisplaySource::Live(store) => store.range(range),
            DisplaySource::Filtered(records) => {
                let end = range.end.min(records.len());
                let start = range.start.min(end);
                records[start..end].to_vec()
            }
        }
    }

    fn identity(&self) -> DisplayIdentity {
        match self {
            DisplaySource::Live(store) => DisplayIdentity::Live {
                generation: store.generation(),
            },
            DisplaySource::Filtered(records) => DisplayIdentity::Filtered(Arc::clone(records)),
        }
    }
}

/// A laid-out frame of the list.
#[derive(Debug, Clone, Default)]
pub struct ListFrame {
    pub rows: Vec<RowView>,
    /// Lines of the first row hidden above the viewport
    pub skip_lines: u64,
}

pub struct ListView {
    virtualizer: Virtualizer,
    identity: Option<DisplayIdentity>,
    selected: Option<usize>,
    expanded: HashSet<usize>,
    following: bool,
    width: u16,
}

impl ListView {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            virtualizer: Virtualizer::new(config.estimated_row_height, config.overscan),
            identity: None,
            selected: None,
            expanded: HashSet::new(),
            following: config.follow,
            width: 0,
        }
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.contains(&index)
    }

    /// Apply the list area size. A width change invalidates every measured height.
    pub fn resize(&mut self, width: u16, height: u16) {
        if width != self.width {
            self.width = width;
            self.virtualizer.clear_measurements();
        }
        self.virtualizer.set_viewport_height(height as u64);
    }

    pub fn scroll_by(&mut self, delta: i64) {
        if delta < 0 {
            self.following = false;
        }
        self.virtualizer.scroll_by(delta);
    }

    /// Scroll by whole viewports and select the new first visible row.
    pub fn page(&mut self, pages: i64) {
        let step = self.virtualizer.viewport_height().max(1) as i64;
        self.scroll_by(step.saturating_mul(pages));
        if self.virtualizer.record_count() > 0 {
            self.selected = Some(self.virtualizer.first_visible_index());
        }
    }

    pub fn go_to_start(&mut self) {
        self.following = false;
        self.virtualizer.scroll_to(0);
        if self.virtualizer.record_count() > 0 {
            self.selected = Some(0);
        }
    }

    /// Pin the view to the newest record.
    pub fn go_to_end(&mut self) {
        self.following = true;
        self.virtualizer.scroll_to_end();
        self.selected = self.virtualizer.record_count().checked_sub(1);
    }

    pub fn move_selection(&mut self, delta: i64) {
        let count = self.virtualizer.record_count();
        if count == 0 {
            return;
        }
        if delta < 0 {
            self.following = false;
        }
        let next = match self.selected {
            Some(current) => (current as i64 + delta).clamp(0, count as i64 - 1) as usize,
            None => self.virtualizer.first_visible_index(),
        };
        self.selected = Some(next);
        self.reveal(next);
    }

    pub fn toggle_expanded(&mut self) {
        if let Some(index) = self.selected {
            if !self.expanded.remove(&index) {
                self.expanded.insert(index);
            }
        }
    }

    /// Lay out the current window of `source`, feeding measured heights back into the
    /// virtualizer until the window is stable.
    pub fn layout(&mut self, source: &DisplaySource) -> ListFrame {
        let identity = source.identity();
        if self.identity.as_ref() != Some(&identity) {
            self.identity = Some(identity);
            self.virtualizer.reset();
            self.expanded.clear();
            self.selected = None;
        }

        self.virtualizer.set_record_count(source.len());
        if self.following {
            self.virtualizer.scroll_to_end();
        }

        let mut rows = Vec::new();
        for _ in 0..MAX_LAYOUT_PASSES {
            rows = self.layout_window(source);
            let mut changed = false;
            for row in &rows {
                changed |= self.virtualizer.report_measured_height(row.index, row.height());
            }
            if self.following {
                self.virtualizer.scroll_to_end();
            }
            if !changed {
                break;
            }
        }

        let skip_lines = rows.first().map_or(0, |row| {
            let top = self.virtualizer.heights().offset_of(row.index);
            self.virtualizer.scroll_offset().saturating_sub(top)
        });
        ListFrame { rows, skip_lines }
    }

    fn layout_window(&self, source: &DisplaySource) -> Vec<RowView> {
        let window = self.virtualizer.window();
        source
            .range(window.start_index..window.end_index)
            .iter()
            .enumerate()
            .map(|(offset, record)| {
                let index = window.start_index + offset;
                let mut row = RowView::layout(index, record, self.width, self.is_expanded(index));
                row.selected = self.selected == Some(index);
                row
            })
            .collect()
    }

    fn reveal(&mut self, index: usize) {
        let heights = self.virtualizer.heights();
        let top = heights.offset_of(index);
        let bottom = heights.offset_of(index + 1);
        let scroll = self.virtualizer.scroll_offset();
        let viewport = self.virtualizer.viewport_height();

        if top < scroll {
            self.virtualizer.scroll_to(top);
        } else if bottom > scroll + viewport {
            self.virtualizer.scroll_to(bottom.saturating_sub(viewport));
        }
    }
}
