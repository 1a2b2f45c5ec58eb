//! Frame data handed to the renderer.
//!
//! [`ViewState`] is rebuilt by the application from the store, the virtualizer's window and the
//! session status. It contains only what is on screen, already wrapped to the terminal width, so
//! the renderer does no layout of its own.

use crate::metrics::format_millis;
use crate::record::LogRecord;
use crate::stream::{SessionState, StreamStatus};
use crate::timeline::Histogram;
use std::time::Duration;
use unicode_width::UnicodeWidthChar;

/// Rows taken by the timeline (sparkline plus the axis label line).
pub const TIMELINE_HEIGHT: u16 = 5;
/// Rows taken by the status line.
pub const STATUS_HEIGHT: u16 = 1;

/// Width of the timestamp column plus separator.
const TIME_COLUMN: usize = 25;

/// Split `text` into lines of at most `width` terminal cells. Always returns at least one line.
///
/// A character wider than `width` gets a line of its own.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 || text.is_empty() {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let cells = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cells > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(ch);
        used += cells;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Human-readable byte count (`"512 B"`, `"1.5 KB"`, `"3.2 MB"`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// One record laid out for the current width.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    /// Position in the displayed list
    pub index: usize,
    pub lines: Vec<String>,
    /// Lines belonging to the single-line summary; the rest are expanded detail
    pub header_len: usize,
    pub level: Option<String>,
    pub expanded: bool,
    pub selected: bool,
}

impl RowView {
    /// Timestamp and single-line JSON, wrapped; expanded rows add the pretty-printed record.
    pub fn layout(index: usize, record: &LogRecord, width: u16, expanded: bool) -> Self {
        let width = width as usize;
        let header = format!(
            "{:<pad$}{}",
            record.formatted_time(),
            record.summary(),
            pad = TIME_COLUMN
        );
        let mut lines = wrap_text(&header, width);
        let header_len = lines.len();

        if expanded {
            let detail = serde_json::to_string_pretty(record).unwrap_or_default();
            for line in detail.lines() {
                lines.extend(wrap_text(&format!("    {line}"), width));
            }
        }

        Self {
            index,
            lines,
            header_len,
            level: record.str_field("level").map(str::to_ascii_lowercase),
            expanded,
            selected: false,
        }
    }

    /// Wrapped line count; the height reported to the virtualizer.
    pub fn height(&self) -> u32 {
        self.lines.len() as u32
    }

    pub fn is_detail(&self, line: usize) -> bool {
        line >= self.header_len
    }
}

/// Everything shown in the status line.
#[derive(Debug, Clone)]
pub struct StatusLine {
    pub source: String,
    pub state: SessionState,
    pub record_count: usize,
    /// Number of rows shown when a filter is active
    pub filtered_count: Option<usize>,
    pub bytes_loaded: u64,
    pub total_bytes: Option<u64>,
    pub error: Option<String>,
    pub ttfb: Option<Duration>,
    pub ttfr: Option<Duration>,
    pub indexing: bool,
    pub following: bool,
    pub message: Option<String>,
}

impl StatusLine {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            state: SessionState::Idle,
            record_count: 0,
            filtered_count: None,
            bytes_loaded: 0,
            total_bytes: None,
            error: None,
            ttfb: None,
            ttfr: None,
            indexing: false,
            following: false,
            message: None,
        }
    }

    /// Copy the session fields from a controller snapshot.
    pub fn apply_stream_status(&mut self, status: &StreamStatus) {
        self.state = status.state;
        self.record_count = status.record_count;
        self.bytes_loaded = status.bytes_loaded;
        self.total_bytes = status.total_bytes;
        self.error = status.error.as_ref().map(|e| e.to_string());
        self.ttfb = status.ttfb;
        self.ttfr = status.ttfr;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    pub fn format(&self) -> String {
        let mut parts = vec![self.source.clone(), self.state.label().to_string()];

        parts.push(match self.filtered_count {
            Some(shown) => format!("{shown}/{} logs", self.record_count),
            None => format!("{} logs", self.record_count),
        });

        parts.push(match self.total_bytes {
            Some(total) => format!(
                "{} / {}",
                format_bytes(self.bytes_loaded),
                format_bytes(total)
            ),
            None => format_bytes(self.bytes_loaded),
        });

        if let Some(ttfb) = self.ttfb {
            parts.push(format!("TTFB {}", format_millis(ttfb)));
        }
        if let Some(ttfr) = self.ttfr {
            parts.push(format!("TTFR {}", format_millis(ttfr)));
        }
        if self.indexing {
            parts.push("indexing".to_string());
        }
        if self.following {
            parts.push("FOLLOW".to_string());
        }
        if let Some(error) = &self.error {
            parts.push(format!("{error} (r to retry)"));
        }
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        parts.join(" | ")
    }
}

/// One frame of the viewer.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub width: u16,
    pub height: u16,
    /// Rows of the current window, overscan included
    pub rows: Vec<RowView>,
    /// Lines of `rows` that lie above the viewport
    pub skip_lines: u64,
    pub timeline: Option<Histogram>,
    pub status: StatusLine,
    /// Filter text being edited, if the prompt is open
    pub filter_prompt: Option<String>,
    /// Filter currently applied to the list
    pub filter: String,
}

impl ViewState {
    pub fn new(source: impl Into<String>, width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            rows: Vec::new(),
            skip_lines: 0,
            timeline: None,
            status: StatusLine::new(source),
            filter_prompt: None,
            filter: String::new(),
        }
    }

    /// Terminal lines available to the record list.
    pub fn list_height(&self) -> u16 {
        self.height
            .saturating_sub(TIMELINE_HEIGHT)
            .saturating_sub(STATUS_HEIGHT)
    }

    /// Returns true if the size actually changed.
    pub fn update_terminal_size(&mut self, width: u16, height: u16) -> bool {
        let changed = self.width != width || self.height != height;
        self.width = width;
        self.height = height;
        changed
    }

    /// Lines to draw in the list area, each with its row and line number within the row.
    pub fn visible_lines(&self) -> Vec<(&RowView, usize, &str)> {
        self.rows
            .iter()
            .flat_map(|row| {
                row.lines
                    .iter()
                    .enumerate()
                    .map(move |(line, text)| (row, line, text.as_str()))
            })
            .skip(self.skip_lines as usize)
            .take(self.list_height() as usize)
            .collect()
    }

    pub fn status_text(&self) -> String {
        match &self.filter_prompt {
            Some(buffer) => format!("/{buffer}"),
            None => self.status.format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use unicode_width::UnicodeWidthStr;

    fn record(fields: Value) -> LogRecord {
        let fields: Map<String, Value> = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        LogRecord::new(1_724_323_612_592, fields)
    }

    #[test]
    fn wraps_on_character_boundaries() {
        assert_eq!(wrap_text("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_text("", 4), vec![""]);
        assert_eq!(wrap_text("äöüß", 2), vec!["äö", "üß"]);
        assert_eq!(wrap_text("abc", 0), vec!["abc"]);
    }

    #[test]
    fn wraps_wide_characters_by_cell_width() {
        let lines = wrap_text("日本語のログ出力です", 4);
        assert_eq!(lines, vec!["日本", "語の", "ログ", "出力", "です"]);
        for width in [3, 5, 7, 40] {
            for line in wrap_text("mixed 日本語 text 🚀 with émoji ログ", width) {
                assert!(line.width() <= width, "{line:?} wider than {width}");
            }
        }
        // A double-width character cannot be split below its own width.
        assert_eq!(wrap_text("日本", 1), vec!["日", "本"]);
    }

    #[test]
    fn cjk_row_height_counts_terminal_cells() {
        let msg = "日本語のログ出力です日本語のログ出力です";
        let record = record(json!({ "msg": msg }));
        let row = RowView::layout(0, &record, 40, false);

        // 25 time cells + 72 cells of JSON, 40 of them from the message.
        assert!(row.lines.iter().all(|line| line.width() <= 40));
        assert_eq!(row.lines.concat().width(), 97);
        assert_eq!(row.height(), 3);
    }

    #[test]
    fn formats_byte_counts() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn row_height_follows_width() {
        let record = record(json!({"level": "INFO", "msg": "hello"}));
        let wide = RowView::layout(0, &record, 200, false);
        assert_eq!(wide.height(), 1);
        assert!(wide.lines[0].starts_with("2024-08-22 10:46:52.592"));
        assert_eq!(wide.level.as_deref(), Some("info"));

        let narrow = RowView::layout(0, &record, 20, false);
        assert!(narrow.height() > 1);
        assert!(narrow.lines.iter().all(|line| line.chars().count() <= 20));
    }

    #[test]
    fn expanded_rows_include_pretty_json() {
        let record = record(json!({"msg": "hello"}));
        let row = RowView::layout(3, &record, 200, true);
        assert!(row.expanded);
        assert_eq!(row.header_len, 1);
        assert!(row.is_detail(1));
        assert!(row.height() >= 4);
        assert!(row.lines.iter().any(|line| line.contains("\"msg\": \"hello\"")));
    }

    #[test]
    fn visible_lines_skip_and_clip() {
        let mut view = ViewState::new("test", 80, TIMELINE_HEIGHT + STATUS_HEIGHT + 3);
        view.rows = (0..3)
            .map(|index| RowView {
                index,
                lines: vec![format!("{index}a"), format!("{index}b")],
                header_len: 2,
                level: None,
                expanded: false,
                selected: false,
            })
            .collect();
        view.skip_lines = 1;

        let lines: Vec<&str> = view.visible_lines().iter().map(|(_, _, l)| *l).collect();
        assert_eq!(lines, vec!["0b", "1a", "1b"]);
    }

    #[test]
    fn status_line_lists_progress() {
        let mut status = StatusLine::new("logs.ndjson");
        status.state = SessionState::Streaming;
        status.record_count = 42;
        status.bytes_loaded = 2048;
        status.total_bytes = Some(4096);
        status.ttfb = Some(Duration::from_millis(12));
        status.following = true;

        assert_eq!(
            status.format(),
            "logs.ndjson | Streaming | 42 logs | 2.0 KB / 4.0 KB | TTFB 12ms | FOLLOW"
        );

        status.filtered_count = Some(3);
        status.error = Some("HTTP error! status: 500".to_string());
        let text = status.format();
        assert!(text.contains("3/42 logs"));
        assert!(text.ends_with("HTTP error! status: 500 (r to retry)"));
    }

    #[test]
    fn prompt_replaces_status() {
        let mut view = ViewState::new("src", 80, 24);
        view.filter_prompt = Some("err".to_string());
        assert_eq!(view.status_text(), "/err");
        assert_eq!(view.list_height(), 24 - TIMELINE_HEIGHT - STATUS_HEIGHT);
    }
}
