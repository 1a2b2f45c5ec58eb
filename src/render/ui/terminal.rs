//! ratatui implementation of [`UIRenderer`].
//!
//! Layout, top to bottom: timeline sparkline with an axis line, the record list, the status line.

use crate::error::Result;
use crate::render::ui::state::{ViewState, STATUS_HEIGHT, TIMELINE_HEIGHT};
use crate::render::ui::{ColorTheme, UIRenderer};
use crate::stream::SessionState;
use crate::timeline::{format_axis_time, Histogram};
use ratatui::crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::Line,
    widgets::{Paragraph, Sparkline},
    Frame, Terminal,
};
use std::io::{self, Stdout};

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

pub struct TerminalUI {
    terminal: Option<CrosstermTerminal>,
    theme: ColorTheme,
}

impl TerminalUI {
    pub fn new() -> Result<Self> {
        Self::with_theme(ColorTheme::default())
    }

    pub fn with_theme(theme: ColorTheme) -> Result<Self> {
        Ok(Self {
            terminal: None,
            theme,
        })
    }

    fn render_timeline(frame: &mut Frame, area: Rect, view_state: &ViewState, theme: &ColorTheme) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        let Some(histogram) = &view_state.timeline else {
            frame.render_widget(Paragraph::new("No data to display"), area);
            return;
        };

        let data = stretch_counts(&histogram.counts(), chunks[0].width as usize);
        let sparkline = Sparkline::default()
            .data(&data)
            .max(histogram.ceiling())
            .style(Style::default().fg(theme.timeline));
        frame.render_widget(sparkline, chunks[0]);

        frame.render_widget(
            Paragraph::new(axis_label(histogram, chunks[1].width as usize)),
            chunks[1],
        );
    }

    fn render_rows(frame: &mut Frame, area: Rect, view_state: &ViewState, theme: &ColorTheme) {
        let lines: Vec<Line> = view_state
            .visible_lines()
            .into_iter()
            .map(|(row, line, text)| {
                let mut style = theme.level_style(row.level.as_deref());
                if row.is_detail(line) {
                    style = style.patch(theme.detail);
                }
                if row.selected {
                    style = style.patch(theme.selection);
                }
                Line::styled(text.to_string(), style)
            })
            .collect();

        if lines.is_empty() {
            let placeholder = if view_state.status.state.is_active() {
                "Waiting for data..."
            } else {
                "No data to display"
            };
            frame.render_widget(Paragraph::new(placeholder), area);
        } else {
            frame.render_widget(Paragraph::new(lines), area);
        }
    }

    fn render_status(frame: &mut Frame, area: Rect, view_state: &ViewState, theme: &ColorTheme) {
        let failed = view_state.status.state == SessionState::Failed;
        let status = Paragraph::new(view_state.status_text()).style(theme.status_style(failed));
        frame.render_widget(status, area);
    }
}

/// Repeat each bucket so the sparkline spans `width` columns.
pub fn stretch_counts(counts: &[u64], width: usize) -> Vec<u64> {
    if counts.is_empty() || width <= counts.len() {
        return counts.to_vec();
    }
    (0..width)
        .map(|column| counts[column * counts.len() / width])
        .collect()
}

/// First and last bucket times at the edges, peak count in the middle.
fn axis_label(histogram: &Histogram, width: usize) -> String {
    let Some(span) = histogram.span() else {
        return String::new();
    };
    let left = format_axis_time(span.min);
    let right = format_axis_time(span.max);
    let middle = format!("max {}", histogram.ceiling());
    let gap = width.saturating_sub(left.len() + right.len() + middle.len());
    let pad_left = gap / 2;
    let pad_right = gap - pad_left;
    format!(
        "{left}{}{middle}{}{right}",
        " ".repeat(pad_left),
        " ".repeat(pad_right)
    )
}

impl UIRenderer for TerminalUI {
    fn render(&mut self, view_state: &ViewState) -> Result<bool> {
        let drew_rows = !view_state.visible_lines().is_empty();
        if let Some(ref mut terminal) = self.terminal {
            let theme = &self.theme;

            terminal.draw(move |frame| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(TIMELINE_HEIGHT),
                        Constraint::Min(0),
                        Constraint::Length(STATUS_HEIGHT),
                    ])
                    .split(frame.size());

                Self::render_timeline(frame, chunks[0], view_state, theme);
                Self::render_rows(frame, chunks[1], view_state, theme);
                Self::render_status(frame, chunks[2], view_state, theme);
            })?;
            return Ok(drew_rows);
        }
        Ok(false)
    }

    fn initialize(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout);
        self.terminal = Some(Terminal::new(backend)?);
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.terminal.is_some() {
            disable_raw_mode()?;
            execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
            self.terminal = None;
        }
        Ok(())
    }

    fn get_terminal_size(&self) -> Result<(u16, u16)> {
        let (cols, rows) = ratatui::crossterm::terminal::size()?;
        Ok((cols, rows))
    }
}

impl Drop for TerminalUI {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;
    use ratatui::style::Color;
    use serde_json::Map;
    use std::sync::Arc;

    #[test]
    fn terminal_ui_starts_detached() {
        let ui = TerminalUI::new().unwrap();
        assert!(ui.terminal.is_none());
        assert_eq!(ui.theme.status_bg, Color::Blue);

        let mono = TerminalUI::with_theme(ColorTheme::monochrome()).unwrap();
        assert_eq!(mono.theme.status_bg, Color::Black);
    }

    #[test]
    fn render_without_terminal_is_a_no_op() {
        let mut ui = TerminalUI::new().unwrap();
        let view = ViewState::new("test", 80, 24);
        assert!(!ui.render(&view).unwrap());
    }

    #[test]
    fn counts_stretch_to_width() {
        assert_eq!(stretch_counts(&[1, 2], 4), vec![1, 1, 2, 2]);
        assert_eq!(stretch_counts(&[1, 2, 3], 2), vec![1, 2, 3]);
        assert!(stretch_counts(&[], 10).is_empty());
    }

    #[test]
    fn axis_label_spans_width() {
        let records: Vec<Arc<LogRecord>> = [0i64, 60_000]
            .iter()
            .map(|&t| Arc::new(LogRecord::new(t, Map::new())))
            .collect();
        let histogram = Histogram::build(&records, 4).unwrap();
        let label = axis_label(&histogram, 40);
        assert_eq!(label.len(), 40);
        assert!(label.starts_with("00:00:00"));
        assert!(label.ends_with("00:01:00"));
        assert!(label.contains("max 1"));
    }
}
