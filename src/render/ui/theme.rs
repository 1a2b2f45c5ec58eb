//! Color theme using ratatui colors directly.

use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct ColorTheme {
    /// Normal text color (None uses terminal default)
    pub normal_text: Option<Color>,

    pub error_level: Color,
    pub warn_level: Color,
    pub info_level: Color,
    pub debug_level: Color,

    /// Row under the cursor
    pub selection: Style,

    /// Continuation lines of an expanded row
    pub detail: Style,

    pub status_bg: Color,
    pub status_fg: Color,

    /// Status line when the session failed
    pub error_text: Color,

    pub timeline: Color,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            normal_text: None,
            error_level: Color::Red,
            warn_level: Color::Yellow,
            info_level: Color::Green,
            debug_level: Color::DarkGray,
            selection: Style::default().add_modifier(Modifier::REVERSED),
            detail: Style::default().fg(Color::Gray),
            status_bg: Color::Blue,
            status_fg: Color::White,
            error_text: Color::Red,
            timeline: Color::Cyan,
        }
    }
}

impl ColorTheme {
    /// Theme for terminals without color support.
    pub fn monochrome() -> Self {
        Self {
            normal_text: None,
            error_level: Color::Reset,
            warn_level: Color::Reset,
            info_level: Color::Reset,
            debug_level: Color::Reset,
            selection: Style::default().add_modifier(Modifier::REVERSED),
            detail: Style::default(),
            status_bg: Color::Black,
            status_fg: Color::White,
            error_text: Color::White,
            timeline: Color::Reset,
        }
    }

    /// Style for a row given its lowercase `level` field.
    pub fn level_style(&self, level: Option<&str>) -> Style {
        let base = match self.normal_text {
            Some(color) => Style::default().fg(color),
            None => Style::default(),
        };
        match level {
            Some("error" | "fatal" | "critical") => base.fg(self.error_level),
            Some("warn" | "warning") => base.fg(self.warn_level),
            Some("info") => base.fg(self.info_level),
            Some("debug" | "trace") => base.fg(self.debug_level),
            _ => base,
        }
    }

    pub fn status_style(&self, failed: bool) -> Style {
        let fg = if failed {
            self.error_text
        } else {
            self.status_fg
        };
        Style::default().bg(self.status_bg).fg(fg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_colors() {
        let theme = ColorTheme::default();
        assert_eq!(theme.level_style(Some("error")).fg, Some(Color::Red));
        assert_eq!(theme.level_style(Some("warning")).fg, Some(Color::Yellow));
        assert_eq!(theme.level_style(Some("info")).fg, Some(Color::Green));
        assert_eq!(theme.level_style(Some("custom")).fg, None);
        assert_eq!(theme.level_style(None).fg, None);
    }

    #[test]
    fn status_turns_red_on_failure() {
        let theme = ColorTheme::default();
        assert_eq!(theme.status_style(false).fg, Some(Color::White));
        assert_eq!(theme.status_style(true).fg, Some(Color::Red));
        assert_eq!(theme.status_style(true).bg, Some(Color::Blue));
    }

    #[test]
    fn monochrome_has_no_level_colors() {
        let theme = ColorTheme::monochrome();
        assert_eq!(theme.level_style(Some("error")).fg, Some(Color::Reset));
        assert_eq!(theme.status_bg, Color::Black);
    }
}
