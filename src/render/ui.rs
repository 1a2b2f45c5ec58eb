//! Terminal rendering components: the renderer trait, per-frame view state, the ratatui
//! implementation and its color theme.

pub mod renderer;
pub mod state;
pub mod terminal;
pub mod theme;

pub use renderer::UIRenderer;
pub use state::{format_bytes, wrap_text, RowView, StatusLine, ViewState};
pub use terminal::TerminalUI;
pub use theme::ColorTheme;

#[cfg(test)]
pub use renderer::tests::MockUIRenderer;
