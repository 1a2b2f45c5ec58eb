//! Renderer seam between the application loop and the terminal.

use crate::error::Result;
use crate::render::ui::state::ViewState;

/// Draws frames and owns the terminal lifecycle.
pub trait UIRenderer {
    /// Draw one frame. Returns whether any record row was drawn.
    fn render(&mut self, view_state: &ViewState) -> Result<bool>;

    /// Enter raw mode and the alternate screen
    fn initialize(&mut self) -> Result<()>;

    /// Restore the terminal
    fn cleanup(&mut self) -> Result<()>;

    /// (width, height)
    fn get_terminal_size(&self) -> Result<(u16, u16)>;
}
