//! Virtualized list layout: which rows to render for a scroll position.

pub mod heights;
pub mod virtualizer;

pub use heights::{HeightIndex, RowLayout};
pub use virtualizer::{compute_window, window_over, Virtualizer, Window};
