//! # ndjview - Streaming NDJSON Log Viewer
//!
//! A terminal viewer for newline-delimited JSON logs that starts showing records while the
//! response is still arriving, renders only the rows on screen, and filters in a background
//! task without stalling the display.
//!
//! ## Features
//!
//! - **Incremental Parsing**: Byte chunks are split on newlines with partial lines carried
//!   across chunk boundaries; malformed lines are skipped
//! - **Abortable Sessions**: Every load can be cancelled or retried, with time-to-first-byte
//!   and time-to-first-render marks
//! - **Windowed Rendering**: Only the visible rows plus overscan are laid out, over a
//!   measured-height index
//! - **Background Search**: A worker task owns its own index and answers tagged requests;
//!   stale replies are discarded
//!
//! ## Architecture
//!
//! - [`stream`] - Chunk parser, byte sources and the session controller
//! - [`store`] - Append-only record sequence
//! - [`window`] - Height index and the virtualization engine
//! - [`search`] - Search worker protocol, coordinator and query debouncing
//! - [`timeline`] - Time histogram over the loaded records
//! - [`render::ui`](crate::render::ui) - Terminal user interface components
//! - [`app`] - Application core and component coordination

// Core modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod record;
pub mod store;

// Ingestion, layout and search
pub mod search;
pub mod stream;
pub mod timeline;
pub mod window;

// Terminal front end
pub mod app;
pub mod input;
pub mod render;

// Re-export commonly used types for convenience
pub use error::{NdjviewError, Result};

// Public API surface for external usage
pub use app::Application;
pub use config::ViewerConfig;
pub use record::LogRecord;
pub use search::SearchCoordinator;
pub use store::LogStore;
pub use stream::StreamController;
pub use window::{compute_window, Virtualizer, Window};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
