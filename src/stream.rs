//! Ingestion pipeline: byte sources, the NDJSON chunk parser, and the session controller
//! that drives one into the other and appends to the [`LogStore`](crate::store::LogStore).

pub mod parser;
pub mod session;
pub mod source;

pub use parser::{flush_carry, parse_chunk, parse_line, NdjsonDecoder, ParsedChunk};
pub use session::{SessionState, StreamController, StreamStatus};
pub use source::{open_source, ChunkSource, FileSource, HttpSource, MemorySource, SourceResponse};
