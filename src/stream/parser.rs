//! Incremental NDJSON chunk parser.
//!
//! Network reads arrive in arbitrary byte slices that rarely line up with record boundaries.
//! [`parse_chunk`] joins the previous unterminated tail with the next chunk, parses every
//! complete line, and hands back the new tail. Working on bytes rather than text means a
//! multi-byte UTF-8 sequence split across two reads is carried intact.

use bstr::ByteSlice;
use memchr::memchr_iter;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Output of one [`parse_chunk`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedChunk<T> {
    /// Records parsed from complete lines, in input order
    pub records: Vec<T>,
    /// Bytes after the last line feed; may be empty
    pub carry: Vec<u8>,
}

/// Parse every complete line of `carry + chunk`.
///
/// The segment after the final `\n` is never parsed; it becomes the returned carry.
/// Blank lines are skipped and lines that fail to deserialize are dropped.
pub fn parse_chunk<T: DeserializeOwned>(chunk: &[u8], carry: &[u8]) -> ParsedChunk<T> {
    let mut combined = Vec::with_capacity(carry.len() + chunk.len());
    combined.extend_from_slice(carry);
    combined.extend_from_slice(chunk);

    let mut records = Vec::new();
    let mut line_start = 0;
    for newline in memchr_iter(b'\n', &combined) {
        if let Some(record) = parse_line(&combined[line_start..newline]) {
            records.push(record);
        }
        line_start = newline + 1;
    }

    combined.drain(..line_start);
    ParsedChunk {
        records,
        carry: combined,
    }
}

/// Parse the final carry at end of stream as if a trailing newline were present.
pub fn flush_carry<T: DeserializeOwned>(carry: &[u8]) -> Vec<T> {
    parse_line(carry).into_iter().collect()
}

/// Parse one line. `None` for blank or malformed input.
pub fn parse_line<T: DeserializeOwned>(line: &[u8]) -> Option<T> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_slice(trimmed) {
        Ok(value) => Some(value),
        Err(err) => {
            log::debug!(
                "Failed to parse NDJSON line ({}): {}",
                err,
                trimmed.to_str_lossy()
            );
            None
        }
    }
}

/// Stateful wrapper that owns the carry buffer between reads.
#[derive(Debug)]
pub struct NdjsonDecoder<T> {
    carry: Vec<u8>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> NdjsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            carry: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Feed one chunk, returning the records it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<T> {
        let parsed = parse_chunk(chunk, &self.carry);
        self.carry = parsed.carry;
        parsed.records
    }

    /// Flush the unterminated tail at end of stream.
    pub fn finish(&mut self) -> Vec<T> {
        let carry = std::mem::take(&mut self.carry);
        flush_carry(&carry)
    }

    /// Bytes currently held back waiting for a line feed.
    pub fn carry(&self) -> &[u8] {
        &self.carry
    }

    /// Discard any buffered tail.
    pub fn reset(&mut self) {
        self.carry.clear();
    }
}

impl<T: DeserializeOwned> Default for NdjsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}
