//! Error types and handling infrastructure for ndjview.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types and `anyhow` for application-level error handling with context.
//!
//! ## Error classes
//!
//! - **Transport failures**: non-2xx status or an unreadable source
//! - **Network/IO failures**: the underlying read rejects mid-stream
//! - **Local failures**: search, UI, and configuration problems
//!
//! Cancellation and malformed records have no variant: an aborted session
//! is a state, not an error, and a bad NDJSON line is dropped where it is parsed.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ndjview operations.
#[derive(Error, Debug)]
pub enum NdjviewError {
    /// The ingestion endpoint answered with a non-success status
    #[error("HTTP error! status: {status}")]
    HttpStatus { status: u16 },

    /// Connection or mid-stream read failure from the HTTP transport
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    /// File system related errors (permission denied, read failure, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Local source path does not exist
    #[error("Source not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Search worker or coordinator errors
    #[error("Search operation failed: {message}")]
    SearchError { message: String },

    /// UI and terminal related errors
    #[error("UI operation failed: {message}")]
    UIError { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid command line arguments
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for ndjview operations.
pub type Result<T> = std::result::Result<T, NdjviewError>;

impl NdjviewError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a Network error from a reqwest error with additional context
    pub fn network(message: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            message: message.into(),
            source,
        }
    }

    /// Create a SearchError with a descriptive message
    pub fn search(message: impl Into<String>) -> Self {
        Self::SearchError {
            message: message.into(),
        }
    }

    /// Create a UIError with a descriptive message
    pub fn ui(message: impl Into<String>) -> Self {
        Self::UIError {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// True for failures the user can sensibly retry (transport and IO problems).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { .. }
                | Self::Network { .. }
                | Self::FileError { .. }
                | Self::SourceNotFound { .. }
        )
    }
}

// Automatic conversion from io::Error to NdjviewError
impl From<std::io::Error> for NdjviewError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            std::io::ErrorKind::UnexpectedEof => Self::FileError {
                message: "Unexpected end of stream".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

impl From<reqwest::Error> for NdjviewError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::HttpStatus {
                status: status.as_u16(),
            };
        }
        let message = if err.is_connect() {
            "Connection failed"
        } else if err.is_timeout() {
            "Request timed out"
        } else if err.is_body() || err.is_decode() {
            "Failed to read response body"
        } else {
            "Request failed"
        };
        Self::network(message, err)
    }
}
