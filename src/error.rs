//! Error types for tree-uploader
//!
//! This module defines the error hierarchy for the upload path:
//! - Record source errors (unreadable or truncated input files)
//! - Row encoding errors (failure to write into the upload pipe)
//! - Store errors (reported by the store client)
//! - Cancellation (distinct from data errors so callers can tell an
//!   operator-initiated abort apart from a failed batch)
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include context about what failed
//! - Nothing here is fatal to the process; a failed batch leaves the
//!   existence cache untouched so a retry is always safe

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for a single upload attempt
#[derive(Error, Debug)]
pub enum UploadError {
    /// Record source errors (malformed or unreadable input)
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// Failure to encode a row into the upload pipe
    #[error("Row encoding error: {0}")]
    Encode(#[source] std::io::Error),

    /// Errors reported by the store client
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to spawn the store writer thread
    #[error("Failed to spawn store writer thread: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// Store writer thread panicked before reporting a result
    #[error("Store writer thread panicked")]
    WriterPanicked,

    /// Upload was canceled before the store writer reported a result
    #[error("Upload aborted")]
    Aborted,
}

impl UploadError {
    /// True if this upload failed because it was canceled, not
    /// because of bad data or a store failure.
    pub fn is_aborted(&self) -> bool {
        matches!(self, UploadError::Aborted)
    }
}

/// Errors from the record source (row file reader)
#[derive(Error, Debug)]
pub enum ReadError {
    /// Failed to open the input file
    #[error("Failed to open row file '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error while reading records
    #[error("I/O error reading records: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended in the middle of a record
    #[error("Truncated record: expected {expected} more bytes")]
    Truncated { expected: usize },

    /// Record length prefix is implausibly large (corrupt file)
    #[error("Record length {len} exceeds maximum {max}")]
    Oversized { len: u64, max: u64 },
}

/// Errors reported by the store client
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store rejected the insert
    #[error("Store rejected insert into '{target}': {reason}")]
    Rejected { target: String, reason: String },

    /// I/O error while streaming the insert body
    #[error("I/O error during store write: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and construction errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Table name must be non-empty
    #[error("Table name cannot be empty")]
    EmptyTableName,

    /// All table-id flag bits are in use
    #[error("Table id space exhausted: at most {max} table writers per process")]
    TableIdsExhausted { max: usize },

    /// Cache TTL out of range
    #[error("Cache TTL must be at least {min_secs}s (got {got_secs}s)")]
    TtlTooSmall { min_secs: u64, got_secs: u64 },

    /// Eviction interval out of range
    #[error("Eviction interval must be at least {min_secs}s (got {got_secs}s)")]
    IntervalTooSmall { min_secs: u64, got_secs: u64 },

    /// Pipe buffer size out of range
    #[error("Pipe buffer must be between {min} and {max} bytes (got {got})")]
    PipeBufferOutOfRange { min: usize, max: usize, got: usize },

    /// No input files given
    #[error("No input row files specified")]
    NoInputs,
}

/// Result alias for upload operations
pub type Result<T> = std::result::Result<T, UploadError>;

/// Result alias for record source operations
pub type ReadResult<T> = std::result::Result<T, ReadError>;

/// Result alias for store client operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = UploadError::from(ReadError::Truncated { expected: 12 });
        assert!(err.to_string().contains("12 more bytes"));

        let err = UploadError::from(StoreError::Rejected {
            target: "graphite_tree (Level, Path, Version)".into(),
            reason: "connection refused".into(),
        });
        assert!(err.to_string().contains("graphite_tree"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_is_aborted() {
        assert!(UploadError::Aborted.is_aborted());
        assert!(!UploadError::WriterPanicked.is_aborted());
        assert!(!UploadError::from(ReadError::Truncated { expected: 1 }).is_aborted());
    }
}
