//! Error types for the delivery engine.

use thiserror::Error;

/// Core engine error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported range: {0}")]
    UnsupportedRange(String),

    #[error("range start {start} exceeds document length {length}")]
    RangeNotSatisfiable { start: u64, length: u64 },

    #[error("unsupported archive format: {0}")]
    UnsupportedArchiveFormat(String),

    #[error("corrupt archive {name}: {reason}")]
    CorruptArchive { name: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
