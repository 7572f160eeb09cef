//! Error types for the Doru library.
//!
//! All errors are represented by the [`DoruError`] enum. Migration failure
//! kinds (unsupported format, corrupt commit, missing compatibility codec,
//! publish failure, compliance denial) are distinct variants so callers can
//! match on them for user messaging.

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Doru operations.
///
/// Uses the `thiserror` crate for automatic `Error` trait implementation and
/// provides convenient constructor methods for creating specific error types.
#[derive(Error, Debug)]
pub enum DoruError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Index-related errors
    #[error("Index error: {0}")]
    Index(String),

    /// Legacy commit major format exceeds the supported ceiling
    #[error("Unsupported legacy format: major {major} exceeds supported ceiling {ceiling}")]
    UnsupportedFormat { major: u32, ceiling: u32 },

    /// Legacy commit failed structural or checksum validation
    #[error("Corrupt commit: {0}")]
    CorruptCommit(String),

    /// No compatibility codec registered for a legacy segment format
    #[error("No compatibility codec registered for legacy segment format {format_major}")]
    UnknownSegmentCodec { format_major: u32 },

    /// Storage hold could not be acquired
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Writing the new commit file failed before it became discoverable
    #[error("Publish failure: {0}")]
    PublishFailure(String),

    /// The compliance gate refused the operation
    #[error("Operation not permitted by current license: {0}")]
    ComplianceDenied(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with DoruError.
pub type Result<T> = std::result::Result<T, DoruError>;

impl DoruError {
    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        DoruError::Storage(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        DoruError::Index(msg.into())
    }

    /// Create a new corrupt-commit error.
    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        DoruError::CorruptCommit(msg.into())
    }

    /// Create a new publish-failure error.
    pub fn publish<S: Into<String>>(msg: S) -> Self {
        DoruError::PublishFailure(msg.into())
    }

    /// Create a new storage-unavailable error.
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        DoruError::StorageUnavailable(msg.into())
    }

    /// Create a new compliance-denied error for the named feature.
    pub fn compliance<S: Into<String>>(feature: S) -> Self {
        DoruError::ComplianceDenied(feature.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DoruError::Other(msg.into())
    }
}
