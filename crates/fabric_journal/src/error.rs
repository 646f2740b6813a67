//! Error types for journal operations.

use crate::entry::ResourceType;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;

/// Errors that can occur during journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The journal document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An entry already exists for this resource.
    #[error("journal entry already exists for {resource_type} {resource_uuid}")]
    AlreadyExists {
        /// Resource identifier.
        resource_uuid: String,
        /// Resource type.
        resource_type: ResourceType,
    },

    /// No entry exists for this resource.
    #[error("no journal entry for {resource_type} {resource_uuid}")]
    NotFound {
        /// Resource identifier.
        resource_uuid: String,
        /// Resource type.
        resource_type: ResourceType,
    },

    /// The journal file is corrupted.
    #[error("journal corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the journal lock.
    #[error("journal {0:?} is locked by another process")]
    Locked(PathBuf),
}
