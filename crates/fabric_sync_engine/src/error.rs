//! Error types for the sync engine.

use fabric_journal::{EntryKey, JournalError};
use fabric_agent::FabricError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Journal store error.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// Fabric command channel error.
    #[error("fabric error: {0}")]
    Fabric(#[from] FabricError),

    /// A worker was started twice.
    #[error("{0} is already running")]
    AlreadyRunning(&'static str),

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl SyncError {
    /// Returns true if a later pass may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Fabric(e) => e.is_transient(),
            SyncError::Journal(JournalError::Io(_)) => true,
            _ => false,
        }
    }
}

/// An entry whose payload cannot be turned into a fabric command.
///
/// Retrying such an entry can never succeed, so it is moved to `failed`
/// with this error as its diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed entry {key}: {reason}")]
pub struct MalformedEntry {
    /// Entry that failed validation.
    pub key: EntryKey,
    /// What is missing or invalid.
    pub reason: String,
}

impl MalformedEntry {
    pub(crate) fn new(key: EntryKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_journal::ResourceType;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::Fabric(FabricError::Channel("reset".into())).is_retryable());
        assert!(!SyncError::Fabric(FabricError::UnknownCommand("x".into())).is_retryable());
        assert!(!SyncError::AlreadyRunning("periodic sync worker").is_retryable());
        assert!(!SyncError::Journal(JournalError::Corrupted("bad".into())).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::AlreadyRunning("periodic sync worker");
        assert_eq!(err.to_string(), "periodic sync worker is already running");

        let err = MalformedEntry::new(EntryKey::new("p1", ResourceType::Port), "missing member");
        assert_eq!(err.to_string(), "malformed entry port/p1: missing member");
    }
}
