//! Error types for the backup pipeline.

use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`RemoteArchive`](crate::RemoteArchive).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object changed before it could be deleted: {0}")]
    PreconditionFailed(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failures reported by a [`SnapshotStore`](crate::SnapshotStore).
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("database engine error: {0}")]
    Engine(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("snapshot task failed: {0}")]
    Task(String),
}

/// Outcome of a failed backup run. Each variant names the stage that aborted.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("failed to clear staging path: {0}")]
    Staging(#[source] std::io::Error),

    #[error("failed to create snapshot: {0}")]
    Snapshot(#[source] SnapshotError),

    #[error("failed to upload {object}: {source}")]
    Upload {
        object: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to list remote archive: {0}")]
    List(#[source] StorageError),

    #[error("failed to delete {object} from remote archive: {source}")]
    RetentionDelete {
        object: String,
        #[source]
        source: StorageError,
    },

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl BackupError {
    /// Stage name used in log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            BackupError::Staging(_) => "staging",
            BackupError::Snapshot(_) => "snapshot",
            BackupError::Upload { .. } => "upload",
            BackupError::List(_) => "list",
            BackupError::RetentionDelete { .. } => "retention_delete",
            BackupError::Unexpected(_) => "unexpected",
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
