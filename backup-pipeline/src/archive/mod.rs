//! Remote archive abstraction over a single logical bucket.

pub mod local;
pub mod s3;

use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

pub use local::LocalArchive;
pub use s3::S3Archive;

/// Default bound on every archive call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// One archived snapshot as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub name: String,
    pub last_modified: DateTime<Utc>,
}

#[async_trait]
pub trait RemoteArchive: Send + Sync {
    /// Uploads `local_path` as `remote_name`. Fails with
    /// [`StorageError::AlreadyExists`] instead of overwriting.
    async fn upload(&self, local_path: &Path, remote_name: &str) -> Result<(), StorageError>;

    /// Every object currently in the archive.
    async fn list(&self) -> Result<Vec<RemoteObject>, StorageError>;

    /// Deletes `remote_name`, guarded against the object changing between
    /// lookup and deletion.
    async fn delete(&self, remote_name: &str) -> Result<(), StorageError>;
}

/// Runs `fut` under `timeout`, mapping expiry to [`StorageError::Timeout`].
pub(crate) async fn with_timeout<T, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout { operation, timeout }),
    }
}
