//! Directory-backed archive for development and tests.

use super::{with_timeout, RemoteArchive, RemoteObject, DEFAULT_TIMEOUT};
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub struct LocalArchive {
    base_path: PathBuf,
    timeout: Duration,
}

impl LocalArchive {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn full_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            return Err(StorageError::Backend(format!("invalid object name: {name:?}")));
        }
        Ok(self.base_path.join(name))
    }
}

fn partial_name(remote_name: &str) -> String {
    format!(".{remote_name}.partial")
}

/// In-progress upload file that is deleted on drop.
struct PartialFile {
    path: Option<PathBuf>,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    async fn remove_now(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[async_trait]
impl RemoteArchive for LocalArchive {
    async fn upload(&self, local_path: &Path, remote_name: &str) -> Result<(), StorageError> {
        let dest = self.full_path(remote_name)?;
        let partial = self.base_path.join(partial_name(remote_name));
        with_timeout("upload", self.timeout, async {
            fs::create_dir_all(&self.base_path).await?;
            if fs::try_exists(&dest).await? {
                return Err(StorageError::AlreadyExists(remote_name.to_string()));
            }
            let mut source = fs::File::open(local_path).await?;

            // Removed unless the copy is published, including when this future is dropped
            let mut guard = PartialFile::new(partial.clone());
            let mut target = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&partial)
                .await?;
            tokio::io::copy(&mut source, &mut target).await?;
            target.sync_all().await?;
            drop(target);

            // hard_link refuses to clobber an earlier run's object
            match fs::hard_link(&partial, &dest).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(StorageError::AlreadyExists(remote_name.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
            guard.remove_now().await;
            Ok::<_, StorageError>(())
        })
        .await
    }

    async fn list(&self) -> Result<Vec<RemoteObject>, StorageError> {
        with_timeout("list", self.timeout, async {
            let mut results = Vec::new();
            let mut entries = match fs::read_dir(&self.base_path).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(results),
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                if !meta.is_file() {
                    continue;
                }
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                let last_modified: DateTime<Utc> = meta.modified()?.into();
                results.push(RemoteObject {
                    name,
                    last_modified,
                });
            }

            Ok::<_, StorageError>(results)
        })
        .await
    }

    async fn delete(&self, remote_name: &str) -> Result<(), StorageError> {
        let path = self.full_path(remote_name)?;
        with_timeout("delete", self.timeout, async {
            match fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    Err(StorageError::NotFound(remote_name.to_string()))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }
}
