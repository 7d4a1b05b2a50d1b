//! Local staging area for the snapshot file.

use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::fs;

#[async_trait]
pub trait Staging: Send + Sync {
    /// True when `path` is an existing regular file.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Removes the file at `path`. A missing file is not an error.
    async fn delete_if_exists(&self, path: &Path) -> io::Result<()>;
}

/// Staging backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStaging;

#[async_trait]
impl Staging for LocalStaging {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(!meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete_if_exists(&self, path: &Path) -> io::Result<()> {
        if fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("staging path {} is a directory", path.display()),
            ));
        }

        match fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed previous snapshot");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_delete_existing_file() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("vacuum.sqlite");
        std::fs::write(&path, b"old snapshot")?;

        let staging = LocalStaging;
        assert!(staging.exists(&path).await?);

        staging.delete_if_exists(&path).await?;
        assert!(!staging.exists(&path).await?);
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_not_an_error() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("never-written.sqlite");

        let staging = LocalStaging;
        assert!(!staging.exists(&path).await?);
        staging.delete_if_exists(&path).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_directory_is_rejected() -> io::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("snapshot-dir");
        std::fs::create_dir(&path)?;

        let staging = LocalStaging;
        assert!(!staging.exists(&path).await?);
        assert!(staging.delete_if_exists(&path).await.is_err());
        assert!(path.is_dir());
        Ok(())
    }
}
