use crate::db::connection::DbPool;
use async_trait::async_trait;
use backup_pipeline::{SnapshotError, SnapshotStore};
use rusqlite::params;
use std::path::Path;

/// Snapshots the live database with `VACUUM INTO`, which produces a
/// compacted, standalone copy without blocking readers.
pub struct SqliteSnapshotStore {
    db: DbPool,
}

impl SqliteSnapshotStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn write_snapshot(&self, destination: &Path) -> Result<(), SnapshotError> {
        let db = self.db.clone();
        let dest = destination.to_string_lossy().into_owned();

        tokio::task::spawn_blocking(move || {
            let conn = db.get().map_err(|e| SnapshotError::Engine(Box::new(e)))?;
            conn.execute("VACUUM main INTO ?1", params![dest])
                .map_err(|e| SnapshotError::Engine(Box::new(e)))?;
            tracing::info!(path = %dest, "[DB Backup] Created snapshot");
            Ok::<_, SnapshotError>(())
        })
        .await
        .map_err(|e| SnapshotError::Task(e.to_string()))?
    }
}
