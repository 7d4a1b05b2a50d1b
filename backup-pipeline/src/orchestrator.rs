//! One end-to-end backup run.
//!
//! Stages run strictly in order and the first failure ends the run. Nothing
//! already committed is rolled back: an uploaded object stays in the
//! archive even when the listing after it fails, and is picked up by the
//! next run's listing.

use crate::archive::{RemoteArchive, RemoteObject};
use crate::error::{BackupError, Result};
use crate::retention::RetentionPolicy;
use crate::snapshot::SnapshotStore;
use crate::staging::Staging;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_OBJECT_PREFIX: &str = "entities-backup";
pub const DEFAULT_OBJECT_EXTENSION: &str = "sqlite";
pub const DEFAULT_STAGING_PATH: &str = "vacuum.sqlite";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Local file the snapshot is written to before upload
    pub staging_path: PathBuf,

    /// Remote object names are `<prefix><unix seconds>.<extension>`
    pub object_prefix: String,
    pub object_extension: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            staging_path: PathBuf::from(DEFAULT_STAGING_PATH),
            object_prefix: DEFAULT_OBJECT_PREFIX.to_string(),
            object_extension: DEFAULT_OBJECT_EXTENSION.to_string(),
        }
    }
}

impl PipelineSettings {
    pub fn object_name(&self, at: DateTime<Utc>) -> String {
        format!(
            "{}{}.{}",
            self.object_prefix,
            at.timestamp(),
            self.object_extension
        )
    }
}

/// Stage outcomes of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupRun {
    pub staging_cleared: bool,
    pub snapshot_created: bool,
    pub uploaded: bool,
    pub uploaded_object: Option<String>,
    pub inventory: Vec<RemoteObject>,
    pub deleted_object: Option<String>,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct BackupOrchestrator {
    staging: Arc<dyn Staging>,
    snapshots: Arc<dyn SnapshotStore>,
    archive: Arc<dyn RemoteArchive>,
    retention: Arc<dyn RetentionPolicy>,
    settings: PipelineSettings,
    clock: Clock,
}

impl BackupOrchestrator {
    pub fn new(
        staging: Arc<dyn Staging>,
        snapshots: Arc<dyn SnapshotStore>,
        archive: Arc<dyn RemoteArchive>,
        retention: Arc<dyn RetentionPolicy>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            staging,
            snapshots,
            archive,
            retention,
            settings,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the wall clock used for object names.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub async fn run(&self) -> Result<BackupRun> {
        let mut run = BackupRun::default();
        let staging_path = &self.settings.staging_path;

        self.staging
            .delete_if_exists(staging_path)
            .await
            .map_err(BackupError::Staging)?;
        run.staging_cleared = true;

        self.snapshots
            .write_snapshot(staging_path)
            .await
            .map_err(BackupError::Snapshot)?;
        run.snapshot_created = true;
        tracing::debug!(path = %staging_path.display(), "Snapshot written");

        let object = self.settings.object_name((self.clock)());
        self.archive
            .upload(staging_path, &object)
            .await
            .map_err(|source| BackupError::Upload {
                object: object.clone(),
                source,
            })?;
        run.uploaded = true;
        run.uploaded_object = Some(object.clone());
        tracing::info!(object = %object, "Snapshot uploaded");

        run.inventory = self.archive.list().await.map_err(BackupError::List)?;

        if let Some(victim) = self.retention.select_for_deletion(&run.inventory) {
            self.archive
                .delete(&victim)
                .await
                .map_err(|source| BackupError::RetentionDelete {
                    object: victim.clone(),
                    source,
                })?;
            tracing::info!(object = %victim, "Pruned oldest snapshot");
            run.deleted_object = Some(victim);
        } else {
            tracing::debug!(count = run.inventory.len(), "Archive within retention threshold");
        }

        Ok(run)
    }
}
