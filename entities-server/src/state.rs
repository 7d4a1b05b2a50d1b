use crate::config::{AppConfig, ArchiveConfig};
use crate::db::connection::DbPool;
use crate::services::db_snapshot::SqliteSnapshotStore;
use backup_pipeline::archive::{LocalArchive, S3Archive};
use backup_pipeline::{BackupOrchestrator, LocalStaging, RemoteArchive, RunGate, ThresholdRetention};
use std::sync::Arc;

/// Built once at startup and shared by every trigger.
pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub orchestrator: BackupOrchestrator,
    pub backup_gate: RunGate,
}

impl AppState {
    pub async fn new(db: DbPool, config: AppConfig) -> anyhow::Result<Self> {
        let archive = build_archive(&config).await?;
        let orchestrator = BackupOrchestrator::new(
            Arc::new(LocalStaging),
            Arc::new(SqliteSnapshotStore::new(db.clone())),
            archive,
            Arc::new(ThresholdRetention::default()),
            config.pipeline_settings(),
        );
        Ok(Self::with_orchestrator(db, config, orchestrator))
    }

    pub fn with_orchestrator(db: DbPool, config: AppConfig, orchestrator: BackupOrchestrator) -> Self {
        Self {
            db,
            config,
            orchestrator,
            backup_gate: RunGate::new(),
        }
    }
}

async fn build_archive(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteArchive>> {
    let archive: Arc<dyn RemoteArchive> = match config.archive()? {
        ArchiveConfig::S3 {
            bucket,
            endpoint,
            region,
        } => {
            tracing::info!(bucket = %bucket, endpoint = ?endpoint, "Using S3 archive");
            let archive = S3Archive::new(bucket.clone(), endpoint.clone(), region.clone())
                .await
                .with_timeout(config.storage_timeout);
            Arc::new(archive)
        }
        ArchiveConfig::Local { dir } => {
            tracing::info!(dir = %dir.display(), "Using local directory archive");
            Arc::new(LocalArchive::new(dir).with_timeout(config.storage_timeout))
        }
    };
    Ok(archive)
}
