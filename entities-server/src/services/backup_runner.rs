use crate::state::AppState;
use backup_pipeline::{BackupError, BackupRun};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time allowed for the snapshot stage when waiting out a run at shutdown.
const SNAPSHOT_ALLOWANCE: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Scheduled => f.write_str("scheduled"),
            Trigger::Manual => f.write_str("manual"),
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(BackupRun),
    /// Another run held the gate; nothing was attempted.
    Skipped,
}

/// Runs the backup pipeline unless a run is already in progress.
pub async fn run_backup(state: Arc<AppState>, trigger: Trigger) -> Result<RunOutcome, BackupError> {
    let Some(permit) = state.backup_gate.try_acquire() else {
        tracing::warn!(%trigger, "Skipping backup: previous run still in progress");
        return Ok(RunOutcome::Skipped);
    };

    tracing::info!(%trigger, "Starting database backup");
    let started = Instant::now();

    // Own task so a panicking collaborator surfaces as an error, not a crash.
    // The permit lives in the task and is released however it ends.
    let task_state = state.clone();
    let result = tokio::spawn(async move {
        let _permit = permit;
        task_state.orchestrator.run().await
    })
    .await
    .unwrap_or_else(|e| Err(BackupError::Unexpected(format!("backup task failed: {e}"))));

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(run) => tracing::info!(
            %trigger,
            object = ?run.uploaded_object,
            archived = run.inventory.len(),
            pruned = ?run.deleted_object,
            elapsed_ms,
            "Database backup completed"
        ),
        Err(e) => tracing::error!(
            %trigger,
            stage = e.stage(),
            error = %e,
            elapsed_ms,
            "Database backup failed"
        ),
    }

    result.map(RunOutcome::Completed)
}

/// Upper bound for one run: three archive calls plus the snapshot.
pub fn drain_limit(storage_timeout: Duration) -> Duration {
    storage_timeout * 3 + SNAPSHOT_ALLOWANCE
}

/// Waits for an in-flight run to finish. Returns `false` if `limit` elapsed first.
pub async fn wait_for_running_backup(state: &AppState, limit: Duration) -> bool {
    if !state.backup_gate.is_running() {
        return true;
    }
    tracing::info!("Waiting for the running backup to finish");
    tokio::time::timeout(limit, state.backup_gate.wait_idle())
        .await
        .is_ok()
}
