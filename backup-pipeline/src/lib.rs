//! Backup Pipeline Library
//!
//! Snapshots the live database into a staging file, ships it to a remote
//! archive and prunes the archive down to its retention threshold.

pub mod archive;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod retention;
pub mod snapshot;
pub mod staging;

// Re-export commonly used types
pub use archive::{RemoteArchive, RemoteObject};
pub use error::{BackupError, SnapshotError, StorageError};
pub use gate::{RunGate, RunPermit};
pub use orchestrator::{BackupOrchestrator, BackupRun, PipelineSettings};
pub use retention::{RetentionPolicy, ThresholdRetention};
pub use snapshot::SnapshotStore;
pub use staging::{LocalStaging, Staging};
