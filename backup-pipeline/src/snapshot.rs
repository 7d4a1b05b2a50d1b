//! Contract for producing a standalone copy of the live database.

use crate::error::SnapshotError;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Writes a consistent point-in-time copy of the database to
    /// `destination`. The file must be usable without the live engine.
    async fn write_snapshot(&self, destination: &Path) -> Result<(), SnapshotError>;
}
