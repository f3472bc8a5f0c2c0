use async_trait::async_trait;

use crate::{
    error::Result,
    version::{Direction, SchemaVersion},
};

/// Storage capability the [`SchemaManager`](crate::SchemaManager) drives.
///
/// Implementations only know how to read and record the version row and how
/// to run one migration of the ladder in one direction. Walking the ladder,
/// dirty tracking and reconnection policy live in the manager.
///
/// Version reads run concurrently with each other and with a migration in
/// progress, so every method takes `&self`.
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Versions available in the ladder, ascending.
    fn versions(&self) -> Vec<u32>;

    /// `None` when no version has been recorded yet.
    async fn read_version(&self) -> Result<Option<SchemaVersion>>;

    /// Records `version`. Recording version `0` as clean clears the row.
    async fn write_version(&self, version: SchemaVersion) -> Result<()>;

    /// Runs migration `version` in `direction`.
    async fn apply(&self, version: u32, direction: Direction) -> Result<()>;

    /// Replaces a stale connection.
    async fn reconnect(&self) -> Result<()>;
}
