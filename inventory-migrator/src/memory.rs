use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Semaphore;

use crate::{
    error::{MigrateError, Result},
    migrator::Migrator,
    version::{Direction, SchemaVersion, NEW_SCHEMA_ONLY_VERSION},
};

#[derive(Debug, Default)]
struct State {
    version: Option<SchemaVersion>,
    fail_on: Option<u32>,
    stale: bool,
    unreachable: bool,
    paused: bool,
    reconnects: usize,
    applied: Vec<(u32, Direction)>,
}

/// In-process migrator. Clones share state, so a test can keep a handle to
/// inspect or break the connection while a manager owns another one.
#[derive(Debug, Clone)]
pub struct MemoryMigrator {
    versions: Vec<u32>,
    state: Arc<RwLock<State>>,
    gate: Arc<Semaphore>,
}

impl MemoryMigrator {
    pub fn new() -> Self {
        Self::with_versions((1..=NEW_SCHEMA_ONLY_VERSION).collect())
    }

    pub fn with_versions(mut versions: Vec<u32>) -> Self {
        versions.sort_unstable();
        versions.dedup();

        Self {
            versions,
            state: Arc::default(),
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Makes migration `version` fail in both directions.
    pub fn fail_on(&self, version: Option<u32>) {
        self.state.write().fail_on = version;
    }

    /// Holds every migration before it runs until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.state.write().paused = true;
    }

    /// Lets the held migration run.
    pub fn resume(&self) {
        self.state.write().paused = false;
        self.gate.add_permits(1);
    }

    /// Drops the connection; the next call fails until a reconnect.
    pub fn disconnect(&self) {
        self.state.write().stale = true;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.write().unreachable = unreachable;
    }

    pub fn reconnects(&self) -> usize {
        self.state.read().reconnects
    }

    pub fn applied(&self) -> Vec<(u32, Direction)> {
        self.state.read().applied.clone()
    }

    pub fn recorded(&self) -> Option<SchemaVersion> {
        self.state.read().version
    }

    fn check_connection(state: &State) -> Result<()> {
        if state.stale {
            return Err(MigrateError::Connection("connection is closed".to_owned()));
        }

        Ok(())
    }
}

impl Default for MemoryMigrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Migrator for MemoryMigrator {
    fn versions(&self) -> Vec<u32> {
        self.versions.clone()
    }

    async fn read_version(&self) -> Result<Option<SchemaVersion>> {
        let state = self.state.read();
        Self::check_connection(&state)?;

        Ok(state.version)
    }

    async fn write_version(&self, version: SchemaVersion) -> Result<()> {
        let mut state = self.state.write();
        Self::check_connection(&state)?;

        state.version = if version == SchemaVersion::default() {
            None
        } else {
            Some(version)
        };

        Ok(())
    }

    async fn apply(&self, version: u32, direction: Direction) -> Result<()> {
        let paused = self.state.read().paused;

        if paused {
            self.gate
                .acquire()
                .await
                .map_err(|err| MigrateError::Connection(err.to_string()))?
                .forget();
        }

        let mut state = self.state.write();
        Self::check_connection(&state)?;

        if !self.versions.contains(&version) {
            return Err(MigrateError::UnknownVersion(version));
        }

        if state.fail_on == Some(version) {
            return Err(MigrateError::Failed {
                version,
                reason: "injected failure".to_owned(),
            });
        }

        state.applied.push((version, direction));

        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        let mut state = self.state.write();

        if state.unreachable {
            return Err(MigrateError::Connection(
                "database is unreachable".to_owned(),
            ));
        }

        state.stale = false;
        state.reconnects += 1;

        Ok(())
    }
}
