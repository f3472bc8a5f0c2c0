use tokio::sync::Mutex;

use crate::{
    error::{MigrateError, Result},
    migrator::Migrator,
    version::{Direction, SchemaVersion, EMPTY_SCHEMA_VERSION},
};

/// Monotonic migration ladder with explicit up, down, to and force operations.
///
/// The manager is the only writer of the schema version. Up, down, to and
/// force hold the admin lock for their whole duration, so concurrent admin
/// calls are applied one after the other. Reading the current version never
/// takes that lock.
pub struct SchemaManager {
    migrator: Box<dyn Migrator>,
    admin: Mutex<()>,
}

impl SchemaManager {
    pub fn new<M: Migrator + 'static>(migrator: M) -> Self {
        Self {
            migrator: Box::new(migrator),
            admin: Mutex::new(()),
        }
    }

    /// Highest version the ladder knows about.
    pub async fn latest(&self) -> u32 {
        self.migrator
            .versions()
            .last()
            .copied()
            .unwrap_or(EMPTY_SCHEMA_VERSION)
    }

    /// Current version, `0` and clean when nothing was ever applied.
    ///
    /// While a migration runs this returns the dirty target of its current
    /// step.
    pub async fn current(&self) -> Result<SchemaVersion> {
        read_current(self.migrator.as_ref()).await
    }

    /// Applies the next migration and returns the new version.
    pub async fn up(&self) -> Result<u32> {
        let _admin = self.admin.lock().await;
        let migrator = self.migrator.as_ref();
        let current = read_clean(migrator).await?;

        let Some(next) = migrator.versions().into_iter().find(|v| *v > current) else {
            return Err(MigrateError::NoChange);
        };

        step(migrator, current, next).await?;

        Ok(next)
    }

    /// Reverts the current migration and returns the new version.
    pub async fn down(&self) -> Result<u32> {
        let _admin = self.admin.lock().await;
        let migrator = self.migrator.as_ref();
        let current = read_clean(migrator).await?;

        if current == EMPTY_SCHEMA_VERSION {
            return Err(MigrateError::NoChange);
        }

        let previous = previous_version(&migrator.versions(), current)?;
        step(migrator, current, previous).await?;

        Ok(previous)
    }

    /// Steps up or down until `target` is reached.
    pub async fn to(&self, target: u32) -> Result<u32> {
        let _admin = self.admin.lock().await;
        let migrator = self.migrator.as_ref();
        let versions = migrator.versions();

        if target != EMPTY_SCHEMA_VERSION && !versions.contains(&target) {
            return Err(MigrateError::UnknownVersion(target));
        }

        let mut current = read_clean(migrator).await?;

        while current < target {
            let Some(next) = versions.iter().copied().find(|v| *v > current) else {
                return Err(MigrateError::UnknownVersion(target));
            };

            step(migrator, current, next).await?;
            current = next;
        }

        while current > target {
            let previous = previous_version(&versions, current)?;
            step(migrator, current, previous).await?;
            current = previous;
        }

        Ok(current)
    }

    /// Records `version` as applied and clean without running anything.
    ///
    /// Used to recover after a migration failed half way.
    pub async fn force(&self, version: u32) -> Result<()> {
        let _admin = self.admin.lock().await;
        let migrator = self.migrator.as_ref();

        ensure_connected(migrator).await?;
        migrator.write_version(SchemaVersion::new(version)).await?;

        tracing::info!(version, "schema version forced");

        Ok(())
    }
}

async fn ensure_connected(migrator: &dyn Migrator) -> Result<()> {
    read_current(migrator).await.map(|_| ())
}

async fn read_current(migrator: &dyn Migrator) -> Result<SchemaVersion> {
    let version = match migrator.read_version().await {
        Err(err) if err.is_connection() => {
            tracing::warn!("migrator connection is stale, reconnecting: {err}");

            migrator.reconnect().await?;
            migrator.read_version().await?
        }
        res => res?,
    };

    Ok(version.unwrap_or_default())
}

async fn read_clean(migrator: &dyn Migrator) -> Result<u32> {
    let current = read_current(migrator).await?;

    if current.dirty {
        return Err(MigrateError::Dirty(current.version));
    }

    Ok(current.version)
}

fn previous_version(versions: &[u32], current: u32) -> Result<u32> {
    if !versions.contains(&current) {
        return Err(MigrateError::UnknownVersion(current));
    }

    Ok(versions
        .iter()
        .copied()
        .filter(|v| *v < current)
        .last()
        .unwrap_or(EMPTY_SCHEMA_VERSION))
}

/// Moves one rung. The version row is marked dirty with the target before the
/// migration runs and only cleaned once it succeeded.
async fn step(migrator: &dyn Migrator, from: u32, to: u32) -> Result<()> {
    let (version, direction) = if to > from {
        (to, Direction::Up)
    } else {
        (from, Direction::Down)
    };

    migrator.write_version(SchemaVersion::dirty(to)).await?;

    if let Err(err) = migrator.apply(version, direction).await {
        tracing::error!(from, to, "migration failed: {err}");

        return Err(err);
    }

    migrator.write_version(SchemaVersion::new(to)).await?;

    tracing::info!(from, to, "migration applied");

    Ok(())
}
