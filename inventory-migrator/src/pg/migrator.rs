use std::{
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use parking_lot::RwLock;
use sea_query::{ColumnDef, PostgresQueryBuilder, Table};
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{migrations, schema::SchemaMigrations, Migration, ScriptMigration};
use crate::{
    error::{MigrateError, Result},
    migrator::Migrator,
    source,
    version::{Direction, SchemaVersion},
};

/// Runs the ladder against PostgreSQL and keeps the version in a single row
/// `schema_migrations(version, dirty)` table.
pub struct PgMigrator {
    pool: RwLock<PgPool>,
    url: Option<String>,
    table_ready: AtomicBool,
    migrations: Vec<Box<dyn Migration>>,
}

impl PgMigrator {
    /// Uses the embedded ladder.
    pub fn new(pool: &PgPool) -> Self {
        Self {
            pool: RwLock::new(pool.clone()),
            url: None,
            table_ready: AtomicBool::new(false),
            migrations: migrations(),
        }
    }

    /// Uses the SQL files of `path` instead of the embedded ladder.
    pub fn from_dir(pool: &PgPool, path: impl AsRef<Path>) -> Result<Self> {
        let migrations = source::read_dir(path)?
            .into_iter()
            .map(|script| Box::new(ScriptMigration::from(script)) as Box<dyn Migration>)
            .collect();

        Ok(Self {
            pool: RwLock::new(pool.clone()),
            url: None,
            table_ready: AtomicBool::new(false),
            migrations,
        })
    }

    /// Database url used to open a fresh pool when the current one is stale.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    fn pool(&self) -> PgPool {
        self.pool.read().clone()
    }

    /// Creates the version table on first use.
    async fn ensure_table(&self) -> Result<()> {
        if self.table_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        let statement = Table::create()
            .table(SchemaMigrations::Table)
            .if_not_exists()
            .col(
                ColumnDef::new(SchemaMigrations::Version)
                    .big_integer()
                    .not_null()
                    .primary_key(),
            )
            .col(ColumnDef::new(SchemaMigrations::Dirty).boolean().not_null())
            .to_string(PostgresQueryBuilder);

        sqlx::query(&statement).execute(&self.pool()).await?;
        self.table_ready.store(true, Ordering::Release);

        Ok(())
    }
}

#[async_trait]
impl Migrator for PgMigrator {
    fn versions(&self) -> Vec<u32> {
        let mut versions = self
            .migrations
            .iter()
            .map(|m| m.version())
            .collect::<Vec<_>>();

        versions.sort_unstable();
        versions
    }

    async fn read_version(&self) -> Result<Option<SchemaVersion>> {
        self.ensure_table().await?;

        let row = sqlx::query_as::<_, (i64, bool)>(
            "SELECT version, dirty FROM schema_migrations LIMIT 1",
        )
        .fetch_optional(&self.pool())
        .await?;

        let Some((version, dirty)) = row else {
            return Ok(None);
        };

        let version = u32::try_from(version).map_err(|_| {
            MigrateError::InvalidSource(format!("recorded schema version {version} is invalid"))
        })?;

        Ok(Some(SchemaVersion { version, dirty }))
    }

    async fn write_version(&self, version: SchemaVersion) -> Result<()> {
        self.ensure_table().await?;

        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM schema_migrations")
            .execute(&mut *tx)
            .await?;

        if version != SchemaVersion::default() {
            sqlx::query("INSERT INTO schema_migrations (version, dirty) VALUES ($1, $2)")
                .bind(i64::from(version.version))
                .bind(version.dirty)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn apply(&self, version: u32, direction: Direction) -> Result<()> {
        let Some(migration) = self.migrations.iter().find(|m| m.version() == version) else {
            return Err(MigrateError::UnknownVersion(version));
        };

        let mut operations = migration.operations();

        if direction == Direction::Down {
            operations.reverse();
        }

        let failed = |err: MigrateError| MigrateError::Failed {
            version,
            reason: format!("{}: {err}", migration.name()),
        };

        let mut tx = self.pool().begin().await?;

        for operation in operations {
            let res = match direction {
                Direction::Up => operation.up(&mut *tx).await,
                Direction::Down => operation.down(&mut *tx).await,
            };

            res.map_err(&failed)?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        let Some(url) = self.url.as_deref() else {
            return Err(MigrateError::Connection(
                "no database url to reconnect with".to_owned(),
            ));
        };

        let pool = PgPoolOptions::new()
            .connect(url)
            .await
            .map_err(|err| MigrateError::Connection(err.to_string()))?;

        // Shared with the store, so dropped and not closed.
        *self.pool.write() = pool;

        Ok(())
    }
}
