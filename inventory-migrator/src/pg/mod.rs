//! PostgreSQL ladder.
//!
//! Every migration is a list of operations. An operation is rendered from a
//! pair of `sea-query` schema statements, or written as raw SQL for what the
//! builder cannot express (partial indexes, declarative partitions).

use async_trait::async_trait;
use sea_query::{
    Iden, Index, IndexDropStatement, PostgresQueryBuilder, SchemaStatementBuilder, Table,
    TableDropStatement,
};
use sqlx::PgConnection;

use crate::{error::Result, source::MigrationScript};

macro_rules! postgres_migration {
    ($ty:ident, $version:expr, $name:literal, [$($op:expr),* $(,)?]) => {
        pub struct $ty;

        impl $crate::pg::Migration for $ty {
            fn version(&self) -> u32 {
                $version
            }

            fn name(&self) -> &str {
                $name
            }

            fn operations(&self) -> Vec<Box<dyn $crate::pg::Operation>> {
                vec![$(Box::new($op)),*]
            }
        }
    };
}

mod m0001;
mod m0002;
mod m0003;
mod m0004;
mod m0005;
mod m0006;
mod migrator;
pub mod schema;

pub use m0001::M0001;
pub use m0002::M0002;
pub use m0003::M0003;
pub use m0004::M0004;
pub use m0005::M0005;
pub use m0006::M0006;
pub use migrator::PgMigrator;

#[async_trait]
pub trait Operation: Send + Sync {
    async fn up(&self, connection: &mut PgConnection) -> Result<()>;

    async fn down(&self, connection: &mut PgConnection) -> Result<()>;
}

pub trait Migration: Send + Sync {
    fn version(&self) -> u32;

    fn name(&self) -> &str;

    fn operations(&self) -> Vec<Box<dyn Operation>>;
}

/// Embedded ladder, lowest version first.
pub fn migrations() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(M0001),
        Box::new(M0002),
        Box::new(M0003),
        Box::new(M0004),
        Box::new(M0005),
        Box::new(M0006),
    ]
}

pub(crate) fn drop_table<T: Iden + 'static>(table: T) -> TableDropStatement {
    Table::drop().table(table).if_exists().to_owned()
}

pub(crate) fn drop_index(name: &str) -> IndexDropStatement {
    Index::drop().name(name).if_exists().to_owned()
}

/// Operation holding the SQL of both directions.
pub struct SqlOperation {
    up: String,
    down: String,
}

impl SqlOperation {
    pub fn new(up: impl Into<String>, down: impl Into<String>) -> Self {
        Self {
            up: up.into(),
            down: down.into(),
        }
    }

    /// Renders a pair of schema statements.
    pub fn schema<U, D>(up: U, down: D) -> Self
    where
        U: SchemaStatementBuilder,
        D: SchemaStatementBuilder,
    {
        Self::new(
            up.to_string(PostgresQueryBuilder),
            down.to_string(PostgresQueryBuilder),
        )
    }
}

#[async_trait]
impl Operation for SqlOperation {
    async fn up(&self, connection: &mut PgConnection) -> Result<()> {
        sqlx::raw_sql(&self.up).execute(connection).await?;

        Ok(())
    }

    async fn down(&self, connection: &mut PgConnection) -> Result<()> {
        sqlx::raw_sql(&self.down).execute(connection).await?;

        Ok(())
    }
}

/// Migration read from a `<version>_<name>.{up,down}.sql` pair.
pub struct ScriptMigration(MigrationScript);

impl From<MigrationScript> for ScriptMigration {
    fn from(value: MigrationScript) -> Self {
        Self(value)
    }
}

impl Migration for ScriptMigration {
    fn version(&self) -> u32 {
        self.0.version
    }

    fn name(&self) -> &str {
        &self.0.name
    }

    fn operations(&self) -> Vec<Box<dyn Operation>> {
        vec![Box::new(SqlOperation::new(
            self.0.up.clone(),
            self.0.down.clone(),
        ))]
    }
}
