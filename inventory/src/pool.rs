use std::sync::Arc;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::OnceCell;

use crate::{config::InventoryConfig, error::Result};

/// Process wide connection pool, opened by the first caller.
///
/// Clones share the same pool; concurrent first calls open it once.
#[derive(Debug, Clone, Default)]
pub struct PoolHandle(Arc<OnceCell<PgPool>>);

impl PoolHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_connect(&self, config: &InventoryConfig) -> Result<&PgPool> {
        let pool = self
            .0
            .get_or_try_init(|| async {
                tracing::info!("opening pool of {} connections", config.max_connections);

                PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(&config.database_url)
                    .await
            })
            .await?;

        Ok(pool)
    }

    pub fn get(&self) -> Option<&PgPool> {
        self.0.get()
    }
}
