use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    engine::Engine,
    error::{Result, StoreError},
    ingest::IngestPlan,
    legacy::{LegacyEvent, LegacyKey},
    lookup::{AssetRow, LookupKey},
    model::{AccountOwner, CloudAssetChanges},
    partition::Partition,
    store::Store,
};

mod binding;
mod catalog;
mod legacy;
mod lookup;
mod owner;
mod partition;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(pool: &PgPool) -> Store {
        Store::new(Self { pool: pool.clone() })
    }
}

/// Commits on success. On failure the transaction is rolled back and a
/// rollback error is reported together with the original one.
async fn finish<T>(tx: Transaction<'_, Postgres>, res: Result<T>) -> Result<T> {
    match res {
        Ok(value) => {
            tx.commit().await?;

            Ok(value)
        }
        Err(err) => match tx.rollback().await {
            Ok(()) => Err(err),
            Err(rollback) => Err(StoreError::Rollback {
                source: Box::new(err),
                rollback: rollback.to_string(),
            }),
        },
    }
}

#[async_trait]
impl Engine for PgStore {
    async fn ingest(&self, plan: &IngestPlan) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = binding::ingest(&mut tx, plan).await;

        finish(tx, res).await
    }

    async fn ingest_legacy(&self, changes: &CloudAssetChanges) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = legacy::ingest(&mut tx, changes).await;

        finish(tx, res).await
    }

    async fn find(&self, when: DateTime<Utc>, key: &LookupKey) -> Result<Vec<AssetRow>> {
        lookup::find(&self.pool, when, key).await
    }

    async fn find_related(
        &self,
        when: DateTime<Utc>,
        arn_id: &str,
        account: &str,
        region: &str,
    ) -> Result<Vec<String>> {
        lookup::find_related(&self.pool, when, arn_id, account, region).await
    }

    async fn find_legacy(&self, when: DateTime<Utc>, key: &LegacyKey) -> Result<Vec<AssetRow>> {
        legacy::find(&self.pool, when, key).await
    }

    async fn read_legacy_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LegacyEvent>> {
        legacy::read_events(&self.pool, from, to).await
    }

    async fn account_owner(&self, account: &str) -> Result<Option<AccountOwner>> {
        owner::find(&self.pool, account).await
    }

    async fn store_account_owner(&self, owner: &AccountOwner) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = owner::store(&mut tx, owner).await;

        finish(tx, res).await
    }

    async fn generate_partition(
        &self,
        begin: Option<DateTime<Utc>>,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<Partition>> {
        let mut tx = self.pool.begin().await?;
        let res = partition::generate(&mut tx, begin, days, now).await;

        finish(tx, res).await
    }

    async fn partitions(&self) -> Result<Vec<Partition>> {
        partition::list(&self.pool).await
    }

    async fn delete_partition(&self, name: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = partition::delete(&mut tx, name).await;

        finish(tx, res).await
    }
}
