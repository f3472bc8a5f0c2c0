use std::sync::Arc;

use chrono::{DateTime, Utc};
use inventory_migrator::{SchemaManager, SchemaVersion, MINIMUM_SCHEMA_VERSION};
use inventory_store::{AccountOwner, CloudAssetChanges, CloudAssetDetails, Partition, Store};

use crate::{
    config::InventoryConfig,
    error::{InventoryError, Result},
};

/// Entry point of the inventory.
///
/// Writes and lookups are routed to the legacy event table, the binding
/// store, or both, depending on the schema version applied at the time of
/// the call.
#[derive(Clone)]
pub struct Inventory {
    store: Store,
    schema: Arc<SchemaManager>,
    config: InventoryConfig,
}

impl Inventory {
    pub fn new(store: Store, schema: SchemaManager, config: InventoryConfig) -> Self {
        Self {
            store,
            schema: Arc::new(schema),
            config,
        }
    }

    /// Opens the shared pool and brings the schema up to the configured
    /// minimum version.
    #[cfg(feature = "pg")]
    pub async fn connect(pool: &crate::PoolHandle, config: InventoryConfig) -> Result<Self> {
        use inventory_migrator::pg::PgMigrator;
        use inventory_store::PgStore;

        let pool = pool.get_or_connect(&config).await?;

        let migrator = match config.migrations_path.as_ref() {
            Some(path) => PgMigrator::from_dir(pool, path)?,
            None => PgMigrator::new(pool),
        }
        .url(config.database_url.to_owned());

        let inventory = Self::new(PgStore::new(pool), SchemaManager::new(migrator), config);
        inventory.ensure_schema().await?;

        Ok(inventory)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Migrates to `min_schema_version` when the applied version is below it.
    pub async fn ensure_schema(&self) -> Result<SchemaVersion> {
        let current = self.schema.current().await?;
        let min = self.config.min_schema_version;

        if current.version >= min {
            tracing::debug!("schema version {current} satisfies minimum {min}");
            return Ok(current);
        }

        let version = self.schema.to(min).await?;
        tracing::info!("schema migrated to version {version}");

        Ok(SchemaVersion::new(version))
    }

    /// Version used to route writes. A failed read falls back to the legacy
    /// path only.
    async fn write_version(&self) -> SchemaVersion {
        match self.schema.current().await {
            Ok(version) => version,
            Err(e) => {
                tracing::warn!("schema version unavailable, writing legacy schema only: {e}");
                SchemaVersion::new(MINIMUM_SCHEMA_VERSION)
            }
        }
    }

    pub async fn store_cloud_asset(&self, changes: &CloudAssetChanges) -> Result<()> {
        if changes.changes.iter().any(|c| c.has_unbound_public_ips()) {
            tracing::info!(
                "public ips of `{}` without hostname are not recorded",
                changes.arn
            );
        }

        let version = self.write_version().await;

        let res = if !version.writes_new() {
            tracing::debug!("schema {version}: legacy write");
            self.store.store_legacy(changes).await.map_err(Into::into)
        } else if !version.writes_legacy() {
            tracing::debug!("schema {version}: new schema write");
            self.store.store_cloud_asset(changes).await.map_err(Into::into)
        } else {
            tracing::debug!("schema {version}: dual write");
            let new = self.store.store_cloud_asset(changes).await;
            let legacy = self.store.store_legacy(changes).await;

            dual_write(legacy, new)
        };

        res.inspect_err(InventoryError::log)
    }

    pub async fn fetch_by_ip(&self, when: DateTime<Utc>, ip: &str) -> Result<Vec<CloudAssetDetails>> {
        let res = if self.schema.current().await?.reads_new() {
            self.store.fetch_by_ip(when, ip).await
        } else {
            self.store.legacy_fetch_by_ip(when, ip).await
        };

        res.map_err(Into::into).inspect_err(InventoryError::log)
    }

    pub async fn fetch_by_hostname(
        &self,
        when: DateTime<Utc>,
        hostname: &str,
    ) -> Result<Vec<CloudAssetDetails>> {
        let res = if self.schema.current().await?.reads_new() {
            self.store.fetch_by_hostname(when, hostname).await
        } else {
            self.store.legacy_fetch_by_hostname(when, hostname).await
        };

        res.map_err(Into::into).inspect_err(InventoryError::log)
    }

    /// The legacy schema has no resource id index, so lookups answer nothing
    /// until reads move to the new schema.
    pub async fn fetch_by_resource_id(
        &self,
        when: DateTime<Utc>,
        arn_id: &str,
    ) -> Result<Vec<CloudAssetDetails>> {
        if !self.schema.current().await?.reads_new() {
            tracing::debug!("resource id lookup of `{arn_id}` on legacy schema");
            return Ok(Vec::new());
        }

        self.store
            .fetch_by_resource_id(when, arn_id)
            .await
            .map_err(Into::into)
            .inspect_err(InventoryError::log)
    }

    pub async fn fetch_all(&self, when: DateTime<Utc>) -> Result<Vec<CloudAssetDetails>> {
        Ok(self.store.fetch_all(when).await?)
    }

    pub async fn store_account_owner(&self, owner: &AccountOwner) -> Result<()> {
        self.store
            .store_account_owner(owner)
            .await
            .map_err(Into::into)
            .inspect_err(InventoryError::log)
    }

    pub async fn schema_version(&self) -> Result<SchemaVersion> {
        Ok(self.schema.current().await?)
    }

    pub async fn schema_up(&self) -> Result<u32> {
        let version = self.schema.up().await?;
        tracing::info!("schema migrated up to version {version}");

        Ok(version)
    }

    pub async fn schema_down(&self) -> Result<u32> {
        let version = self.schema.down().await?;
        tracing::info!("schema migrated down to version {version}");

        Ok(version)
    }

    pub async fn schema_to(&self, version: u32) -> Result<u32> {
        let version = self.schema.to(version).await?;
        tracing::info!("schema migrated to version {version}");

        Ok(version)
    }

    pub async fn force_schema(&self, version: u32) -> Result<()> {
        self.schema.force(version).await?;
        tracing::info!("schema version forced to {version}");

        Ok(())
    }

    pub async fn generate_partition(
        &self,
        begin: Option<DateTime<Utc>>,
        days: u32,
    ) -> Result<Option<Partition>> {
        let partition = self
            .store
            .generate_partition(begin, days)
            .await
            .inspect_err(|e| tracing::error!("partition generation failed: {e}"))?;

        match partition.as_ref() {
            Some(partition) => tracing::info!("partition {} created", partition.name),
            None => tracing::debug!("latest partition still ahead, nothing generated"),
        }

        Ok(partition)
    }

    pub async fn partitions(&self) -> Result<Vec<Partition>> {
        Ok(self.store.partitions().await?)
    }

    pub async fn delete_partition(&self, name: &str) -> Result<()> {
        self.store
            .delete_partition(name)
            .await
            .map_err(Into::into)
            .inspect_err(InventoryError::log)?;

        tracing::info!("partition {name} deleted");

        Ok(())
    }

    /// Drops the partitions older than the configured TTL.
    pub async fn drop_expired_partitions(&self) -> Result<Vec<String>> {
        let dropped = self
            .store
            .drop_expired_partitions(self.config.partition_ttl_days)
            .await?;

        for name in dropped.iter() {
            tracing::info!("expired partition {name} dropped");
        }

        Ok(dropped)
    }

    /// Replays the legacy events of `[from, to]` into the binding store.
    pub async fn back_fill(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<usize> {
        let count = self
            .store
            .back_fill(from, to)
            .await
            .map_err(Into::into)
            .inspect_err(InventoryError::log)?;

        tracing::info!("{count} legacy events replayed from {from} to {to}");

        Ok(count)
    }
}

/// Outcome of a write to both schemas.
fn dual_write(
    legacy: inventory_store::Result<()>,
    new: inventory_store::Result<()>,
) -> Result<()> {
    match (legacy, new) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e.into()),
        (Err(legacy), Err(new)) => Err(InventoryError::DualWrite { legacy, new }),
    }
}

#[cfg(test)]
mod tests {
    use inventory_store::StoreError;

    use super::*;

    fn failed(field: &str) -> inventory_store::Result<()> {
        Err(StoreError::invalid_input(field, "broken"))
    }

    #[test]
    fn dual_write_outcomes() {
        assert!(dual_write(Ok(()), Ok(())).is_ok());

        assert!(matches!(
            dual_write(failed("legacy"), Ok(())),
            Err(InventoryError::Store(StoreError::InvalidInput { ref field, .. })) if field == "legacy"
        ));
        assert!(matches!(
            dual_write(Ok(()), failed("new")),
            Err(InventoryError::Store(StoreError::InvalidInput { ref field, .. })) if field == "new"
        ));

        let err = dual_write(failed("legacy"), failed("new")).unwrap_err();
        assert!(matches!(err, InventoryError::DualWrite { .. }));
        assert!(err.to_string().contains("`legacy`"));
    }
}
