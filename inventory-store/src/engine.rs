use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dyn_clone::DynClone;

use crate::{
    error::Result,
    ingest::IngestPlan,
    legacy::{LegacyEvent, LegacyKey},
    lookup::{AssetRow, LookupKey},
    model::{AccountOwner, CloudAssetChanges},
    partition::Partition,
};

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "pg")]
mod pg;

#[cfg(feature = "memory")]
pub use memory::*;
#[cfg(feature = "pg")]
pub use pg::*;

/// Storage backend. Every write runs in a single transaction: it either
/// applies completely or not at all.
#[async_trait]
pub trait Engine: DynClone + Send + Sync {
    /// Upserts the catalog entries of the resource, then applies every
    /// assign/release of the plan in order.
    async fn ingest(&self, plan: &IngestPlan) -> Result<()>;

    /// Appends the changes to the legacy event table.
    async fn ingest_legacy(&self, changes: &CloudAssetChanges) -> Result<()>;

    /// Binding rows whose interval covers `when`, joined with the catalog.
    async fn find(&self, when: DateTime<Utc>, key: &LookupKey) -> Result<Vec<AssetRow>>;

    /// Related ARN ids of a resource whose relationship covers `when`.
    async fn find_related(
        &self,
        when: DateTime<Utc>,
        arn_id: &str,
        account: &str,
        region: &str,
    ) -> Result<Vec<String>>;

    /// Latest join events per resource at `when` in the legacy event table.
    async fn find_legacy(&self, when: DateTime<Utc>, key: &LegacyKey) -> Result<Vec<AssetRow>>;

    async fn read_legacy_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LegacyEvent>>;

    async fn account_owner(&self, account: &str) -> Result<Option<AccountOwner>>;

    async fn store_account_owner(&self, owner: &AccountOwner) -> Result<()>;

    /// Registers and creates the next partition. `None` when auto-generation
    /// has nothing to do yet.
    async fn generate_partition(
        &self,
        begin: Option<DateTime<Utc>>,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<Partition>>;

    /// Registered partitions with their row counts, latest end first.
    async fn partitions(&self) -> Result<Vec<Partition>>;

    async fn delete_partition(&self, name: &str) -> Result<()>;
}

dyn_clone::clone_trait_object!(Engine);
