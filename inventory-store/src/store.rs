use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};

use crate::{
    engine::Engine,
    error::{Result, StoreError},
    ingest::IngestPlan,
    ip::parse_ip,
    legacy::LegacyKey,
    lookup::{aggregate, dedup_champions, AssetRow, LookupKey},
    model::{AccountOwner, CloudAssetChanges, CloudAssetDetails},
    partition::{self, Partition},
};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct Store {
    pub(crate) engine: Box<dyn Engine>,
    clock: Clock,
}

impl Store {
    pub fn new<E: Engine + 'static>(engine: E) -> Self {
        Self {
            engine: Box::new(engine),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the wall clock used by partition management.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Applies every binding change of the event to the new schema in one
    /// transaction.
    pub async fn store_cloud_asset(&self, changes: &CloudAssetChanges) -> Result<()> {
        if changes.arn.trim().is_empty() {
            return Err(StoreError::invalid_input("arn", "must not be empty"));
        }

        self.engine.ingest(&IngestPlan::new(changes)).await
    }

    /// Appends the event to the legacy event table.
    pub async fn store_legacy(&self, changes: &CloudAssetChanges) -> Result<()> {
        if changes.arn.trim().is_empty() {
            return Err(StoreError::invalid_input("arn", "must not be empty"));
        }

        self.engine.ingest_legacy(changes).await
    }

    pub async fn fetch_by_ip(&self, when: DateTime<Utc>, ip: &str) -> Result<Vec<CloudAssetDetails>> {
        let key = LookupKey::ip(parse_ip("ip", ip)?);

        self.fetch(when, &key).await
    }

    pub async fn fetch_by_hostname(
        &self,
        when: DateTime<Utc>,
        hostname: &str,
    ) -> Result<Vec<CloudAssetDetails>> {
        let hostname = required("hostname", hostname)?;

        self.fetch(when, &LookupKey::Hostname(hostname)).await
    }

    pub async fn fetch_by_resource_id(
        &self,
        when: DateTime<Utc>,
        arn_id: &str,
    ) -> Result<Vec<CloudAssetDetails>> {
        let arn_id = required("resource", arn_id)?;

        self.fetch(when, &LookupKey::ArnId(arn_id)).await
    }

    pub async fn fetch_all(&self, _when: DateTime<Utc>) -> Result<Vec<CloudAssetDetails>> {
        Err(StoreError::NotAvailable("fetch all"))
    }

    async fn fetch(&self, when: DateTime<Utc>, key: &LookupKey) -> Result<Vec<CloudAssetDetails>> {
        let rows = self.engine.find(when, key).await?;

        self.details(when, rows).await
    }

    /// Joins owners and related resources into the aggregated rows.
    async fn details(&self, when: DateTime<Utc>, rows: Vec<AssetRow>) -> Result<Vec<CloudAssetDetails>> {
        let mut assets = aggregate(rows)?;
        let mut owners: HashMap<String, Option<AccountOwner>> = HashMap::new();

        for asset in assets.iter_mut() {
            let owner = match owners.get(&asset.account_id) {
                Some(owner) => owner.clone(),
                None => {
                    let mut owner = self.engine.account_owner(&asset.account_id).await?;

                    if let Some(owner) = owner.as_mut() {
                        dedup_champions(owner);
                    }

                    owners.insert(asset.account_id.to_owned(), owner.clone());
                    owner
                }
            };

            asset.account_owner = owner;
            asset.related_resources = self
                .engine
                .find_related(when, &asset.arn, &asset.account_id, &asset.region)
                .await?;
        }

        Ok(assets)
    }

    /// Resources whose latest legacy event for the IP at `when` is a join.
    pub async fn legacy_fetch_by_ip(
        &self,
        when: DateTime<Utc>,
        ip: &str,
    ) -> Result<Vec<CloudAssetDetails>> {
        let key = LegacyKey::Ip(parse_ip("ip", ip)?);

        aggregate(self.engine.find_legacy(when, &key).await?)
    }

    pub async fn legacy_fetch_by_hostname(
        &self,
        when: DateTime<Utc>,
        hostname: &str,
    ) -> Result<Vec<CloudAssetDetails>> {
        let key = LegacyKey::Hostname(required("hostname", hostname)?);

        aggregate(self.engine.find_legacy(when, &key).await?)
    }

    pub async fn store_account_owner(&self, owner: &AccountOwner) -> Result<()> {
        required("accountId", &owner.account_id)?;
        required("owner.login", &owner.owner.login)?;

        for champion in owner.champions.iter() {
            required("champions.login", &champion.login)?;
        }

        self.engine.store_account_owner(owner).await
    }

    pub async fn account_owner(&self, account: &str) -> Result<Option<AccountOwner>> {
        let mut owner = self.engine.account_owner(account).await?;

        if let Some(owner) = owner.as_mut() {
            dedup_champions(owner);
        }

        Ok(owner)
    }

    /// Creates the partition starting at `begin`, or the one following the
    /// latest partition when `begin` is `None`.
    pub async fn generate_partition(
        &self,
        begin: Option<DateTime<Utc>>,
        days: u32,
    ) -> Result<Option<Partition>> {
        self.engine.generate_partition(begin, days, self.now()).await
    }

    pub async fn partitions(&self) -> Result<Vec<Partition>> {
        self.engine.partitions().await
    }

    pub async fn delete_partition(&self, name: &str) -> Result<()> {
        partition::validate_name(name)?;

        self.engine.delete_partition(name).await
    }

    /// Deletes the partitions that ended more than `ttl_days` ago.
    pub async fn drop_expired_partitions(&self, ttl_days: u32) -> Result<Vec<String>> {
        let cutoff = self.now() - Duration::days(i64::from(ttl_days));
        let mut dropped = Vec::new();

        for partition in self.partitions().await? {
            if partition.end < cutoff {
                self.engine.delete_partition(&partition.name).await?;
                dropped.push(partition.name);
            }
        }

        Ok(dropped)
    }

    /// Replays legacy events of `[from, to]` into the new schema, oldest first.
    pub async fn back_fill(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<usize> {
        if from > to {
            return Err(StoreError::invalid_input(
                "from",
                format!("`{from}` is after `{to}`"),
            ));
        }

        let events = self.engine.read_legacy_events(from, to).await?;
        let count = events.len();

        for event in events {
            let changes = CloudAssetChanges::try_from(event)?;
            self.engine.ingest(&IngestPlan::new(&changes)).await?;
        }

        Ok(count)
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(StoreError::invalid_input(field, "must not be empty"));
    }

    Ok(value.to_owned())
}
