use std::{
    collections::{BTreeMap, HashMap},
    net::IpAddr,
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{
    binding::{self, Interval},
    engine::Engine,
    error::{Result, StoreError},
    ingest::{Binding, IngestPlan},
    legacy::{latest_joins, legacy_writes, LegacyEvent, LegacyKey},
    lookup::{AssetRow, LookupKey},
    model::{AccountOwner, ChangeType, CloudAssetChanges, Person, Tags},
    partition::{self, Partition},
    store::Store,
};

/// Append-only id dictionary. Ids start at 1.
#[derive(Debug, Clone, Default)]
struct Dictionary(Vec<String>);

impl Dictionary {
    fn ensure(&mut self, value: &str) -> i64 {
        let index = match self.0.iter().position(|v| v == value) {
            Some(index) => index,
            None => {
                self.0.push(value.to_owned());
                self.0.len() - 1
            }
        };

        index as i64 + 1
    }

    fn id(&self, value: &str) -> Option<i64> {
        self.0
            .iter()
            .position(|v| v == value)
            .map(|index| index as i64 + 1)
    }

    fn value(&self, id: i64) -> String {
        usize::try_from(id - 1)
            .ok()
            .and_then(|index| self.0.get(index))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct Resource {
    arn_id: String,
    account_id: i64,
    region_id: i64,
    resource_type_id: i64,
    tags: Tags,
}

#[derive(Debug, Clone)]
struct LegacyResource {
    account: String,
    region: String,
    resource_type: String,
    tags: Tags,
}

#[derive(Debug, Clone)]
struct LegacyRow {
    ts: DateTime<Utc>,
    is_public: bool,
    is_join: bool,
    arn: String,
    ip: IpAddr,
    hostname: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    accounts: Dictionary,
    regions: Dictionary,
    resource_types: Dictionary,
    resources: Vec<Resource>,
    private_ips: BTreeMap<(i64, IpAddr), Vec<Interval>>,
    public_ips: BTreeMap<(i64, IpAddr, String), Vec<Interval>>,
    relationships: BTreeMap<(i64, String), Vec<Interval>>,
    persons: BTreeMap<String, Person>,
    owners: HashMap<i64, String>,
    champions: HashMap<i64, Vec<String>>,
    legacy_resources: HashMap<String, LegacyResource>,
    legacy_events: Vec<LegacyRow>,
    partitions: Vec<Partition>,
}

impl State {
    fn ensure_resource(&mut self, plan: &IngestPlan) -> i64 {
        let account_id = self.accounts.ensure(&plan.resource.account);
        let region_id = self.regions.ensure(&plan.resource.region);
        let resource_type_id = self.resource_types.ensure(&plan.resource.resource_type);

        let existing = self.resources.iter().position(|r| {
            r.arn_id == plan.resource.arn_id
                && r.account_id == account_id
                && r.region_id == region_id
        });

        let index = match existing {
            Some(index) => {
                self.resources[index].tags = plan.resource.tags.clone();
                index
            }
            None => {
                self.resources.push(Resource {
                    arn_id: plan.resource.arn_id.to_owned(),
                    account_id,
                    region_id,
                    resource_type_id,
                    tags: plan.resource.tags.clone(),
                });
                self.resources.len() - 1
            }
        };

        index as i64 + 1
    }

    fn resource(&self, id: i64) -> Option<&Resource> {
        usize::try_from(id - 1)
            .ok()
            .and_then(|index| self.resources.get(index))
    }

    fn asset_row(&self, id: i64) -> Result<AssetRow> {
        let resource = self
            .resource(id)
            .ok_or_else(|| anyhow::anyhow!("binding references unknown resource {id}"))?;

        Ok(AssetRow {
            arn: resource.arn_id.to_owned(),
            account: self.accounts.value(resource.account_id),
            region: self.regions.value(resource.region_id),
            resource_type: self.resource_types.value(resource.resource_type_id),
            meta: Some(serde_json::to_value(&resource.tags)?),
            ..AssetRow::default()
        })
    }

    fn upsert_person(&mut self, person: &Person) {
        self.persons.insert(person.login.to_owned(), person.clone());
    }

    fn partition_count(&self, partition: &Partition) -> i64 {
        let range = partition.range();

        self.legacy_events
            .iter()
            .filter(|event| range.contains(event.ts))
            .count() as i64
    }

    fn legacy_event(&self, row: &LegacyRow) -> LegacyEvent {
        let resource = self.legacy_resources.get(&row.arn);

        LegacyEvent {
            ts: row.ts,
            arn: row.arn.to_owned(),
            resource_type: resource.map(|r| r.resource_type.to_owned()).unwrap_or_default(),
            region: resource.map(|r| r.region.to_owned()).unwrap_or_default(),
            account: resource.map(|r| r.account.to_owned()).unwrap_or_default(),
            meta: resource.and_then(|r| serde_json::to_value(&r.tags).ok()),
            ip: row.ip.to_string(),
            hostname: row.hostname.clone(),
            is_join: row.is_join,
            is_public: row.is_public,
        }
    }
}

fn apply(rows: &mut Vec<Interval>, change_type: ChangeType, when: DateTime<Utc>) -> bool {
    match change_type {
        ChangeType::Added => binding::assign(rows, when),
        ChangeType::Deleted => binding::release(rows, when),
    }
}

fn covering<'a, K: 'a>(
    groups: impl Iterator<Item = (&'a K, &'a Vec<Interval>)>,
    when: DateTime<Utc>,
) -> impl Iterator<Item = &'a K> {
    groups
        .filter(move |(_, rows)| rows.iter().any(|row| row.covers(when)))
        .map(|(key, _)| key)
}

/// In-process engine. Each write holds the state lock for its whole run and
/// only fails before its first mutation, so a failed write leaves nothing
/// behind.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Arc<RwLock<State>>);

impl MemoryStore {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> Store {
        Store::new(Self::default())
    }

    fn write<T>(&self, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        f(&mut self.0.write())
    }
}

#[async_trait]
impl Engine for MemoryStore {
    async fn ingest(&self, plan: &IngestPlan) -> Result<()> {
        self.write(|state| {
            let resource_id = state.ensure_resource(plan);

            for op in plan.ops.iter() {
                let rows = match &op.binding {
                    Binding::PrivateIp(ip) => {
                        state.private_ips.entry((resource_id, *ip)).or_default()
                    }
                    Binding::PublicIp { ip, hostname } => state
                        .public_ips
                        .entry((resource_id, *ip, hostname.to_owned()))
                        .or_default(),
                    Binding::Relationship(related) => state
                        .relationships
                        .entry((resource_id, related.to_owned()))
                        .or_default(),
                };

                apply(rows, op.change_type, plan.when);
            }

            Ok(())
        })
    }

    async fn ingest_legacy(&self, changes: &CloudAssetChanges) -> Result<()> {
        self.write(|state| {
            state
                .legacy_resources
                .entry(changes.arn.to_owned())
                .or_insert_with(|| LegacyResource {
                    account: changes.account_id.to_owned(),
                    region: changes.region.to_owned(),
                    resource_type: changes.resource_type.to_owned(),
                    tags: changes.tags.clone(),
                });

            for write in legacy_writes(changes) {
                state.legacy_events.push(LegacyRow {
                    ts: write.ts,
                    is_public: write.is_public,
                    is_join: write.is_join,
                    arn: changes.arn.to_owned(),
                    ip: write.ip,
                    hostname: write.hostname,
                });
            }

            Ok(())
        })
    }

    async fn find(&self, when: DateTime<Utc>, key: &LookupKey) -> Result<Vec<AssetRow>> {
        let state = self.0.read();
        let mut rows = Vec::new();

        let private = covering(state.private_ips.iter(), when).filter(|(id, ip)| match key {
            LookupKey::PrivateIp(key) => ip == key,
            LookupKey::ArnId(arn_id) => state.resource(*id).is_some_and(|r| &r.arn_id == arn_id),
            _ => false,
        });

        for (id, ip) in private {
            rows.push(AssetRow {
                private_ip: Some(ip.to_string()),
                ..state.asset_row(*id)?
            });
        }

        let public = covering(state.public_ips.iter(), when).filter(|(id, ip, hostname)| match key {
            LookupKey::PublicIp(key) => ip == key,
            LookupKey::Hostname(key) => hostname == key,
            LookupKey::ArnId(arn_id) => state.resource(*id).is_some_and(|r| &r.arn_id == arn_id),
            LookupKey::PrivateIp(_) => false,
        });

        for (id, ip, hostname) in public {
            rows.push(AssetRow {
                public_ip: Some(ip.to_string()),
                hostname: Some(hostname.to_owned()),
                ..state.asset_row(*id)?
            });
        }

        Ok(rows)
    }

    async fn find_related(
        &self,
        when: DateTime<Utc>,
        arn_id: &str,
        account: &str,
        region: &str,
    ) -> Result<Vec<String>> {
        let state = self.0.read();

        let (Some(account_id), Some(region_id)) =
            (state.accounts.id(account), state.regions.id(region))
        else {
            return Ok(vec![]);
        };

        let related = covering(state.relationships.iter(), when)
            .filter(|(id, _)| {
                state.resource(*id).is_some_and(|r| {
                    r.arn_id == arn_id && r.account_id == account_id && r.region_id == region_id
                })
            })
            .map(|(_, related)| related.to_owned())
            .collect();

        Ok(related)
    }

    async fn find_legacy(&self, when: DateTime<Utc>, key: &LegacyKey) -> Result<Vec<AssetRow>> {
        let state = self.0.read();

        let events: Vec<LegacyEvent> = state
            .legacy_events
            .iter()
            .filter(|row| match key {
                LegacyKey::Ip(ip) => &row.ip == ip,
                LegacyKey::Hostname(hostname) => row.hostname.as_ref() == Some(hostname),
            })
            .map(|row| state.legacy_event(row))
            .collect();

        Ok(latest_joins(&events, when)
            .into_iter()
            .map(LegacyEvent::to_asset_row)
            .collect())
    }

    async fn read_legacy_events(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LegacyEvent>> {
        let state = self.0.read();

        let mut events: Vec<LegacyEvent> = state
            .legacy_events
            .iter()
            .filter(|row| row.ts >= from && row.ts <= to)
            .map(|row| state.legacy_event(row))
            .collect();

        events.sort_by_key(|event| event.ts);

        Ok(events)
    }

    async fn account_owner(&self, account: &str) -> Result<Option<AccountOwner>> {
        let state = self.0.read();

        let Some(account_id) = state.accounts.id(account) else {
            return Ok(None);
        };

        let Some(owner) = state
            .owners
            .get(&account_id)
            .and_then(|login| state.persons.get(login))
        else {
            return Ok(None);
        };

        let champions = state
            .champions
            .get(&account_id)
            .map(|logins| {
                logins
                    .iter()
                    .filter_map(|login| state.persons.get(login).cloned())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(AccountOwner {
            account_id: account.to_owned(),
            owner: owner.clone(),
            champions,
        }))
    }

    async fn store_account_owner(&self, owner: &AccountOwner) -> Result<()> {
        self.write(|state| {
            let account_id = state.accounts.ensure(&owner.account_id);

            state.upsert_person(&owner.owner);
            state
                .owners
                .insert(account_id, owner.owner.login.to_owned());

            let mut logins = Vec::with_capacity(owner.champions.len());

            for champion in owner.champions.iter() {
                state.upsert_person(champion);

                if !logins.contains(&champion.login) {
                    logins.push(champion.login.to_owned());
                }
            }

            logins.sort();
            state.champions.insert(account_id, logins);

            Ok(())
        })
    }

    async fn generate_partition(
        &self,
        begin: Option<DateTime<Utc>>,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<Partition>> {
        self.write(|state| {
            let latest = state
                .partitions
                .iter()
                .max_by_key(|p| p.end)
                .map(Partition::range);

            let Some(range) = partition::plan(begin, days, latest.as_ref(), now)? else {
                return Ok(None);
            };

            let name = range.name();

            if state
                .partitions
                .iter()
                .any(|p| p.name == name || p.range().overlaps(&range))
            {
                return Err(StoreError::PartitionConflict(name));
            }

            let mut partition = Partition {
                name,
                created_at: now,
                begin: range.begin,
                end: range.end,
                count: 0,
            };

            partition.count = state.partition_count(&partition);
            state.partitions.push(partition.clone());

            Ok(Some(partition))
        })
    }

    async fn partitions(&self) -> Result<Vec<Partition>> {
        let state = self.0.read();

        let mut partitions: Vec<Partition> = state
            .partitions
            .iter()
            .map(|p| Partition {
                count: state.partition_count(p),
                ..p.clone()
            })
            .collect();

        partitions.sort_by(|a, b| b.end.cmp(&a.end));

        Ok(partitions)
    }

    async fn delete_partition(&self, name: &str) -> Result<()> {
        self.write(|state| {
            let Some(index) = state.partitions.iter().position(|p| p.name == name) else {
                return Err(StoreError::NotFoundPartition(name.to_owned()));
            };

            let range = state.partitions.remove(index).range();
            state.legacy_events.retain(|event| !range.contains(event.ts));

            Ok(())
        })
    }
}
