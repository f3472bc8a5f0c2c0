//! Legacy event table: one row per join/leave of an IP (and hostname) on a
//! resource keyed by its full ARN.

use std::net::IpAddr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    error::{Result, StoreError},
    lookup::AssetRow,
    model::{tags_from_meta, ChangeType, CloudAssetChanges, NetworkChanges},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyKey {
    Ip(IpAddr),
    Hostname(String),
}

/// Event row to append for one change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyWrite {
    pub ts: DateTime<Utc>,
    pub is_public: bool,
    pub is_join: bool,
    pub ip: IpAddr,
    pub hostname: Option<String>,
}

/// Private IPs write one event each, public IPs one per hostname.
pub fn legacy_writes(changes: &CloudAssetChanges) -> Vec<LegacyWrite> {
    let mut writes = Vec::new();

    for change in changes.changes.iter() {
        let is_join = change.change_type == ChangeType::Added;

        for ip in change.private_ips.iter() {
            writes.push(LegacyWrite {
                ts: changes.change_time,
                is_public: false,
                is_join,
                ip: *ip,
                hostname: None,
            });
        }

        for ip in change.public_ips.iter() {
            for hostname in change.hostnames.iter() {
                writes.push(LegacyWrite {
                    ts: changes.change_time,
                    is_public: true,
                    is_join,
                    ip: *ip,
                    hostname: Some(hostname.to_owned()),
                });
            }
        }
    }

    writes
}

/// Stored event joined with its resource.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "pg", derive(sqlx::FromRow))]
pub struct LegacyEvent {
    pub ts: DateTime<Utc>,
    pub arn: String,
    pub resource_type: String,
    pub region: String,
    pub account: String,
    pub meta: Option<Value>,
    pub ip: String,
    pub hostname: Option<String>,
    pub is_join: bool,
    pub is_public: bool,
}

impl LegacyEvent {
    pub fn to_asset_row(&self) -> AssetRow {
        let (private_ip, public_ip) = if self.is_public {
            (None, Some(self.ip.to_owned()))
        } else {
            (Some(self.ip.to_owned()), None)
        };

        AssetRow {
            arn: self.arn.to_owned(),
            account: self.account.to_owned(),
            region: self.region.to_owned(),
            resource_type: self.resource_type.to_owned(),
            meta: self.meta.clone(),
            private_ip,
            public_ip,
            hostname: self.hostname.clone(),
        }
    }
}

/// Replays an event as a single-change ingest.
impl TryFrom<LegacyEvent> for CloudAssetChanges {
    type Error = StoreError;

    fn try_from(event: LegacyEvent) -> Result<Self> {
        let ip = event
            .ip
            .parse::<IpAddr>()
            .map_err(|err| anyhow!("stored address `{}` is invalid: {err}", event.ip))?;

        let mut change = NetworkChanges::new(if event.is_join {
            ChangeType::Added
        } else {
            ChangeType::Deleted
        });

        if event.is_public {
            change.public_ips.push(ip);
            change.hostnames.extend(event.hostname);
        } else {
            change.private_ips.push(ip);
        }

        Ok(CloudAssetChanges {
            changes: vec![change],
            change_time: event.ts,
            resource_type: event.resource_type,
            account_id: event.account,
            region: event.region,
            arn: event.arn,
            tags: tags_from_meta(event.meta)?,
        })
    }
}

/// Keeps, per resource, the events at its latest `ts <= when`, and only if
/// they are joins.
pub fn latest_joins<'a>(
    events: impl IntoIterator<Item = &'a LegacyEvent>,
    when: DateTime<Utc>,
) -> Vec<&'a LegacyEvent> {
    let candidates: Vec<&LegacyEvent> = events.into_iter().filter(|e| e.ts <= when).collect();

    candidates
        .iter()
        .filter(|event| {
            let max_ts = candidates
                .iter()
                .filter(|other| other.arn == event.arn)
                .map(|other| other.ts)
                .max();

            max_ts == Some(event.ts) && event.is_join
        })
        .copied()
        .collect()
}
