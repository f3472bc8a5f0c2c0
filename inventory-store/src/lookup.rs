use std::{collections::BTreeMap, net::IpAddr};

use anyhow::anyhow;
use serde_json::Value;

use crate::{
    error::Result,
    ip::is_private,
    model::{tags_from_meta, AccountOwner, CloudAssetDetails, Person},
};

/// What a lookup matches bindings on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    PrivateIp(IpAddr),
    PublicIp(IpAddr),
    Hostname(String),
    ArnId(String),
}

impl LookupKey {
    /// Picks the private or public relation from the address range.
    pub fn ip(ip: IpAddr) -> Self {
        if is_private(&ip) {
            LookupKey::PrivateIp(ip)
        } else {
            LookupKey::PublicIp(ip)
        }
    }
}

/// One matching binding joined with the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "pg", derive(sqlx::FromRow))]
pub struct AssetRow {
    pub arn: String,
    pub account: String,
    pub region: String,
    pub resource_type: String,
    pub meta: Option<Value>,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
    pub hostname: Option<String>,
}

/// Merges rows into one record per resource, sorted by ARN. IPs and
/// hostnames are deduplicated case-insensitively in first-seen order.
pub fn aggregate(rows: Vec<AssetRow>) -> Result<Vec<CloudAssetDetails>> {
    let mut assets: BTreeMap<(String, String, String), CloudAssetDetails> = BTreeMap::new();

    for row in rows {
        let key = (row.arn.clone(), row.account.clone(), row.region.clone());

        let asset = match assets.entry(key) {
            std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(CloudAssetDetails {
                    resource_type: row.resource_type,
                    account_id: row.account,
                    region: row.region,
                    arn: row.arn,
                    tags: tags_from_meta(row.meta)?,
                    ..CloudAssetDetails::default()
                })
            }
        };

        if let Some(ip) = row.private_ip {
            push_ip(&mut asset.private_ip_addresses, &ip)?;
        }

        if let Some(ip) = row.public_ip {
            push_ip(&mut asset.public_ip_addresses, &ip)?;
        }

        if let Some(hostname) = row.hostname {
            if !asset
                .hostnames
                .iter()
                .any(|h| h.eq_ignore_ascii_case(&hostname))
            {
                asset.hostnames.push(hostname);
            }
        }
    }

    Ok(assets.into_values().collect())
}

fn push_ip(ips: &mut Vec<IpAddr>, value: &str) -> Result<()> {
    let ip = value
        .parse::<IpAddr>()
        .map_err(|err| anyhow!("stored address `{value}` is invalid: {err}"))?;

    if !ips.contains(&ip) {
        ips.push(ip);
    }

    Ok(())
}

/// Drops repeated champions, comparing emails case-insensitively.
pub fn dedup_champions(owner: &mut AccountOwner) {
    let mut seen: Vec<Person> = Vec::with_capacity(owner.champions.len());

    for champion in owner.champions.drain(..) {
        if !seen
            .iter()
            .any(|p| p.email.eq_ignore_ascii_case(&champion.email))
        {
            seen.push(champion);
        }
    }

    owner.champions = seen;
}
