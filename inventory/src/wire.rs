//! JSON request and response bodies of the inventory API.
//!
//! Wire types carry strings the way clients send them. They are validated
//! and converted into the store types before any storage call is made.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use inventory_store as store;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{InventoryError, Result};

/// Parses an RFC 3339 instant with optional fractional seconds.
pub fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| InventoryError::invalid_input(field, format!("`{value}`: {e}")))
}

#[allow(clippy::ptr_arg)]
fn ip_addresses(values: &Vec<String>) -> std::result::Result<(), ValidationError> {
    if values.iter().all(|v| v.trim().parse::<std::net::IpAddr>().is_ok()) {
        Ok(())
    } else {
        Err(ValidationError::new("ip_address"))
    }
}

fn change_type(value: &str) -> std::result::Result<(), ValidationError> {
    value
        .parse::<store::ChangeType>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("change_type"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NetworkChanges {
    #[serde(default)]
    #[validate(custom = "ip_addresses")]
    pub private_ip_addresses: Vec<String>,

    #[serde(default)]
    #[validate(custom = "ip_addresses")]
    pub public_ip_addresses: Vec<String>,

    #[serde(default)]
    pub hostnames: Vec<String>,

    #[serde(default)]
    pub related_resources: Vec<String>,

    #[validate(custom = "change_type")]
    pub change_type: String,
}

impl TryFrom<NetworkChanges> for store::NetworkChanges {
    type Error = InventoryError;

    fn try_from(value: NetworkChanges) -> Result<Self> {
        let parse = |field: &str, values: &[String]| {
            values
                .iter()
                .map(|v| store::parse_ip(field, v))
                .collect::<store::Result<Vec<_>>>()
        };

        Ok(Self {
            private_ips: parse("privateIpAddresses", &value.private_ip_addresses)?,
            public_ips: parse("publicIpAddresses", &value.public_ip_addresses)?,
            hostnames: value.hostnames,
            related_resources: value.related_resources,
            change_type: value.change_type.parse()?,
        })
    }
}

/// Change event of one resource as posted by the collectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CloudAssetChanges {
    #[serde(default)]
    #[validate]
    pub changes: Vec<NetworkChanges>,

    pub change_time: String,

    #[validate(length(min = 1))]
    pub resource_type: String,

    #[validate(length(min = 1))]
    pub account_id: String,

    #[validate(length(min = 1))]
    pub region: String,

    /// Full ARN of the resource.
    #[validate(length(min = 1))]
    pub resource_id: String,

    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl TryFrom<CloudAssetChanges> for store::CloudAssetChanges {
    type Error = InventoryError;

    fn try_from(value: CloudAssetChanges) -> Result<Self> {
        let change_time = parse_time("changeTime", &value.change_time)?;
        value.validate()?;

        Ok(Self {
            changes: value
                .changes
                .into_iter()
                .map(store::NetworkChanges::try_from)
                .collect::<Result<_>>()?,
            change_time,
            resource_type: value.resource_type,
            account_id: value.account_id,
            region: value.region,
            arn: value.resource_id,
            tags: value.tags,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Person {
    pub name: String,
    #[validate(length(min = 1))]
    pub login: String,
    pub email: String,
    pub valid: bool,
}

impl From<Person> for store::Person {
    fn from(value: Person) -> Self {
        Self {
            name: value.name,
            login: value.login,
            email: value.email,
            valid: value.valid,
        }
    }
}

impl From<store::Person> for Person {
    fn from(value: store::Person) -> Self {
        Self {
            name: value.name,
            login: value.login,
            email: value.email,
            valid: value.valid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccountOwner {
    #[validate(length(min = 1))]
    pub account_id: String,

    #[validate]
    pub owner: Person,

    #[serde(default)]
    #[validate]
    pub champions: Vec<Person>,
}

impl TryFrom<AccountOwner> for store::AccountOwner {
    type Error = InventoryError;

    fn try_from(value: AccountOwner) -> Result<Self> {
        value.validate()?;

        Ok(Self {
            account_id: value.account_id,
            owner: value.owner.into(),
            champions: value.champions.into_iter().map(Into::into).collect(),
        })
    }
}

impl From<store::AccountOwner> for AccountOwner {
    fn from(value: store::AccountOwner) -> Self {
        Self {
            account_id: value.account_id,
            owner: value.owner.into(),
            champions: value.champions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAssetDetails {
    pub private_ip_addresses: Vec<String>,
    pub public_ip_addresses: Vec<String>,
    pub hostnames: Vec<String>,
    pub resource_type: String,
    pub account_id: String,
    pub region: String,
    pub arn: String,
    pub tags: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_owner: Option<AccountOwner>,

    #[serde(default)]
    pub related_resources: Vec<String>,
}

impl From<store::CloudAssetDetails> for CloudAssetDetails {
    fn from(value: store::CloudAssetDetails) -> Self {
        Self {
            private_ip_addresses: value
                .private_ip_addresses
                .iter()
                .map(ToString::to_string)
                .collect(),
            public_ip_addresses: value
                .public_ip_addresses
                .iter()
                .map(ToString::to_string)
                .collect(),
            hostnames: value.hostnames,
            resource_type: value.resource_type,
            account_id: value.account_id,
            region: value.region,
            arn: value.arn,
            tags: value.tags,
            account_owner: value.account_owner.map(Into::into),
            related_resources: value.related_resources,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudAssets {
    pub assets: Vec<CloudAssetDetails>,
}

impl CloudAssets {
    /// Lookup answer of the API, which treats an empty result as not found.
    pub fn require_non_empty(assets: Vec<store::CloudAssetDetails>, id: &str) -> Result<Self> {
        if assets.is_empty() {
            return Err(InventoryError::NotFound { id: id.to_owned() });
        }

        Ok(Self {
            assets: assets.into_iter().map(Into::into).collect(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FetchByIpParameters {
    #[validate(length(min = 1))]
    pub ip_address: String,
    pub time: String,
}

impl FetchByIpParameters {
    pub fn when(&self) -> Result<DateTime<Utc>> {
        let when = parse_time("time", &self.time)?;
        self.validate()?;

        Ok(when)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FetchByHostnameParameters {
    #[validate(length(min = 1))]
    pub hostname: String,
    pub time: String,
}

impl FetchByHostnameParameters {
    pub fn when(&self) -> Result<DateTime<Utc>> {
        let when = parse_time("time", &self.time)?;
        self.validate()?;

        Ok(when)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FetchByResourceIdParameters {
    #[validate(length(min = 1))]
    pub resource_id: String,
    pub time: String,
}

impl FetchByResourceIdParameters {
    pub fn when(&self) -> Result<DateTime<Utc>> {
        let when = parse_time("time", &self.time)?;
        self.validate()?;

        Ok(when)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackFillEvents {
    pub from: String,
    pub to: String,
}

impl BackFillEvents {
    pub fn range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let from = parse_time("from", &self.from)?;
        let to = parse_time("to", &self.to)?;

        if from > to {
            return Err(InventoryError::invalid_input(
                "from, to",
                "invalid time range",
            ));
        }

        Ok((from, to))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub version: u32,
    pub dirty: bool,
}

impl From<inventory_migrator::SchemaVersion> for SchemaVersion {
    fn from(value: inventory_migrator::SchemaVersion) -> Self {
        Self {
            version: value.version,
            dirty: value.dirty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ForceSchema {
    pub version: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePartition {
    #[serde(default)]
    pub begin: Option<DateTime<Utc>>,
    #[serde(default)]
    pub days: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletePartition {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: i64,
}

impl From<store::Partition> for Partition {
    fn from(value: store::Partition) -> Self {
        Self {
            name: value.name,
            created_at: value.created_at,
            begin: value.begin,
            end: value.end,
            count: value.count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitions {
    pub results: Vec<Partition>,
}

impl From<Vec<store::Partition>> for Partitions {
    fn from(value: Vec<store::Partition>) -> Self {
        Self {
            results: value.into_iter().map(Into::into).collect(),
        }
    }
}
