use std::{collections::HashMap, fmt, net::IpAddr, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Free form key/value metadata of a resource.
pub type Tags = HashMap<String, String>;

/// Decodes a stored `meta` column. A missing or null value is an empty map.
pub fn tags_from_meta(meta: Option<Value>) -> Result<Tags> {
    match meta {
        None | Some(Value::Null) => Ok(Tags::new()),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Deleted,
}

impl FromStr for ChangeType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("ADDED") {
            Ok(ChangeType::Added)
        } else if s.eq_ignore_ascii_case("DELETED") {
            Ok(ChangeType::Deleted)
        } else {
            Err(StoreError::invalid_input(
                "changeType",
                format!("unknown change type `{s}`"),
            ))
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Added => f.write_str("ADDED"),
            ChangeType::Deleted => f.write_str("DELETED"),
        }
    }
}

/// One block of network changes sharing a change type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkChanges {
    pub private_ips: Vec<IpAddr>,
    pub public_ips: Vec<IpAddr>,
    pub hostnames: Vec<String>,
    pub related_resources: Vec<String>,
    pub change_type: ChangeType,
}

impl NetworkChanges {
    pub fn new(change_type: ChangeType) -> Self {
        Self {
            private_ips: Vec::new(),
            public_ips: Vec::new(),
            hostnames: Vec::new(),
            related_resources: Vec::new(),
            change_type,
        }
    }

    /// Public IPs are only recorded together with a hostname.
    pub fn has_unbound_public_ips(&self) -> bool {
        !self.public_ips.is_empty() && self.hostnames.is_empty()
    }
}

/// A change event for one resource, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudAssetChanges {
    pub changes: Vec<NetworkChanges>,
    pub change_time: DateTime<Utc>,
    pub resource_type: String,
    pub account_id: String,
    pub region: String,
    pub arn: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "pg", derive(sqlx::FromRow))]
pub struct Person {
    pub name: String,
    pub login: String,
    pub email: String,
    pub valid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountOwner {
    pub account_id: String,
    pub owner: Person,
    pub champions: Vec<Person>,
}

/// State of one resource at the queried instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloudAssetDetails {
    pub private_ip_addresses: Vec<IpAddr>,
    pub public_ip_addresses: Vec<IpAddr>,
    pub hostnames: Vec<String>,
    pub resource_type: String,
    pub account_id: String,
    pub region: String,
    pub arn: String,
    pub tags: Tags,
    pub account_owner: Option<AccountOwner>,
    pub related_resources: Vec<String>,
}
