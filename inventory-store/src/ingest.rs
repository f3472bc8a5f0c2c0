use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::{
    arn::res_id_from_arn,
    model::{ChangeType, CloudAssetChanges, Tags},
};

/// Canonical resource identity plus the metadata written on every ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    pub arn_id: String,
    pub account: String,
    pub region: String,
    pub resource_type: String,
    pub tags: Tags,
}

/// Key of one binding relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Binding {
    PrivateIp(IpAddr),
    PublicIp { ip: IpAddr, hostname: String },
    Relationship(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOp {
    pub change_type: ChangeType,
    pub binding: Binding,
}

/// Everything one [`CloudAssetChanges`] writes to the new schema, in the
/// order it is applied inside the ingest transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestPlan {
    pub resource: ResourceSpec,
    pub when: DateTime<Utc>,
    pub ops: Vec<BindingOp>,
}

impl IngestPlan {
    pub fn new(changes: &CloudAssetChanges) -> Self {
        let mut ops = Vec::new();

        for change in changes.changes.iter() {
            let change_type = change.change_type;

            for ip in change.private_ips.iter() {
                ops.push(BindingOp {
                    change_type,
                    binding: Binding::PrivateIp(*ip),
                });
            }

            for ip in change.public_ips.iter() {
                for hostname in change.hostnames.iter() {
                    ops.push(BindingOp {
                        change_type,
                        binding: Binding::PublicIp {
                            ip: *ip,
                            hostname: hostname.to_owned(),
                        },
                    });
                }
            }

            for related in change.related_resources.iter() {
                ops.push(BindingOp {
                    change_type,
                    binding: Binding::Relationship(related.to_owned()),
                });
            }
        }

        Self {
            resource: ResourceSpec {
                arn_id: res_id_from_arn(&changes.arn).to_owned(),
                account: changes.account_id.to_owned(),
                region: changes.region.to_owned(),
                resource_type: changes.resource_type.to_owned(),
                tags: changes.tags.clone(),
            },
            when: changes.change_time,
            ops,
        }
    }
}
