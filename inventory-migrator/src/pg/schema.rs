//! Table and column identifiers shared by the migrations and the PostgreSQL
//! storage engine.

use sea_query::Iden;

/// Legacy resource table keyed by the full ARN.
#[derive(Iden, Clone, Copy)]
pub enum AwsResources {
    Table,
    Id,
    AccountId,
    Region,
    Type,
    Meta,
}

#[derive(Iden, Clone, Copy)]
pub enum AwsIps {
    Table,
    Ip,
}

#[derive(Iden, Clone, Copy)]
pub enum AwsHostnames {
    Table,
    Hostname,
}

/// Legacy event table, range partitioned on `ts`.
#[derive(Iden, Clone, Copy)]
pub enum AwsEventsIpsHostnames {
    Table,
    Ts,
    IsPublic,
    IsJoin,
    AwsResourcesId,
    AwsIpsIp,
    AwsHostnamesHostname,
}

/// Registry of the explicit partitions of [`AwsEventsIpsHostnames`].
#[derive(Iden, Clone, Copy)]
pub enum Partitions {
    Table,
    Name,
    CreatedAt,
    PartitionBegin,
    PartitionEnd,
}

#[derive(Iden, Clone, Copy)]
pub enum AwsRegion {
    Table,
    Id,
    Region,
}

#[derive(Iden, Clone, Copy)]
pub enum AwsAccount {
    Table,
    Id,
    Account,
}

#[derive(Iden, Clone, Copy)]
pub enum AwsResourceType {
    Table,
    Id,
    ResourceType,
}

#[derive(Iden, Clone, Copy)]
pub enum AwsResource {
    Table,
    Id,
    ArnId,
    AwsAccountId,
    AwsRegionId,
    AwsResourceTypeId,
    Meta,
}

#[derive(Iden, Clone, Copy)]
pub enum AwsPrivateIpAssignment {
    Table,
    Id,
    NotBefore,
    NotAfter,
    PrivateIp,
    AwsResourceId,
}

#[derive(Iden, Clone, Copy)]
pub enum AwsPublicIpAssignment {
    Table,
    Id,
    NotBefore,
    NotAfter,
    PublicIp,
    AwsHostname,
    AwsResourceId,
}

#[derive(Iden, Clone, Copy)]
pub enum AwsResourceRelationship {
    Table,
    Id,
    NotBefore,
    NotAfter,
    AwsResourceId,
    RelatedArnId,
}

#[derive(Iden, Clone, Copy)]
pub enum Person {
    Table,
    Id,
    Login,
    Email,
    Name,
    Valid,
}

#[derive(Iden, Clone, Copy)]
pub enum AccountOwner {
    Table,
    PersonId,
    AwsAccountId,
}

#[derive(Iden, Clone, Copy)]
pub enum AccountChampion {
    Table,
    PersonId,
    AwsAccountId,
}

/// Version row written by the schema manager.
#[derive(Iden, Clone, Copy)]
pub enum SchemaMigrations {
    Table,
    Version,
    Dirty,
}
