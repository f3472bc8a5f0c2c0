//! Legacy event schema: resources keyed by full ARN and a range partitioned
//! event table with one row per observed IP/hostname change.

use sea_query::{
    Alias, ColumnDef, Expr, Index, IndexCreateStatement, IndexDropStatement, Table,
    TableCreateStatement,
};

use super::{
    drop_table,
    schema::{AwsEventsIpsHostnames, AwsHostnames, AwsIps, AwsResources, Partitions},
    SqlOperation,
};

postgres_migration!(
    M0001,
    crate::MINIMUM_SCHEMA_VERSION,
    "legacy_schema",
    [
        SqlOperation::schema(create_resources(), drop_table(AwsResources::Table)),
        SqlOperation::schema(create_ips(), drop_table(AwsIps::Table)),
        SqlOperation::schema(create_hostnames(), drop_table(AwsHostnames::Table)),
        SqlOperation::schema(create_events(), drop_table(AwsEventsIpsHostnames::Table)),
        SqlOperation::schema(create_events_ip_ts_idx(), drop_events_ip_ts_idx()),
        SqlOperation::new(
            "CREATE TABLE IF NOT EXISTS aws_events_ips_hostnames_default \
             PARTITION OF aws_events_ips_hostnames DEFAULT",
            "DROP TABLE IF EXISTS aws_events_ips_hostnames_default",
        ),
        SqlOperation::schema(create_partitions(), drop_table(Partitions::Table)),
    ]
);

fn create_resources() -> TableCreateStatement {
    Table::create()
        .table(AwsResources::Table)
        .if_not_exists()
        .col(ColumnDef::new(AwsResources::Id).text().not_null().primary_key())
        .col(ColumnDef::new(AwsResources::AccountId).text().not_null())
        .col(ColumnDef::new(AwsResources::Region).text().not_null())
        .col(ColumnDef::new(AwsResources::Type).text().not_null())
        .col(ColumnDef::new(AwsResources::Meta).json_binary().null())
        .to_owned()
}

fn create_ips() -> TableCreateStatement {
    Table::create()
        .table(AwsIps::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AwsIps::Ip)
                .custom(Alias::new("inet"))
                .not_null()
                .primary_key(),
        )
        .to_owned()
}

fn create_hostnames() -> TableCreateStatement {
    Table::create()
        .table(AwsHostnames::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AwsHostnames::Hostname)
                .text()
                .not_null()
                .primary_key(),
        )
        .to_owned()
}

fn create_events() -> TableCreateStatement {
    Table::create()
        .table(AwsEventsIpsHostnames::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AwsEventsIpsHostnames::Ts)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsEventsIpsHostnames::IsPublic)
                .boolean()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsEventsIpsHostnames::IsJoin)
                .boolean()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsEventsIpsHostnames::AwsResourcesId)
                .text()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsEventsIpsHostnames::AwsIpsIp)
                .custom(Alias::new("inet"))
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsEventsIpsHostnames::AwsHostnamesHostname)
                .text()
                .null(),
        )
        .extra("PARTITION BY RANGE (ts)")
        .to_owned()
}

fn create_events_ip_ts_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_aws_events_ips_hostnames_ip_ts")
        .table(AwsEventsIpsHostnames::Table)
        .col(AwsEventsIpsHostnames::AwsIpsIp)
        .col(AwsEventsIpsHostnames::Ts)
        .to_owned()
}

fn drop_events_ip_ts_idx() -> IndexDropStatement {
    Index::drop()
        .name("idx_aws_events_ips_hostnames_ip_ts")
        .table(AwsEventsIpsHostnames::Table)
        .to_owned()
}

fn create_partitions() -> TableCreateStatement {
    Table::create()
        .table(Partitions::Table)
        .if_not_exists()
        .col(ColumnDef::new(Partitions::Name).text().not_null().primary_key())
        .col(
            ColumnDef::new(Partitions::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(
            ColumnDef::new(Partitions::PartitionBegin)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Partitions::PartitionEnd)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned()
}
