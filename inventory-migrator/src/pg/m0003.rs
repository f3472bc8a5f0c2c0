//! Resource relationship intervals. From this version on, writes go to both
//! schemas.

use sea_query::{ColumnDef, ForeignKey, Index, IndexCreateStatement, Table, TableCreateStatement};

use super::{
    drop_index, drop_table,
    schema::{AwsResource, AwsResourceRelationship},
    SqlOperation,
};

postgres_migration!(
    M0003,
    crate::DUAL_WRITES_SCHEMA_VERSION,
    "resource_relationship",
    [
        SqlOperation::schema(create_table(), drop_table(AwsResourceRelationship::Table)),
        SqlOperation::schema(
            create_not_before_uk(),
            drop_index("uk_aws_resource_relationship_not_before")
        ),
        SqlOperation::schema(
            create_not_after_uk(),
            drop_index("uk_aws_resource_relationship_not_after")
        ),
        SqlOperation::new(
            "CREATE UNIQUE INDEX IF NOT EXISTS uk_aws_resource_relationship_open \
             ON aws_resource_relationship (aws_resource_id, related_arn_id) \
             WHERE not_after IS NULL",
            "DROP INDEX IF EXISTS uk_aws_resource_relationship_open",
        ),
    ]
);

fn create_table() -> TableCreateStatement {
    Table::create()
        .table(AwsResourceRelationship::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AwsResourceRelationship::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(AwsResourceRelationship::NotBefore)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsResourceRelationship::NotAfter)
                .timestamp_with_time_zone()
                .null(),
        )
        .col(
            ColumnDef::new(AwsResourceRelationship::AwsResourceId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsResourceRelationship::RelatedArnId)
                .text()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(
                    AwsResourceRelationship::Table,
                    AwsResourceRelationship::AwsResourceId,
                )
                .to(AwsResource::Table, AwsResource::Id),
        )
        .to_owned()
}

fn create_not_before_uk() -> IndexCreateStatement {
    Index::create()
        .name("uk_aws_resource_relationship_not_before")
        .table(AwsResourceRelationship::Table)
        .unique()
        .col(AwsResourceRelationship::AwsResourceId)
        .col(AwsResourceRelationship::RelatedArnId)
        .col(AwsResourceRelationship::NotBefore)
        .to_owned()
}

fn create_not_after_uk() -> IndexCreateStatement {
    Index::create()
        .name("uk_aws_resource_relationship_not_after")
        .table(AwsResourceRelationship::Table)
        .unique()
        .col(AwsResourceRelationship::AwsResourceId)
        .col(AwsResourceRelationship::RelatedArnId)
        .col(AwsResourceRelationship::NotAfter)
        .to_owned()
}
