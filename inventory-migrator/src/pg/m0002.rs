//! Canonical catalog, IP assignment intervals and account ownership.

use sea_query::{
    Alias, ColumnDef, Expr, ForeignKey, Iden, Index, IndexCreateStatement, Table,
    TableCreateStatement,
};

use super::{
    drop_index, drop_table,
    schema::{
        AccountChampion, AccountOwner, AwsAccount, AwsPrivateIpAssignment, AwsPublicIpAssignment,
        AwsRegion, AwsResource, AwsResourceType, Person,
    },
    SqlOperation,
};

postgres_migration!(
    M0002,
    crate::M1_SCHEMA_VERSION,
    "catalog_and_bindings",
    [
        SqlOperation::schema(
            create_dictionary(AwsRegion::Table, AwsRegion::Id, AwsRegion::Region),
            drop_table(AwsRegion::Table)
        ),
        SqlOperation::schema(
            create_dictionary(AwsAccount::Table, AwsAccount::Id, AwsAccount::Account),
            drop_table(AwsAccount::Table)
        ),
        SqlOperation::schema(
            create_dictionary(
                AwsResourceType::Table,
                AwsResourceType::Id,
                AwsResourceType::ResourceType
            ),
            drop_table(AwsResourceType::Table)
        ),
        SqlOperation::schema(create_resource(), drop_table(AwsResource::Table)),
        SqlOperation::schema(create_resource_uk(), drop_index("uk_aws_resource_arn_account_region")),
        SqlOperation::schema(create_private_ip(), drop_table(AwsPrivateIpAssignment::Table)),
        SqlOperation::schema(
            create_private_ip_not_before_uk(),
            drop_index("uk_aws_private_ip_assignment_not_before")
        ),
        SqlOperation::schema(
            create_private_ip_not_after_uk(),
            drop_index("uk_aws_private_ip_assignment_not_after")
        ),
        SqlOperation::new(
            "CREATE UNIQUE INDEX IF NOT EXISTS uk_aws_private_ip_assignment_open \
             ON aws_private_ip_assignment (private_ip, aws_resource_id) \
             WHERE not_after IS NULL",
            "DROP INDEX IF EXISTS uk_aws_private_ip_assignment_open",
        ),
        SqlOperation::schema(create_public_ip(), drop_table(AwsPublicIpAssignment::Table)),
        SqlOperation::schema(
            create_public_ip_not_before_uk(),
            drop_index("uk_aws_public_ip_assignment_not_before")
        ),
        SqlOperation::schema(
            create_public_ip_not_after_uk(),
            drop_index("uk_aws_public_ip_assignment_not_after")
        ),
        SqlOperation::new(
            "CREATE UNIQUE INDEX IF NOT EXISTS uk_aws_public_ip_assignment_open \
             ON aws_public_ip_assignment (public_ip, aws_hostname, aws_resource_id) \
             WHERE not_after IS NULL",
            "DROP INDEX IF EXISTS uk_aws_public_ip_assignment_open",
        ),
        SqlOperation::schema(create_person(), drop_table(Person::Table)),
        SqlOperation::schema(create_account_owner(), drop_table(AccountOwner::Table)),
        SqlOperation::schema(create_account_champion(), drop_table(AccountChampion::Table)),
    ]
);

/// Append-only `(id, value)` table with a unique value.
fn create_dictionary<T, I, V>(table: T, id: I, value: V) -> TableCreateStatement
where
    T: Iden + 'static,
    I: Iden + 'static,
    V: Iden + 'static,
{
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(value).text().not_null().unique_key())
        .to_owned()
}

fn create_resource() -> TableCreateStatement {
    Table::create()
        .table(AwsResource::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AwsResource::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(AwsResource::ArnId).text().not_null())
        .col(ColumnDef::new(AwsResource::AwsAccountId).big_integer().not_null())
        .col(ColumnDef::new(AwsResource::AwsRegionId).big_integer().not_null())
        .col(
            ColumnDef::new(AwsResource::AwsResourceTypeId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsResource::Meta)
                .json_binary()
                .not_null()
                .default(Expr::cust("'{}'::jsonb")),
        )
        .foreign_key(
            ForeignKey::create()
                .from(AwsResource::Table, AwsResource::AwsAccountId)
                .to(AwsAccount::Table, AwsAccount::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .from(AwsResource::Table, AwsResource::AwsRegionId)
                .to(AwsRegion::Table, AwsRegion::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .from(AwsResource::Table, AwsResource::AwsResourceTypeId)
                .to(AwsResourceType::Table, AwsResourceType::Id),
        )
        .to_owned()
}

fn create_resource_uk() -> IndexCreateStatement {
    Index::create()
        .name("uk_aws_resource_arn_account_region")
        .table(AwsResource::Table)
        .unique()
        .col(AwsResource::ArnId)
        .col(AwsResource::AwsAccountId)
        .col(AwsResource::AwsRegionId)
        .to_owned()
}

fn create_private_ip() -> TableCreateStatement {
    Table::create()
        .table(AwsPrivateIpAssignment::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AwsPrivateIpAssignment::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(AwsPrivateIpAssignment::NotBefore)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsPrivateIpAssignment::NotAfter)
                .timestamp_with_time_zone()
                .null(),
        )
        .col(
            ColumnDef::new(AwsPrivateIpAssignment::PrivateIp)
                .custom(Alias::new("inet"))
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsPrivateIpAssignment::AwsResourceId)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(
                    AwsPrivateIpAssignment::Table,
                    AwsPrivateIpAssignment::AwsResourceId,
                )
                .to(AwsResource::Table, AwsResource::Id),
        )
        .to_owned()
}

fn create_private_ip_not_before_uk() -> IndexCreateStatement {
    Index::create()
        .name("uk_aws_private_ip_assignment_not_before")
        .table(AwsPrivateIpAssignment::Table)
        .unique()
        .col(AwsPrivateIpAssignment::PrivateIp)
        .col(AwsPrivateIpAssignment::AwsResourceId)
        .col(AwsPrivateIpAssignment::NotBefore)
        .to_owned()
}

fn create_private_ip_not_after_uk() -> IndexCreateStatement {
    Index::create()
        .name("uk_aws_private_ip_assignment_not_after")
        .table(AwsPrivateIpAssignment::Table)
        .unique()
        .col(AwsPrivateIpAssignment::PrivateIp)
        .col(AwsPrivateIpAssignment::AwsResourceId)
        .col(AwsPrivateIpAssignment::NotAfter)
        .to_owned()
}

fn create_public_ip() -> TableCreateStatement {
    Table::create()
        .table(AwsPublicIpAssignment::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AwsPublicIpAssignment::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(AwsPublicIpAssignment::NotBefore)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsPublicIpAssignment::NotAfter)
                .timestamp_with_time_zone()
                .null(),
        )
        .col(
            ColumnDef::new(AwsPublicIpAssignment::PublicIp)
                .custom(Alias::new("inet"))
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsPublicIpAssignment::AwsHostname)
                .text()
                .not_null(),
        )
        .col(
            ColumnDef::new(AwsPublicIpAssignment::AwsResourceId)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(
                    AwsPublicIpAssignment::Table,
                    AwsPublicIpAssignment::AwsResourceId,
                )
                .to(AwsResource::Table, AwsResource::Id),
        )
        .to_owned()
}

fn create_public_ip_not_before_uk() -> IndexCreateStatement {
    Index::create()
        .name("uk_aws_public_ip_assignment_not_before")
        .table(AwsPublicIpAssignment::Table)
        .unique()
        .col(AwsPublicIpAssignment::PublicIp)
        .col(AwsPublicIpAssignment::AwsHostname)
        .col(AwsPublicIpAssignment::AwsResourceId)
        .col(AwsPublicIpAssignment::NotBefore)
        .to_owned()
}

fn create_public_ip_not_after_uk() -> IndexCreateStatement {
    Index::create()
        .name("uk_aws_public_ip_assignment_not_after")
        .table(AwsPublicIpAssignment::Table)
        .unique()
        .col(AwsPublicIpAssignment::PublicIp)
        .col(AwsPublicIpAssignment::AwsHostname)
        .col(AwsPublicIpAssignment::AwsResourceId)
        .col(AwsPublicIpAssignment::NotAfter)
        .to_owned()
}

fn create_person() -> TableCreateStatement {
    Table::create()
        .table(Person::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Person::Id)
                .big_integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(Person::Login).text().not_null().unique_key())
        .col(ColumnDef::new(Person::Email).text().not_null())
        .col(ColumnDef::new(Person::Name).text().not_null())
        .col(
            ColumnDef::new(Person::Valid)
                .boolean()
                .not_null()
                .default(true),
        )
        .to_owned()
}

fn create_account_owner() -> TableCreateStatement {
    Table::create()
        .table(AccountOwner::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AccountOwner::AwsAccountId)
                .big_integer()
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(AccountOwner::PersonId).big_integer().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(AccountOwner::Table, AccountOwner::AwsAccountId)
                .to(AwsAccount::Table, AwsAccount::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .from(AccountOwner::Table, AccountOwner::PersonId)
                .to(Person::Table, Person::Id),
        )
        .to_owned()
}

fn create_account_champion() -> TableCreateStatement {
    Table::create()
        .table(AccountChampion::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(AccountChampion::PersonId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(AccountChampion::AwsAccountId)
                .big_integer()
                .not_null(),
        )
        .primary_key(
            Index::create()
                .col(AccountChampion::PersonId)
                .col(AccountChampion::AwsAccountId),
        )
        .foreign_key(
            ForeignKey::create()
                .from(AccountChampion::Table, AccountChampion::AwsAccountId)
                .to(AwsAccount::Table, AwsAccount::Id),
        )
        .foreign_key(
            ForeignKey::create()
                .from(AccountChampion::Table, AccountChampion::PersonId)
                .to(Person::Table, Person::Id),
        )
        .to_owned()
}
