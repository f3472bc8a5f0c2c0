//! Lookup indexes. Reads switch to the new schema from this version on.

use sea_query::{Index, IndexCreateStatement};

use super::{
    drop_index,
    schema::{AwsPrivateIpAssignment, AwsPublicIpAssignment, AwsResource},
    SqlOperation,
};

postgres_migration!(
    M0004,
    crate::READS_FROM_NEW_SCHEMA_VERSION,
    "lookup_indexes",
    [
        SqlOperation::schema(
            create_private_ip_idx(),
            drop_index("idx_aws_private_ip_assignment_ip_interval")
        ),
        SqlOperation::schema(
            create_public_ip_idx(),
            drop_index("idx_aws_public_ip_assignment_ip_interval")
        ),
        SqlOperation::schema(
            create_hostname_idx(),
            drop_index("idx_aws_public_ip_assignment_hostname_interval")
        ),
        SqlOperation::schema(create_arn_id_idx(), drop_index("idx_aws_resource_arn_id")),
    ]
);

fn create_private_ip_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_aws_private_ip_assignment_ip_interval")
        .table(AwsPrivateIpAssignment::Table)
        .col(AwsPrivateIpAssignment::PrivateIp)
        .col(AwsPrivateIpAssignment::NotBefore)
        .col(AwsPrivateIpAssignment::NotAfter)
        .to_owned()
}

fn create_public_ip_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_aws_public_ip_assignment_ip_interval")
        .table(AwsPublicIpAssignment::Table)
        .col(AwsPublicIpAssignment::PublicIp)
        .col(AwsPublicIpAssignment::NotBefore)
        .col(AwsPublicIpAssignment::NotAfter)
        .to_owned()
}

fn create_hostname_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_aws_public_ip_assignment_hostname_interval")
        .table(AwsPublicIpAssignment::Table)
        .col(AwsPublicIpAssignment::AwsHostname)
        .col(AwsPublicIpAssignment::NotBefore)
        .col(AwsPublicIpAssignment::NotAfter)
        .to_owned()
}

fn create_arn_id_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_aws_resource_arn_id")
        .table(AwsResource::Table)
        .col(AwsResource::ArnId)
        .to_owned()
}
