//! Back-fill scans the legacy events by time.

use sea_query::{Index, IndexCreateStatement};

use super::{drop_index, schema::AwsEventsIpsHostnames, SqlOperation};

postgres_migration!(
    M0005,
    5,
    "events_ts_index",
    [SqlOperation::schema(
        create_ts_idx(),
        drop_index("idx_aws_events_ips_hostnames_ts")
    )]
);

fn create_ts_idx() -> IndexCreateStatement {
    Index::create()
        .name("idx_aws_events_ips_hostnames_ts")
        .table(AwsEventsIpsHostnames::Table)
        .col(AwsEventsIpsHostnames::Ts)
        .to_owned()
}
