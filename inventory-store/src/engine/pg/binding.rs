use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgArguments, PgQueryResult},
    query::Query,
    PgConnection, Postgres,
};

use super::catalog;
use crate::{
    error::Result,
    ingest::{Binding, IngestPlan},
    model::ChangeType,
};

/// Statements of one binding relation. `$1` is the instant, `$2` the
/// resource id and `$3`/`$4` the key columns.
struct RelationSql {
    assign_upgrade: &'static str,
    assign_insert: &'static str,
    release_close: &'static str,
    release_orphan: &'static str,
}

macro_rules! relation_sql {
    ($table:literal, $columns:literal, $values:literal, $key:literal) => {
        RelationSql {
            assign_upgrade: concat!(
                "UPDATE ", $table, " SET not_before = $1 WHERE id = (",
                "SELECT id FROM ", $table, " WHERE aws_resource_id = $2 AND ", $key,
                " AND not_before = to_timestamp(0) AND not_after > $1",
                " ORDER BY not_after ASC LIMIT 1",
                ") AND NOT EXISTS (",
                "SELECT 1 FROM ", $table, " WHERE aws_resource_id = $2 AND ", $key,
                " AND not_before = $1)"
            ),
            assign_insert: concat!(
                "INSERT INTO ", $table, " (not_before, aws_resource_id, ", $columns, ")",
                " SELECT $1, $2, ", $values, " WHERE NOT EXISTS (",
                "SELECT 1 FROM ", $table, " WHERE aws_resource_id = $2 AND ", $key,
                " AND (not_after IS NULL OR not_before = $1)",
                ") ON CONFLICT DO NOTHING"
            ),
            release_close: concat!(
                "UPDATE ", $table, " SET not_after = $1",
                " WHERE aws_resource_id = $2 AND ", $key,
                " AND not_after IS NULL AND not_before < $1 AND NOT EXISTS (",
                "SELECT 1 FROM ", $table, " WHERE aws_resource_id = $2 AND ", $key,
                " AND not_after = $1)"
            ),
            release_orphan: concat!(
                "INSERT INTO ", $table, " (not_before, not_after, aws_resource_id, ", $columns, ")",
                " SELECT to_timestamp(0), $1, $2, ", $values, " WHERE NOT EXISTS (",
                "SELECT 1 FROM ", $table, " WHERE aws_resource_id = $2 AND ", $key,
                " AND (not_before = to_timestamp(0) OR not_after = $1)",
                ") ON CONFLICT DO NOTHING"
            ),
        }
    };
}

const PRIVATE_IP: RelationSql = relation_sql!(
    "aws_private_ip_assignment",
    "private_ip",
    "$3::inet",
    "private_ip = $3::inet"
);

const PUBLIC_IP: RelationSql = relation_sql!(
    "aws_public_ip_assignment",
    "public_ip, aws_hostname",
    "$3::inet, $4",
    "public_ip = $3::inet AND aws_hostname = $4"
);

const RELATIONSHIP: RelationSql = relation_sql!(
    "aws_resource_relationship",
    "related_arn_id",
    "$3",
    "related_arn_id = $3"
);

fn relation(binding: &Binding) -> &'static RelationSql {
    match binding {
        Binding::PrivateIp(_) => &PRIVATE_IP,
        Binding::PublicIp { .. } => &PUBLIC_IP,
        Binding::Relationship(_) => &RELATIONSHIP,
    }
}

fn bind_key<'q>(
    query: Query<'q, Postgres, PgArguments>,
    binding: &'q Binding,
) -> Query<'q, Postgres, PgArguments> {
    match binding {
        Binding::PrivateIp(ip) => query.bind(ip.to_string()),
        Binding::PublicIp { ip, hostname } => query.bind(ip.to_string()).bind(hostname),
        Binding::Relationship(related) => query.bind(related),
    }
}

async fn execute(
    conn: &mut PgConnection,
    statement: &'static str,
    when: DateTime<Utc>,
    resource_id: i64,
    binding: &Binding,
) -> Result<PgQueryResult> {
    let query = sqlx::query(statement).bind(when).bind(resource_id);
    let res = bind_key(query, binding).execute(&mut *conn).await?;

    Ok(res)
}

pub async fn assign(
    conn: &mut PgConnection,
    resource_id: i64,
    binding: &Binding,
    when: DateTime<Utc>,
) -> Result<()> {
    let sql = relation(binding);

    let upgraded = execute(conn, sql.assign_upgrade, when, resource_id, binding).await?;

    if upgraded.rows_affected() == 0 {
        execute(conn, sql.assign_insert, when, resource_id, binding).await?;
    }

    Ok(())
}

pub async fn release(
    conn: &mut PgConnection,
    resource_id: i64,
    binding: &Binding,
    when: DateTime<Utc>,
) -> Result<()> {
    let sql = relation(binding);

    let closed = execute(conn, sql.release_close, when, resource_id, binding).await?;

    if closed.rows_affected() == 0 {
        execute(conn, sql.release_orphan, when, resource_id, binding).await?;
    }

    Ok(())
}

pub async fn ingest(conn: &mut PgConnection, plan: &IngestPlan) -> Result<()> {
    let resource_id = catalog::ensure_resource(conn, &plan.resource).await?;

    for op in plan.ops.iter() {
        match op.change_type {
            ChangeType::Added => assign(conn, resource_id, &op.binding, plan.when).await?,
            ChangeType::Deleted => release(conn, resource_id, &op.binding, plan.when).await?,
        }
    }

    Ok(())
}
