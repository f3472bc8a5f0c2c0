use chrono::{DateTime, SecondsFormat, Utc};
use sea_query::{Alias, Asterisk, Expr, Func, PostgresQueryBuilder, Query, Table};
use sqlx::{PgConnection, PgPool};

use crate::{
    error::{Result, StoreError},
    partition::{self, Partition, PartitionRange, DEFAULT_PARTITION, PARTITIONED_TABLE},
};

const LOCK: &str = "LOCK TABLE partitions";

const LATEST: &str = r#"
    SELECT name, created_at, partition_begin AS "begin", partition_end AS "end"
    FROM partitions
    ORDER BY partition_end DESC
    LIMIT 1
"#;

const ALL: &str = r#"
    SELECT name, created_at, partition_begin AS "begin", partition_end AS "end"
    FROM partitions
    ORDER BY partition_end DESC
"#;

const REGISTER: &str = r#"
    INSERT INTO partitions (name, created_at, partition_begin, partition_end)
    SELECT $1, $2, $3, $4
    WHERE NOT EXISTS (
        SELECT 1 FROM partitions
        WHERE name = $1 OR (partition_begin < $4 AND partition_end > $3)
    )
"#;

const UNREGISTER: &str = "DELETE FROM partitions WHERE name = $1";

fn literal(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub async fn generate(
    conn: &mut PgConnection,
    begin: Option<DateTime<Utc>>,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Option<Partition>> {
    sqlx::query(LOCK).execute(&mut *conn).await?;

    let latest = sqlx::query_as::<_, Partition>(LATEST)
        .fetch_optional(&mut *conn)
        .await?
        .map(|p| p.range());

    let Some(range) = partition::plan(begin, days, latest.as_ref(), now)? else {
        return Ok(None);
    };

    let name = range.name();
    partition::validate_name(&name)?;

    let registered = sqlx::query(REGISTER)
        .bind(&name)
        .bind(now)
        .bind(range.begin)
        .bind(range.end)
        .execute(&mut *conn)
        .await?;

    if registered.rows_affected() == 0 {
        return Err(StoreError::PartitionConflict(name));
    }

    let count = create_table(conn, &name, &range).await?;

    Ok(Some(Partition {
        name,
        created_at: now,
        begin: range.begin,
        end: range.end,
        count,
    }))
}

/// Creates the partition standalone, moves the rows of its range out of the
/// default partition, then attaches it. Attaching a range that still has rows
/// in the default partition is rejected by PostgreSQL.
async fn create_table(conn: &mut PgConnection, name: &str, range: &PartitionRange) -> Result<i64> {
    let create = format!(
        r#"CREATE TABLE "{name}" (LIKE {PARTITIONED_TABLE} INCLUDING DEFAULTS INCLUDING CONSTRAINTS)"#
    );

    sqlx::query(&create).execute(&mut *conn).await?;

    let moved = format!(
        r#"WITH moved AS (
            DELETE FROM {DEFAULT_PARTITION} WHERE ts >= $1 AND ts < $2 RETURNING *
        )
        INSERT INTO "{name}" SELECT * FROM moved"#
    );

    let moved = sqlx::query(&moved)
        .bind(range.begin)
        .bind(range.end)
        .execute(&mut *conn)
        .await?;

    let attach = format!(
        r#"ALTER TABLE {PARTITIONED_TABLE} ATTACH PARTITION "{name}" FOR VALUES FROM ('{}') TO ('{}')"#,
        literal(range.begin),
        literal(range.end)
    );

    sqlx::query(&attach).execute(&mut *conn).await?;

    let index = format!(
        r#"CREATE INDEX IF NOT EXISTS "{name}_ip_ts" ON "{name}" USING BTREE (aws_ips_ip, ts)"#
    );

    sqlx::query(&index).execute(&mut *conn).await?;

    Ok(moved.rows_affected() as i64)
}

pub async fn list(pool: &PgPool) -> Result<Vec<Partition>> {
    let mut partitions = sqlx::query_as::<_, Partition>(ALL)
        .fetch_all(pool)
        .await?;

    for partition in partitions.iter_mut() {
        let statement = Query::select()
            .expr(Func::count(Expr::col(Asterisk)))
            .from(Alias::new(partition.name.as_str()))
            .to_string(PostgresQueryBuilder);

        partition.count = sqlx::query_scalar::<_, i64>(&statement)
            .fetch_one(pool)
            .await?;
    }

    Ok(partitions)
}

pub async fn delete(conn: &mut PgConnection, name: &str) -> Result<()> {
    partition::validate_name(name)?;

    sqlx::query(LOCK).execute(&mut *conn).await?;

    let removed = sqlx::query(UNREGISTER)
        .bind(name)
        .execute(&mut *conn)
        .await?;

    if removed.rows_affected() == 0 {
        return Err(StoreError::NotFoundPartition(name.to_owned()));
    }

    let statement = Table::drop()
        .table(Alias::new(name))
        .to_string(PostgresQueryBuilder);

    sqlx::query(&statement).execute(&mut *conn).await?;

    Ok(())
}
