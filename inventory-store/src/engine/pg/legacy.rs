use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgConnection, PgPool};

use crate::{
    error::Result,
    legacy::{legacy_writes, LegacyEvent, LegacyKey},
    lookup::AssetRow,
    model::CloudAssetChanges,
};

const INSERT_RESOURCE: &str = r#"
    INSERT INTO aws_resources (id, account_id, region, type, meta) VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT DO NOTHING
"#;

const INSERT_HOSTNAME: &str = "INSERT INTO aws_hostnames (hostname) VALUES ($1) ON CONFLICT DO NOTHING";

const INSERT_IP: &str = "INSERT INTO aws_ips (ip) VALUES ($1::inet) ON CONFLICT DO NOTHING";

const INSERT_EVENT: &str = r#"
    INSERT INTO aws_events_ips_hostnames
        (ts, is_public, is_join, aws_resources_id, aws_ips_ip, aws_hostnames_hostname)
    VALUES ($1, $2, $3, $4, $5::inet, $6)
"#;

const LATEST_BY_IP: &str = r#"
    WITH candidates AS (
        SELECT e.*, MAX(e.ts) OVER (PARTITION BY e.aws_resources_id) AS max_ts
        FROM aws_events_ips_hostnames e
        WHERE e.aws_ips_ip = $2::inet AND e.ts <= $1
    )
    SELECT c.aws_resources_id AS arn,
        COALESCE(r.account_id, '') AS account,
        COALESCE(r.region, '') AS region,
        COALESCE(r.type, '') AS resource_type,
        r.meta,
        CASE WHEN c.is_public THEN NULL ELSE host(c.aws_ips_ip) END AS private_ip,
        CASE WHEN c.is_public THEN host(c.aws_ips_ip) ELSE NULL END AS public_ip,
        c.aws_hostnames_hostname AS hostname
    FROM candidates c
    LEFT JOIN aws_resources r ON r.id = c.aws_resources_id
    WHERE c.ts = c.max_ts AND c.is_join
"#;

const LATEST_BY_HOSTNAME: &str = r#"
    WITH candidates AS (
        SELECT e.*, MAX(e.ts) OVER (PARTITION BY e.aws_resources_id) AS max_ts
        FROM aws_events_ips_hostnames e
        WHERE e.aws_hostnames_hostname = $2 AND e.ts <= $1
    )
    SELECT c.aws_resources_id AS arn,
        COALESCE(r.account_id, '') AS account,
        COALESCE(r.region, '') AS region,
        COALESCE(r.type, '') AS resource_type,
        r.meta,
        CASE WHEN c.is_public THEN NULL ELSE host(c.aws_ips_ip) END AS private_ip,
        CASE WHEN c.is_public THEN host(c.aws_ips_ip) ELSE NULL END AS public_ip,
        c.aws_hostnames_hostname AS hostname
    FROM candidates c
    LEFT JOIN aws_resources r ON r.id = c.aws_resources_id
    WHERE c.ts = c.max_ts AND c.is_join
"#;

const EVENTS_BETWEEN: &str = r#"
    SELECT e.ts, e.aws_resources_id AS arn,
        COALESCE(r.type, '') AS resource_type,
        COALESCE(r.region, '') AS region,
        COALESCE(r.account_id, '') AS account,
        r.meta,
        host(e.aws_ips_ip) AS ip,
        e.aws_hostnames_hostname AS hostname,
        e.is_join,
        e.is_public
    FROM aws_events_ips_hostnames e
    LEFT JOIN aws_resources r ON r.id = e.aws_resources_id
    WHERE e.ts >= $1 AND e.ts <= $2
    ORDER BY e.ts ASC
"#;

pub async fn ingest(conn: &mut PgConnection, changes: &CloudAssetChanges) -> Result<()> {
    sqlx::query(INSERT_RESOURCE)
        .bind(&changes.arn)
        .bind(&changes.account_id)
        .bind(&changes.region)
        .bind(&changes.resource_type)
        .bind(Json(&changes.tags))
        .execute(&mut *conn)
        .await?;

    for hostname in changes.changes.iter().flat_map(|c| c.hostnames.iter()) {
        sqlx::query(INSERT_HOSTNAME)
            .bind(hostname)
            .execute(&mut *conn)
            .await?;
    }

    for write in legacy_writes(changes) {
        sqlx::query(INSERT_IP)
            .bind(write.ip.to_string())
            .execute(&mut *conn)
            .await?;

        sqlx::query(INSERT_EVENT)
            .bind(write.ts)
            .bind(write.is_public)
            .bind(write.is_join)
            .bind(&changes.arn)
            .bind(write.ip.to_string())
            .bind(write.hostname)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub async fn find(pool: &PgPool, when: DateTime<Utc>, key: &LegacyKey) -> Result<Vec<AssetRow>> {
    let (statement, value) = match key {
        LegacyKey::Ip(ip) => (LATEST_BY_IP, ip.to_string()),
        LegacyKey::Hostname(hostname) => (LATEST_BY_HOSTNAME, hostname.to_owned()),
    };

    let rows = sqlx::query_as::<_, AssetRow>(statement)
        .bind(when)
        .bind(value)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

pub async fn read_events(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<LegacyEvent>> {
    let events = sqlx::query_as::<_, LegacyEvent>(EVENTS_BETWEEN)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

    Ok(events)
}
