use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::Result,
    lookup::{AssetRow, LookupKey},
};

const BY_PRIVATE_IP: &str = r#"
    SELECT r.arn_id AS arn, a.account, g.region, t.resource_type, r.meta,
        host(b.private_ip) AS private_ip, NULL::text AS public_ip, NULL::text AS hostname
    FROM aws_private_ip_assignment b
    JOIN aws_resource r ON r.id = b.aws_resource_id
    JOIN aws_account a ON a.id = r.aws_account_id
    JOIN aws_region g ON g.id = r.aws_region_id
    JOIN aws_resource_type t ON t.id = r.aws_resource_type_id
    WHERE b.private_ip = $2::inet
        AND b.not_before <= $1 AND (b.not_after IS NULL OR b.not_after > $1)
"#;

const BY_PUBLIC_IP: &str = r#"
    SELECT r.arn_id AS arn, a.account, g.region, t.resource_type, r.meta,
        NULL::text AS private_ip, host(b.public_ip) AS public_ip, b.aws_hostname AS hostname
    FROM aws_public_ip_assignment b
    JOIN aws_resource r ON r.id = b.aws_resource_id
    JOIN aws_account a ON a.id = r.aws_account_id
    JOIN aws_region g ON g.id = r.aws_region_id
    JOIN aws_resource_type t ON t.id = r.aws_resource_type_id
    WHERE b.public_ip = $2::inet
        AND b.not_before <= $1 AND (b.not_after IS NULL OR b.not_after > $1)
"#;

const BY_HOSTNAME: &str = r#"
    SELECT r.arn_id AS arn, a.account, g.region, t.resource_type, r.meta,
        NULL::text AS private_ip, host(b.public_ip) AS public_ip, b.aws_hostname AS hostname
    FROM aws_public_ip_assignment b
    JOIN aws_resource r ON r.id = b.aws_resource_id
    JOIN aws_account a ON a.id = r.aws_account_id
    JOIN aws_region g ON g.id = r.aws_region_id
    JOIN aws_resource_type t ON t.id = r.aws_resource_type_id
    WHERE b.aws_hostname = $2
        AND b.not_before <= $1 AND (b.not_after IS NULL OR b.not_after > $1)
"#;

const BY_ARN_ID: &str = r#"
    SELECT r.arn_id AS arn, a.account, g.region, t.resource_type, r.meta,
        host(b.private_ip) AS private_ip, NULL::text AS public_ip, NULL::text AS hostname
    FROM aws_private_ip_assignment b
    JOIN aws_resource r ON r.id = b.aws_resource_id
    JOIN aws_account a ON a.id = r.aws_account_id
    JOIN aws_region g ON g.id = r.aws_region_id
    JOIN aws_resource_type t ON t.id = r.aws_resource_type_id
    WHERE r.arn_id = $2
        AND b.not_before <= $1 AND (b.not_after IS NULL OR b.not_after > $1)
    UNION ALL
    SELECT r.arn_id AS arn, a.account, g.region, t.resource_type, r.meta,
        NULL::text AS private_ip, host(b.public_ip) AS public_ip, b.aws_hostname AS hostname
    FROM aws_public_ip_assignment b
    JOIN aws_resource r ON r.id = b.aws_resource_id
    JOIN aws_account a ON a.id = r.aws_account_id
    JOIN aws_region g ON g.id = r.aws_region_id
    JOIN aws_resource_type t ON t.id = r.aws_resource_type_id
    WHERE r.arn_id = $2
        AND b.not_before <= $1 AND (b.not_after IS NULL OR b.not_after > $1)
"#;

const RELATED: &str = r#"
    SELECT b.related_arn_id
    FROM aws_resource_relationship b
    JOIN aws_resource r ON r.id = b.aws_resource_id
    JOIN aws_account a ON a.id = r.aws_account_id
    JOIN aws_region g ON g.id = r.aws_region_id
    WHERE r.arn_id = $2 AND a.account = $3 AND g.region = $4
        AND b.not_before <= $1 AND (b.not_after IS NULL OR b.not_after > $1)
    ORDER BY b.related_arn_id
"#;

pub async fn find(pool: &PgPool, when: DateTime<Utc>, key: &LookupKey) -> Result<Vec<AssetRow>> {
    let (statement, value) = match key {
        LookupKey::PrivateIp(ip) => (BY_PRIVATE_IP, ip.to_string()),
        LookupKey::PublicIp(ip) => (BY_PUBLIC_IP, ip.to_string()),
        LookupKey::Hostname(hostname) => (BY_HOSTNAME, hostname.to_owned()),
        LookupKey::ArnId(arn_id) => (BY_ARN_ID, arn_id.to_owned()),
    };

    let rows = sqlx::query_as::<_, AssetRow>(statement)
        .bind(when)
        .bind(value)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

pub async fn find_related(
    pool: &PgPool,
    when: DateTime<Utc>,
    arn_id: &str,
    account: &str,
    region: &str,
) -> Result<Vec<String>> {
    let related = sqlx::query_scalar::<_, String>(RELATED)
        .bind(when)
        .bind(arn_id)
        .bind(account)
        .bind(region)
        .fetch_all(pool)
        .await?;

    Ok(related)
}
