use sqlx::{types::Json, PgConnection};

use crate::{error::Result, ingest::ResourceSpec};

const UPSERT_ACCOUNT: &str = r#"
    INSERT INTO aws_account (account) VALUES ($1)
    ON CONFLICT (account) DO UPDATE SET account = EXCLUDED.account
    RETURNING id
"#;

const UPSERT_REGION: &str = r#"
    INSERT INTO aws_region (region) VALUES ($1)
    ON CONFLICT (region) DO UPDATE SET region = EXCLUDED.region
    RETURNING id
"#;

const UPSERT_RESOURCE_TYPE: &str = r#"
    INSERT INTO aws_resource_type (resource_type) VALUES ($1)
    ON CONFLICT (resource_type) DO UPDATE SET resource_type = EXCLUDED.resource_type
    RETURNING id
"#;

const UPSERT_RESOURCE: &str = r#"
    INSERT INTO aws_resource (arn_id, aws_account_id, aws_region_id, aws_resource_type_id, meta)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (arn_id, aws_account_id, aws_region_id) DO UPDATE SET meta = EXCLUDED.meta
    RETURNING id
"#;

async fn upsert(conn: &mut PgConnection, statement: &str, value: &str) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(statement)
        .bind(value)
        .fetch_one(&mut *conn)
        .await?;

    Ok(id)
}

pub async fn ensure_account(conn: &mut PgConnection, account: &str) -> Result<i64> {
    upsert(conn, UPSERT_ACCOUNT, account).await
}

/// Ids of the account, region and type, then of the resource itself. The
/// resource tags are replaced.
pub async fn ensure_resource(conn: &mut PgConnection, resource: &ResourceSpec) -> Result<i64> {
    let account_id = ensure_account(conn, &resource.account).await?;
    let region_id = upsert(conn, UPSERT_REGION, &resource.region).await?;
    let resource_type_id = upsert(conn, UPSERT_RESOURCE_TYPE, &resource.resource_type).await?;

    let id = sqlx::query_scalar::<_, i64>(UPSERT_RESOURCE)
        .bind(&resource.arn_id)
        .bind(account_id)
        .bind(region_id)
        .bind(resource_type_id)
        .bind(Json(&resource.tags))
        .fetch_one(&mut *conn)
        .await?;

    Ok(id)
}
