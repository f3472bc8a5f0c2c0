use sqlx::{PgConnection, PgPool};

use super::catalog;
use crate::{
    error::Result,
    model::{AccountOwner, Person},
};

const UPSERT_PERSON: &str = r#"
    INSERT INTO person (login, email, name, valid) VALUES ($1, $2, $3, $4)
    ON CONFLICT (login) DO UPDATE SET email = EXCLUDED.email, name = EXCLUDED.name, valid = EXCLUDED.valid
    RETURNING id
"#;

const UPSERT_OWNER: &str = r#"
    INSERT INTO account_owner (aws_account_id, person_id) VALUES ($1, $2)
    ON CONFLICT (aws_account_id) DO UPDATE SET person_id = EXCLUDED.person_id
"#;

const DELETE_CHAMPIONS: &str = "DELETE FROM account_champion WHERE aws_account_id = $1";

const INSERT_CHAMPION: &str = r#"
    INSERT INTO account_champion (person_id, aws_account_id) VALUES ($1, $2)
    ON CONFLICT DO NOTHING
"#;

const SELECT_OWNER: &str = r#"
    SELECT p.name, p.login, p.email, p.valid
    FROM account_owner o
    JOIN person p ON p.id = o.person_id
    JOIN aws_account a ON a.id = o.aws_account_id
    WHERE a.account = $1
"#;

const SELECT_CHAMPIONS: &str = r#"
    SELECT p.name, p.login, p.email, p.valid
    FROM account_champion c
    JOIN person p ON p.id = c.person_id
    JOIN aws_account a ON a.id = c.aws_account_id
    WHERE a.account = $1
    ORDER BY p.login
"#;

async fn upsert_person(conn: &mut PgConnection, person: &Person) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(UPSERT_PERSON)
        .bind(&person.login)
        .bind(&person.email)
        .bind(&person.name)
        .bind(person.valid)
        .fetch_one(&mut *conn)
        .await?;

    Ok(id)
}

/// Replaces the owner and the whole champion list of the account.
pub async fn store(conn: &mut PgConnection, owner: &AccountOwner) -> Result<()> {
    let account_id = catalog::ensure_account(conn, &owner.account_id).await?;
    let person_id = upsert_person(conn, &owner.owner).await?;

    sqlx::query(UPSERT_OWNER)
        .bind(account_id)
        .bind(person_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(DELETE_CHAMPIONS)
        .bind(account_id)
        .execute(&mut *conn)
        .await?;

    for champion in owner.champions.iter() {
        let person_id = upsert_person(conn, champion).await?;

        sqlx::query(INSERT_CHAMPION)
            .bind(person_id)
            .bind(account_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub async fn find(pool: &PgPool, account: &str) -> Result<Option<AccountOwner>> {
    let Some(owner) = sqlx::query_as::<_, Person>(SELECT_OWNER)
        .bind(account)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let champions = sqlx::query_as::<_, Person>(SELECT_CHAMPIONS)
        .bind(account)
        .fetch_all(pool)
        .await?;

    Ok(Some(AccountOwner {
        account_id: account.to_owned(),
        owner,
        champions,
    }))
}
