use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::{AccountId, AccountRole, Email, HashedPassword, OrganizationId};

/// Database row for the accounts table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub organization_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Account {
    /// Parsed role; rows written by this application always parse.
    pub fn role(&self) -> Option<AccountRole> {
        self.role.parse::<AccountRole>().ok()
    }
}

/// Data structure for inserting a new account.
pub struct NewAccount {
    pub id: AccountId,
    pub email: Email,
    pub name: String,
    pub role: AccountRole,
    pub password_hash: Option<HashedPassword>,
    pub organization_id: OrganizationId,
}

pub async fn find_by_email<'e, E>(
    executor: E,
    email: &str,
) -> Result<Option<Account>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_id<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<Account>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Account>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>("SELECT * FROM accounts ORDER BY created_at ASC")
        .fetch_all(executor)
        .await
}

pub async fn count_by_organization<'e, E>(
    executor: E,
    organization_id: &str,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar("SELECT count(*) FROM accounts WHERE organization_id = $1")
        .bind(organization_id)
        .fetch_one(executor)
        .await
}

pub async fn insert<'e, E>(executor: E, account: &NewAccount) -> Result<Account, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        "INSERT INTO accounts (id, email, name, role, password_hash, organization_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(account.id.as_str())
    .bind(account.email.as_str())
    .bind(&account.name)
    .bind(account.role.to_string())
    .bind(account.password_hash.as_ref().map(|h| h.as_str().to_string()))
    .bind(account.organization_id.as_str())
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E>(
    executor: E,
    id: &str,
    email: &str,
    name: &str,
    role: &str,
    organization_id: &str,
) -> Result<Option<Account>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Account>(
        "UPDATE accounts SET email = $2, name = $3, role = $4, organization_id = $5, \
         updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(email)
    .bind(name)
    .bind(role)
    .bind(organization_id)
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Insert-or-update an admin account by email; used by the seed binary.
pub async fn upsert_admin<'e, E>(
    executor: E,
    id: &AccountId,
    email: &str,
    organization_id: &str,
) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO accounts (id, email, name, role, organization_id) \
         VALUES ($1, $2, $2, 'admin', $3) \
         ON CONFLICT (email) DO UPDATE SET role = 'admin', \
         organization_id = EXCLUDED.organization_id, updated_at = now()",
    )
    .bind(id.as_str())
    .bind(email)
    .bind(organization_id)
    .execute(executor)
    .await?;
    Ok(())
}
