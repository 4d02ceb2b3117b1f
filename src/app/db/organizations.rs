use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::{new_ulid, OrganizationId};

/// Database row for the organizations table. The table is the tenant
/// boundary itself and carries no RLS policy.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub plan: String,
    pub api_key: String,
    pub monthly_test_limit: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Data structure for inserting a new organization.
pub struct NewOrganization {
    pub id: OrganizationId,
    pub name: String,
    pub plan: String,
    pub api_key: String,
    pub monthly_test_limit: i32,
    pub trial_ends_at: Option<OffsetDateTime>,
}

/// API keys are `qa3_` plus a fresh ULID.
pub fn generate_api_key() -> String {
    format!("qa3_{}", new_ulid())
}

pub async fn find_by_id<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<Organization>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_name<'e, E>(
    executor: E,
    name: &str,
) -> Result<Option<Organization>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE name = $1 LIMIT 1")
        .bind(name)
        .fetch_optional(executor)
        .await
}

pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Organization>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations ORDER BY created_at DESC")
        .fetch_all(executor)
        .await
}

pub async fn insert<'e, E>(
    executor: E,
    organization: &NewOrganization,
) -> Result<Organization, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Organization>(
        "INSERT INTO organizations (id, name, plan, api_key, monthly_test_limit, trial_ends_at) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(organization.id.as_str())
    .bind(&organization.name)
    .bind(&organization.plan)
    .bind(&organization.api_key)
    .bind(organization.monthly_test_limit)
    .bind(organization.trial_ends_at)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E>(
    executor: E,
    id: &str,
    name: &str,
    plan: &str,
    monthly_test_limit: i32,
) -> Result<Option<Organization>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Organization>(
        "UPDATE organizations SET name = $2, plan = $3, monthly_test_limit = $4, updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(plan)
    .bind(monthly_test_limit)
    .fetch_optional(executor)
    .await
}

/// Swap in a fresh API key, returning it.
pub async fn regenerate_api_key<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<String>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar::<_, String>(
        "UPDATE organizations SET api_key = $2, updated_at = now() WHERE id = $1 RETURNING api_key",
    )
    .bind(id)
    .bind(generate_api_key())
    .fetch_optional(executor)
    .await
}

/// Insert-or-update by id; used by the seed binary.
pub async fn upsert<'e, E>(
    executor: E,
    id: &str,
    name: &str,
    api_key: &str,
) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO organizations (id, name, api_key) VALUES ($1, $2, $3) \
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, updated_at = now()",
    )
    .bind(id)
    .bind(name)
    .bind(api_key)
    .execute(executor)
    .await?;
    Ok(())
}
