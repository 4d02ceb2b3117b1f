use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Database row for the integrations table (slack/github/jira/webhook hooks
/// configured per project).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Integration {
    pub id: String,
    pub organization_id: String,
    pub project_id: String,
    pub r#type: String,
    pub name: String,
    pub config: Value,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Integration>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Integration>("SELECT * FROM integrations WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list<'e, E>(
    executor: E,
    project_id: Option<&str>,
    integration_type: Option<&str>,
) -> Result<Vec<Integration>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Integration>(
        "SELECT * FROM integrations \
         WHERE ($1::text IS NULL OR project_id = $1) \
         AND ($2::text IS NULL OR type = $2) \
         ORDER BY created_at DESC",
    )
    .bind(project_id)
    .bind(integration_type)
    .fetch_all(executor)
    .await
}

pub async fn insert<'e, E>(
    executor: E,
    organization_id: &str,
    project_id: &str,
    integration_type: &str,
    name: &str,
    config: &Value,
    is_active: bool,
) -> Result<Integration, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Integration>(
        "INSERT INTO integrations (id, organization_id, project_id, type, name, config, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(new_ulid())
    .bind(organization_id)
    .bind(project_id)
    .bind(integration_type)
    .bind(name)
    .bind(config)
    .bind(is_active)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E>(
    executor: E,
    id: &str,
    name: &str,
    config: &Value,
    is_active: bool,
) -> Result<Option<Integration>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Integration>(
        "UPDATE integrations SET name = $2, config = $3, is_active = $4, updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(config)
    .bind(is_active)
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM integrations WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
