use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Database row for the test_configs table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TestConfig {
    pub id: String,
    pub organization_id: String,
    pub project_id: String,
    pub name: String,
    pub mode: String,
    pub browser: String,
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub max_duration: i32,
    pub excluded_paths: Value,
    pub is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub struct NewTestConfig {
    pub organization_id: String,
    pub project_id: String,
    pub name: String,
    pub mode: String,
    pub browser: String,
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub max_duration: i32,
    pub excluded_paths: Value,
    pub is_default: bool,
}

impl NewTestConfig {
    /// The configuration every fresh project starts with.
    pub fn default_for_project(organization_id: &str, project_id: &str) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            project_id: project_id.to_string(),
            name: "Default configuration".to_string(),
            mode: "omakase".to_string(),
            browser: "chrome".to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            max_duration: 3600,
            excluded_paths: Value::Array(vec![]),
            is_default: true,
        }
    }
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<TestConfig>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestConfig>("SELECT * FROM test_configs WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Find a config, checking it belongs to the given project.
pub async fn find_in_project<'e, E>(
    executor: E,
    id: &str,
    project_id: &str,
) -> Result<Option<TestConfig>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestConfig>(
        "SELECT * FROM test_configs WHERE id = $1 AND project_id = $2",
    )
    .bind(id)
    .bind(project_id)
    .fetch_optional(executor)
    .await
}

/// Configs for a project, default first, then newest first.
pub async fn list_by_project<'e, E>(
    executor: E,
    project_id: &str,
) -> Result<Vec<TestConfig>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestConfig>(
        "SELECT * FROM test_configs WHERE project_id = $1 \
         ORDER BY is_default DESC, created_at DESC",
    )
    .bind(project_id)
    .fetch_all(executor)
    .await
}

pub async fn insert<'e, E>(executor: E, config: &NewTestConfig) -> Result<TestConfig, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestConfig>(
        "INSERT INTO test_configs \
           (id, organization_id, project_id, name, mode, browser, viewport_width, \
            viewport_height, max_duration, excluded_paths, is_default) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(new_ulid())
    .bind(&config.organization_id)
    .bind(&config.project_id)
    .bind(&config.name)
    .bind(&config.mode)
    .bind(&config.browser)
    .bind(config.viewport_width)
    .bind(config.viewport_height)
    .bind(config.max_duration)
    .bind(&config.excluded_paths)
    .bind(config.is_default)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E>(
    executor: E,
    id: &str,
    name: &str,
    mode: &str,
    browser: &str,
    viewport_width: i32,
    viewport_height: i32,
    max_duration: i32,
    excluded_paths: &Value,
) -> Result<Option<TestConfig>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestConfig>(
        "UPDATE test_configs SET name = $2, mode = $3, browser = $4, viewport_width = $5, \
         viewport_height = $6, max_duration = $7, excluded_paths = $8, updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(mode)
    .bind(browser)
    .bind(viewport_width)
    .bind(viewport_height)
    .bind(max_duration)
    .bind(excluded_paths)
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM test_configs WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
