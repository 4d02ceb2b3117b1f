use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Database row for the projects table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Project list entry with the counts the dashboard polls for.
#[derive(Debug, FromRow, Serialize)]
pub struct ProjectListEntry {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub test_session_count: i64,
    pub open_bug_count: i64,
    pub last_session_status: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub struct NewProject {
    pub organization_id: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
}

/// Find an active project by ID.
pub async fn find_active<'e, E>(executor: E, id: &str) -> Result<Option<Project>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1 AND is_active")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Active projects the account is a member of, newest first, with session
/// and open-bug counts.
pub async fn list_for_account<'e, E>(
    executor: E,
    account_id: &str,
) -> Result<Vec<ProjectListEntry>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, ProjectListEntry>(
        "SELECT p.id, p.name, p.description, p.url, p.created_at, \
           (SELECT count(*) FROM test_sessions ts WHERE ts.project_id = p.id) AS test_session_count, \
           (SELECT count(*) FROM bug_tickets bt WHERE bt.project_id = p.id \
              AND bt.status IN ('open', 'in_progress')) AS open_bug_count, \
           (SELECT ts.status FROM test_sessions ts WHERE ts.project_id = p.id \
              ORDER BY ts.created_at DESC LIMIT 1) AS last_session_status \
         FROM projects p \
         JOIN project_members pm ON pm.project_id = p.id \
         WHERE pm.account_id = $1 AND p.is_active \
         ORDER BY p.created_at DESC",
    )
    .bind(account_id)
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
    sqlx::query_scalar("SELECT count(*) FROM projects WHERE organization_id = $1")
        .bind(organization_id)
        .fetch_one(executor)
        .await
}

pub async fn insert<'e, E>(executor: E, project: &NewProject) -> Result<Project, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Project>(
        "INSERT INTO projects (id, organization_id, name, description, url) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(new_ulid())
    .bind(&project.organization_id)
    .bind(&project.name)
    .bind(&project.description)
    .bind(&project.url)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E>(
    executor: E,
    id: &str,
    name: &str,
    description: Option<&str>,
    url: &str,
    is_active: Option<bool>,
) -> Result<Option<Project>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Project>(
        "UPDATE projects SET name = $2, description = $3, url = $4, \
         is_active = COALESCE($5, is_active), updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .bind(url)
    .bind(is_active)
    .fetch_optional(executor)
    .await
}

/// Soft delete: flips is_active off, keeps history intact.
pub async fn soft_delete<'e, E>(executor: E, id: &str) -> Result<Option<Project>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Project>(
        "UPDATE projects SET is_active = FALSE, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}
