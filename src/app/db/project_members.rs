use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::{new_ulid, ProjectRole};

/// Database row for the project_members table.
#[derive(Debug, FromRow, Serialize)]
pub struct ProjectMember {
    pub id: String,
    pub organization_id: String,
    pub project_id: String,
    pub account_id: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ProjectMember {
    pub fn role(&self) -> Option<ProjectRole> {
        self.role.parse::<ProjectRole>().ok()
    }
}

/// Member joined with display fields from the account row.
#[derive(Debug, FromRow, Serialize)]
pub struct MemberWithAccount {
    pub id: String,
    pub account_id: String,
    pub role: String,
    pub account_name: String,
    pub account_email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Find the membership row of one account in one project.
pub async fn find<'e, E>(
    executor: E,
    project_id: &str,
    account_id: &str,
) -> Result<Option<ProjectMember>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, ProjectMember>(
        "SELECT * FROM project_members WHERE project_id = $1 AND account_id = $2",
    )
    .bind(project_id)
    .bind(account_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_id<'e, E>(
    executor: E,
    id: &str,
) -> Result<Option<ProjectMember>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, ProjectMember>("SELECT * FROM project_members WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn list_by_project<'e, E>(
    executor: E,
    project_id: &str,
) -> Result<Vec<MemberWithAccount>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, MemberWithAccount>(
        "SELECT pm.id, pm.account_id, pm.role, pm.created_at, \
           a.name AS account_name, a.email AS account_email \
         FROM project_members pm \
         JOIN accounts a ON a.id = pm.account_id \
         WHERE pm.project_id = $1 \
         ORDER BY pm.created_at ASC",
    )
    .bind(project_id)
    .fetch_all(executor)
    .await
}

pub async fn insert<'e, E>(
    executor: E,
    organization_id: &str,
    project_id: &str,
    account_id: &str,
    role: ProjectRole,
) -> Result<ProjectMember, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, ProjectMember>(
        "INSERT INTO project_members (id, organization_id, project_id, account_id, role) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(new_ulid())
    .bind(organization_id)
    .bind(project_id)
    .bind(account_id)
    .bind(role.to_string())
    .fetch_one(executor)
    .await
}

pub async fn delete_by_id<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM project_members WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_owners<'e, E>(executor: E, project_id: &str) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        "SELECT count(*) FROM project_members WHERE project_id = $1 AND role = 'owner'",
    )
    .bind(project_id)
    .fetch_one(executor)
    .await
}
