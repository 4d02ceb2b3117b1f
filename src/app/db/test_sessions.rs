use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Database row for the test_sessions table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TestSession {
    pub id: String,
    pub organization_id: String,
    pub project_id: String,
    pub test_config_id: String,
    pub account_id: String,
    pub status: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub error_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TestSession {
    /// Pending and running sessions block project deletion and may be
    /// cancelled; everything else is settled history.
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "pending" | "running")
    }
}

/// Per-status counts for one project.
#[derive(Debug, FromRow, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<TestSession>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestSession>("SELECT * FROM test_sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Sessions for a project, newest first. `status` of `None` means all.
pub async fn list_by_project<'e, E>(
    executor: E,
    project_id: &str,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<TestSession>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestSession>(
        "SELECT * FROM test_sessions WHERE project_id = $1 \
         AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(project_id)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub async fn count_by_project<'e, E>(
    executor: E,
    project_id: &str,
    status: Option<&str>,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        "SELECT count(*) FROM test_sessions WHERE project_id = $1 \
         AND ($2::text IS NULL OR status = $2)",
    )
    .bind(project_id)
    .bind(status)
    .fetch_one(executor)
    .await
}

/// Running sessions across all projects the account is a member of.
pub async fn list_running_for_account<'e, E>(
    executor: E,
    account_id: &str,
) -> Result<Vec<TestSession>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestSession>(
        "SELECT ts.* FROM test_sessions ts \
         JOIN project_members pm ON pm.project_id = ts.project_id \
         WHERE pm.account_id = $1 AND ts.status = 'running' \
         ORDER BY ts.started_at DESC NULLS LAST",
    )
    .bind(account_id)
    .fetch_all(executor)
    .await
}

/// Most recent sessions across the account's projects.
pub async fn list_recent_for_account<'e, E>(
    executor: E,
    account_id: &str,
    limit: i64,
) -> Result<Vec<TestSession>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestSession>(
        "SELECT ts.* FROM test_sessions ts \
         JOIN project_members pm ON pm.project_id = ts.project_id \
         WHERE pm.account_id = $1 \
         ORDER BY ts.created_at DESC LIMIT $2",
    )
    .bind(account_id)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub async fn count_by_config<'e, E>(
    executor: E,
    test_config_id: &str,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar("SELECT count(*) FROM test_sessions WHERE test_config_id = $1")
        .bind(test_config_id)
        .fetch_one(executor)
        .await
}

pub async fn count_active_by_project<'e, E>(
    executor: E,
    project_id: &str,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        "SELECT count(*) FROM test_sessions WHERE project_id = $1 \
         AND status IN ('pending', 'running')",
    )
    .bind(project_id)
    .fetch_one(executor)
    .await
}

/// Sessions created in the organization since the given instant. Feeds the
/// monthly usage display.
pub async fn count_for_organization_since<'e, E>(
    executor: E,
    organization_id: &str,
    since: OffsetDateTime,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        "SELECT count(*) FROM test_sessions WHERE organization_id = $1 AND created_at >= $2",
    )
    .bind(organization_id)
    .bind(since)
    .fetch_one(executor)
    .await
}

pub async fn status_counts_by_project<'e, E>(
    executor: E,
    project_id: &str,
) -> Result<Vec<StatusCount>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, StatusCount>(
        "SELECT status, count(*) AS count FROM test_sessions \
         WHERE project_id = $1 GROUP BY status",
    )
    .bind(project_id)
    .fetch_all(executor)
    .await
}

/// Insert a new pending session.
pub async fn insert<'e, E>(
    executor: E,
    organization_id: &str,
    project_id: &str,
    test_config_id: &str,
    account_id: &str,
) -> Result<TestSession, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestSession>(
        "INSERT INTO test_sessions (id, organization_id, project_id, test_config_id, account_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(new_ulid())
    .bind(organization_id)
    .bind(project_id)
    .bind(test_config_id)
    .bind(account_id)
    .fetch_one(executor)
    .await
}

/// Mark a session failed with an operator-facing message (used by cancel
/// and stop paths).
pub async fn mark_failed<'e, E>(
    executor: E,
    id: &str,
    error_message: &str,
) -> Result<Option<TestSession>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestSession>(
        "UPDATE test_sessions SET status = 'failed', completed_at = now(), \
         error_message = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(error_message)
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM test_sessions WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn session(status: &str) -> TestSession {
        TestSession {
            id: "s".into(),
            organization_id: "o".into(),
            project_id: "p".into(),
            test_config_id: "c".into(),
            account_id: "a".into(),
            status: status.into(),
            started_at: None,
            completed_at: None,
            error_message: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn active_statuses() {
        assert!(session("pending").is_active());
        assert!(session("running").is_active());
        assert!(!session("completed").is_active());
        assert!(!session("failed").is_active());
    }
}
