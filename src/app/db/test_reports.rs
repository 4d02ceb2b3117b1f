use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Database row for the test_reports table. `report_content` is HTML from
/// the generative API, stored verbatim.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TestReport {
    pub id: String,
    pub organization_id: String,
    pub test_session_id: String,
    pub account_id: String,
    pub language: String,
    pub report_content: String,
    pub summary: Option<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub struct NewTestReport {
    pub organization_id: String,
    pub test_session_id: String,
    pub account_id: String,
    pub language: String,
    pub report_content: String,
    pub summary: Option<Value>,
}

/// Find a report visible to the account through project membership.
pub async fn find_for_member<'e, E>(
    executor: E,
    id: &str,
    account_id: &str,
) -> Result<Option<TestReport>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestReport>(
        "SELECT r.* FROM test_reports r \
         JOIN test_sessions ts ON ts.id = r.test_session_id \
         JOIN project_members pm ON pm.project_id = ts.project_id \
         WHERE r.id = $1 AND pm.account_id = $2",
    )
    .bind(id)
    .bind(account_id)
    .fetch_optional(executor)
    .await
}

pub async fn list_for_member<'e, E>(
    executor: E,
    account_id: &str,
    project_id: Option<&str>,
    test_session_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<TestReport>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestReport>(
        "SELECT r.* FROM test_reports r \
         JOIN test_sessions ts ON ts.id = r.test_session_id \
         JOIN project_members pm ON pm.project_id = ts.project_id \
         WHERE pm.account_id = $1 \
         AND ($2::text IS NULL OR ts.project_id = $2) \
         AND ($3::text IS NULL OR r.test_session_id = $3) \
         ORDER BY r.created_at DESC LIMIT $4 OFFSET $5",
    )
    .bind(account_id)
    .bind(project_id)
    .bind(test_session_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub async fn count_for_member<'e, E>(
    executor: E,
    account_id: &str,
    project_id: Option<&str>,
    test_session_id: Option<&str>,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        "SELECT count(*) FROM test_reports r \
         JOIN test_sessions ts ON ts.id = r.test_session_id \
         JOIN project_members pm ON pm.project_id = ts.project_id \
         WHERE pm.account_id = $1 \
         AND ($2::text IS NULL OR ts.project_id = $2) \
         AND ($3::text IS NULL OR r.test_session_id = $3)",
    )
    .bind(account_id)
    .bind(project_id)
    .bind(test_session_id)
    .fetch_one(executor)
    .await
}

pub async fn list_by_session<'e, E>(
    executor: E,
    test_session_id: &str,
) -> Result<Vec<TestReport>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestReport>(
        "SELECT * FROM test_reports WHERE test_session_id = $1 ORDER BY created_at DESC",
    )
    .bind(test_session_id)
    .fetch_all(executor)
    .await
}

pub async fn insert<'e, E>(executor: E, report: &NewTestReport) -> Result<TestReport, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestReport>(
        "INSERT INTO test_reports \
           (id, organization_id, test_session_id, account_id, language, report_content, summary) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(new_ulid())
    .bind(&report.organization_id)
    .bind(&report.test_session_id)
    .bind(&report.account_id)
    .bind(&report.language)
    .bind(&report.report_content)
    .bind(&report.summary)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<TestReport>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestReport>("SELECT * FROM test_reports WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn delete<'e, E>(executor: E, id: &str) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM test_reports WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
