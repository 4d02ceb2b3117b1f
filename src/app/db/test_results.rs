use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Database row for the test_results table: one visited page per row,
/// written back by the external worker.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TestResult {
    pub id: String,
    pub organization_id: String,
    pub test_session_id: String,
    pub url: String,
    pub status: String,
    pub execution_time_ms: i32,
    pub screenshot: Option<String>,
    pub console_logs: Option<Value>,
    pub network_logs: Option<Value>,
    pub user_actions: Option<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub struct NewTestResult {
    pub organization_id: String,
    pub test_session_id: String,
    pub url: String,
    pub status: String,
    pub execution_time_ms: i32,
    pub screenshot: Option<String>,
    pub console_logs: Option<Value>,
    pub network_logs: Option<Value>,
    pub user_actions: Option<Value>,
}

pub async fn list_by_session<'e, E>(
    executor: E,
    test_session_id: &str,
    status: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<TestResult>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestResult>(
        "SELECT * FROM test_results WHERE test_session_id = $1 \
         AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(test_session_id)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub async fn count_by_session<'e, E>(
    executor: E,
    test_session_id: &str,
    status: Option<&str>,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        "SELECT count(*) FROM test_results WHERE test_session_id = $1 \
         AND ($2::text IS NULL OR status = $2)",
    )
    .bind(test_session_id)
    .bind(status)
    .fetch_one(executor)
    .await
}

pub async fn insert<'e, E>(executor: E, result: &NewTestResult) -> Result<TestResult, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TestResult>(
        "INSERT INTO test_results \
           (id, organization_id, test_session_id, url, status, execution_time_ms, \
            screenshot, console_logs, network_logs, user_actions) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(new_ulid())
    .bind(&result.organization_id)
    .bind(&result.test_session_id)
    .bind(&result.url)
    .bind(&result.status)
    .bind(result.execution_time_ms)
    .bind(&result.screenshot)
    .bind(&result.console_logs)
    .bind(&result.network_logs)
    .bind(&result.user_actions)
    .fetch_one(executor)
    .await
}
