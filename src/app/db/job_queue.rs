use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Job type for browser test runs — the only type this application enqueues
/// today.
pub const JOB_TYPE_TEST_EXECUTION: &str = "test_execution";

/// Default priority for user-triggered runs (lower runs earlier).
pub const DEFAULT_PRIORITY: i32 = 5;

/// Database row for the job_queue table. This table is the boundary to the
/// external execution worker: the application inserts pending rows and polls
/// status/result; scheduling and retries happen on the other side.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: String,
    pub organization_id: String,
    pub r#type: String,
    pub status: String,
    pub priority: i32,
    pub test_session_id: Option<String>,
    pub payload: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub struct NewJob {
    pub organization_id: String,
    pub job_type: String,
    pub priority: i32,
    pub test_session_id: Option<String>,
    pub payload: Value,
}

/// Counts grouped by (type, status) for the stats endpoint.
#[derive(Debug, FromRow, Serialize)]
pub struct TypeStatusCount {
    pub r#type: String,
    pub status: String,
    pub count: i64,
}

pub async fn insert<'e, E>(executor: E, job: &NewJob) -> Result<Job, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Job>(
        "INSERT INTO job_queue (id, organization_id, type, priority, test_session_id, payload) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(new_ulid())
    .bind(&job.organization_id)
    .bind(&job.job_type)
    .bind(job.priority)
    .bind(&job.test_session_id)
    .bind(&job.payload)
    .fetch_one(executor)
    .await
}

pub async fn list_by_session<'e, E>(
    executor: E,
    test_session_id: &str,
) -> Result<Vec<Job>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Job>(
        "SELECT * FROM job_queue WHERE test_session_id = $1 ORDER BY created_at DESC",
    )
    .bind(test_session_id)
    .fetch_all(executor)
    .await
}

/// Pending jobs in worker pickup order.
pub async fn list_pending<'e, E>(executor: E, limit: i64) -> Result<Vec<Job>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Job>(
        "SELECT * FROM job_queue WHERE status = 'pending' \
         ORDER BY priority ASC, scheduled_at ASC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Cancel every job of a session that hasn't finished yet. Returns the
/// number of rows touched.
pub async fn cancel_for_session<'e, E>(
    executor: E,
    test_session_id: &str,
    error: &str,
) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE job_queue SET status = 'cancelled', completed_at = now(), error = $2, \
         updated_at = now() \
         WHERE test_session_id = $1 AND status IN ('pending', 'processing')",
    )
    .bind(test_session_id)
    .bind(error)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn stats<'e, E>(executor: E) -> Result<Vec<TypeStatusCount>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, TypeStatusCount>(
        "SELECT type, status, count(*) AS count FROM job_queue GROUP BY type, status",
    )
    .fetch_all(executor)
    .await
}
