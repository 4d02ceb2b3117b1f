use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Database row for the session_logs table. Written by the external worker;
/// this application only reads them back (report generation pulls the
/// screenshots out of here).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionLog {
    pub id: String,
    pub organization_id: String,
    pub test_session_id: String,
    pub level: String,
    pub message: String,
    pub screenshot: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn list_by_session<'e, E>(
    executor: E,
    test_session_id: &str,
) -> Result<Vec<SessionLog>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, SessionLog>(
        "SELECT * FROM session_logs WHERE test_session_id = $1 ORDER BY created_at DESC",
    )
    .bind(test_session_id)
    .fetch_all(executor)
    .await
}
