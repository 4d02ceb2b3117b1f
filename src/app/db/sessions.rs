use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Database row for the sessions table. Sessions deliberately carry no FK
/// to accounts: a deleted account surfaces as an authentication failure on
/// next use instead of cascading.
#[derive(Debug, FromRow)]
pub struct Session {
    pub id: String,
    pub account_id: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// Create a new session for an account. Returns the session ID.
pub async fn create<'e, E>(
    executor: E,
    account_id: &str,
    expires_at: OffsetDateTime,
) -> Result<String, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let session_id = new_ulid();
    sqlx::query("INSERT INTO sessions (id, account_id, expires_at) VALUES ($1, $2, $3)")
        .bind(&session_id)
        .bind(account_id)
        .bind(expires_at)
        .execute(executor)
        .await?;
    Ok(session_id)
}

/// Find a valid (non-expired) session by ID.
pub async fn find_valid<'e, E>(
    executor: E,
    session_id: &str,
) -> Result<Option<Session>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1 AND expires_at > now()")
        .bind(session_id)
        .fetch_optional(executor)
        .await
}

pub async fn delete<'e, E>(executor: E, session_id: &str) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(executor)
        .await?;
    Ok(())
}
