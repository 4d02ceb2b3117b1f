use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Comment joined with the author's display fields.
#[derive(Debug, FromRow, Serialize)]
pub struct CommentWithAccount {
    pub id: String,
    pub bug_ticket_id: String,
    pub account_id: String,
    pub content: String,
    pub account_name: String,
    pub account_email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn list_by_ticket<'e, E>(
    executor: E,
    bug_ticket_id: &str,
) -> Result<Vec<CommentWithAccount>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, CommentWithAccount>(
        "SELECT c.id, c.bug_ticket_id, c.account_id, c.content, c.created_at, \
           a.name AS account_name, a.email AS account_email \
         FROM bug_comments c \
         JOIN accounts a ON a.id = c.account_id \
         WHERE c.bug_ticket_id = $1 \
         ORDER BY c.created_at ASC",
    )
    .bind(bug_ticket_id)
    .fetch_all(executor)
    .await
}

pub async fn insert<'e, E>(
    executor: E,
    organization_id: &str,
    bug_ticket_id: &str,
    account_id: &str,
    content: &str,
) -> Result<String, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = new_ulid();
    sqlx::query(
        "INSERT INTO bug_comments (id, organization_id, bug_ticket_id, account_id, content) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&id)
    .bind(organization_id)
    .bind(bug_ticket_id)
    .bind(account_id)
    .bind(content)
    .execute(executor)
    .await?;
    Ok(id)
}
