use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::app::domain::new_ulid;

/// Statuses a bug ticket may move through. Transition targets are validated
/// against this list before an update is attempted.
pub const BUG_STATUSES: &[&str] = &["open", "in_progress", "resolved", "closed", "false_positive"];

pub const BUG_SEVERITIES: &[&str] = &["critical", "high", "medium", "low"];

/// Database row for the bug_tickets table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BugTicket {
    pub id: String,
    pub organization_id: String,
    pub project_id: String,
    pub test_session_id: Option<String>,
    pub test_result_id: Option<String>,
    pub reported_by: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub bug_type: String,
    pub status: String,
    pub url: Option<String>,
    pub steps: Option<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Optional filters for listing tickets.
#[derive(Debug, Default)]
pub struct BugTicketFilter<'a> {
    pub project_id: Option<&'a str>,
    pub test_session_id: Option<&'a str>,
    pub status: Option<&'a str>,
    pub severity: Option<&'a str>,
}

pub struct NewBugTicket {
    pub organization_id: String,
    pub project_id: String,
    pub test_session_id: Option<String>,
    pub test_result_id: Option<String>,
    pub reported_by: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub bug_type: String,
    pub url: Option<String>,
    pub steps: Option<Value>,
}

/// Counts grouped along one dimension (status, severity or type).
#[derive(Debug, FromRow, Serialize)]
pub struct GroupCount {
    pub key: String,
    pub count: i64,
}

/// Find a ticket the account can see through project membership.
pub async fn find_for_member<'e, E>(
    executor: E,
    id: &str,
    account_id: &str,
) -> Result<Option<BugTicket>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, BugTicket>(
        "SELECT bt.* FROM bug_tickets bt \
         JOIN project_members pm ON pm.project_id = bt.project_id \
         WHERE bt.id = $1 AND pm.account_id = $2",
    )
    .bind(id)
    .bind(account_id)
    .fetch_optional(executor)
    .await
}

pub async fn list<'e, E>(
    executor: E,
    account_id: &str,
    filter: &BugTicketFilter<'_>,
    limit: i64,
    offset: i64,
) -> Result<Vec<BugTicket>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, BugTicket>(
        "SELECT bt.* FROM bug_tickets bt \
         JOIN project_members pm ON pm.project_id = bt.project_id \
         WHERE pm.account_id = $1 \
         AND ($2::text IS NULL OR bt.project_id = $2) \
         AND ($3::text IS NULL OR bt.test_session_id = $3) \
         AND ($4::text IS NULL OR bt.status = $4) \
         AND ($5::text IS NULL OR bt.severity = $5) \
         ORDER BY bt.created_at DESC LIMIT $6 OFFSET $7",
    )
    .bind(account_id)
    .bind(filter.project_id)
    .bind(filter.test_session_id)
    .bind(filter.status)
    .bind(filter.severity)
    .bind(limit)
    .bind(offset)
    .fetch_all(executor)
    .await
}

pub async fn count<'e, E>(
    executor: E,
    account_id: &str,
    filter: &BugTicketFilter<'_>,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar(
        "SELECT count(*) FROM bug_tickets bt \
         JOIN project_members pm ON pm.project_id = bt.project_id \
         WHERE pm.account_id = $1 \
         AND ($2::text IS NULL OR bt.project_id = $2) \
         AND ($3::text IS NULL OR bt.test_session_id = $3) \
         AND ($4::text IS NULL OR bt.status = $4) \
         AND ($5::text IS NULL OR bt.severity = $5)",
    )
    .bind(account_id)
    .bind(filter.project_id)
    .bind(filter.test_session_id)
    .bind(filter.status)
    .bind(filter.severity)
    .fetch_one(executor)
    .await
}

pub async fn list_by_session<'e, E>(
    executor: E,
    test_session_id: &str,
) -> Result<Vec<BugTicket>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, BugTicket>(
        "SELECT * FROM bug_tickets WHERE test_session_id = $1 ORDER BY created_at DESC",
    )
    .bind(test_session_id)
    .fetch_all(executor)
    .await
}

pub async fn count_by_session<'e, E>(
    executor: E,
    test_session_id: &str,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_scalar("SELECT count(*) FROM bug_tickets WHERE test_session_id = $1")
        .bind(test_session_id)
        .fetch_one(executor)
        .await
}

pub async fn insert<'e, E>(executor: E, ticket: &NewBugTicket) -> Result<BugTicket, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, BugTicket>(
        "INSERT INTO bug_tickets \
           (id, organization_id, project_id, test_session_id, test_result_id, reported_by, \
            title, description, severity, bug_type, url, steps) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
    )
    .bind(new_ulid())
    .bind(&ticket.organization_id)
    .bind(&ticket.project_id)
    .bind(&ticket.test_session_id)
    .bind(&ticket.test_result_id)
    .bind(&ticket.reported_by)
    .bind(&ticket.title)
    .bind(&ticket.description)
    .bind(&ticket.severity)
    .bind(&ticket.bug_type)
    .bind(&ticket.url)
    .bind(&ticket.steps)
    .fetch_one(executor)
    .await
}

pub async fn update_status<'e, E>(
    executor: E,
    id: &str,
    status: &str,
) -> Result<Option<BugTicket>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, BugTicket>(
        "UPDATE bug_tickets SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(executor)
    .await
}

pub async fn update_fields<'e, E>(
    executor: E,
    id: &str,
    title: &str,
    description: Option<&str>,
    severity: &str,
    bug_type: &str,
) -> Result<Option<BugTicket>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, BugTicket>(
        "UPDATE bug_tickets SET title = $2, description = $3, severity = $4, \
         bug_type = $5, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .bind(severity)
    .bind(bug_type)
    .fetch_optional(executor)
    .await
}

/// Ticket counts grouped by the given column, restricted to the account's
/// projects. `dimension` is interpolated from a fixed allow-list, never from
/// caller input.
pub async fn stats<'e, E>(
    executor: E,
    account_id: &str,
    dimension: &str,
) -> Result<Vec<GroupCount>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let column = match dimension {
        "severity" => "severity",
        "bug_type" => "bug_type",
        _ => "status",
    };
    let sql = format!(
        "SELECT bt.{column} AS key, count(*) AS count FROM bug_tickets bt \
         JOIN project_members pm ON pm.project_id = bt.project_id \
         WHERE pm.account_id = $1 GROUP BY bt.{column}"
    );
    sqlx::query_as::<_, GroupCount>(&sql)
        .bind(account_id)
        .fetch_all(executor)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_include_lifecycle_ends() {
        assert!(BUG_STATUSES.contains(&"open"));
        assert!(BUG_STATUSES.contains(&"false_positive"));
        assert!(!BUG_STATUSES.contains(&"reopened"));
    }

    #[test]
    fn severities_are_ordered_worst_first() {
        assert_eq!(BUG_SEVERITIES.first(), Some(&"critical"));
        assert_eq!(BUG_SEVERITIES.last(), Some(&"low"));
    }
}
