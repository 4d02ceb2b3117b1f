use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

use crate::app::domain::new_ulid;

/// Database row for the usage_stats table, one row per organization per
/// calendar month.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UsageStats {
    pub id: String,
    pub organization_id: String,
    pub month: Date,
    pub test_session_count: i32,
    pub bug_report_count: i32,
    pub total_test_minutes: i32,
}

/// First day of the month containing `at`, the bucket key for usage rows.
pub fn month_bucket(at: OffsetDateTime) -> Date {
    let date = at.date();
    Date::from_calendar_date(date.year(), date.month(), 1).expect("day 1 always valid")
}

pub async fn find<'e, E>(
    executor: E,
    organization_id: &str,
    month: Date,
) -> Result<Option<UsageStats>, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, UsageStats>(
        "SELECT id, organization_id, month, test_session_count, bug_report_count, \
         total_test_minutes FROM usage_stats WHERE organization_id = $1 AND month = $2",
    )
    .bind(organization_id)
    .bind(month)
    .fetch_optional(executor)
    .await
}

/// Bump the month's session counter, creating the row if this is the first
/// session of the month.
pub async fn increment_session_count<'e, E>(
    executor: E,
    organization_id: &str,
    month: Date,
) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO usage_stats (id, organization_id, month, test_session_count) \
         VALUES ($1, $2, $3, 1) \
         ON CONFLICT (organization_id, month) DO UPDATE \
         SET test_session_count = usage_stats.test_session_count + 1, updated_at = now()",
    )
    .bind(new_ulid())
    .bind(organization_id)
    .bind(month)
    .execute(executor)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn bucket_is_first_of_month() {
        let at = datetime!(2026-08-17 13:45 UTC);
        let bucket = month_bucket(at);
        assert_eq!(bucket.day(), 1);
        assert_eq!(bucket.month(), time::Month::August);
        assert_eq!(bucket.year(), 2026);
    }

    #[test]
    fn bucket_stable_within_month() {
        assert_eq!(
            month_bucket(datetime!(2026-02-01 00:00 UTC)),
            month_bucket(datetime!(2026-02-28 23:59 UTC))
        );
    }
}
