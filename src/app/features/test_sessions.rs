use axum::{
    extract::{Path, Query},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use crate::app::{
    access::UserAccess,
    db,
    error::AppError,
    AppState,
};

const SESSION_STATUSES: &[&str] = &["pending", "running", "completed", "failed"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreatePayload {
    pub project_id: String,
    pub test_config_id: String,
}

fn default_limit() -> i64 {
    20
}

fn default_recent_limit() -> i64 {
    10
}

/// `all` and absent both mean "no filter"; anything else must be a known
/// status.
fn status_filter(raw: Option<&str>) -> Result<Option<String>, AppError> {
    match raw {
        None | Some("all") => Ok(None),
        Some(s) if SESSION_STATUSES.contains(&s) => Ok(Some(s.to_string())),
        Some(s) => Err(AppError::Validation(format!("Unknown status: {s}"))),
    }
}

/// Membership guard shared by the handlers below. NotFound, not Forbidden:
/// don't leak which projects exist.
async fn require_member(
    tx: &mut sqlx::PgConnection,
    project_id: &str,
    account_id: &str,
) -> Result<(), AppError> {
    db::project_members::find(&mut *tx, project_id, account_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    Ok(())
}

/// GET /api/test-sessions/{id} — session with its tickets, reports and counts.
pub async fn get_one(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let session = db::test_sessions::find_by_id(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;
    require_member(&mut *tx, &session.project_id, &access.account.id).await?;

    let bug_tickets = db::bug_tickets::list_by_session(&mut *tx, &id).await?;
    let reports = db::test_reports::list_by_session(&mut *tx, &id).await?;
    let result_count = db::test_results::count_by_session(&mut *tx, &id, None).await?;
    tx.commit().await?;

    let bug_count = bug_tickets.len();
    Ok(Json(json!({
        "testSession": session,
        "bugTickets": bug_tickets,
        "reports": reports,
        "counts": { "testResults": result_count, "bugTickets": bug_count }
    })))
}

/// GET /api/projects/{project_id}/test-sessions?status=&limit=&offset=
pub async fn list_by_project(
    access: UserAccess,
    Path(project_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = status_filter(query.status.as_deref())?;
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let mut tx = access.db.begin().await?;
    require_member(&mut *tx, &project_id, &access.account.id).await?;
    let sessions =
        db::test_sessions::list_by_project(&mut *tx, &project_id, status.as_deref(), limit, offset)
            .await?;
    let total =
        db::test_sessions::count_by_project(&mut *tx, &project_id, status.as_deref()).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "testSessions": sessions,
        "total": total,
        "hasMore": total > offset + limit,
    })))
}

/// GET /api/test-sessions/running — running sessions across the caller's
/// projects, for the dashboard poller.
pub async fn list_running(access: UserAccess) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let sessions =
        db::test_sessions::list_running_for_account(&mut *tx, &access.account.id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "testSessions": sessions })))
}

/// GET /api/test-sessions/recent?limit=
pub async fn list_recent(
    access: UserAccess,
    Query(query): Query<RecentQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let limit = query.limit.clamp(1, 50);
    let mut tx = access.db.begin().await?;
    let sessions =
        db::test_sessions::list_recent_for_account(&mut *tx, &access.account.id, limit).await?;
    tx.commit().await?;
    Ok(Json(json!({ "testSessions": sessions })))
}

/// GET /api/projects/{project_id}/test-sessions/stats — status breakdown.
pub async fn stats(
    access: UserAccess,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    require_member(&mut *tx, &project_id, &access.account.id).await?;
    let counts = db::test_sessions::status_counts_by_project(&mut *tx, &project_id).await?;
    tx.commit().await?;

    let mut breakdown = serde_json::Map::new();
    for entry in counts {
        breakdown.insert(entry.status, json!(entry.count));
    }
    Ok(Json(json!({ "statusCounts": breakdown })))
}

/// POST /api/test-sessions — insert a pending session after the membership
/// and free-plan limit checks, then bump the month's usage counter.
pub async fn create(
    access: UserAccess,
    Json(payload): Json<CreatePayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let org_id = access.account.organization_id.clone();
    let month = db::usage_stats::month_bucket(OffsetDateTime::now_utc());

    let mut tx = access.db.begin().await?;
    let member = db::project_members::find(&mut *tx, &payload.project_id, &access.account.id)
        .await?;
    if member.is_none() {
        return Err(AppError::Forbidden(
            "No access to this project".to_string(),
        ));
    }
    db::test_configs::find_in_project(&mut *tx, &payload.test_config_id, &payload.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test config not found".to_string()))?;

    let organization = db::organizations::find_by_id(&mut *tx, &org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    let usage = db::usage_stats::find(&mut *tx, &org_id, month).await?;
    if organization.plan == "free" {
        let used = usage.map(|u| u.test_session_count).unwrap_or(0);
        if used >= organization.monthly_test_limit {
            return Err(AppError::PreconditionFailed(
                "Monthly test session limit reached".to_string(),
            ));
        }
    }

    let session = db::test_sessions::insert(
        &mut *tx,
        &org_id,
        &payload.project_id,
        &payload.test_config_id,
        &access.account.id,
    )
    .await?;
    tx.commit().await?;

    // Usage accounting is best-effort and sequenced after the insert; a
    // failure here must not undo the session.
    let mut tx = access.db.begin().await?;
    match db::usage_stats::increment_session_count(&mut *tx, &org_id, month).await {
        Ok(()) => {
            if let Err(err) = tx.commit().await {
                tracing::warn!(%err, "usage stats commit failed");
            }
        }
        Err(err) => tracing::warn!(%err, "usage stats increment failed"),
    }

    Ok(Json(json!({ "testSession": session })))
}

/// POST /api/test-sessions/{id}/cancel — pending/running only.
pub async fn cancel(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let session = db::test_sessions::find_by_id(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;

    // creator or fellow project member may cancel
    if session.account_id != access.account.id {
        db::project_members::find(&mut *tx, &session.project_id, &access.account.id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden("No permission to cancel this test session".to_string())
            })?;
    }

    if !session.is_active() {
        return Err(AppError::PreconditionFailed(
            "Only pending or running test sessions can be cancelled".to_string(),
        ));
    }

    let updated = db::test_sessions::mark_failed(&mut *tx, &id, "Cancelled by user")
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;
    db::job_queue::cancel_for_session(&mut *tx, &id, "Cancelled by user").await?;
    tx.commit().await?;

    Ok(Json(json!({ "testSession": updated })))
}

/// DELETE /api/test-sessions/{id} — settled sessions only.
pub async fn delete(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let session = db::test_sessions::find_by_id(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;
    require_member(&mut *tx, &session.project_id, &access.account.id).await?;

    if session.is_active() {
        return Err(AppError::PreconditionFailed(
            "A pending or running test session cannot be deleted".to_string(),
        ));
    }

    db::test_sessions::delete(&mut *tx, &id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "ok": true })))
}

/// Test session routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/test-sessions", post(create))
        .route("/api/test-sessions/running", get(list_running))
        .route("/api/test-sessions/recent", get(list_recent))
        .route("/api/test-sessions/{id}", get(get_one).delete(delete))
        .route("/api/test-sessions/{id}/cancel", post(cancel))
        .route(
            "/api/projects/{id}/test-sessions",
            get(list_by_project),
        )
        .route(
            "/api/projects/{id}/test-sessions/stats",
            get(stats),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_and_absent_mean_no_filter() {
        assert_eq!(status_filter(None).unwrap(), None);
        assert_eq!(status_filter(Some("all")).unwrap(), None);
    }

    #[test]
    fn known_statuses_pass_through() {
        assert_eq!(
            status_filter(Some("running")).unwrap(),
            Some("running".to_string())
        );
    }

    #[test]
    fn unknown_status_rejected() {
        assert!(status_filter(Some("exploded")).is_err());
    }
}
