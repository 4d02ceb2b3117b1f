use axum::{
    extract::Path,
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

#[derive(Debug, Deserialize)]
pub struct StartPayload {
    pub project_id: String,
    pub test_config_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StopPayload {
    pub session_id: String,
}

/// Progress shown to the polling UI. Completed runs read 100; running runs
/// estimate from visited pages, capped below completion.
fn progress_for(status: &str, result_count: i64) -> i64 {
    match status {
        "completed" => 100,
        "running" => (result_count * 10).min(90),
        _ => 0,
    }
}

/// POST /api/test-execution/start — create the pending session plus its
/// job-queue row in one transaction. The external worker takes it from
/// there; this application never executes tests itself.
pub async fn start(
    access: UserAccess,
    Json(payload): Json<StartPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let org_id = access.account.organization_id.clone();
    let month = db::usage_stats::month_bucket(OffsetDateTime::now_utc());

    let mut tx = access.db.begin().await?;
    let project = db::projects::find_active(&mut *tx, &payload.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    let config =
        db::test_configs::find_in_project(&mut *tx, &payload.test_config_id, &project.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Test config not found".to_string()))?;

    let organization = db::organizations::find_by_id(&mut *tx, &org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    if organization.plan == "free" {
        let used = db::usage_stats::find(&mut *tx, &org_id, month)
            .await?
            .map(|u| u.test_session_count)
            .unwrap_or(0);
        if used >= organization.monthly_test_limit {
            return Err(AppError::PreconditionFailed(
                "Monthly test session limit reached".to_string(),
            ));
        }
    }

    let session = db::test_sessions::insert(
        &mut *tx,
        &org_id,
        &project.id,
        &config.id,
        &access.account.id,
    )
    .await?;

    db::job_queue::insert(
        &mut *tx,
        &db::job_queue::NewJob {
            organization_id: org_id.clone(),
            job_type: db::job_queue::JOB_TYPE_TEST_EXECUTION.to_string(),
            priority: db::job_queue::DEFAULT_PRIORITY,
            test_session_id: Some(session.id.clone()),
            payload: json!({
                "projectId": project.id,
                "testConfigId": config.id,
                "sessionId": session.id,
                "accountId": access.account.id,
            }),
        },
    )
    .await?;
    tx.commit().await?;

    let mut tx = access.db.begin().await?;
    match db::usage_stats::increment_session_count(&mut *tx, &org_id, month).await {
        Ok(()) => {
            if let Err(err) = tx.commit().await {
                tracing::warn!(%err, "usage stats commit failed");
            }
        }
        Err(err) => tracing::warn!(%err, "usage stats increment failed"),
    }

    Ok(Json(json!({
        "sessionId": session.id,
        "message": "Test execution queued",
    })))
}

/// POST /api/test-execution/stop — running sessions only.
pub async fn stop(
    access: UserAccess,
    Json(payload): Json<StopPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let session = db::test_sessions::find_by_id(&mut *tx, &payload.session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;

    if session.status != "running" {
        return Err(AppError::BadRequest(
            "Only a running test can be stopped".to_string(),
        ));
    }

    db::test_sessions::mark_failed(&mut *tx, &session.id, "Cancelled by user").await?;
    db::job_queue::cancel_for_session(&mut *tx, &session.id, "Cancelled by user").await?;
    tx.commit().await?;

    Ok(Json(json!({ "message": "Test execution stopped" })))
}

/// GET /api/test-execution/{session_id}/status — polled by the UI.
pub async fn status(
    access: UserAccess,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let session = db::test_sessions::find_by_id(&mut *tx, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;
    let result_count = db::test_results::count_by_session(&mut *tx, &session_id, None).await?;
    let bug_count = db::bug_tickets::count_by_session(&mut *tx, &session_id).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "status": session.status,
        "progress": progress_for(&session.status, result_count),
        "startedAt": session.started_at.map(|t| t.unix_timestamp()),
        "completedAt": session.completed_at.map(|t| t.unix_timestamp()),
        "pagesVisited": result_count,
        "bugsFound": bug_count,
    })))
}

/// Test execution routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/test-execution/start", post(start))
        .route("/api/test-execution/stop", post(stop))
        .route("/api/test-execution/{session_id}/status", get(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_is_done() {
        assert_eq!(progress_for("completed", 0), 100);
        assert_eq!(progress_for("completed", 50), 100);
    }

    #[test]
    fn running_scales_with_results_capped() {
        assert_eq!(progress_for("running", 0), 0);
        assert_eq!(progress_for("running", 4), 40);
        assert_eq!(progress_for("running", 9), 90);
        assert_eq!(progress_for("running", 25), 90);
    }

    #[test]
    fn other_statuses_report_zero() {
        assert_eq!(progress_for("pending", 3), 0);
        assert_eq!(progress_for("failed", 3), 0);
    }
}
