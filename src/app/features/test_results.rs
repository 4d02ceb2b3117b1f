use axum::{
    extract::{Path, Query},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::app::{
    access::UserAccess,
    db,
    error::AppError,
    AppState,
};

const RESULT_STATUSES: &[&str] = &["passed", "failed", "skipped"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateResultPayload {
    pub test_session_id: String,
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    pub status: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub execution_time_ms: i32,
    pub screenshot: Option<String>,
    pub console_logs: Option<Value>,
    pub network_logs: Option<Value>,
    pub user_actions: Option<Value>,
}

/// GET /api/test-sessions/{session_id}/results
pub async fn list_by_session(
    access: UserAccess,
    Path(session_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = query.status.as_deref();
    if let Some(s) = status {
        if !RESULT_STATUSES.contains(&s) {
            return Err(AppError::Validation(format!("Unknown status: {s}")));
        }
    }
    let limit = query.limit.clamp(1, 500);
    let offset = query.offset.max(0);

    let mut tx = access.db.begin().await?;
    db::test_sessions::find_by_id(&mut *tx, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;
    let results =
        db::test_results::list_by_session(&mut *tx, &session_id, status, limit, offset).await?;
    let total = db::test_results::count_by_session(&mut *tx, &session_id, status).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "results": results,
        "total": total,
        "hasMore": total > offset + limit,
    })))
}

/// POST /api/test-results — write-back path for result rows.
pub async fn create(
    access: UserAccess,
    Json(payload): Json<CreateResultPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid test result payload".to_string()))?;
    if !RESULT_STATUSES.contains(&payload.status.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown status: {}",
            payload.status
        )));
    }

    let mut tx = access.db.begin().await?;
    let session = db::test_sessions::find_by_id(&mut *tx, &payload.test_session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;

    let result = db::test_results::insert(
        &mut *tx,
        &db::test_results::NewTestResult {
            organization_id: session.organization_id.clone(),
            test_session_id: session.id.clone(),
            url: payload.url,
            status: payload.status,
            execution_time_ms: payload.execution_time_ms,
            screenshot: payload.screenshot,
            console_logs: payload.console_logs,
            network_logs: payload.network_logs,
            user_actions: payload.user_actions,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "result": result })))
}

/// Test result routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/test-sessions/{id}/results",
            get(list_by_session),
        )
        .route("/api/test-results", post(create))
}
