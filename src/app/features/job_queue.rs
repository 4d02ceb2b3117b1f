use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::{
    access::UserAccess,
    db,
    error::AppError,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

/// GET /api/test-sessions/{session_id}/jobs — job rows for one session,
/// newest first; what the UI polls while a run is queued.
pub async fn list_by_session(
    access: UserAccess,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    db::test_sessions::find_by_id(&mut *tx, &session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;
    let jobs = db::job_queue::list_by_session(&mut *tx, &session_id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "jobs": jobs })))
}

/// GET /api/jobs/pending?limit= — worker pickup order; admin role only.
pub async fn list_pending(
    access: UserAccess,
    Query(query): Query<PendingQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !access.account.role().is_some_and(|r| r.is_admin()) {
        return Err(AppError::Forbidden(
            "Administrator role required".to_string(),
        ));
    }
    let limit = query.limit.clamp(1, 100);

    let mut tx = access.db.begin().await?;
    let jobs = db::job_queue::list_pending(&mut *tx, limit).await?;
    tx.commit().await?;
    Ok(Json(json!({ "jobs": jobs })))
}

/// GET /api/jobs/stats — counts grouped by type and status.
pub async fn stats(access: UserAccess) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let counts = db::job_queue::stats(&mut *tx).await?;
    tx.commit().await?;

    // { "<type>": { "<status>": n, ... }, ... }
    let mut by_type = serde_json::Map::new();
    for entry in counts {
        let bucket = by_type
            .entry(entry.r#type)
            .or_insert_with(|| json!({}));
        if let Some(map) = bucket.as_object_mut() {
            map.insert(entry.status, json!(entry.count));
        }
    }
    Ok(Json(json!({ "stats": by_type })))
}

/// Job queue routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/test-sessions/{id}/jobs", get(list_by_session))
        .route("/api/jobs/pending", get(list_pending))
        .route("/api/jobs/stats", get(stats))
}
