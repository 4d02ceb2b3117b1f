use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::app::{
    access::UserAccess,
    db::{
        self,
        bug_tickets::{BugTicketFilter, BUG_SEVERITIES, BUG_STATUSES},
    },
    error::AppError,
    AppState,
};

const BUG_TYPES: &[&str] = &["ui", "functional", "performance", "security"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub project_id: Option<String>,
    pub test_session_id: Option<String>,
    pub status: Option<String>,
    pub severity: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_dimension")]
    pub dimension: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub severity: String,
    pub bug_type: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddCommentPayload {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
}

fn default_limit() -> i64 {
    50
}

fn default_dimension() -> String {
    "status".to_string()
}

/// GET /api/bug-tickets/{id}
pub async fn get_one(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let ticket = db::bug_tickets::find_for_member(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bug ticket not found".to_string()))?;
    let comments = db::bug_comments::list_by_ticket(&mut *tx, &id).await?;
    tx.commit().await?;

    Ok(Json(json!({ "bugTicket": ticket, "comments": comments })))
}

/// GET /api/bug-tickets?project_id=&test_session_id=&status=&severity=
pub async fn list(
    access: UserAccess,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(s) = query.status.as_deref() {
        if !BUG_STATUSES.contains(&s) {
            return Err(AppError::Validation(format!("Unknown status: {s}")));
        }
    }
    if let Some(s) = query.severity.as_deref() {
        if !BUG_SEVERITIES.contains(&s) {
            return Err(AppError::Validation(format!("Unknown severity: {s}")));
        }
    }
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);
    let filter = BugTicketFilter {
        project_id: query.project_id.as_deref(),
        test_session_id: query.test_session_id.as_deref(),
        status: query.status.as_deref(),
        severity: query.severity.as_deref(),
    };

    let mut tx = access.db.begin().await?;
    let tickets = db::bug_tickets::list(&mut *tx, &access.account.id, &filter, limit, offset).await?;
    let total = db::bug_tickets::count(&mut *tx, &access.account.id, &filter).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "bugTickets": tickets,
        "total": total,
        "hasMore": total > offset + limit,
    })))
}

/// PUT /api/bug-tickets/{id}/status — target must be a known status.
pub async fn update_status(
    access: UserAccess,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !BUG_STATUSES.contains(&payload.status.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Invalid status transition target: {}",
            payload.status
        )));
    }

    let mut tx = access.db.begin().await?;
    db::bug_tickets::find_for_member(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bug ticket not found".to_string()))?;
    let ticket = db::bug_tickets::update_status(&mut *tx, &id, &payload.status)
        .await?
        .ok_or_else(|| AppError::NotFound("Bug ticket not found".to_string()))?;
    tx.commit().await?;

    Ok(Json(json!({ "bugTicket": ticket })))
}

/// PUT /api/bug-tickets/{id}
pub async fn update(
    access: UserAccess,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid bug ticket payload".to_string()))?;
    if !BUG_SEVERITIES.contains(&payload.severity.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown severity: {}",
            payload.severity
        )));
    }
    if !BUG_TYPES.contains(&payload.bug_type.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown bug type: {}",
            payload.bug_type
        )));
    }

    let mut tx = access.db.begin().await?;
    db::bug_tickets::find_for_member(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bug ticket not found".to_string()))?;
    let ticket = db::bug_tickets::update_fields(
        &mut *tx,
        &id,
        &payload.title,
        payload.description.as_deref(),
        &payload.severity,
        &payload.bug_type,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Bug ticket not found".to_string()))?;
    tx.commit().await?;

    Ok(Json(json!({ "bugTicket": ticket })))
}

/// GET /api/bug-tickets/{id}/comments
pub async fn list_comments(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    db::bug_tickets::find_for_member(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bug ticket not found".to_string()))?;
    let comments = db::bug_comments::list_by_ticket(&mut *tx, &id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "comments": comments })))
}

/// POST /api/bug-tickets/{id}/comments
pub async fn add_comment(
    access: UserAccess,
    Path(id): Path<String>,
    Json(payload): Json<AddCommentPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid comment payload".to_string()))?;

    let mut tx = access.db.begin().await?;
    let ticket = db::bug_tickets::find_for_member(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Bug ticket not found".to_string()))?;
    let comment_id = db::bug_comments::insert(
        &mut *tx,
        &ticket.organization_id,
        &id,
        &access.account.id,
        &payload.content,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "commentId": comment_id })))
}

/// GET /api/bug-tickets/stats?dimension=status|severity|bug_type
pub async fn stats(
    access: UserAccess,
    Query(query): Query<StatsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let counts = db::bug_tickets::stats(&mut *tx, &access.account.id, &query.dimension).await?;
    tx.commit().await?;

    let mut breakdown = serde_json::Map::new();
    for entry in counts {
        breakdown.insert(entry.key, json!(entry.count));
    }
    Ok(Json(json!({ "counts": breakdown })))
}

/// Bug ticket routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bug-tickets", get(list))
        .route("/api/bug-tickets/stats", get(stats))
        .route("/api/bug-tickets/{id}", get(get_one).put(update))
        .route(
            "/api/bug-tickets/{id}/status",
            axum::routing::put(update_status),
        )
        .route(
            "/api/bug-tickets/{id}/comments",
            get(list_comments).post(add_comment),
        )
}
