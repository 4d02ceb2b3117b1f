use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use time::OffsetDateTime;
use validator::Validate;

use crate::app::{
    access::UserAccess,
    db,
    domain::ProjectRole,
    error::AppError,
    report::{GeminiClient, ReportData},
    AppState,
};

const LANGUAGES: &[&str] = &["ja", "en"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub project_id: Option<String>,
    pub test_session_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportPayload {
    pub test_session_id: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[validate(length(min = 1))]
    pub report_content: String,
    pub summary: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct GeneratePayload {
    pub test_session_id: String,
}

fn default_limit() -> i64 {
    50
}

fn default_language() -> String {
    "ja".to_string()
}

/// GET /api/test-reports/{id}
pub async fn get_one(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let report = db::test_reports::find_for_member(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;
    tx.commit().await?;
    Ok(Json(json!({ "report": report })))
}

/// GET /api/test-reports?project_id=&test_session_id=&limit=&offset=
pub async fn list(
    access: UserAccess,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);

    let mut tx = access.db.begin().await?;
    let reports = db::test_reports::list_for_member(
        &mut *tx,
        &access.account.id,
        query.project_id.as_deref(),
        query.test_session_id.as_deref(),
        limit,
        offset,
    )
    .await?;
    let total = db::test_reports::count_for_member(
        &mut *tx,
        &access.account.id,
        query.project_id.as_deref(),
        query.test_session_id.as_deref(),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({
        "reports": reports,
        "total": total,
        "hasMore": total > offset + limit,
    })))
}

/// POST /api/test-reports — store externally produced report content.
pub async fn create(
    access: UserAccess,
    Json(payload): Json<CreateReportPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid report payload".to_string()))?;
    if !LANGUAGES.contains(&payload.language.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown language: {}",
            payload.language
        )));
    }

    let mut tx = access.db.begin().await?;
    let session = db::test_sessions::find_by_id(&mut *tx, &payload.test_session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;
    db::project_members::find(&mut *tx, &session.project_id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;

    let report = db::test_reports::insert(
        &mut *tx,
        &db::test_reports::NewTestReport {
            organization_id: session.organization_id.clone(),
            test_session_id: session.id.clone(),
            account_id: access.account.id.clone(),
            language: payload.language,
            report_content: payload.report_content,
            summary: payload.summary,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "report": report })))
}

/// POST /api/test-reports/generate — assemble the session's data, call the
/// generative API, store the returned HTML verbatim.
pub async fn generate(
    State(state): State<AppState>,
    access: UserAccess,
    Json(payload): Json<GeneratePayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let api_key = state
        .config
        .gemini_api_key
        .clone()
        .ok_or_else(|| AppError::Internal("report API key is not configured".to_string()))?;

    let mut tx = access.db.begin().await?;
    let session = db::test_sessions::find_by_id(&mut *tx, &payload.test_session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test session not found".to_string()))?;
    db::project_members::find(&mut *tx, &session.project_id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::Forbidden("No access to this test session".to_string()))?;
    let project = db::projects::find_active(&mut *tx, &session.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let results = db::test_results::list_by_session(&mut *tx, &session.id, None, 500, 0).await?;
    let bugs = db::bug_tickets::list_by_session(&mut *tx, &session.id).await?;
    let logs = db::session_logs::list_by_session(&mut *tx, &session.id).await?;
    tx.commit().await?;

    let data = ReportData {
        session_id: &session.id,
        project_name: &project.name,
        results: &results,
        bugs: &bugs,
        logs: &logs,
    };

    let client = GeminiClient::new(&state.http, &api_key, &state.config.gemini_model);
    let report_content = client
        .generate_test_report(&data)
        .await
        .map_err(|e| AppError::Internal(format!("report generation failed: {e}")))?;
    let summary = crate::app::report::build_summary(&data, OffsetDateTime::now_utc());

    let mut tx = access.db.begin().await?;
    let report = db::test_reports::insert(
        &mut *tx,
        &db::test_reports::NewTestReport {
            organization_id: session.organization_id.clone(),
            test_session_id: session.id.clone(),
            account_id: access.account.id.clone(),
            language: default_language(),
            report_content,
            summary: Some(summary),
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "report": report })))
}

/// DELETE /api/test-reports/{id} — report owner, or an owner/admin of the
/// project the report's session belongs to.
pub async fn delete(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let report = db::test_reports::find_by_id(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

    let mut allowed = report.account_id == access.account.id;
    if !allowed {
        let session = db::test_sessions::find_by_id(&mut *tx, &report.test_session_id).await?;
        if let Some(session) = session {
            let member =
                db::project_members::find(&mut *tx, &session.project_id, &access.account.id)
                    .await?;
            allowed = member
                .and_then(|m| m.role())
                .is_some_and(ProjectRole::can_manage);
        }
    }
    if !allowed {
        return Err(AppError::Forbidden(
            "No permission to delete this report".to_string(),
        ));
    }

    db::test_reports::delete(&mut *tx, &id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "ok": true })))
}

/// Test report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/test-reports", get(list).post(create))
        .route("/api/test-reports/generate", post(generate))
        .route("/api/test-reports/{id}", get(get_one).delete(delete))
}
