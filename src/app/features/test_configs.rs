use axum::{
    extract::Path,
    routing::get,
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

const MODES: &[&str] = &["omakase", "scenario"];
const BROWSERS: &[&str] = &["chrome", "firefox", "safari", "edge"];

#[derive(Debug, Deserialize, Validate)]
pub struct TestConfigPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_browser")]
    pub browser: String,
    #[serde(default = "default_viewport_width")]
    #[validate(range(min = 320, max = 7680))]
    pub viewport_width: i32,
    #[serde(default = "default_viewport_height")]
    #[validate(range(min = 240, max = 4320))]
    pub viewport_height: i32,
    #[serde(default = "default_max_duration")]
    #[validate(range(min = 60, max = 86400))]
    pub max_duration: i32,
    #[serde(default = "empty_paths")]
    pub excluded_paths: Value,
}

fn default_mode() -> String {
    "omakase".to_string()
}
fn default_browser() -> String {
    "chrome".to_string()
}
fn default_viewport_width() -> i32 {
    1920
}
fn default_viewport_height() -> i32 {
    1080
}
fn default_max_duration() -> i32 {
    3600
}
fn empty_paths() -> Value {
    Value::Array(vec![])
}

fn validate_choices(payload: &TestConfigPayload) -> Result<(), AppError> {
    if !MODES.contains(&payload.mode.as_str()) {
        return Err(AppError::Validation(format!("Unknown mode: {}", payload.mode)));
    }
    if !BROWSERS.contains(&payload.browser.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown browser: {}",
            payload.browser
        )));
    }
    if !payload.excluded_paths.is_array() {
        return Err(AppError::Validation(
            "excluded_paths must be an array".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/test-configs/{id}
pub async fn get_one(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let config = db::test_configs::find_by_id(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test config not found".to_string()))?;
    let session_count = db::test_sessions::count_by_config(&mut *tx, &id).await?;
    tx.commit().await?;
    Ok(Json(json!({
        "testConfig": config,
        "counts": { "testSessions": session_count }
    })))
}

/// GET /api/projects/{project_id}/test-configs
pub async fn list_by_project(
    access: UserAccess,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    db::projects::find_active(&mut *tx, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    let configs = db::test_configs::list_by_project(&mut *tx, &project_id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "testConfigs": configs })))
}

/// POST /api/projects/{project_id}/test-configs
pub async fn create(
    access: UserAccess,
    Path(project_id): Path<String>,
    Json(payload): Json<TestConfigPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid test config payload".to_string()))?;
    validate_choices(&payload)?;

    let mut tx = access.db.begin().await?;
    let project = db::projects::find_active(&mut *tx, &project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let config = db::test_configs::insert(
        &mut *tx,
        &db::test_configs::NewTestConfig {
            organization_id: project.organization_id.clone(),
            project_id: project.id.clone(),
            name: payload.name,
            mode: payload.mode,
            browser: payload.browser,
            viewport_width: payload.viewport_width,
            viewport_height: payload.viewport_height,
            max_duration: payload.max_duration,
            excluded_paths: payload.excluded_paths,
            is_default: false,
        },
    )
    .await?;
    tx.commit().await?;
    Ok(Json(json!({ "testConfig": config })))
}

/// PUT /api/test-configs/{id}
pub async fn update(
    access: UserAccess,
    Path(id): Path<String>,
    Json(payload): Json<TestConfigPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid test config payload".to_string()))?;
    validate_choices(&payload)?;

    let mut tx = access.db.begin().await?;
    let config = db::test_configs::update(
        &mut *tx,
        &id,
        &payload.name,
        &payload.mode,
        &payload.browser,
        payload.viewport_width,
        payload.viewport_height,
        payload.max_duration,
        &payload.excluded_paths,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Test config not found".to_string()))?;
    tx.commit().await?;
    Ok(Json(json!({ "testConfig": config })))
}

/// DELETE /api/test-configs/{id} — the default config stays, and so does
/// anything test sessions still reference.
pub async fn delete(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let config = db::test_configs::find_by_id(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test config not found".to_string()))?;
    if config.is_default {
        return Err(AppError::PreconditionFailed(
            "The default test config cannot be deleted".to_string(),
        ));
    }
    let in_use = db::test_sessions::count_by_config(&mut *tx, &id).await?;
    if in_use > 0 {
        return Err(AppError::PreconditionFailed(
            "Test sessions reference this config".to_string(),
        ));
    }
    db::test_configs::delete(&mut *tx, &id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "ok": true })))
}

/// Test config routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/projects/{id}/test-configs",
            get(list_by_project).post(create),
        )
        .route(
            "/api/test-configs/{id}",
            get(get_one).put(update).delete(delete),
        )
}
