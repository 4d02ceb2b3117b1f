use axum::{
    extract::{Path, Query},
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

const INTEGRATION_TYPES: &[&str] = &["slack", "github", "jira", "webhook"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub project_id: Option<String>,
    #[serde(rename = "type")]
    pub integration_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateIntegrationPayload {
    pub project_id: String,
    #[serde(rename = "type")]
    pub integration_type: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default = "empty_config")]
    pub config: Value,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateIntegrationPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub config: Value,
    pub is_active: bool,
}

fn empty_config() -> Value {
    json!({})
}

fn default_active() -> bool {
    true
}

/// GET /api/integrations/{id}
pub async fn get_one(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let integration = db::integrations::find_by_id(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Integration not found".to_string()))?;
    let project = db::projects::find_active(&mut *tx, &integration.project_id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "integration": integration, "project": project })))
}

/// GET /api/integrations?project_id=&type=
pub async fn list(
    access: UserAccess,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(t) = query.integration_type.as_deref() {
        if !INTEGRATION_TYPES.contains(&t) {
            return Err(AppError::Validation(format!("Unknown integration type: {t}")));
        }
    }

    let mut tx = access.db.begin().await?;
    let integrations = db::integrations::list(
        &mut *tx,
        query.project_id.as_deref(),
        query.integration_type.as_deref(),
    )
    .await?;
    tx.commit().await?;
    Ok(Json(json!({ "integrations": integrations })))
}

/// POST /api/integrations
pub async fn create(
    access: UserAccess,
    Json(payload): Json<CreateIntegrationPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid integration payload".to_string()))?;
    if !INTEGRATION_TYPES.contains(&payload.integration_type.as_str()) {
        return Err(AppError::Validation(format!(
            "Unknown integration type: {}",
            payload.integration_type
        )));
    }

    let mut tx = access.db.begin().await?;
    let project = db::projects::find_active(&mut *tx, &payload.project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    let integration = db::integrations::insert(
        &mut *tx,
        &project.organization_id,
        &project.id,
        &payload.integration_type,
        &payload.name,
        &payload.config,
        payload.is_active,
    )
    .await?;
    tx.commit().await?;
    Ok(Json(json!({ "integration": integration })))
}

/// PUT /api/integrations/{id}
pub async fn update(
    access: UserAccess,
    Path(id): Path<String>,
    Json(payload): Json<UpdateIntegrationPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid integration payload".to_string()))?;

    let mut tx = access.db.begin().await?;
    let integration = db::integrations::update(
        &mut *tx,
        &id,
        &payload.name,
        &payload.config,
        payload.is_active,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Integration not found".to_string()))?;
    tx.commit().await?;
    Ok(Json(json!({ "integration": integration })))
}

/// DELETE /api/integrations/{id}
pub async fn delete(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let deleted = db::integrations::delete(&mut *tx, &id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Integration not found".to_string()));
    }
    tx.commit().await?;
    Ok(Json(json!({ "ok": true })))
}

/// Integration routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/integrations", get(list).post(create))
        .route(
            "/api/integrations/{id}",
            get(get_one).put(update).delete(delete),
        )
}
