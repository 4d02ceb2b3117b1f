use axum::{
    extract::Path,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::app::{
    access::UserAccess,
    db,
    domain::ProjectRole,
    error::AppError,
    AppState,
};

/// Tenant isolation note: these handlers run on the guarded handle, so the
/// database already restricts rows to the caller's organization. Membership
/// checks on top of that are authorization, not isolation — and return
/// `NotFound` (not `Forbidden`) where the original does, to avoid leaking
/// whether a project exists.

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    pub is_active: Option<bool>,
}

/// Target URLs must be fetchable by the browser worker.
fn validate_target_url(url: &str) -> Result<(), AppError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(AppError::Validation(
            "url must be an http(s) URL".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberPayload {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    pub role: ProjectRole,
}

/// GET /api/projects — active projects the caller belongs to.
pub async fn list(access: UserAccess) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let projects = db::projects::list_for_account(&mut *tx, &access.account.id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "projects": projects })))
}

/// GET /api/projects/{id}
pub async fn get_one(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let member = db::project_members::find(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    let project = db::projects::find_active(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    let configs = db::test_configs::list_by_project(&mut *tx, &id).await?;
    let session_count = db::test_sessions::count_by_project(&mut *tx, &id, None).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "project": project,
        "memberRole": member.role,
        "testConfigs": configs,
        "counts": { "testSessions": session_count }
    })))
}

/// POST /api/projects — create the project, make the caller its owner and
/// attach a default test config, all in one interactive transaction.
pub async fn create(
    access: UserAccess,
    Json(payload): Json<CreateProjectPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid project payload".to_string()))?;
    validate_target_url(&payload.url)?;

    let org_id = access.account.organization_id.clone();
    let mut tx = access.db.begin().await?;
    let project = db::projects::insert(
        &mut *tx,
        &db::projects::NewProject {
            organization_id: org_id.clone(),
            name: payload.name,
            description: payload.description,
            url: payload.url,
        },
    )
    .await?;
    db::project_members::insert(
        &mut *tx,
        &org_id,
        &project.id,
        &access.account.id,
        ProjectRole::Owner,
    )
    .await?;
    db::test_configs::insert(
        &mut *tx,
        &db::test_configs::NewTestConfig::default_for_project(&org_id, &project.id),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "project": project })))
}

/// PUT /api/projects/{id} — owners and project admins only.
pub async fn update(
    access: UserAccess,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProjectPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid project payload".to_string()))?;
    validate_target_url(&payload.url)?;

    let mut tx = access.db.begin().await?;
    let member = db::project_members::find(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    if !member.role().is_some_and(|r| r.can_manage()) {
        return Err(AppError::Forbidden(
            "No permission to update this project".to_string(),
        ));
    }

    let project = db::projects::update(
        &mut *tx,
        &id,
        &payload.name,
        payload.description.as_deref(),
        &payload.url,
        payload.is_active,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    tx.commit().await?;

    Ok(Json(json!({ "project": project })))
}

/// DELETE /api/projects/{id} — soft delete, owners only. Refused while any
/// test session is still pending or running.
pub async fn delete(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let member = db::project_members::find(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    if member.role() != Some(ProjectRole::Owner) {
        return Err(AppError::Forbidden(
            "No permission to delete this project".to_string(),
        ));
    }

    let active = db::test_sessions::count_active_by_project(&mut *tx, &id).await?;
    if active > 0 {
        return Err(AppError::PreconditionFailed(
            "Test sessions are still running for this project".to_string(),
        ));
    }

    let project = db::projects::soft_delete(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    tx.commit().await?;

    Ok(Json(json!({ "project": project })))
}

/// GET /api/projects/{id}/members
pub async fn list_members(
    access: UserAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    db::project_members::find(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    let members = db::project_members::list_by_project(&mut *tx, &id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "members": members })))
}

/// POST /api/projects/{id}/members — owners and project admins only.
pub async fn add_member(
    access: UserAccess,
    Path(id): Path<String>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid member payload".to_string()))?;
    if payload.role == ProjectRole::Owner {
        return Err(AppError::Validation(
            "Members can be added as admin or member only".to_string(),
        ));
    }

    let mut tx = access.db.begin().await?;
    let current = db::project_members::find(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    if !current.role().is_some_and(|r| r.can_manage()) {
        return Err(AppError::Forbidden(
            "No permission to add members".to_string(),
        ));
    }

    let account = db::accounts::find_by_email(&mut *tx, &payload.email.to_lowercase())
        .await?
        .ok_or_else(|| AppError::NotFound("No account with this email".to_string()))?;

    if db::project_members::find(&mut *tx, &id, &account.id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Already a member of this project".to_string(),
        ));
    }

    let member = db::project_members::insert(
        &mut *tx,
        &access.account.organization_id,
        &id,
        &account.id,
        payload.role,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(json!({ "member": member, "account": account })))
}

/// DELETE /api/projects/{id}/members/{member_id} — the last owner stays.
pub async fn remove_member(
    access: UserAccess,
    Path((id, member_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let current = db::project_members::find(&mut *tx, &id, &access.account.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    if !current.role().is_some_and(|r| r.can_manage()) {
        return Err(AppError::Forbidden(
            "No permission to remove members".to_string(),
        ));
    }

    let target = db::project_members::find_by_id(&mut *tx, &member_id)
        .await?
        .filter(|m| m.project_id == id)
        .ok_or_else(|| AppError::NotFound("Member not found".to_string()))?;

    let owners = db::project_members::count_owners(&mut *tx, &id).await?;
    if owners == 1 && target.role() == Some(ProjectRole::Owner) {
        return Err(AppError::PreconditionFailed(
            "The last owner cannot be removed".to_string(),
        ));
    }

    db::project_members::delete_by_id(&mut *tx, &member_id).await?;
    tx.commit().await?;

    Ok(Json(json!({ "ok": true })))
}

/// Project routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects", get(list).post(create))
        .route(
            "/api/projects/{id}",
            get(get_one).put(update).delete(delete),
        )
        .route(
            "/api/projects/{id}/members",
            get(list_members).post(add_member),
        )
        .route(
            "/api/projects/{id}/members/{member_id}",
            axum::routing::delete(remove_member),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_and_https_urls_accepted() {
        assert!(validate_target_url("https://example.com").is_ok());
        assert!(validate_target_url("http://localhost:8080/shop").is_ok());
    }

    #[test]
    fn other_schemes_rejected() {
        assert!(validate_target_url("ftp://example.com").is_err());
        assert!(validate_target_url("not a url").is_err());
        assert!(validate_target_url("").is_err());
    }
}
