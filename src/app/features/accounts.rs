use axum::{
    extract::Path,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::app::{
    access::AdminAccess,
    db,
    domain::{AccountId, AccountRole, Email},
    error::AppError,
    AppState,
};

/// Cross-tenant account management. Admin tier only; every operation runs
/// through the bypassed handle.

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountPayload {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub role: AccountRole,
    pub organization_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountPayload {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub role: AccountRole,
    pub organization_id: String,
}

/// GET /api/accounts — all accounts, all tenants.
pub async fn list(access: AdminAccess) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let accounts = db::accounts::list_all(&mut *tx).await?;
    tx.commit().await?;
    Ok(Json(json!({ "accounts": accounts })))
}

/// GET /api/accounts/{id}
pub async fn get_one(
    access: AdminAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let account = db::accounts::find_by_id(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
    let organization = db::organizations::find_by_id(&mut *tx, &account.organization_id).await?;
    tx.commit().await?;
    Ok(Json(json!({ "account": account, "organization": organization })))
}

/// POST /api/accounts — provision an account into an organization. The
/// account has no password until its owner registers one; provisioning is
/// an allow-list operation.
pub async fn create(
    access: AdminAccess,
    Json(payload): Json<CreateAccountPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid account payload".to_string()))?;
    let email = Email::new(payload.email)
        .map_err(|_| AppError::Validation("Invalid email address".to_string()))?;

    let mut tx = access.db.begin().await?;
    if db::accounts::find_by_email(&mut *tx, email.as_str())
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }
    let organization = db::organizations::find_by_id(&mut *tx, &payload.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    let organization_id = crate::app::domain::OrganizationId::from_string(&organization.id)
        .map_err(|_| AppError::Internal("malformed organization id".to_string()))?;

    let account = db::accounts::insert(
        &mut *tx,
        &db::NewAccount {
            id: AccountId::new(),
            email,
            name: payload.name,
            role: payload.role,
            password_hash: None,
            organization_id,
        },
    )
    .await?;
    tx.commit().await?;
    Ok(Json(json!({ "account": account })))
}

/// PUT /api/accounts/{id}
pub async fn update(
    access: AdminAccess,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAccountPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid account payload".to_string()))?;
    let email = Email::new(payload.email)
        .map_err(|_| AppError::Validation("Invalid email address".to_string()))?;

    let mut tx = access.db.begin().await?;
    let account = db::accounts::update(
        &mut *tx,
        &id,
        email.as_str(),
        &payload.name,
        &payload.role.to_string(),
        &payload.organization_id,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
    tx.commit().await?;
    Ok(Json(json!({ "account": account })))
}

/// DELETE /api/accounts/{id}
pub async fn delete(
    access: AdminAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let deleted = db::accounts::delete(&mut *tx, &id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("Account not found".to_string()));
    }
    tx.commit().await?;
    Ok(Json(json!({ "ok": true })))
}

/// Account management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/accounts", get(list).post(create))
        .route(
            "/api/accounts/{id}",
            get(get_one).put(update).delete(delete),
        )
}
