use axum::{
    extract::Path,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use validator::Validate;

use crate::app::{
    access::{AdminAccess, TenantAdminAccess, UserAccess},
    db,
    domain::OrganizationId,
    error::AppError,
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default = "default_test_limit")]
    pub monthly_test_limit: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrganizationPayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub plan: String,
    pub monthly_test_limit: i32,
}

fn default_plan() -> String {
    "free".to_string()
}

fn default_test_limit() -> i32 {
    10
}

const PLANS: &[&str] = &["free", "professional", "enterprise"];

fn validate_plan(plan: &str) -> Result<(), AppError> {
    if PLANS.contains(&plan) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Unknown plan: {plan}")))
    }
}

/// GET /api/organizations/current — the caller's organization with counts.
pub async fn current(access: UserAccess) -> Result<Json<serde_json::Value>, AppError> {
    let org_id = access.account.organization_id.clone();
    let mut tx = access.db.begin().await?;
    let organization = db::organizations::find_by_id(&mut *tx, &org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    let project_count = db::projects::count_by_organization(&mut *tx, &org_id).await?;
    let account_count = db::accounts::count_by_organization(&mut *tx, &org_id).await?;
    let month_start = db::usage_stats::month_bucket(OffsetDateTime::now_utc())
        .midnight()
        .assume_utc();
    let test_sessions_this_month =
        db::test_sessions::count_for_organization_since(&mut *tx, &org_id, month_start).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "organization": organization,
        "counts": {
            "projects": project_count,
            "accounts": account_count,
            "testSessions": test_sessions_this_month,
        }
    })))
}

/// GET /api/organizations/usage — current-month usage against the plan limit.
pub async fn usage(access: UserAccess) -> Result<Json<serde_json::Value>, AppError> {
    let org_id = access.account.organization_id.clone();
    let month = db::usage_stats::month_bucket(OffsetDateTime::now_utc());

    let mut tx = access.db.begin().await?;
    let stats = db::usage_stats::find(&mut *tx, &org_id, month).await?;
    let organization = db::organizations::find_by_id(&mut *tx, &org_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    tx.commit().await?;

    let current = match stats {
        Some(s) => json!({
            "testSessionCount": s.test_session_count,
            "bugReportCount": s.bug_report_count,
            "totalTestMinutes": s.total_test_minutes,
        }),
        None => json!({
            "testSessionCount": 0,
            "bugReportCount": 0,
            "totalTestMinutes": 0,
        }),
    };

    Ok(Json(json!({
        "currentUsage": current,
        "limit": organization.monthly_test_limit,
        "plan": organization.plan,
    })))
}

/// GET /api/organizations/accounts — the caller's organization members
/// (tenant-admin tier). No explicit filter: the handle is guarded, so the
/// row-security policy itself restricts the listing to the caller's tenant.
pub async fn list_accounts(access: TenantAdminAccess) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let accounts = db::accounts::list_all(&mut *tx).await?;
    tx.commit().await?;
    Ok(Json(json!({ "accounts": accounts })))
}

/// GET /api/organizations — every tenant (admin tier).
pub async fn list(access: AdminAccess) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let organizations = db::organizations::list_all(&mut *tx).await?;
    tx.commit().await?;
    Ok(Json(json!({ "organizations": organizations })))
}

/// GET /api/organizations/{id} (admin tier)
pub async fn get_one(
    access: AdminAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let organization = db::organizations::find_by_id(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    let project_count = db::projects::count_by_organization(&mut *tx, &id).await?;
    let account_count = db::accounts::count_by_organization(&mut *tx, &id).await?;
    tx.commit().await?;
    Ok(Json(json!({
        "organization": organization,
        "counts": { "projects": project_count, "accounts": account_count }
    })))
}

/// POST /api/organizations (admin tier) — free plan starts a 14-day trial.
pub async fn create(
    access: AdminAccess,
    Json(payload): Json<CreateOrganizationPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid organization payload".to_string()))?;
    validate_plan(&payload.plan)?;
    if payload.monthly_test_limit < 0 {
        return Err(AppError::Validation(
            "monthly_test_limit must be non-negative".to_string(),
        ));
    }

    let trial_ends_at = if payload.plan == "free" {
        Some(OffsetDateTime::now_utc() + Duration::days(14))
    } else {
        None
    };

    let mut tx = access.db.begin().await?;
    let organization = db::organizations::insert(
        &mut *tx,
        &db::NewOrganization {
            id: OrganizationId::new(),
            name: payload.name,
            plan: payload.plan,
            api_key: db::organizations::generate_api_key(),
            monthly_test_limit: payload.monthly_test_limit,
            trial_ends_at,
        },
    )
    .await?;
    tx.commit().await?;
    Ok(Json(json!({ "organization": organization })))
}

/// PUT /api/organizations/{id} (admin tier)
pub async fn update(
    access: AdminAccess,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOrganizationPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid organization payload".to_string()))?;
    validate_plan(&payload.plan)?;
    if payload.monthly_test_limit < 0 {
        return Err(AppError::Validation(
            "monthly_test_limit must be non-negative".to_string(),
        ));
    }

    let mut tx = access.db.begin().await?;
    let organization = db::organizations::update(
        &mut *tx,
        &id,
        &payload.name,
        &payload.plan,
        payload.monthly_test_limit,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    tx.commit().await?;
    Ok(Json(json!({ "organization": organization })))
}

/// POST /api/organizations/{id}/regenerate-api-key (admin tier)
pub async fn regenerate_api_key(
    access: AdminAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut tx = access.db.begin().await?;
    let api_key = db::organizations::regenerate_api_key(&mut *tx, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))?;
    tx.commit().await?;
    Ok(Json(json!({ "apiKey": api_key })))
}

/// Organization routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/organizations", get(list).post(create))
        .route("/api/organizations/current", get(current))
        .route("/api/organizations/usage", get(usage))
        .route("/api/organizations/accounts", get(list_accounts))
        .route("/api/organizations/{id}", get(get_one).put(update))
        .route(
            "/api/organizations/{id}/regenerate-api-key",
            post(regenerate_api_key),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_allow_list() {
        assert!(validate_plan("free").is_ok());
        assert!(validate_plan("professional").is_ok());
        assert!(validate_plan("enterprise").is_ok());
        assert!(validate_plan("platinum").is_err());
    }
}
