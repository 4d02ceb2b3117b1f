use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use validator::Validate;

use crate::app::{
    access::PublicAccess,
    db,
    domain::{AccountId, AccountRole, Email, HashedPassword, OrganizationId, Password},
    error::AppError,
    session::{clear_session_cookie, session_cookie, SESSION_COOKIE},
    AppState,
};

/// Name given to the shared organization that demo registrations land in.
const DEMO_ORGANIZATION_NAME: &str = "Demo organization";

const SESSION_LIFETIME_DAYS: i64 = 30;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDemoPayload {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// POST /api/auth/login — verify credentials, open a session.
pub async fn login(
    access: PublicAccess,
    jar: CookieJar,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid login payload".to_string()))?;

    let email = Email::new(payload.email)
        .map_err(|_| AppError::Validation("Invalid email address".to_string()))?;
    // No strength check at login; rules apply at registration only.
    let password = Password::for_verification(payload.password);

    let mut tx = access.db.begin().await?;
    let account = db::accounts::find_by_email(&mut *tx, email.as_str())
        .await?
        .ok_or_else(|| AppError::Validation("Invalid email or password".to_string()))?;

    let stored = account
        .password_hash
        .clone()
        .map(HashedPassword::from_string)
        .ok_or_else(|| AppError::Validation("Invalid email or password".to_string()))?;
    stored
        .verify(&password)
        .map_err(|_| AppError::Validation("Invalid email or password".to_string()))?;

    let expires_at = OffsetDateTime::now_utc() + Duration::days(SESSION_LIFETIME_DAYS);
    let session_id = db::sessions::create(&mut *tx, &account.id, expires_at).await?;
    tx.commit().await?;

    let jar = jar.add(session_cookie(session_id));
    Ok((jar, Json(json!({ "account": account }))))
}

/// POST /api/auth/logout — drop the session row, clear the cookie.
pub async fn logout(access: PublicAccess, jar: CookieJar) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let mut tx = access.db.begin().await?;
        db::sessions::delete(&mut *tx, cookie.value()).await?;
        tx.commit().await?;
    }
    let jar = jar.add(clear_session_cookie());
    Ok((jar, Json(json!({ "ok": true }))))
}

/// POST /api/auth/register-demo — self-service demo registration.
///
/// All demo registrations share one organization; registering creates an
/// admin-role account in it. Registering an email twice is a conflict, and
/// the second attempt must not create a second demo organization.
pub async fn register_demo(
    access: PublicAccess,
    jar: CookieJar,
    Json(payload): Json<RegisterDemoPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|_| AppError::Validation("Invalid registration payload".to_string()))?;

    let email = Email::new(payload.email)
        .map_err(|_| AppError::Validation("Invalid email address".to_string()))?;
    let password = Password::parse(payload.password)
        .map_err(|e| AppError::Validation(e.message.map(|m| m.to_string()).unwrap_or_else(|| "Weak password".to_string())))?;
    let password_hash = HashedPassword::from_password(&password)
        .map_err(|_| AppError::Internal("password hashing failed".to_string()))?;

    let mut tx = access.db.begin().await?;

    if db::accounts::find_by_email(&mut *tx, email.as_str())
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "An account with this email is already registered".to_string(),
        ));
    }

    // Reuse the demo organization when it exists; creating it and creating
    // the account are one transaction, so a lost race surfaces as a
    // constraint error rather than a duplicate organization.
    let demo_org = match db::organizations::find_by_name(&mut *tx, DEMO_ORGANIZATION_NAME).await? {
        Some(org) => org,
        None => {
            let new_org = db::NewOrganization {
                id: OrganizationId::new(),
                name: DEMO_ORGANIZATION_NAME.to_string(),
                plan: "free".to_string(),
                api_key: db::organizations::generate_api_key(),
                monthly_test_limit: 10,
                trial_ends_at: Some(OffsetDateTime::now_utc() + Duration::days(14)),
            };
            db::organizations::insert(&mut *tx, &new_org).await?
        }
    };

    let organization_id = OrganizationId::from_string(&demo_org.id)
        .map_err(|_| AppError::Internal("malformed organization id".to_string()))?;
    let new_account = db::NewAccount {
        id: AccountId::new(),
        email,
        name: payload.name,
        role: AccountRole::Admin,
        password_hash: Some(password_hash),
        organization_id,
    };
    let account = db::accounts::insert(&mut *tx, &new_account).await?;

    let expires_at = OffsetDateTime::now_utc() + Duration::days(SESSION_LIFETIME_DAYS);
    let session_id = db::sessions::create(&mut *tx, &account.id, expires_at).await?;
    tx.commit().await?;

    let jar = jar.add(session_cookie(session_id));
    Ok((jar, Json(json!({ "account": account }))))
}

/// GET /api/auth/check — role probe for the current session. Never fails:
/// an anonymous caller just gets three `false`s.
pub async fn check(access: PublicAccess, jar: CookieJar) -> Result<impl IntoResponse, AppError> {
    let role = match jar.get(SESSION_COOKIE) {
        Some(cookie) => {
            let mut tx = access.db.begin().await?;
            let session = db::sessions::find_valid(&mut *tx, cookie.value()).await?;
            let account = match session {
                Some(s) => db::accounts::find_by_id(&mut *tx, &s.account_id).await?,
                None => None,
            };
            tx.commit().await?;
            account.and_then(|a| a.role())
        }
        None => None,
    };

    Ok(Json(json!({
        "user": role.is_some(),
        "tenantAdmin": role.is_some_and(|r| r.is_tenant_admin()),
        "admin": role.is_some_and(|r| r.is_admin()),
    })))
}

/// Auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/register-demo", post(register_demo))
        .route("/api/auth/check", get(check))
}
