//! Access tiers.
//!
//! Each API handler declares its tier by taking one of these extractors.
//! The extractor authenticates the request (session cookie → session row →
//! account row), checks the role where the tier demands one, and attaches
//! the correctly-scoped database handle:
//!
//! - [`PublicAccess`] — no session; bypassed handle (pre-login checks only).
//! - [`UserAccess`] — session + account required; handle guarded by the
//!   account's organization.
//! - [`TenantAdminAccess`] — additionally role ∈ {admin, tenantAdmin};
//!   guarded handle.
//! - [`AdminAccess`] — role = admin; bypassed handle (platform admins
//!   manage all organizations).
//!
//! Session and account lookups always go through a bypassed handle: the
//! tenant isn't known until the account row has been read. A valid session
//! whose account row has since been deleted is an authentication failure,
//! not a crash.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;

use crate::app::{
    db::{self, Account},
    domain::OrganizationId,
    error::AppError,
    session::SESSION_COOKIE,
    tenant::ScopedDb,
    AppState,
};

/// Tier 1: no authentication. Carries a bypassed handle for pre-login
/// lookups.
pub struct PublicAccess {
    pub db: ScopedDb,
}

/// Tier 2: any authenticated account.
pub struct UserAccess {
    pub db: ScopedDb,
    pub account: Account,
}

/// Tier 3: organization administrators (and platform admins).
pub struct TenantAdminAccess {
    pub db: ScopedDb,
    pub account: Account,
}

/// Tier 4: platform administrators. The handle bypasses tenant filtering.
pub struct AdminAccess {
    pub db: ScopedDb,
    pub account: Account,
}

/// Resolve the session cookie to an account, or fail with `Unauthorized`.
async fn authenticate(state: &AppState, parts: &Parts) -> Result<Account, AppError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let bypassed = ScopedDb::bypassed(state.pool.clone());
    let mut tx = bypassed.begin().await?;
    let session = db::sessions::find_valid(&mut *tx, &token)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let account = db::accounts::find_by_id(&mut *tx, &session.account_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    tx.commit().await?;

    Ok(account)
}

/// The guarded handle for an account's organization.
fn guarded_for(state: &AppState, account: &Account) -> Result<ScopedDb, AppError> {
    let organization = OrganizationId::from_string(&account.organization_id)
        .map_err(|_| AppError::Internal("malformed organization id on account".to_string()))?;
    Ok(ScopedDb::guarded(state.pool.clone(), organization))
}

impl FromRequestParts<AppState> for PublicAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self {
            db: ScopedDb::bypassed(state.pool.clone()),
        })
    }
}

impl FromRequestParts<AppState> for UserAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = authenticate(state, parts).await?;
        let db = guarded_for(state, &account)?;
        Ok(Self { db, account })
    }
}

impl FromRequestParts<AppState> for TenantAdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = authenticate(state, parts).await?;
        if !account.role().is_some_and(|r| r.is_tenant_admin()) {
            return Err(AppError::Forbidden(
                "Tenant administrator role required".to_string(),
            ));
        }
        let db = guarded_for(state, &account)?;
        Ok(Self { db, account })
    }
}

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = authenticate(state, parts).await?;
        if !account.role().is_some_and(|r| r.is_admin()) {
            return Err(AppError::Forbidden(
                "Administrator role required".to_string(),
            ));
        }
        Ok(Self {
            db: ScopedDb::bypassed(state.pool.clone()),
            account,
        })
    }
}
