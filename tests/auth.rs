use serde_json::json;
use tower::ServiceExt;

mod common;

use crate::common::*;

macro_rules! require_pool {
    () => {
        match common::test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("skipping: no test database configured");
                return;
            }
        }
    };
}

#[tokio::test]
async fn register_demo_sets_session_cookie() {
    let pool = require_pool!();
    let app = test_router(pool);

    let email = unique_email("register");
    let cookie = register_demo_cookie(&app, &email).await;
    assert!(cookie.starts_with("session_id="));

    // cookie works against a user-tier endpoint
    let response = app
        .oneshot(get_request("/api/projects", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
}

#[tokio::test]
async fn register_demo_twice_conflicts_without_duplicating_demo_org() {
    let pool = require_pool!();
    let app = test_router(pool.clone());

    let email = unique_email("conflict");
    register_demo_cookie(&app, &email).await;

    let orgs_before: i64 =
        sqlx::query_scalar("SELECT count(*) FROM organizations WHERE name = 'Demo organization'")
            .fetch_one(&pool)
            .await
            .unwrap();

    let body = json!({ "email": email, "name": "Again", "password": "Password123" });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/register-demo", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::CONFLICT);

    let orgs_after: i64 =
        sqlx::query_scalar("SELECT count(*) FROM organizations WHERE name = 'Demo organization'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(orgs_before, orgs_after);
}

#[tokio::test]
async fn login_with_wrong_password_rejected() {
    let pool = require_pool!();
    let app = test_router(pool);

    let email = unique_email("wrongpw");
    register_demo_cookie(&app, &email).await;

    let body = json!({ "email": email, "password": "NotThePassword1" });
    let response = app
        .oneshot(json_request("POST", "/api/auth/login", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_tier_requires_session() {
    let pool = require_pool!();
    let app = test_router(pool);

    let response = app
        .oneshot(get_request("/api/projects", None))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_tiers_require_session() {
    let pool = require_pool!();
    let app = test_router(pool);

    let response = app
        .clone()
        .oneshot(get_request("/api/accounts", None))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get_request("/api/organizations/accounts", None))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_role_forbidden_on_admin_tiers() {
    let pool = require_pool!();
    let app = test_router(pool.clone());

    let email = unique_email("plainuser");
    let (cookie, _, _) = account_with_role(
        &pool,
        &app,
        &email,
        qa3::app::domain::AccountRole::User,
    )
    .await;

    // tenant-admin tier
    let response = app
        .clone()
        .oneshot(get_request("/api/organizations/accounts", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::FORBIDDEN);

    // admin tier
    let response = app
        .oneshot(get_request("/api/accounts", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn tenant_admin_passes_tenant_tier_but_not_admin_tier() {
    let pool = require_pool!();
    let app = test_router(pool.clone());

    let email = unique_email("tenantadmin");
    let (cookie, _, _) = account_with_role(
        &pool,
        &app,
        &email,
        qa3::app::domain::AccountRole::TenantAdmin,
    )
    .await;

    let response = app
        .clone()
        .oneshot(get_request("/api/organizations/accounts", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/accounts", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn valid_session_with_deleted_account_is_unauthorized() {
    let pool = require_pool!();
    let app = test_router(pool.clone());

    let email = unique_email("ghost");
    let (cookie, account_id, _) = account_with_role(
        &pool,
        &app,
        &email,
        qa3::app::domain::AccountRole::User,
    )
    .await;

    // delete the account out from under the live session
    let scoped = qa3::app::tenant::ScopedDb::bypassed(pool.clone());
    let mut tx = scoped.begin().await.unwrap();
    qa3::app::db::accounts::delete(&mut *tx, &account_id)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let response = app
        .oneshot(get_request("/api/projects", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let pool = require_pool!();
    let app = test_router(pool);

    let email = unique_email("logout");
    let cookie = register_demo_cookie(&app, &email).await;

    let response = app
        .clone()
        .oneshot(json_request_with_cookie(
            "POST",
            "/api/auth/logout",
            &cookie,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/projects", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn check_reports_roles_for_anonymous_and_admin() {
    let pool = require_pool!();
    let app = test_router(pool);

    let response = app
        .clone()
        .oneshot(get_request("/api/auth/check", None))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value["user"], false);
    assert_eq!(value["admin"], false);

    let email = unique_email("check");
    let cookie = register_demo_cookie(&app, &email).await;
    let response = app
        .oneshot(get_request("/api/auth/check", Some(&cookie)))
        .await
        .unwrap();
    let value = json_body(response).await;
    // demo registrations get the admin role
    assert_eq!(value["user"], true);
    assert_eq!(value["tenantAdmin"], true);
    assert_eq!(value["admin"], true);
}
