#![allow(dead_code)]

use axum::body::Body;
use http_body_util::BodyExt;
use qa3::app::{
    self,
    domain::{AccountId, AccountRole, Email, HashedPassword, OrganizationId, Password},
    tenant::ScopedDb,
};
use qa3::create_router;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

/// Connect to the test database, or None when no database is configured.
/// Tests early-return on None so the suite passes on machines without
/// Postgres.
pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    sqlx::migrate!("./migrations").run(&pool).await.ok()?;
    Some(pool)
}

pub fn test_router(pool: PgPool) -> axum::Router {
    let state = app::AppState {
        pool,
        config: app::config::Config::for_tests(),
        http: reqwest::Client::new(),
    };
    create_router(state)
}

/// Unique email per test run to keep tests independent on a shared database.
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, ulid::Ulid::new()).to_lowercase()
}

pub fn extract_session_id_from_cookie(set_cookie_header: &str) -> Option<&str> {
    set_cookie_header.split(';').next()?.strip_prefix("session_id=")
}

pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> http::Request<Body> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request_with_cookie(
    method: &str,
    uri: &str,
    cookie: &str,
    body: &Value,
) -> http::Request<Body> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("cookie", cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> http::Request<Body> {
    let mut builder = http::Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Register a demo account through the API, return its cookie header.
/// Demo accounts land in the shared demo organization with the admin role.
pub async fn register_demo_cookie(app: &axum::Router, email: &str) -> String {
    let body = json!({
        "email": email,
        "name": "Demo Tester",
        "password": "Password123",
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/register-demo", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK, "demo registration failed");
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("registration sets a session cookie")
        .to_str()
        .unwrap();
    let session_id = extract_session_id_from_cookie(set_cookie).unwrap();
    format!("session_id={}", session_id)
}

/// Create an organization and an account with the given role directly via
/// the db layer (through the bypassed handle — the app role is subject to
/// RLS), then log in through the API. Returns (cookie, account_id, org_id).
pub async fn account_with_role(
    pool: &PgPool,
    app: &axum::Router,
    email: &str,
    role: AccountRole,
) -> (String, String, String) {
    use qa3::app::db;

    let scoped = ScopedDb::bypassed(pool.clone());
    let mut tx = scoped.begin().await.unwrap();

    let org = db::organizations::insert(
        &mut *tx,
        &db::NewOrganization {
            id: OrganizationId::new(),
            name: format!("Org {}", ulid::Ulid::new()),
            plan: "free".to_string(),
            api_key: db::organizations::generate_api_key(),
            monthly_test_limit: 10,
            trial_ends_at: None,
        },
    )
    .await
    .unwrap();

    let password = Password::parse("Password123".to_string()).unwrap();
    let account = db::accounts::insert(
        &mut *tx,
        &db::NewAccount {
            id: AccountId::new(),
            email: Email::new(email.to_string()).unwrap(),
            name: "Role Tester".to_string(),
            role,
            password_hash: Some(HashedPassword::from_password(&password).unwrap()),
            organization_id: OrganizationId::from_string(&org.id).unwrap(),
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let cookie = login_cookie(app, email, "Password123").await;
    (cookie, account.id, org.id)
}

/// Log in through the API, return the cookie header.
pub async fn login_cookie(app: &axum::Router, email: &str, password: &str) -> String {
    let body = json!({ "email": email, "password": password });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/login", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK, "login failed");
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .expect("login sets a session cookie")
        .to_str()
        .unwrap();
    let session_id = extract_session_id_from_cookie(set_cookie).unwrap();
    format!("session_id={}", session_id)
}

/// Create a project through the API, return (project_id, default_config_id).
pub async fn create_project(app: &axum::Router, cookie: &str, name: &str) -> (String, String) {
    let body = json!({ "name": name, "url": "https://example.com" });
    let response = app
        .clone()
        .oneshot(json_request_with_cookie("POST", "/api/projects", cookie, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK, "project creation failed");
    let value = json_body(response).await;
    let project_id = value["project"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/projects/{project_id}"), Some(cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
    let value = json_body(response).await;
    let config_id = value["testConfigs"][0]["id"].as_str().unwrap().to_string();

    (project_id, config_id)
}
