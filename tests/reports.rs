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

/// Queue a session so reports have something to hang off.
async fn session_for(app: &axum::Router, cookie: &str) -> String {
    let (project_id, config_id) = create_project(app, cookie, "Reported").await;
    let body = json!({ "project_id": project_id, "test_config_id": config_id });
    let response = app
        .clone()
        .oneshot(json_request_with_cookie("POST", "/api/test-sessions", cookie, &body))
        .await
        .unwrap();
    json_body(response).await["testSession"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn store_and_fetch_external_report() {
    let pool = require_pool!();
    let app = test_router(pool);
    let cookie = register_demo_cookie(&app, &unique_email("report")).await;
    let session_id = session_for(&app, &cookie).await;

    let body = json!({
        "test_session_id": session_id,
        "language": "en",
        "report_content": "<html><body>fine</body></html>",
        "summary": { "totalTests": 0 },
    });
    let response = app
        .clone()
        .oneshot(json_request_with_cookie("POST", "/api/test-reports", &cookie, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
    let report_id = json_body(response).await["report"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/test-reports/{report_id}"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value["report"]["report_content"], "<html><body>fine</body></html>");
    assert_eq!(value["report"]["language"], "en");

    // listing by session finds it
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/test-reports?test_session_id={session_id}"),
            Some(&cookie),
        ))
        .await
        .unwrap();
    let value = json_body(response).await;
    assert_eq!(value["total"], 1);

    // owner may delete
    let response = app
        .oneshot(json_request_with_cookie(
            "DELETE",
            &format!("/api/test-reports/{report_id}"),
            &cookie,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
}

#[tokio::test]
async fn store_report_with_unknown_language_rejected() {
    let pool = require_pool!();
    let app = test_router(pool);
    let cookie = register_demo_cookie(&app, &unique_email("lang")).await;
    let session_id = session_for(&app, &cookie).await;

    let body = json!({
        "test_session_id": session_id,
        "language": "tlh",
        "report_content": "<html></html>",
    });
    let response = app
        .oneshot(json_request_with_cookie("POST", "/api/test-reports", &cookie, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_without_api_key_is_internal_error() {
    let pool = require_pool!();
    // Config::for_tests() carries no Gemini key
    let app = test_router(pool);
    let cookie = register_demo_cookie(&app, &unique_email("nokey")).await;
    let session_id = session_for(&app, &cookie).await;

    let body = json!({ "test_session_id": session_id });
    let response = app
        .oneshot(json_request_with_cookie(
            "POST",
            "/api/test-reports/generate",
            &cookie,
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn report_of_foreign_project_is_not_found() {
    let pool = require_pool!();
    let app = test_router(pool);

    let owner_cookie = register_demo_cookie(&app, &unique_email("rep-owner")).await;
    let session_id = session_for(&app, &owner_cookie).await;

    let body = json!({
        "test_session_id": session_id,
        "report_content": "<html></html>",
    });
    let response = app
        .clone()
        .oneshot(json_request_with_cookie(
            "POST",
            "/api/test-reports",
            &owner_cookie,
            &body,
        ))
        .await
        .unwrap();
    let report_id = json_body(response).await["report"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let stranger_cookie = register_demo_cookie(&app, &unique_email("rep-stranger")).await;
    let response = app
        .oneshot(get_request(&format!("/api/test-reports/{report_id}"), Some(&stranger_cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
}
