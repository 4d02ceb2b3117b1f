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
async fn create_project_attaches_owner_and_default_config() {
    let pool = require_pool!();
    let app = test_router(pool);
    let cookie = register_demo_cookie(&app, &unique_email("owner")).await;

    let (project_id, _) = create_project(&app, &cookie, "Storefront").await;

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/projects/{project_id}"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
    let value = json_body(response).await;
    assert_eq!(value["memberRole"], "owner");
    assert_eq!(value["testConfigs"].as_array().unwrap().len(), 1);
    assert_eq!(value["testConfigs"][0]["is_default"], true);

    let response = app
        .oneshot(get_request(&format!("/api/projects/{project_id}/members"), Some(&cookie)))
        .await
        .unwrap();
    let value = json_body(response).await;
    assert_eq!(value["members"].as_array().unwrap().len(), 1);
    assert_eq!(value["members"][0]["role"], "owner");
}

#[tokio::test]
async fn create_project_rejects_invalid_url() {
    let pool = require_pool!();
    let app = test_router(pool);
    let cookie = register_demo_cookie(&app, &unique_email("badurl")).await;

    let body = json!({ "name": "Broken", "url": "not a url" });
    let response = app
        .oneshot(json_request_with_cookie("POST", "/api/projects", &cookie, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn project_of_another_member_is_not_found() {
    let pool = require_pool!();
    let app = test_router(pool);

    let owner_cookie = register_demo_cookie(&app, &unique_email("proj-owner")).await;
    let (project_id, _) = create_project(&app, &owner_cookie, "Private").await;

    // same demo organization, but not a member of this project
    let stranger_cookie = register_demo_cookie(&app, &unique_email("stranger")).await;
    let response = app
        .oneshot(get_request(&format!("/api/projects/{project_id}"), Some(&stranger_cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_with_active_session_is_precondition_failed() {
    let pool = require_pool!();
    let app = test_router(pool);
    let cookie = register_demo_cookie(&app, &unique_email("deleter")).await;
    let (project_id, config_id) = create_project(&app, &cookie, "Busy").await;

    // queue a run: session enters status pending
    let body = json!({ "project_id": project_id, "test_config_id": config_id });
    let response = app
        .clone()
        .oneshot(json_request_with_cookie("POST", "/api/test-sessions", &cookie, &body))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
    let session_id = json_body(response).await["testSession"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(json_request_with_cookie(
            "DELETE",
            &format!("/api/projects/{project_id}"),
            &cookie,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::PRECONDITION_FAILED);

    // project untouched
    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/projects/{project_id}"), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);

    // cancelling the session unblocks deletion
    let response = app
        .clone()
        .oneshot(json_request_with_cookie(
            "POST",
            &format!("/api/test-sessions/{session_id}/cancel"),
            &cookie,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);

    let response = app
        .oneshot(json_request_with_cookie(
            "DELETE",
            &format!("/api/projects/{project_id}"),
            &cookie,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
}

#[tokio::test]
async fn member_management_round_trip() {
    let pool = require_pool!();
    let app = test_router(pool);

    let owner_cookie = register_demo_cookie(&app, &unique_email("mm-owner")).await;
    let colleague_email = unique_email("mm-colleague");
    register_demo_cookie(&app, &colleague_email).await;

    let (project_id, _) = create_project(&app, &owner_cookie, "Team project").await;

    // unknown email
    let body = json!({ "email": unique_email("nobody"), "role": "member" });
    let response = app
        .clone()
        .oneshot(json_request_with_cookie(
            "POST",
            &format!("/api/projects/{project_id}/members"),
            &owner_cookie,
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::NOT_FOUND);

    // add the colleague
    let body = json!({ "email": colleague_email, "role": "member" });
    let response = app
        .clone()
        .oneshot(json_request_with_cookie(
            "POST",
            &format!("/api/projects/{project_id}/members"),
            &owner_cookie,
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
    let member_id = json_body(response).await["member"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // adding again conflicts
    let body = json!({ "email": colleague_email, "role": "member" });
    let response = app
        .clone()
        .oneshot(json_request_with_cookie(
            "POST",
            &format!("/api/projects/{project_id}/members"),
            &owner_cookie,
            &body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::CONFLICT);

    // removing the colleague is fine
    let response = app
        .clone()
        .oneshot(json_request_with_cookie(
            "DELETE",
            &format!("/api/projects/{project_id}/members/{member_id}"),
            &owner_cookie,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);

    // the last owner cannot be removed
    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/projects/{project_id}/members"), Some(&owner_cookie)))
        .await
        .unwrap();
    let value = json_body(response).await;
    let owner_member_id = value["members"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(json_request_with_cookie(
            "DELETE",
            &format!("/api/projects/{project_id}/members/{owner_member_id}"),
            &owner_cookie,
            &json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::PRECONDITION_FAILED);
}
