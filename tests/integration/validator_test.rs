//! Integration tests for the session validator on protected calls.

use http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_protected_call_requires_session_header() {
    let app = TestApp::new(2);
    let token = app.mint_token("auth0|alice");
    app.register_admitted(&token, "Laptop").await;

    let response = app
        .request("GET", "/api/account/me", None, Some(&token), &[])
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_call_rejects_malformed_session_id() {
    let app = TestApp::new(2);
    let token = app.mint_token("auth0|alice");

    let response = app
        .request(
            "GET",
            "/api/account/me",
            None,
            Some(&token),
            &[("X-Session-Id", "not-a-uuid")],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_call_rejects_unknown_session() {
    let app = TestApp::new(2);
    let token = app.mint_token("auth0|alice");

    let response = app.me(&token, Uuid::new_v4()).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_protected_call_rejects_pending_candidate() {
    let app = TestApp::new(1);
    let token = app.mint_token("auth0|alice");

    app.register_admitted(&token, "Laptop").await;
    let candidate = app.register_over_quota(&token, "Phone").await;

    // A candidate is not usable until it is resolved.
    let response = app.me(&token, candidate).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_protected_call_rejects_foreign_session() {
    let app = TestApp::new(2);
    let alice = app.mint_token("auth0|alice");
    let mallory = app.mint_token("auth0|mallory");

    let alices_session = app.register_admitted(&alice, "Laptop").await;

    // A valid token for a different account cannot use Alice's session.
    let response = app.me(&mallory, alices_session).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_is_observable_on_next_request() {
    let app = TestApp::new(2);
    let token = app.mint_token("auth0|alice");

    let session = app.register_admitted(&token, "Laptop").await;

    let probe = app.me(&token, session).await;
    assert_eq!(probe.status, StatusCode::OK);

    app.request(
        "POST",
        "/api/sessions/logout",
        Some(json!({ "session_id": session })),
        Some(&token),
        &[("X-Session-Id", &session.to_string())],
    )
    .await;

    // Even though the bearer token is still valid, the session is gone.
    let probe = app.me(&token, session).await;
    assert_eq!(probe.status, StatusCode::UNAUTHORIZED);
    assert_eq!(probe.body["error"], "SESSION_REVOKED");
}

#[tokio::test]
async fn test_session_list_includes_revoked_history() {
    let app = TestApp::new(1);
    let token = app.mint_token("auth0|alice");

    let laptop = app.register_admitted(&token, "Laptop").await;
    let phone = app.register_over_quota(&token, "Phone").await;

    let response = app
        .request(
            "POST",
            "/api/sessions/force-activate",
            Some(json!({ "candidate_id": phone, "target_id": laptop })),
            Some(&token),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let list = app
        .request(
            "GET",
            "/api/sessions",
            None,
            Some(&token),
            &[("X-Session-Id", &phone.to_string())],
        )
        .await;

    assert_eq!(list.status, StatusCode::OK);
    let sessions = list.body["sessions"].as_array().expect("sessions array");
    assert_eq!(sessions.len(), 2);

    // The displaced laptop stays visible as revoked history.
    let laptop_row = sessions
        .iter()
        .find(|s| s["id"] == json!(laptop))
        .expect("laptop in history");
    assert_eq!(laptop_row["status"], "revoked");
}
