//! Integration tests for the cancel / force-activate resolution handshake.

use http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use devicegate_admission::store::SessionStore;

use crate::helpers::{TestApp, session_id_from};

#[tokio::test]
async fn test_force_activate_end_to_end() {
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
    assert_eq!(session_id_from(&response.body, "session_id"), phone);

    // The displaced laptop is rejected on its very next protected call.
    let laptop_probe = app.me(&token, laptop).await;
    assert_eq!(laptop_probe.status, StatusCode::UNAUTHORIZED);
    assert_eq!(laptop_probe.body["error"], "SESSION_REVOKED");

    // The phone's session is now the working one.
    let phone_probe = app.me(&token, phone).await;
    assert_eq!(phone_probe.status, StatusCode::OK);
    assert_eq!(phone_probe.body["account_id"], "auth0|alice");

    // The swap did not change the active count.
    assert_eq!(app.store.count_active("auth0|alice").await.unwrap(), 1);
}

#[tokio::test]
async fn test_cancel_end_to_end() {
    let app = TestApp::new(1);
    let token = app.mint_token("auth0|alice");

    let laptop = app.register_admitted(&token, "Laptop").await;
    let phone = app.register_over_quota(&token, "Phone").await;

    let response = app
        .request(
            "POST",
            "/api/sessions/cancel",
            Some(json!({ "session_id": phone })),
            Some(&token),
            &[],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "cancelled");

    // The existing session is untouched.
    let laptop_probe = app.me(&token, laptop).await;
    assert_eq!(laptop_probe.status, StatusCode::OK);

    // The cancelled candidate is retained as revoked and never admitted.
    let phone_probe = app.me(&token, phone).await;
    assert_eq!(phone_probe.status, StatusCode::UNAUTHORIZED);
    assert_eq!(phone_probe.body["error"], "SESSION_REVOKED");
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let app = TestApp::new(1);
    let token = app.mint_token("auth0|alice");

    app.register_admitted(&token, "Laptop").await;
    let phone = app.register_over_quota(&token, "Phone").await;

    let first = app
        .request(
            "POST",
            "/api/sessions/cancel",
            Some(json!({ "session_id": phone })),
            Some(&token),
            &[],
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["status"], "cancelled");

    let second = app
        .request(
            "POST",
            "/api/sessions/cancel",
            Some(json!({ "session_id": phone })),
            Some(&token),
            &[],
        )
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["status"], "already_resolved");
}

#[tokio::test]
async fn test_cancel_unknown_candidate_is_not_found() {
    let app = TestApp::new(1);
    let token = app.mint_token("auth0|alice");

    let response = app
        .request(
            "POST",
            "/api/sessions/cancel",
            Some(json!({ "session_id": Uuid::new_v4() })),
            Some(&token),
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_force_activate_with_invalid_target() {
    let app = TestApp::new(1);
    let token = app.mint_token("auth0|alice");

    app.register_admitted(&token, "Laptop").await;
    let phone = app.register_over_quota(&token, "Phone").await;

    let response = app
        .request(
            "POST",
            "/api/sessions/force-activate",
            Some(json!({ "candidate_id": phone, "target_id": Uuid::new_v4() })),
            Some(&token),
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "INVALID_TARGET");

    // A failed resolution keeps the candidate pending for re-presentation.
    let sessions = app.store.find_by_account("auth0|alice").await.unwrap();
    let candidate = sessions.iter().find(|s| s.id == phone).unwrap();
    assert!(candidate.is_pending());
}

#[tokio::test]
async fn test_force_activate_cannot_displace_foreign_session() {
    let app = TestApp::new(1);
    let alice = app.mint_token("auth0|alice");
    let bob = app.mint_token("auth0|bob");

    let bobs_laptop = app.register_admitted(&bob, "Laptop").await;
    app.register_admitted(&alice, "Laptop").await;
    let alices_phone = app.register_over_quota(&alice, "Phone").await;

    let response = app
        .request(
            "POST",
            "/api/sessions/force-activate",
            Some(json!({ "candidate_id": alices_phone, "target_id": bobs_laptop })),
            Some(&alice),
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    // Bob's session is untouched.
    let probe = app.me(&bob, bobs_laptop).await;
    assert_eq!(probe.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_frees_a_slot() {
    let app = TestApp::new(1);
    let token = app.mint_token("auth0|alice");

    let laptop = app.register_admitted(&token, "Laptop").await;

    let response = app
        .request(
            "POST",
            "/api/sessions/logout",
            Some(json!({ "session_id": laptop })),
            Some(&token),
            &[("X-Session-Id", &laptop.to_string())],
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "logged_out");

    // The freed slot admits the next registration directly.
    app.register_admitted(&token, "Phone").await;
}
