//! Integration tests for session registration and quota admission.

use http::StatusCode;

use devicegate_admission::store::SessionStore;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_register_without_token_is_unauthorized() {
    let app = TestApp::new(2);

    let response = app
        .request("POST", "/api/sessions/register", None, None, &[])
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_with_garbage_token_is_unauthorized() {
    let app = TestApp::new(2);

    let response = app
        .request(
            "POST",
            "/api/sessions/register",
            None,
            Some("not-a-real-token"),
            &[],
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_first_registration_is_admitted() {
    let app = TestApp::new(2);
    let token = app.mint_token("auth0|alice");

    let response = app.register(&token, "Chrome on Linux").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["overquota"], false);
    assert!(response.body["session_id"].is_string());
    assert!(response.body.get("candidate").is_none());
}

#[tokio::test]
async fn test_registration_beyond_quota_returns_candidate_payload() {
    let app = TestApp::new(2);
    let token = app.mint_token("auth0|alice");

    app.register_admitted(&token, "Laptop").await;
    app.register_admitted(&token, "Phone").await;

    let response = app.register(&token, "Tablet").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["overquota"], true);
    assert!(response.body["candidate"].is_string());

    // Two active sessions plus the pending candidate itself.
    let sessions = response.body["sessions"].as_array().expect("sessions array");
    assert_eq!(sessions.len(), 3);
    assert_eq!(
        sessions.iter().filter(|s| s["status"] == "active").count(),
        2
    );
    assert_eq!(
        sessions.iter().filter(|s| s["status"] == "pending").count(),
        1
    );
    // The surfaced record shape: id, device_name, issued_at, status.
    assert!(sessions[0]["issued_at"].is_i64());
    assert!(sessions[0]["device_name"].is_string());
}

#[tokio::test]
async fn test_active_count_never_exceeds_quota() {
    let app = TestApp::new(2);
    let token = app.mint_token("auth0|alice");

    let mut admitted = 0;
    for i in 0..6 {
        let response = app.register(&token, &format!("Device {i}")).await;
        assert_eq!(response.status, StatusCode::OK);
        if response.body["overquota"] == false {
            admitted += 1;
        }
    }

    assert_eq!(admitted, 2);
    assert_eq!(app.store.count_active("auth0|alice").await.unwrap(), 2);
}

#[tokio::test]
async fn test_quotas_are_per_account() {
    let app = TestApp::new(1);
    let alice = app.mint_token("auth0|alice");
    let bob = app.mint_token("auth0|bob");

    app.register_admitted(&alice, "Laptop").await;

    // Bob's first device is unaffected by Alice's full quota.
    let response = app.register(&bob, "Laptop").await;
    assert_eq!(response.body["overquota"], false);
}

#[tokio::test]
async fn test_missing_device_name_falls_back() {
    let app = TestApp::new(1);
    let token = app.mint_token("auth0|alice");

    let response = app
        .request("POST", "/api/sessions/register", None, Some(&token), &[])
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let sessions = app.store.find_by_account("auth0|alice").await.unwrap();
    assert_eq!(sessions[0].device_name, "Browser");
}

#[tokio::test]
async fn test_new_registration_supersedes_stale_candidate() {
    let app = TestApp::new(1);
    let token = app.mint_token("auth0|alice");

    app.register_admitted(&token, "Laptop").await;
    let first = app.register_over_quota(&token, "Phone").await;
    let second = app.register_over_quota(&token, "Tablet").await;
    assert_ne!(first, second);

    let sessions = app.store.find_by_account("auth0|alice").await.unwrap();
    let pending: Vec<_> = sessions.iter().filter(|s| s.is_pending()).collect();
    assert_eq!(pending.len(), 1, "at most one pending candidate per account");
    assert_eq!(pending[0].id, second);

    let stale = sessions.iter().find(|s| s.id == first).unwrap();
    assert!(stale.is_revoked());
}

#[tokio::test]
async fn test_health_requires_no_auth() {
    let app = TestApp::new(2);

    let response = app.request("GET", "/api/health", None, None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}
