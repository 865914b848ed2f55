//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tokio::sync::broadcast;
use tower::ServiceExt;
use uuid::Uuid;

use devicegate_admission::admission::AdmissionCoordinator;
use devicegate_admission::resolution::ResolutionHandler;
use devicegate_admission::store::{MemorySessionStore, SessionStore};
use devicegate_admission::token::{Claims, IdentityVerifier};
use devicegate_admission::validator::SessionValidator;
use devicegate_core::config::auth::AuthConfig;
use devicegate_core::config::logging::LoggingConfig;
use devicegate_core::config::server::ServerConfig;
use devicegate_core::config::session::SessionConfig;
use devicegate_core::config::{AppConfig, DatabaseConfig};

/// Shared HS256 secret for minting test tokens.
const TEST_SECRET: &str = "integration-test-secret";
const TEST_ISSUER: &str = "https://identity.test/";
const TEST_AUDIENCE: &str = "devicegate-api";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// The in-memory session store behind the router
    pub store: Arc<MemorySessionStore>,
}

impl TestApp {
    /// Create a new test application with the given session quota.
    pub fn new(max_active_sessions: u32) -> Self {
        let config = AppConfig {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://unused-in-memory-tests".to_string(),
                max_connections: 1,
                min_connections: 1,
                connect_timeout_seconds: 1,
                idle_timeout_seconds: 1,
            },
            auth: AuthConfig {
                jwt_secret: TEST_SECRET.to_string(),
                issuer: TEST_ISSUER.to_string(),
                audience: TEST_AUDIENCE.to_string(),
                leeway_seconds: 5,
            },
            session: SessionConfig {
                max_active_sessions,
                race_retry_attempts: 3,
                race_retry_backoff_ms: 1,
            },
            logging: LoggingConfig::default(),
        };

        let store = Arc::new(MemorySessionStore::new());
        let store_dyn: Arc<dyn SessionStore> = store.clone();

        let (events, _) = broadcast::channel(64);

        let app_state = devicegate_api::state::AppState {
            config: Arc::new(config.clone()),
            verifier: Arc::new(IdentityVerifier::new(&config.auth)),
            coordinator: Arc::new(AdmissionCoordinator::new(
                Arc::clone(&store_dyn),
                config.session.clone(),
                events.clone(),
            )),
            resolution: Arc::new(ResolutionHandler::new(
                Arc::clone(&store_dyn),
                config.session.clone(),
                events,
            )),
            validator: Arc::new(SessionValidator::new(Arc::clone(&store_dyn))),
            store: store_dyn,
        };

        let router = devicegate_api::router::build_router(app_state);

        Self { router, store }
    }

    /// Mint a bearer token for the given account subject.
    pub fn mint_token(&self, sub: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            iss: TEST_ISSUER.to_string(),
            aud: TEST_AUDIENCE.to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            name: None,
        };
        jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .expect("Failed to mint test token")
    }

    /// Make an HTTP request to the test app.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
        extra_headers: &[(&str, &str)],
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        for (name, value) in extra_headers {
            req = req.header(*name, *value);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Register a device and return the response.
    pub async fn register(&self, token: &str, device_name: &str) -> TestResponse {
        self.request(
            "POST",
            "/api/sessions/register",
            None,
            Some(token),
            &[("X-Device-Name", device_name)],
        )
        .await
    }

    /// Register a device expecting direct admission; returns the session id.
    pub async fn register_admitted(&self, token: &str, device_name: &str) -> Uuid {
        let response = self.register(token, device_name).await;
        assert_eq!(response.status, StatusCode::OK, "register failed: {:?}", response.body);
        assert_eq!(response.body["overquota"], false, "expected direct admission");
        session_id_from(&response.body, "session_id")
    }

    /// Register a device expecting over-quota; returns the candidate id.
    pub async fn register_over_quota(&self, token: &str, device_name: &str) -> Uuid {
        let response = self.register(token, device_name).await;
        assert_eq!(response.status, StatusCode::OK, "register failed: {:?}", response.body);
        assert_eq!(response.body["overquota"], true, "expected over-quota");
        session_id_from(&response.body, "candidate")
    }

    /// Fetch the protected account payload with a working session.
    pub async fn me(&self, token: &str, session_id: Uuid) -> TestResponse {
        self.request(
            "GET",
            "/api/account/me",
            None,
            Some(token),
            &[("X-Session-Id", &session_id.to_string())],
        )
        .await
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Pull a UUID field out of a JSON body.
pub fn session_id_from(body: &Value, field: &str) -> Uuid {
    body.get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| panic!("No '{field}' in body: {body:?}"))
}
