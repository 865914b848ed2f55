//! The server transport behind the orchestrator.
//!
//! A trait seam so the state machine is testable without a server; the real
//! implementation speaks HTTP with `reqwest`. Network-level failures map to
//! `ServiceUnavailable` — transient and retryable, never interpreted as an
//! implicit cancel or force-activate.

use async_trait::async_trait;
use uuid::Uuid;

use devicegate_api::dto::response::{
    AccountResponse, AckResponse, ForceActivateResponse, RegisterResponse, SessionListResponse,
};
use devicegate_api::error::ApiErrorResponse;
use devicegate_core::error::{AppError, ErrorKind};
use devicegate_core::result::AppResult;

/// Server operations the login orchestrator drives.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Register this device; over-quota is a normal result branch.
    async fn register(&self, device_name: &str) -> AppResult<RegisterResponse>;

    /// Cancel a pending candidate.
    async fn cancel(&self, candidate_id: Uuid) -> AppResult<AckResponse>;

    /// Force-activate a candidate by displacing a target session.
    async fn force_activate(
        &self,
        candidate_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<ForceActivateResponse>;

    /// Revoke the working session (protected call).
    async fn logout(&self, session_id: Uuid) -> AppResult<AckResponse>;

    /// Fetch the account payload — the protected read that validates the
    /// working session.
    async fn me(&self, session_id: Uuid) -> AppResult<AccountResponse>;

    /// List the account's sessions (protected call).
    async fn list(&self, session_id: Uuid) -> AppResult<SessionListResponse>;
}

/// HTTP transport for [`SessionApi`].
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    /// Server base URL, e.g. `http://localhost:8080`.
    base_url: String,
    /// Bearer token obtained from the identity provider.
    bearer_token: String,
    /// Shared HTTP client.
    http: reqwest::Client,
}

impl HttpSessionApi {
    /// Creates a transport against `base_url` using an already-acquired
    /// identity token.
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> AppResult<T> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .send()
            .await
            .map_err(|e| {
                AppError::service_unavailable(format!("Could not reach the server: {e}"))
            })?;

        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(|e| {
                AppError::new(
                    ErrorKind::Serialization,
                    format!("Unexpected response body: {e}"),
                )
            })
        } else {
            let body = response.json::<ApiErrorResponse>().await.ok();
            Err(map_api_error(status.as_u16(), body))
        }
    }
}

/// Map an HTTP error status plus the server's error body back onto the
/// domain error taxonomy.
fn map_api_error(status: u16, body: Option<ApiErrorResponse>) -> AppError {
    let (code, message) = match body {
        Some(b) => (b.error, b.message),
        None => (String::new(), format!("Server returned HTTP {status}")),
    };

    let kind = match code.as_str() {
        "SESSION_REVOKED" => ErrorKind::Revoked,
        "NOT_FOUND" => ErrorKind::NotFound,
        "INVALID_TARGET" => ErrorKind::InvalidTarget,
        "UNAUTHORIZED" => ErrorKind::Unauthorized,
        "VALIDATION_ERROR" => ErrorKind::Validation,
        "CONFLICT" => ErrorKind::Conflict,
        "SERVICE_UNAVAILABLE" => ErrorKind::ServiceUnavailable,
        _ if status == 401 => ErrorKind::Unauthorized,
        _ if status >= 500 => ErrorKind::ServiceUnavailable,
        _ => ErrorKind::Internal,
    };

    AppError::new(kind, message)
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn register(&self, device_name: &str) -> AppResult<RegisterResponse> {
        self.send(
            self.http
                .post(self.url("/api/sessions/register"))
                .header("X-Device-Name", device_name),
        )
        .await
    }

    async fn cancel(&self, candidate_id: Uuid) -> AppResult<AckResponse> {
        self.send(
            self.http
                .post(self.url("/api/sessions/cancel"))
                .json(&serde_json::json!({ "session_id": candidate_id })),
        )
        .await
    }

    async fn force_activate(
        &self,
        candidate_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<ForceActivateResponse> {
        self.send(
            self.http
                .post(self.url("/api/sessions/force-activate"))
                .json(&serde_json::json!({
                    "candidate_id": candidate_id,
                    "target_id": target_id,
                })),
        )
        .await
    }

    async fn logout(&self, session_id: Uuid) -> AppResult<AckResponse> {
        self.send(
            self.http
                .post(self.url("/api/sessions/logout"))
                .header("X-Session-Id", session_id.to_string())
                .json(&serde_json::json!({ "session_id": session_id })),
        )
        .await
    }

    async fn me(&self, session_id: Uuid) -> AppResult<AccountResponse> {
        self.send(
            self.http
                .get(self.url("/api/account/me"))
                .header("X-Session-Id", session_id.to_string()),
        )
        .await
    }

    async fn list(&self, session_id: Uuid) -> AppResult<SessionListResponse> {
        self.send(
            self.http
                .get(self.url("/api/sessions"))
                .header("X-Session-Id", session_id.to_string()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping_prefers_machine_code() {
        let err = map_api_error(
            401,
            Some(ApiErrorResponse {
                error: "SESSION_REVOKED".to_string(),
                message: "Session has been revoked".to_string(),
            }),
        );
        assert_eq!(err.kind, ErrorKind::Revoked);
    }

    #[test]
    fn test_error_mapping_falls_back_to_status() {
        assert_eq!(map_api_error(401, None).kind, ErrorKind::Unauthorized);
        assert_eq!(map_api_error(502, None).kind, ErrorKind::ServiceUnavailable);
    }
}
