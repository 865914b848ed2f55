//! Authentication extractors.
//!
//! `AuthAccount` verifies the bearer token only — enough for registration and
//! resolution, where the calling device has no usable session yet.
//! `ActiveSession` additionally requires the `X-Session-Id` header and runs
//! the session validator, which is what makes revocation observable on every
//! protected call.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use devicegate_admission::token::Claims;
use devicegate_core::error::AppError;
use devicegate_entity::session::Session;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the working session id on protected calls.
pub const SESSION_ID_HEADER: &str = "x-session-id";
/// Header carrying the device descriptor at registration.
pub const DEVICE_NAME_HEADER: &str = "x-device-name";

/// An account authenticated by bearer token alone.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    /// The verified token subject.
    pub account_id: String,
    /// All verified claims.
    pub claims: Claims,
}

impl FromRequestParts<AppState> for AuthAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid Authorization header format"))?;

        let claims = state.verifier.verify(token)?;

        Ok(AuthAccount {
            account_id: claims.sub.clone(),
            claims,
        })
    }
}

/// An account with a validated, currently-active session.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    /// The verified token subject.
    pub account_id: String,
    /// All verified claims.
    pub claims: Claims,
    /// The validated session.
    pub session: Session,
}

impl FromRequestParts<AppState> for ActiveSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account = AuthAccount::from_request_parts(parts, state).await?;

        let session_id = parts
            .headers
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing X-Session-Id header"))?;

        let session_id = Uuid::parse_str(session_id)
            .map_err(|_| AppError::unauthorized("Malformed X-Session-Id header"))?;

        let session = state
            .validator
            .validate_for_account(session_id, &account.account_id)
            .await?;

        Ok(ActiveSession {
            account_id: account.account_id,
            claims: account.claims,
            session,
        })
    }
}
