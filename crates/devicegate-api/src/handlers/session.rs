//! Session handlers — register, cancel, force-activate, logout, list.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;

use devicegate_admission::admission::RegisterOutcome;
use devicegate_admission::store::SessionStore;
use devicegate_entity::session::CancelOutcome;

use crate::dto::request::{CancelRequest, ForceActivateRequest, LogoutRequest};
use crate::error::ApiError;
use crate::dto::response::{
    AckResponse, ForceActivateResponse, RegisterResponse, SessionListResponse, SessionResponse,
};
use crate::extractors::auth::DEVICE_NAME_HEADER;
use crate::extractors::{ActiveSession, AuthAccount};
use crate::state::AppState;

/// POST /api/sessions/register
///
/// Registration is authenticated by bearer token alone: the calling device
/// has no session yet. Over-quota is a 200 with `overquota: true`, not an
/// error — the client resolves it interactively.
pub async fn register(
    State(state): State<AppState>,
    auth: AuthAccount,
    headers: HeaderMap,
) -> Result<Json<RegisterResponse>, ApiError> {
    let device_name = headers
        .get(DEVICE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("Browser");

    let user_agent = headers.get("user-agent").and_then(|v| v.to_str().ok());

    let outcome = state
        .coordinator
        .register(&auth.account_id, device_name, user_agent)
        .await?;

    let response = match outcome {
        RegisterOutcome::Admitted { session } => RegisterResponse::admitted(session.id),
        RegisterOutcome::OverQuota {
            candidate,
            sessions,
        } => RegisterResponse::over_quota(
            candidate.id,
            sessions.iter().map(SessionResponse::from).collect(),
        ),
    };

    Ok(Json(response))
}

/// POST /api/sessions/cancel
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<CancelRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    let outcome = state
        .resolution
        .cancel(&auth.account_id, req.session_id)
        .await?;

    let status = match outcome {
        CancelOutcome::Cancelled => "cancelled",
        CancelOutcome::AlreadyResolved => "already_resolved",
    };

    Ok(Json(AckResponse {
        status: status.to_string(),
        session_id: req.session_id,
    }))
}

/// POST /api/sessions/force-activate
pub async fn force_activate(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<ForceActivateRequest>,
) -> Result<Json<ForceActivateResponse>, ApiError> {
    let activated = state
        .resolution
        .force_activate(&auth.account_id, req.candidate_id, req.target_id)
        .await?;

    Ok(Json(ForceActivateResponse {
        session_id: activated.id,
    }))
}

/// POST /api/sessions/logout
///
/// A protected call: the caller presents a validated working session and
/// names the session to revoke (usually the same one).
pub async fn logout(
    State(state): State<AppState>,
    session: ActiveSession,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<AckResponse>, ApiError> {
    state
        .coordinator
        .logout(&session.account_id, req.session_id)
        .await?;

    Ok(Json(AckResponse {
        status: "logged_out".to_string(),
        session_id: req.session_id,
    }))
}

/// GET /api/sessions
///
/// Full session history for the account, revoked rows included.
pub async fn list(
    State(state): State<AppState>,
    session: ActiveSession,
) -> Result<Json<SessionListResponse>, ApiError> {
    let sessions = state.store.find_by_account(&session.account_id).await?;

    Ok(Json(SessionListResponse {
        sessions: sessions.iter().map(SessionResponse::from).collect(),
    }))
}
