//! Response DTOs.
//!
//! The wire shapes here are the client contract: a register result is either
//! `{overquota: false, session_id}` or `{overquota: true, candidate,
//! sessions}`, and sessions are surfaced as
//! `{id, device_name, issued_at (unix seconds), status}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use devicegate_entity::session::{Session, SessionStatus};

/// Session record as surfaced to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Session identifier.
    pub id: Uuid,
    /// Device descriptor supplied at registration.
    pub device_name: String,
    /// Creation time in seconds since the Unix epoch.
    pub issued_at: i64,
    /// Lifecycle status.
    pub status: SessionStatus,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            device_name: session.device_name.clone(),
            issued_at: session.issued_at_unix(),
            status: session.status,
        }
    }
}

/// Result of a registration attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    /// Whether the attempt exceeded the quota.
    pub overquota: bool,
    /// The active session id (admitted directly).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    /// The pending candidate id (over quota).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Uuid>,
    /// All non-revoked sessions, candidate included (over quota).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Vec<SessionResponse>>,
}

impl RegisterResponse {
    /// Build the direct-admission shape.
    pub fn admitted(session_id: Uuid) -> Self {
        Self {
            overquota: false,
            session_id: Some(session_id),
            candidate: None,
            sessions: None,
        }
    }

    /// Build the over-quota shape.
    pub fn over_quota(candidate: Uuid, sessions: Vec<SessionResponse>) -> Self {
        Self {
            overquota: true,
            session_id: None,
            candidate: Some(candidate),
            sessions: Some(sessions),
        }
    }
}

/// Acknowledgement for cancel and logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    /// What happened: `cancelled`, `already_resolved`, or `logged_out`.
    pub status: String,
    /// The session the acknowledgement refers to.
    pub session_id: Uuid,
}

/// Result of a successful force-activate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceActivateResponse {
    /// The newly active session id for the client to adopt.
    pub session_id: Uuid,
}

/// Session list for the resolution UI and account overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResponse {
    /// All sessions for the account, oldest first, revoked included.
    pub sessions: Vec<SessionResponse>,
}

/// The protected account payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    /// The authenticated account.
    pub account_id: String,
    /// The session the request was validated with.
    pub session_id: Uuid,
    /// Display name from the identity token, if present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}
