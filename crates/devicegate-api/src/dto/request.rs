//! Request DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cancel a pending candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    /// The candidate session to cancel.
    pub session_id: Uuid,
}

/// Force-activate a pending candidate by displacing an active session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForceActivateRequest {
    /// The pending candidate to activate.
    pub candidate_id: Uuid,
    /// The active session to revoke in its place.
    pub target_id: Uuid,
}

/// Log out a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    /// The session to revoke.
    pub session_id: Uuid,
}
