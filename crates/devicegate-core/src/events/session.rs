//! Session-related domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to session admission and lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A registration was admitted directly as an active session.
    Admitted {
        /// The session ID.
        session_id: Uuid,
        /// The owning account.
        account_id: String,
        /// The device descriptor supplied at registration.
        device_name: String,
    },
    /// A registration exceeded the quota and produced a pending candidate.
    CandidatePending {
        /// The candidate session ID.
        session_id: Uuid,
        /// The owning account.
        account_id: String,
        /// Number of active sessions at admission time.
        active_count: u32,
        /// The configured quota.
        limit: u32,
    },
    /// A pending candidate was activated, displacing an active session.
    CandidateActivated {
        /// The now-active candidate session ID.
        session_id: Uuid,
        /// The session that was revoked to make room.
        revoked_target: Uuid,
    },
    /// A pending candidate was cancelled by the user.
    Cancelled {
        /// The cancelled candidate session ID.
        session_id: Uuid,
    },
    /// A stale pending candidate was superseded by a newer login attempt.
    Superseded {
        /// The superseded candidate session ID.
        session_id: Uuid,
        /// The owning account.
        account_id: String,
    },
    /// A session was revoked (logout or displacement).
    Revoked {
        /// The revoked session ID.
        session_id: Uuid,
        /// Why the session ended.
        reason: String,
    },
}
