//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle status of a session.
///
/// Transitions are monotone: `pending → active → revoked`,
/// `pending → revoked`, or `active → revoked`. `revoked` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
pub enum SessionStatus {
    /// The session is admitted and may be used on protected calls.
    Active,
    /// The session is a candidate awaiting user resolution.
    Pending,
    /// The session has been revoked. Terminal.
    Revoked,
}

impl SessionStatus {
    /// Whether a transition from `self` to `next` is permitted.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Pending, SessionStatus::Active)
                | (SessionStatus::Pending, SessionStatus::Revoked)
                | (SessionStatus::Active, SessionStatus::Revoked)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Revoked => write!(f, "revoked"),
        }
    }
}

/// One device's login instance.
///
/// Sessions are created by the admission coordinator, either directly
/// `active` (quota available) or `pending` (quota exceeded). Revoked rows
/// are retained for audit and session-list history, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// Opaque identity-provider subject that owns this session.
    pub account_id: String,
    /// Human-readable device descriptor supplied at registration.
    pub device_name: String,
    /// User-Agent header captured at registration.
    pub user_agent: Option<String>,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// When the session was created.
    pub issued_at: DateTime<Utc>,

    // -- Revocation audit --
    /// When the session was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Why the session was revoked.
    pub revoked_reason: Option<String>,
}

impl Session {
    /// Check whether the session may be used on protected calls.
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Check whether the session is an unresolved candidate.
    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    /// Check whether the session has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.status == SessionStatus::Revoked
    }

    /// The creation time as seconds since the Unix epoch, as surfaced to clients.
    pub fn issued_at_unix(&self) -> i64 {
        self.issued_at.timestamp()
    }
}

/// Data required to create a new session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    /// The account this session belongs to.
    pub account_id: String,
    /// Device descriptor supplied by the client.
    pub device_name: String,
    /// User-Agent header, if present.
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table_is_monotone() {
        use SessionStatus::*;

        let all = [Active, Pending, Revoked];
        for from in all {
            for to in all {
                let allowed = from.can_transition_to(to);
                let expected = matches!((from, to), (Pending, Active) | (Pending, Revoked) | (Active, Revoked));
                assert_eq!(allowed, expected, "transition {from} -> {to}");
            }
        }
    }

    #[test]
    fn test_revoked_is_terminal() {
        use SessionStatus::*;
        for to in [Active, Pending, Revoked] {
            assert!(!Revoked.can_transition_to(to));
        }
    }

    #[test]
    fn test_status_helpers() {
        let session = Session {
            id: Uuid::new_v4(),
            account_id: "auth0|abc123".to_string(),
            device_name: "Chrome on Linux".to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
            status: SessionStatus::Pending,
            issued_at: Utc::now(),
            revoked_at: None,
            revoked_reason: None,
        };

        assert!(session.is_pending());
        assert!(!session.is_active());
        assert!(!session.is_revoked());
        assert!(session.issued_at_unix() > 0);
    }
}
