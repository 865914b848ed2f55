//! Outcome values produced by the atomic session-store operations.

use serde::{Deserialize, Serialize};

use super::model::Session;

/// Result of an atomic admission attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRecord {
    /// The session that was created (active or pending).
    pub session: Session,
    /// Whether the account was at quota and the session is a pending candidate.
    pub overquota: bool,
    /// All non-revoked sessions for the account including the candidate,
    /// ordered by issue time. Populated only when `overquota` is true.
    pub sessions: Vec<Session>,
}

/// Result of cancelling a pending candidate.
///
/// Cancel is idempotent: cancelling an already-revoked candidate reports
/// `AlreadyResolved` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelOutcome {
    /// The candidate transitioned from pending to revoked.
    Cancelled,
    /// The candidate was already revoked; nothing changed.
    AlreadyResolved,
}
