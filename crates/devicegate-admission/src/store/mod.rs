//! The `SessionStore` trait and its backends.
//!
//! Every method that mutates sessions is an *atomic unit* scoped to one
//! account: implementations must guarantee that no two units for the same
//! account interleave. Two implementations are provided:
//!
//! - PostgreSQL (per-account advisory-lock transactions)
//! - In-memory (`tokio::sync::Mutex`), for single-node deployments and tests

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use devicegate_core::result::AppResult;
use devicegate_entity::session::{AdmissionRecord, CancelOutcome, NewSession, Session};

pub use memory::MemorySessionStore;
pub use postgres::PostgresSessionStore;

/// Atomic session persistence operations.
#[async_trait]
pub trait SessionStore: std::fmt::Debug + Send + Sync + 'static {
    /// Admission check and insert as one atomic unit: count the account's
    /// active sessions and create the new session as `active` (below quota)
    /// or `pending` (at quota). Any stale pending candidate for the account
    /// is revoked as superseded in the same unit.
    async fn admit(&self, new: NewSession, max_active: u32) -> AppResult<AdmissionRecord>;

    /// Cancel a pending candidate owned by `account_id`. Idempotent: an
    /// already-revoked candidate reports `AlreadyResolved`.
    async fn cancel(&self, candidate_id: Uuid, account_id: &str) -> AppResult<CancelOutcome>;

    /// Atomically revoke `target_id` and activate `candidate_id` (a swap
    /// that leaves the active count unchanged). Fails with `InvalidTarget`
    /// unless the candidate is pending and the target is active, both owned
    /// by `account_id`.
    async fn force_activate(
        &self,
        candidate_id: Uuid,
        target_id: Uuid,
        account_id: &str,
    ) -> AppResult<Session>;

    /// Revoke a non-revoked session owned by `account_id` (logout).
    async fn revoke(&self, session_id: Uuid, account_id: &str, reason: &str) -> AppResult<()>;

    /// Find a session by ID.
    async fn find_by_id(&self, session_id: Uuid) -> AppResult<Option<Session>>;

    /// List all sessions for an account, oldest first, revoked included.
    async fn find_by_account(&self, account_id: &str) -> AppResult<Vec<Session>>;

    /// Count the account's active sessions.
    async fn count_active(&self, account_id: &str) -> AppResult<i64>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
