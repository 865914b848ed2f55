//! PostgreSQL-backed session store.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use devicegate_core::result::AppResult;
use devicegate_database::repositories::session::SessionRepository;
use devicegate_entity::session::{AdmissionRecord, CancelOutcome, NewSession, Session};

use super::SessionStore;

/// Session store backed by PostgreSQL.
///
/// The atomicity guarantees live in [`SessionRepository`]: each mutating
/// operation is a transaction serialized per account with an advisory lock.
#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    /// Session database repository.
    repo: Arc<SessionRepository>,
}

impl PostgresSessionStore {
    /// Creates a new Postgres-backed store.
    pub fn new(repo: Arc<SessionRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn admit(&self, new: NewSession, max_active: u32) -> AppResult<AdmissionRecord> {
        self.repo.admit(&new, max_active).await
    }

    async fn cancel(&self, candidate_id: Uuid, account_id: &str) -> AppResult<CancelOutcome> {
        self.repo.cancel(candidate_id, account_id).await
    }

    async fn force_activate(
        &self,
        candidate_id: Uuid,
        target_id: Uuid,
        account_id: &str,
    ) -> AppResult<Session> {
        self.repo
            .force_activate(candidate_id, target_id, account_id)
            .await
    }

    async fn revoke(&self, session_id: Uuid, account_id: &str, reason: &str) -> AppResult<()> {
        self.repo.revoke(session_id, account_id, reason).await
    }

    async fn find_by_id(&self, session_id: Uuid) -> AppResult<Option<Session>> {
        self.repo.find_by_id(session_id).await
    }

    async fn find_by_account(&self, account_id: &str) -> AppResult<Vec<Session>> {
        self.repo.find_by_account(account_id).await
    }

    async fn count_active(&self, account_id: &str) -> AppResult<i64> {
        self.repo.count_active_by_account(account_id).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        // The repository holds a pool; a cheap lookup doubles as a liveness probe.
        self.repo.find_by_id(Uuid::nil()).await.map(|_| true)
    }
}
