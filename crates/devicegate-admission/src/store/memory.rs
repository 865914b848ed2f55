//! In-memory session store using a Tokio mutex for single-node deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use devicegate_core::error::AppError;
use devicegate_core::result::AppResult;
use devicegate_database::repositories::session::{
    REASON_CANCELLED, REASON_DISPLACED, REASON_SUPERSEDED,
};
use devicegate_entity::session::{
    AdmissionRecord, CancelOutcome, NewSession, Session, SessionStatus,
};

use super::SessionStore;

/// In-memory session store using a Tokio mutex for thread safety.
///
/// Every trait method takes the single lock for its whole duration, which
/// makes each operation one atomic unit — the same guarantee the Postgres
/// backend gets from per-account advisory-lock transactions. Suitable for
/// single-node deployments and tests only.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    /// Protected session map.
    sessions: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl MemorySessionStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions for an account, oldest first.
    fn account_sessions(map: &HashMap<Uuid, Session>, account_id: &str) -> Vec<Session> {
        let mut sessions: Vec<Session> = map
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.issued_at.cmp(&b.issued_at).then(a.id.cmp(&b.id)));
        sessions
    }

    fn revoke_entry(session: &mut Session, reason: &str) {
        session.status = SessionStatus::Revoked;
        session.revoked_at = Some(Utc::now());
        session.revoked_reason = Some(reason.to_string());
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn admit(&self, new: NewSession, max_active: u32) -> AppResult<AdmissionRecord> {
        let mut map = self.sessions.lock().await;

        // One unresolved candidate per account: a newer attempt replaces it.
        for session in map.values_mut() {
            if session.account_id == new.account_id && session.is_pending() {
                Self::revoke_entry(session, REASON_SUPERSEDED);
            }
        }

        let active_count = map
            .values()
            .filter(|s| s.account_id == new.account_id && s.is_active())
            .count();

        let overquota = active_count >= max_active as usize;
        let session = Session {
            id: Uuid::new_v4(),
            account_id: new.account_id.clone(),
            device_name: new.device_name,
            user_agent: new.user_agent,
            status: if overquota {
                SessionStatus::Pending
            } else {
                SessionStatus::Active
            },
            issued_at: Utc::now(),
            revoked_at: None,
            revoked_reason: None,
        };
        map.insert(session.id, session.clone());

        let sessions = if overquota {
            Self::account_sessions(&map, &new.account_id)
                .into_iter()
                .filter(|s| !s.is_revoked())
                .collect()
        } else {
            Vec::new()
        };

        Ok(AdmissionRecord {
            session,
            overquota,
            sessions,
        })
    }

    async fn cancel(&self, candidate_id: Uuid, account_id: &str) -> AppResult<CancelOutcome> {
        let mut map = self.sessions.lock().await;

        match map.get_mut(&candidate_id).filter(|s| s.account_id == account_id) {
            Some(session) if session.is_pending() => {
                Self::revoke_entry(session, REASON_CANCELLED);
                Ok(CancelOutcome::Cancelled)
            }
            Some(session) if session.is_revoked() => Ok(CancelOutcome::AlreadyResolved),
            _ => Err(AppError::not_found(format!(
                "No pending candidate {candidate_id} for this account"
            ))),
        }
    }

    async fn force_activate(
        &self,
        candidate_id: Uuid,
        target_id: Uuid,
        account_id: &str,
    ) -> AppResult<Session> {
        let mut map = self.sessions.lock().await;

        let target_ok = map
            .get(&target_id)
            .is_some_and(|s| s.account_id == account_id && s.is_active());
        if !target_ok {
            return Err(AppError::invalid_target(format!(
                "Target {target_id} is not an active session of this account"
            )));
        }

        // Both transitions happen under the same lock hold: a swap, never a
        // net change of the active count.
        let Some(candidate) = map
            .get_mut(&candidate_id)
            .filter(|s| s.account_id == account_id && s.is_pending())
        else {
            return Err(AppError::invalid_target(format!(
                "Candidate {candidate_id} is not a pending session of this account"
            )));
        };
        candidate.status = SessionStatus::Active;
        let activated = candidate.clone();

        if let Some(target) = map.get_mut(&target_id) {
            Self::revoke_entry(target, REASON_DISPLACED);
        }

        Ok(activated)
    }

    async fn revoke(&self, session_id: Uuid, account_id: &str, reason: &str) -> AppResult<()> {
        let mut map = self.sessions.lock().await;

        match map.get_mut(&session_id).filter(|s| s.account_id == account_id) {
            Some(session) if !session.is_revoked() => {
                Self::revoke_entry(session, reason);
                Ok(())
            }
            _ => Err(AppError::not_found(format!(
                "No revocable session {session_id} for this account"
            ))),
        }
    }

    async fn find_by_id(&self, session_id: Uuid) -> AppResult<Option<Session>> {
        let map = self.sessions.lock().await;
        Ok(map.get(&session_id).cloned())
    }

    async fn find_by_account(&self, account_id: &str) -> AppResult<Vec<Session>> {
        let map = self.sessions.lock().await;
        Ok(Self::account_sessions(&map, account_id))
    }

    async fn count_active(&self, account_id: &str) -> AppResult<i64> {
        let map = self.sessions.lock().await;
        Ok(map
            .values()
            .filter(|s| s.account_id == account_id && s.is_active())
            .count() as i64)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
