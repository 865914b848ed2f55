//! Resolution handler — cancel and force-activate for pending candidates.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use devicegate_core::config::SessionConfig;
use devicegate_core::events::SessionEvent;
use devicegate_core::result::AppResult;
use devicegate_entity::session::{CancelOutcome, Session};

use crate::admission::run_atomic_unit;
use crate::store::SessionStore;

/// Processes a candidate's cancel or force-activate decision.
#[derive(Debug, Clone)]
pub struct ResolutionHandler {
    /// Session persistence.
    store: Arc<dyn SessionStore>,
    /// Admission configuration (race retry settings).
    config: SessionConfig,
    /// Domain event channel.
    events: broadcast::Sender<SessionEvent>,
}

impl ResolutionHandler {
    /// Creates a new resolution handler.
    pub fn new(
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            store,
            config,
            events,
        }
    }

    /// Cancels a pending candidate: the login attempt is abandoned and the
    /// candidate is revoked (and retained for audit). Idempotent — a repeat
    /// cancel reports `AlreadyResolved` without error. No other session is
    /// affected.
    pub async fn cancel(&self, account_id: &str, candidate_id: Uuid) -> AppResult<CancelOutcome> {
        let outcome = self.store.cancel(candidate_id, account_id).await?;

        if outcome == CancelOutcome::Cancelled {
            info!(account_id = %account_id, candidate = %candidate_id, "Candidate cancelled");
            let _ = self.events.send(SessionEvent::Cancelled {
                session_id: candidate_id,
            });
        }

        Ok(outcome)
    }

    /// Resolves a candidate by revoking `target_id` and activating
    /// `candidate_id` in one atomic unit — a swap that leaves the account's
    /// active count unchanged. Returns the now-active session for the client
    /// to adopt.
    pub async fn force_activate(
        &self,
        account_id: &str,
        candidate_id: Uuid,
        target_id: Uuid,
    ) -> AppResult<Session> {
        let activated = run_atomic_unit(&self.config, || async move {
            self.store
                .force_activate(candidate_id, target_id, account_id)
                .await
        })
        .await?;

        info!(
            account_id = %account_id,
            candidate = %candidate_id,
            revoked_target = %target_id,
            "Candidate force-activated"
        );
        let _ = self.events.send(SessionEvent::CandidateActivated {
            session_id: candidate_id,
            revoked_target: target_id,
        });
        let _ = self.events.send(SessionEvent::Revoked {
            session_id: target_id,
            reason: "displaced by force-activated session".to_string(),
        });

        Ok(activated)
    }
}
