//! Admission coordinator — quota-checked registration and logout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use devicegate_core::config::SessionConfig;
use devicegate_core::error::AppError;
use devicegate_core::events::SessionEvent;
use devicegate_core::result::AppResult;
use devicegate_entity::session::{NewSession, Session};

use crate::store::SessionStore;

/// Result of a registration attempt.
///
/// Over-quota is a normal branch of admission, not a failure: the caller
/// receives the pending candidate together with the sessions it may displace.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    /// Quota available; the session is active immediately.
    Admitted {
        /// The newly active session.
        session: Session,
    },
    /// Quota exceeded; the session is a pending candidate awaiting resolution.
    OverQuota {
        /// The pending candidate.
        candidate: Session,
        /// All non-revoked sessions for the account, candidate included.
        sessions: Vec<Session>,
    },
}

/// Coordinates session admission against the per-account quota.
#[derive(Debug, Clone)]
pub struct AdmissionCoordinator {
    /// Session persistence.
    store: Arc<dyn SessionStore>,
    /// Admission configuration.
    config: SessionConfig,
    /// Domain event channel.
    events: broadcast::Sender<SessionEvent>,
}

impl AdmissionCoordinator {
    /// Creates a new admission coordinator.
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

    /// Registers a login attempt for `account_id`.
    ///
    /// The quota check and the session insert happen as one atomic unit in
    /// the store; a unit lost to contention is retried here transparently
    /// and never surfaced to the caller as a race.
    pub async fn register(
        &self,
        account_id: &str,
        device_name: &str,
        user_agent: Option<&str>,
    ) -> AppResult<RegisterOutcome> {
        if account_id.is_empty() {
            return Err(AppError::validation("account_id must not be empty"));
        }
        if device_name.is_empty() {
            return Err(AppError::validation("device_name must not be empty"));
        }

        let new = NewSession {
            account_id: account_id.to_string(),
            device_name: device_name.to_string(),
            user_agent: user_agent.map(String::from),
        };

        let max = self.config.max_active_sessions;
        let record = run_atomic_unit(&self.config, || {
            let new = new.clone();
            async move { self.store.admit(new, max).await }
        })
        .await?;

        if record.overquota {
            warn!(
                account_id = %account_id,
                candidate = %record.session.id,
                limit = max,
                "Registration exceeds session quota, candidate pending"
            );
            let _ = self.events.send(SessionEvent::CandidatePending {
                session_id: record.session.id,
                account_id: account_id.to_string(),
                active_count: record
                    .sessions
                    .iter()
                    .filter(|s| s.is_active())
                    .count() as u32,
                limit: max,
            });

            Ok(RegisterOutcome::OverQuota {
                candidate: record.session,
                sessions: record.sessions,
            })
        } else {
            info!(
                account_id = %account_id,
                session_id = %record.session.id,
                device = %record.session.device_name,
                "Session admitted"
            );
            let _ = self.events.send(SessionEvent::Admitted {
                session_id: record.session.id,
                account_id: account_id.to_string(),
                device_name: record.session.device_name.clone(),
            });

            Ok(RegisterOutcome::Admitted {
                session: record.session,
            })
        }
    }

    /// Revokes a session owned by `account_id` (explicit logout), freeing
    /// one quota slot.
    pub async fn logout(&self, account_id: &str, session_id: Uuid) -> AppResult<()> {
        self.store
            .revoke(session_id, account_id, "logged out by user")
            .await?;

        info!(account_id = %account_id, session_id = %session_id, "Session logged out");
        let _ = self.events.send(SessionEvent::Revoked {
            session_id,
            reason: "logged out by user".to_string(),
        });

        Ok(())
    }
}

/// Runs an atomic unit, retrying transparently when it loses a concurrency
/// race. Exhaustion is reported as retryable unavailability, never as the
/// race itself.
pub(crate) async fn run_atomic_unit<T, F, Fut>(config: &SessionConfig, mut unit: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = config.race_retry_attempts.max(1);
    let backoff = Duration::from_millis(config.race_retry_backoff_ms);

    for attempt in 0..attempts {
        match unit().await {
            Err(e) if e.is_retryable_race() => {
                warn!(attempt, "Atomic unit lost a concurrency race, retrying");
                tokio::time::sleep(backoff).await;
            }
            other => return other,
        }
    }

    Err(AppError::service_unavailable(
        "The account is under heavy contention, please retry",
    ))
}
