//! Session validator — the check behind every protected call.
//!
//! Identity-provider tokens cannot express per-device admission limits, so a
//! bearer token alone is never enough: each protected request also presents a
//! session id, and this validator is what makes a force-activate revocation
//! observable on the displaced device's very next request.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use devicegate_core::error::AppError;
use devicegate_core::result::AppResult;
use devicegate_entity::session::{Session, SessionStatus};

use crate::store::SessionStore;

/// Confirms that a presented session id is currently active.
#[derive(Debug, Clone)]
pub struct SessionValidator {
    /// Session persistence.
    store: Arc<dyn SessionStore>,
}

impl SessionValidator {
    /// Creates a new session validator.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Validates a session id, returning the session only when it is active.
    ///
    /// - unknown id → `NotFound`
    /// - revoked → `Revoked` (the client's signal to force a fresh sign-in)
    /// - pending → `Unauthorized` (a candidate is not usable until resolved)
    pub async fn validate(&self, session_id: Uuid) -> AppResult<Session> {
        let session = self
            .store
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Unknown session {session_id}")))?;

        match session.status {
            SessionStatus::Active => Ok(session),
            SessionStatus::Revoked => {
                debug!(session_id = %session_id, "Rejected revoked session");
                Err(AppError::revoked("Session has been revoked"))
            }
            SessionStatus::Pending => Err(AppError::unauthorized(
                "Session is pending activation",
            )),
        }
    }

    /// Validates a session id and checks that it belongs to the account the
    /// bearer token authenticated.
    pub async fn validate_for_account(
        &self,
        session_id: Uuid,
        account_id: &str,
    ) -> AppResult<Session> {
        let session = self.validate(session_id).await?;

        if session.account_id != account_id {
            return Err(AppError::unauthorized(
                "Session does not belong to the token subject",
            ));
        }

        Ok(session)
    }
}
