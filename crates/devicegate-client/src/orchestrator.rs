//! The login orchestrator state machine.
//!
//! Every suspension point (wait for token, wait for registration, wait for a
//! resolution decision) is an explicit state, so the flow is enumerable and
//! testable instead of living in nested callbacks. One network call is in
//! flight at a time.

use tracing::{debug, info};
use uuid::Uuid;

use devicegate_api::dto::response::{AccountResponse, SessionResponse};
use devicegate_core::error::{AppError, ErrorKind};
use devicegate_core::result::AppResult;

use crate::api::SessionApi;
use crate::persist::SessionIdStore;

/// Where the login flow currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginState {
    /// Waiting for the identity provider to produce a token. No session
    /// calls are made before this completes.
    Authenticating,
    /// Token acquired; registration has not been sent yet.
    Registering,
    /// Registration came back over quota; waiting for exactly one user
    /// decision.
    ResolvingQuota {
        /// The pending candidate.
        candidate: Uuid,
        /// The sessions the user chooses among, candidate included.
        sessions: Vec<SessionResponse>,
    },
    /// A working session is established and persisted.
    Resolved {
        /// The active session id.
        session_id: Uuid,
    },
    /// The login attempt was cancelled by the user.
    Aborted,
}

/// The user's decision for a pending candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Abandon the new login attempt.
    Cancel,
    /// Revoke the given active session and activate the candidate.
    ForceActivate {
        /// The active session to displace.
        target: Uuid,
    },
}

/// Drives register / resolve / validate against the server.
pub struct LoginOrchestrator<A: SessionApi, P: SessionIdStore> {
    api: A,
    persist: P,
    device_name: String,
    state: LoginState,
}

impl<A: SessionApi, P: SessionIdStore> LoginOrchestrator<A, P> {
    /// Creates an orchestrator in the `Authenticating` state.
    pub fn new(api: A, persist: P, device_name: impl Into<String>) -> Self {
        Self {
            api,
            persist,
            device_name: device_name.into(),
            state: LoginState::Authenticating,
        }
    }

    /// The current state.
    pub fn state(&self) -> &LoginState {
        &self.state
    }

    /// The working session id, if the flow is resolved.
    pub fn session_id(&self) -> Option<Uuid> {
        match &self.state {
            LoginState::Resolved { session_id } => Some(*session_id),
            _ => None,
        }
    }

    /// Try to resume a persisted session instead of signing in again.
    ///
    /// Probes the server with the persisted id; a revoked or unknown session
    /// clears the persisted value and leaves the machine in `Authenticating`.
    pub async fn resume(&mut self) -> AppResult<bool> {
        let Some(session_id) = self.persist.load()? else {
            return Ok(false);
        };

        match self.api.me(session_id).await {
            Ok(_) => {
                debug!(session_id = %session_id, "Resumed persisted session");
                self.state = LoginState::Resolved { session_id };
                Ok(true)
            }
            Err(e)
                if matches!(
                    e.kind,
                    ErrorKind::Revoked | ErrorKind::NotFound | ErrorKind::Unauthorized
                ) =>
            {
                info!(session_id = %session_id, "Persisted session is no longer usable");
                self.persist.clear()?;
                self.state = LoginState::Authenticating;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Signal that the identity provider produced a token.
    pub fn start(&mut self) -> AppResult<()> {
        match self.state {
            LoginState::Authenticating | LoginState::Aborted => {
                self.state = LoginState::Registering;
                Ok(())
            }
            _ => Err(AppError::conflict("A login attempt is already in flight")),
        }
    }

    /// Send the registration. Over-quota moves to `ResolvingQuota`; it is a
    /// normal branch and is never retried automatically.
    pub async fn register(&mut self) -> AppResult<&LoginState> {
        if self.state != LoginState::Registering {
            return Err(AppError::conflict("Registration is not due in this state"));
        }

        let response = self.api.register(&self.device_name).await?;

        if response.overquota {
            let candidate = response
                .candidate
                .ok_or_else(|| AppError::internal("Over-quota response without a candidate id"))?;
            self.state = LoginState::ResolvingQuota {
                candidate,
                sessions: response.sessions.unwrap_or_default(),
            };
        } else {
            let session_id = response
                .session_id
                .ok_or_else(|| AppError::internal("Admission response without a session id"))?;
            self.persist.save(session_id)?;
            info!(session_id = %session_id, "Session admitted");
            self.state = LoginState::Resolved { session_id };
        }

        Ok(&self.state)
    }

    /// Apply the user's decision to the pending candidate.
    ///
    /// On failure the state is unchanged and the same choice is re-presented:
    /// a pending candidate is not revoked by a failed resolution attempt.
    pub async fn resolve(&mut self, decision: Resolution) -> AppResult<&LoginState> {
        let candidate = match &self.state {
            LoginState::ResolvingQuota { candidate, .. } => *candidate,
            _ => return Err(AppError::conflict("No pending candidate to resolve")),
        };

        match decision {
            Resolution::Cancel => {
                self.api.cancel(candidate).await?;
                info!(candidate = %candidate, "Login attempt cancelled");
                self.state = LoginState::Aborted;
            }
            Resolution::ForceActivate { target } => {
                let activated = self.api.force_activate(candidate, target).await?;
                self.persist.save(activated.session_id)?;
                info!(
                    session_id = %activated.session_id,
                    displaced = %target,
                    "Candidate force-activated"
                );
                self.state = LoginState::Resolved {
                    session_id: activated.session_id,
                };
            }
        }

        Ok(&self.state)
    }

    /// Fetch the protected account payload with the working session.
    ///
    /// A `Revoked` answer clears the persisted id and returns the machine to
    /// `Authenticating` — the forced fresh sign-in.
    pub async fn fetch_account(&mut self) -> AppResult<AccountResponse> {
        let session_id = match &self.state {
            LoginState::Resolved { session_id } => *session_id,
            _ => return Err(AppError::conflict("No working session")),
        };

        match self.api.me(session_id).await {
            Ok(account) => Ok(account),
            Err(e) if e.kind == ErrorKind::Revoked => {
                info!(session_id = %session_id, "Working session was revoked, clearing");
                self.persist.clear()?;
                self.state = LoginState::Authenticating;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// List the account's sessions with the working session.
    pub async fn list_sessions(&mut self) -> AppResult<Vec<SessionResponse>> {
        let session_id = match &self.state {
            LoginState::Resolved { session_id } => *session_id,
            _ => return Err(AppError::conflict("No working session")),
        };

        match self.api.list(session_id).await {
            Ok(list) => Ok(list.sessions),
            Err(e) if e.kind == ErrorKind::Revoked => {
                self.persist.clear()?;
                self.state = LoginState::Authenticating;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Log out the working session and clear the persisted id.
    pub async fn logout(&mut self) -> AppResult<()> {
        let session_id = match &self.state {
            LoginState::Resolved { session_id } => *session_id,
            _ => return Err(AppError::conflict("No working session")),
        };

        self.api.logout(session_id).await?;
        self.persist.clear()?;
        self.state = LoginState::Authenticating;
        info!(session_id = %session_id, "Logged out");
        Ok(())
    }
}
