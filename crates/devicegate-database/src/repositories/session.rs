//! Session repository implementation.
//!
//! The admission check, the cancel path, the force-activate swap, and logout
//! are each a single transaction serialized per account with an advisory
//! lock, so no two atomic units for the same account can interleave.
//! Accounts never contend with each other.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use devicegate_core::error::{AppError, ErrorKind};
use devicegate_core::result::AppResult;
use devicegate_entity::session::{AdmissionRecord, CancelOutcome, NewSession, Session, SessionStatus};

/// Reason recorded when a stale pending candidate is replaced by a newer attempt.
pub const REASON_SUPERSEDED: &str = "superseded by a newer login attempt";
/// Reason recorded when the user cancels a pending candidate.
pub const REASON_CANCELLED: &str = "cancelled by user";
/// Reason recorded when a session is displaced by a force-activated candidate.
pub const REASON_DISPLACED: &str = "displaced by force-activated session";

/// Repository for session persistence and the per-account atomic units.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a session by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    /// List all sessions for an account, oldest first. Revoked rows are
    /// retained and included (session history for the resolution UI).
    pub async fn find_by_account(&self, account_id: &str) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE account_id = $1 ORDER BY issued_at ASC, id ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list sessions", e))
    }

    /// Count active sessions for an account.
    pub async fn count_active_by_account(&self, account_id: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE account_id = $1 AND status = 'active'",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count active sessions", e)
        })?;
        Ok(count)
    }

    /// Perform the atomic admission check: supersede any stale pending
    /// candidate, count active sessions, and insert the new session as
    /// `active` (below quota) or `pending` (at quota) — all in one
    /// transaction under the account's advisory lock.
    pub async fn admit(&self, new: &NewSession, max_active: u32) -> AppResult<AdmissionRecord> {
        let mut tx = self.begin().await?;
        Self::lock_account(&mut tx, &new.account_id).await?;

        // One unresolved candidate per account: a newer attempt replaces it.
        let superseded = sqlx::query(
            "UPDATE sessions SET status = 'revoked', revoked_at = NOW(), revoked_reason = $2 \
             WHERE account_id = $1 AND status = 'pending'",
        )
        .bind(&new.account_id)
        .bind(REASON_SUPERSEDED)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_tx_error(e, "supersede pending candidate"))?
        .rows_affected();

        if superseded > 0 {
            debug!(account_id = %new.account_id, superseded, "Superseded stale pending candidate");
        }

        let active_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE account_id = $1 AND status = 'active'",
        )
        .bind(&new.account_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_tx_error(e, "count active sessions"))?;

        let overquota = active_count >= max_active as i64;
        let status = if overquota {
            SessionStatus::Pending
        } else {
            SessionStatus::Active
        };

        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (account_id, device_name, user_agent, status) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&new.account_id)
        .bind(&new.device_name)
        .bind(&new.user_agent)
        .bind(status)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_tx_error(e, "insert session"))?;

        let sessions = if overquota {
            sqlx::query_as::<_, Session>(
                "SELECT * FROM sessions WHERE account_id = $1 AND status != 'revoked' \
                 ORDER BY issued_at ASC, id ASC",
            )
            .bind(&new.account_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_tx_error(e, "list non-revoked sessions"))?
        } else {
            Vec::new()
        };

        tx.commit()
            .await
            .map_err(|e| map_tx_error(e, "commit admission"))?;

        Ok(AdmissionRecord {
            session,
            overquota,
            sessions,
        })
    }

    /// Cancel a pending candidate: pending → revoked. Idempotent on an
    /// already-revoked candidate. Anything else is reported as not found.
    pub async fn cancel(&self, candidate_id: Uuid, account_id: &str) -> AppResult<CancelOutcome> {
        let mut tx = self.begin().await?;
        Self::lock_account(&mut tx, account_id).await?;

        let candidate = Self::fetch_owned(&mut tx, candidate_id, account_id).await?;

        let outcome = match candidate {
            Some(s) if s.is_pending() => {
                sqlx::query(
                    "UPDATE sessions SET status = 'revoked', revoked_at = NOW(), revoked_reason = $2 \
                     WHERE id = $1",
                )
                .bind(candidate_id)
                .bind(REASON_CANCELLED)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_tx_error(e, "cancel candidate"))?;
                CancelOutcome::Cancelled
            }
            Some(s) if s.is_revoked() => CancelOutcome::AlreadyResolved,
            _ => {
                return Err(AppError::not_found(format!(
                    "No pending candidate {candidate_id} for this account"
                )));
            }
        };

        tx.commit()
            .await
            .map_err(|e| map_tx_error(e, "commit cancel"))?;
        Ok(outcome)
    }

    /// Force-activate a pending candidate by revoking an active target owned
    /// by the same account. Both transitions happen in one transaction or
    /// not at all, so the active count is unchanged by this operation.
    pub async fn force_activate(
        &self,
        candidate_id: Uuid,
        target_id: Uuid,
        account_id: &str,
    ) -> AppResult<Session> {
        let mut tx = self.begin().await?;
        Self::lock_account(&mut tx, account_id).await?;

        let candidate = Self::fetch_owned(&mut tx, candidate_id, account_id).await?;
        match candidate {
            Some(ref s) if s.is_pending() => {}
            _ => {
                return Err(AppError::invalid_target(format!(
                    "Candidate {candidate_id} is not a pending session of this account"
                )));
            }
        }

        let target = Self::fetch_owned(&mut tx, target_id, account_id).await?;
        match target {
            Some(ref s) if s.is_active() => {}
            _ => {
                return Err(AppError::invalid_target(format!(
                    "Target {target_id} is not an active session of this account"
                )));
            }
        }

        sqlx::query(
            "UPDATE sessions SET status = 'revoked', revoked_at = NOW(), revoked_reason = $2 \
             WHERE id = $1",
        )
        .bind(target_id)
        .bind(REASON_DISPLACED)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_tx_error(e, "revoke target"))?;

        let activated = sqlx::query_as::<_, Session>(
            "UPDATE sessions SET status = 'active' WHERE id = $1 RETURNING *",
        )
        .bind(candidate_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_tx_error(e, "activate candidate"))?;

        tx.commit()
            .await
            .map_err(|e| map_tx_error(e, "commit force-activate"))?;

        Ok(activated)
    }

    /// Revoke a non-revoked session owned by the account (logout).
    pub async fn revoke(
        &self,
        session_id: Uuid,
        account_id: &str,
        reason: &str,
    ) -> AppResult<()> {
        let mut tx = self.begin().await?;
        Self::lock_account(&mut tx, account_id).await?;

        let result = sqlx::query(
            "UPDATE sessions SET status = 'revoked', revoked_at = NOW(), revoked_reason = $3 \
             WHERE id = $1 AND account_id = $2 AND status != 'revoked'",
        )
        .bind(session_id)
        .bind(account_id)
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_tx_error(e, "revoke session"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "No revocable session {session_id} for this account"
            )));
        }

        tx.commit()
            .await
            .map_err(|e| map_tx_error(e, "commit revoke"))?;
        Ok(())
    }

    /// Begin a transaction.
    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e))
    }

    /// Serialize all atomic units for one account within this transaction.
    /// The lock is released automatically at commit/rollback.
    async fn lock_account(tx: &mut Transaction<'static, Postgres>, account_id: &str) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
            .bind(account_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_tx_error(e, "acquire account lock"))?;
        Ok(())
    }

    /// Fetch a session by id constrained to the owning account, inside the
    /// current transaction.
    async fn fetch_owned(
        tx: &mut Transaction<'static, Postgres>,
        id: Uuid,
        account_id: &str,
    ) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_tx_error(e, "fetch session"))
    }
}

/// Map a transactional sqlx error, surfacing lost-race SQLSTATEs as
/// `QuotaRace` so the coordinator can retry them transparently.
fn map_tx_error(e: sqlx::Error, what: &str) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
            return AppError::quota_race(format!("Lost concurrency race while trying to {what}"));
        }
    }
    AppError::with_source(ErrorKind::Database, format!("Failed to {what}"), e)
}
