//! Protected account handlers.

use axum::Json;

use crate::error::ApiError;

use crate::dto::response::AccountResponse;
use crate::extractors::ActiveSession;

/// GET /api/account/me
///
/// A protected read: reaching it at all proves the presented session id is
/// active, which is how a displaced device learns it has been revoked.
pub async fn me(session: ActiveSession) -> Result<Json<AccountResponse>, ApiError> {
    Ok(Json(AccountResponse {
        account_id: session.account_id,
        session_id: session.session.id,
        name: session.claims.name,
    }))
}
