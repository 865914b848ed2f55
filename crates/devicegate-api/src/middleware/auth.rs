//! Bearer pre-check middleware.

// Authentication is handled via the `AuthAccount` / `ActiveSession`
// extractors. This middleware is a lightweight blanket check for routes that
// must never be reachable without a bearer header at all.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

/// Rejects requests without a `Bearer` Authorization header.
///
/// Full verification happens in the extractors; this only keeps anonymous
/// traffic out of the session routes.
pub async fn require_bearer(request: Request, next: Next) -> Result<Response, StatusCode> {
    let has_bearer = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer "))
        .unwrap_or(false);

    if !has_bearer {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
