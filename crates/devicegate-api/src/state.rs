//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use devicegate_admission::admission::AdmissionCoordinator;
use devicegate_admission::resolution::ResolutionHandler;
use devicegate_admission::store::SessionStore;
use devicegate_admission::token::IdentityVerifier;
use devicegate_admission::validator::SessionValidator;
use devicegate_core::config::AppConfig;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Bearer token verifier
    pub verifier: Arc<IdentityVerifier>,
    /// Admission coordinator (register, logout)
    pub coordinator: Arc<AdmissionCoordinator>,
    /// Resolution handler (cancel, force-activate)
    pub resolution: Arc<ResolutionHandler>,
    /// Session validator for protected calls
    pub validator: Arc<SessionValidator>,
    /// Session store (health checks, session listing)
    pub store: Arc<dyn SessionStore>,
}
