//! DeviceGate Server — Per-Account Session Admission Service
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, fmt};

use devicegate_core::config::AppConfig;
use devicegate_core::error::AppError;
use devicegate_core::events::SessionEvent;

#[tokio::main]
async fn main() {
    let env = std::env::var("DEVICEGATE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting DeviceGate v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = devicegate_database::connection::DatabasePool::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    devicegate_database::migration::run_migrations(db.pool()).await?;
    tracing::info!("Database migrations complete");

    // ── Step 2: Repositories and session store ───────────────────
    let session_repo = Arc::new(
        devicegate_database::repositories::session::SessionRepository::new(db.pool().clone()),
    );
    let store: Arc<dyn devicegate_admission::store::SessionStore> = Arc::new(
        devicegate_admission::store::PostgresSessionStore::new(Arc::clone(&session_repo)),
    );

    // ── Step 3: Admission pipeline ───────────────────────────────
    let (events, _) = broadcast::channel::<SessionEvent>(256);

    let verifier = Arc::new(devicegate_admission::token::IdentityVerifier::new(
        &config.auth,
    ));
    let coordinator = Arc::new(devicegate_admission::admission::AdmissionCoordinator::new(
        Arc::clone(&store),
        config.session.clone(),
        events.clone(),
    ));
    let resolution = Arc::new(devicegate_admission::resolution::ResolutionHandler::new(
        Arc::clone(&store),
        config.session.clone(),
        events.clone(),
    ));
    let validator = Arc::new(devicegate_admission::validator::SessionValidator::new(
        Arc::clone(&store),
    ));

    tracing::info!(
        max_active_sessions = config.session.max_active_sessions,
        "Admission pipeline initialized"
    );

    // ── Step 4: Event log subscriber ─────────────────────────────
    let mut event_rx = events.subscribe();
    let event_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => tracing::info!(event = ?event, "session event"),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // ── Step 5: Build and start HTTP server ──────────────────────
    let app_state = devicegate_api::state::AppState {
        config: Arc::new(config.clone()),
        verifier,
        coordinator,
        resolution,
        validator,
        store,
    };

    let app = devicegate_api::router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("DeviceGate server listening on {}", addr);

    // ── Step 6: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    event_task.abort();
    db.close().await;

    tracing::info!("DeviceGate server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
