//! # devicegate-api
//!
//! HTTP API layer for DeviceGate built on Axum.
//!
//! Provides the session admission endpoints, the protected reads that
//! exercise the session validator, middleware (auth pre-check, CORS,
//! logging), extractors, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
