//! # devicegate-core
//!
//! Core crate for DeviceGate. Contains configuration schemas, domain events,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other DeviceGate crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
