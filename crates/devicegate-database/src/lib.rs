//! # devicegate-database
//!
//! PostgreSQL connection management and repository implementations for
//! DeviceGate. All per-account atomic units (admission, resolution, logout)
//! live here as single transactions.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
