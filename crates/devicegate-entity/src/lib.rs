//! # devicegate-entity
//!
//! Domain entity models for DeviceGate.

pub mod session;

pub use session::{AdmissionRecord, CancelOutcome, NewSession, Session, SessionStatus};
