//! Session entity.

pub mod model;
pub mod outcome;

pub use model::{NewSession, Session, SessionStatus};
pub use outcome::{AdmissionRecord, CancelOutcome};
