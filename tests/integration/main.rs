//! Integration tests for the DeviceGate HTTP API.
//!
//! These drive the full Axum router against the in-memory session store, so
//! they run hermetically without a database service.

mod helpers;

mod admission_test;
mod resolution_test;
mod validator_test;
