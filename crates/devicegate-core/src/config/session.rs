//! Session admission configuration.

use serde::{Deserialize, Serialize};

/// Session admission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum concurrently active sessions per account (the quota N).
    #[serde(default = "default_max_active")]
    pub max_active_sessions: u32,
    /// How many times a lost admission/resolution transaction is retried
    /// before the caller is asked to try again.
    #[serde(default = "default_retry_attempts")]
    pub race_retry_attempts: u32,
    /// Backoff between retries in milliseconds.
    #[serde(default = "default_retry_backoff")]
    pub race_retry_backoff_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_active_sessions: default_max_active(),
            race_retry_attempts: default_retry_attempts(),
            race_retry_backoff_ms: default_retry_backoff(),
        }
    }
}

fn default_max_active() -> u32 {
    3
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    25
}
