//! Persistence of the working session id.
//!
//! The "current session" is an explicit context value threaded through the
//! orchestrator, not ambient global state; this module only gives it a home
//! across process restarts. Clearing is tied to the `Revoked` transition.

use std::path::PathBuf;

use uuid::Uuid;

use devicegate_core::error::AppError;
use devicegate_core::result::AppResult;

/// Stores the single working-session id across client restarts.
pub trait SessionIdStore: Send + Sync {
    /// Load the persisted session id, if any.
    fn load(&self) -> AppResult<Option<Uuid>>;

    /// Persist the working session id.
    fn save(&self, session_id: Uuid) -> AppResult<()>;

    /// Forget the persisted session id.
    fn clear(&self) -> AppResult<()>;
}

/// File-backed store holding the session id as a single line of text.
#[derive(Debug, Clone)]
pub struct FileSessionIdStore {
    /// Path of the session file.
    path: PathBuf,
}

impl FileSessionIdStore {
    /// Creates a store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionIdStore for FileSessionIdStore {
    fn load(&self) -> AppResult<Option<Uuid>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                Uuid::parse_str(trimmed).map(Some).map_err(|e| {
                    AppError::internal(format!("Corrupt session file {:?}: {e}", self.path))
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::internal(format!(
                "Failed to read session file {:?}: {e}",
                self.path
            ))),
        }
    }

    fn save(&self, session_id: Uuid) -> AppResult<()> {
        std::fs::write(&self.path, session_id.to_string()).map_err(|e| {
            AppError::internal(format!(
                "Failed to write session file {:?}: {e}",
                self.path
            ))
        })
    }

    fn clear(&self) -> AppResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::internal(format!(
                "Failed to remove session file {:?}: {e}",
                self.path
            ))),
        }
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySessionIdStore {
    slot: std::sync::Mutex<Option<Uuid>>,
}

#[cfg(test)]
impl MemorySessionIdStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl SessionIdStore for MemorySessionIdStore {
    fn load(&self) -> AppResult<Option<Uuid>> {
        Ok(*self.slot.lock().unwrap())
    }

    fn save(&self, session_id: Uuid) -> AppResult<()> {
        *self.slot.lock().unwrap() = Some(session_id);
        Ok(())
    }

    fn clear(&self) -> AppResult<()> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}
