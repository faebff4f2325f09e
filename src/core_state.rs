//! Shared application state for the HTTP layer.
//!
//! `CoreState` is wrapped in `Arc` at startup. It carries the database
//! location (each request opens its own connection) and the login
//! session store behind an `RwLock`.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};
use std::time::Duration;

use crate::config::ServerConfig;
use crate::db;
use crate::sessions::SessionStore;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    db_path: PathBuf,
    /// Idle lifetime of a login session.
    pub session_ttl: Duration,
    sessions: RwLock<SessionStore>,
}

impl CoreState {
    pub fn new(db_path: PathBuf, session_ttl: Duration) -> Self {
        Self {
            db_path,
            session_ttl,
            sessions: RwLock::new(SessionStore::new(session_ttl)),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.database_path.clone(),
            Duration::from_secs(config.session_ttl_secs),
        )
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a fresh database connection for one request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    // ── Sessions ────────────────────────────────────────────

    /// Acquire a write lock on the session store. Lookups also write
    /// (they refresh the idle clock), so there is no read accessor.
    pub fn write_sessions(&self) -> Result<RwLockWriteGuard<'_, SessionStore>, CoreError> {
        self.sessions.write().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn start_session(&self, user_id: i64) -> Result<String, CoreError> {
        Ok(self.write_sessions()?.issue(user_id))
    }

    pub fn resolve_session(&self, token: &str) -> Result<Option<i64>, CoreError> {
        Ok(self.write_sessions()?.resolve(token))
    }

    pub fn end_session(&self, token: &str) -> Result<bool, CoreError> {
        Ok(self.write_sessions()?.revoke(token))
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_db_creates_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::new(dir.path().join("nested/clinic.db"), Duration::from_secs(60));
        let conn = core.open_db().unwrap();
        assert_eq!(db::count_tables(&conn).unwrap(), 3);
        assert!(core.db_path().exists());
    }

    #[test]
    fn session_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::new(dir.path().join("clinic.db"), Duration::from_secs(60));
        let token = core.start_session(3).unwrap();
        assert_eq!(core.active_sessions(), 1);
        assert_eq!(core.resolve_session(&token).unwrap(), Some(3));
        assert!(core.end_session(&token).unwrap());
        assert_eq!(core.resolve_session(&token).unwrap(), None);
        assert_eq!(core.active_sessions(), 0);
    }
}
