use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::User;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
}

type UnauthorizedCallback = Box<dyn Fn() + Send + Sync>;

/// Identity service: the one place that knows the current token and user.
///
/// Shared behind an `Arc` by the API client and the application. When a
/// cache directory is given the session survives restarts.
pub struct Session {
    path: Option<PathBuf>,
    data: RwLock<Option<SessionData>>,
    on_unauthorized: Mutex<Vec<UnauthorizedCallback>>,
}

impl Session {
    /// A session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(None),
            on_unauthorized: Mutex::new(Vec::new()),
        }
    }

    /// A session persisted as `session.json` under `cache_dir`.
    pub fn persistent(cache_dir: &Path) -> Self {
        Self {
            path: Some(cache_dir.join(SESSION_FILE)),
            ..Self::in_memory()
        }
    }

    /// Load session from disk. Returns whether a session was restored.
    /// An unreadable or corrupt file is discarded rather than reported.
    pub fn load(&self) -> Result<bool> {
        let Some(path) = self.path.as_ref() else {
            return Ok(false);
        };
        if !path.exists() {
            return Ok(false);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read session file")?;
        match serde_json::from_str::<SessionData>(&contents) {
            Ok(data) => {
                debug!(username = %data.user.username, "Restored saved session");
                *self.write() = Some(data);
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Discarding corrupt session file");
                std::fs::remove_file(path).context("Failed to remove corrupt session file")?;
                Ok(false)
            }
        }
    }

    fn save(&self, data: &SessionData) -> Result<()> {
        if let Some(ref path) = self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents).context("Failed to write session file")?;
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<SessionData>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<SessionData>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Get the bearer token if logged in
    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|d| d.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().map(|d| d.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.read().as_ref().map(|d| d.user.is_admin()).unwrap_or(false)
    }

    /// Replace the current identity and persist it. The in-memory session is
    /// set even when writing the file fails.
    pub fn set_session(&self, token: String, user: User) -> Result<()> {
        let data = SessionData {
            token,
            user,
            created_at: Utc::now(),
        };
        info!(username = %data.user.username, "Session started");
        let result = self.save(&data);
        *self.write() = Some(data);
        result
    }

    /// Forget the current identity, in memory and on disk.
    pub fn clear_session(&self) -> Result<()> {
        *self.write() = None;
        if let Some(ref path) = self.path {
            if path.exists() {
                std::fs::remove_file(path).context("Failed to remove session file")?;
            }
        }
        Ok(())
    }

    /// Register a callback fired whenever the API rejects the session.
    pub fn on_unauthorized<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_unauthorized
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(callback));
    }

    /// Clear the session after an authorization failure and notify listeners.
    pub fn handle_unauthorized(&self) {
        warn!("Session rejected by server, clearing credentials");
        if let Err(e) = self.clear_session() {
            warn!(error = %e, "Failed to clear session after authorization failure");
        }
        let callbacks = self.on_unauthorized.lock().unwrap_or_else(|e| e.into_inner());
        for callback in callbacks.iter() {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn admin() -> User {
        User {
            id: "1".to_string(),
            username: "admin".to_string(),
            role: Role::Admin,
        }
    }

    #[test]
    fn test_set_and_clear_session() {
        let session = Session::in_memory();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);

        session.set_session("tok".to_string(), admin()).expect("set session");
        assert_eq!(session.token().as_deref(), Some("tok"));
        assert!(session.is_admin());

        session.clear_session().expect("clear session");
        assert!(!session.is_authenticated());
        assert!(!session.is_admin());
    }

    #[test]
    fn test_session_persists_across_instances() {
        let dir = tempfile::tempdir().expect("temp dir");
        let session = Session::persistent(dir.path());
        session.set_session("tok".to_string(), admin()).expect("set session");

        let restored = Session::persistent(dir.path());
        assert!(restored.load().expect("load session"));
        assert_eq!(restored.token().as_deref(), Some("tok"));
        assert_eq!(restored.user().map(|u| u.username), Some("admin".to_string()));

        restored.clear_session().expect("clear session");
        assert!(!dir.path().join(SESSION_FILE).exists());
    }

    #[test]
    fn test_corrupt_session_file_is_discarded() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join(SESSION_FILE), "{not json").expect("write file");

        let session = Session::persistent(dir.path());
        assert!(!session.load().expect("load session"));
        assert!(!dir.path().join(SESSION_FILE).exists());
    }

    #[test]
    fn test_unauthorized_clears_and_notifies() {
        let session = Session::in_memory();
        session.set_session("tok".to_string(), admin()).expect("set session");

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        session.on_unauthorized(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.handle_unauthorized();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!session.is_authenticated());
    }
}
