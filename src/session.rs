use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::Username;

/// The logged-in user's name and bearer token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: Username,
    pub token: String,
}

impl Session {
    #[must_use]
    pub fn new(username: impl Into<Username>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Process-wide session persistence.
///
/// The API client reads the store on every request, so an implementation
/// must return the latest written value from [`get`](SessionStore::get)
/// rather than a snapshot taken at construction.
///
/// # Example
///
/// ```rust
/// use moviebook_client::{MemorySessionStore, SessionStore};
///
/// let store = MemorySessionStore::new();
/// store.set("alice".into(), "token".into()).unwrap();
/// assert_eq!(store.get().unwrap().username.as_str(), "alice");
/// ```
pub trait SessionStore: Send + Sync {
    /// Current session, if anyone is logged in.
    fn get(&self) -> Option<Session>;

    /// Replace the session.
    fn set(&self, username: Username, token: String) -> Result<(), Error>;

    /// Forget the session (logout).
    fn clear(&self) -> Result<(), Error>;

    /// Change the stored username, keeping the token. No-op without a session.
    fn rename(&self, username: Username) -> Result<(), Error> {
        match self.get() {
            Some(session) => self.set(username, session.token),
            None => Ok(()),
        }
    }

    /// Bearer token of the current session.
    fn token(&self) -> Option<String> {
        self.get().map(|s| s.token)
    }
}

/// In-memory store. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start out logged in.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, username: Username, token: String) -> Result<(), Error> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Session { username, token });
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Suffix source for temp files, unique per write within the process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// JSON file store that survives restarts.
///
/// Every [`get`](SessionStore::get) reads the file. A missing file means
/// nobody is logged in; an unreadable or corrupt one is logged and treated
/// the same way.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.{seq}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<Session> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Session file unreadable");
                return None;
            }
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "Session file corrupt");
            })
            .ok()
    }

    fn set(&self, username: Username, token: String) -> Result<(), Error> {
        let json = serde_json::to_vec(&Session { username, token })
            .map_err(|e| Error::Store(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Store(format!("{}: {e}", parent.display())))?;
        }

        // Each write goes to its own temp file, then renames over the target,
        // so readers and other writers never see a partial file.
        let tmp = self.temp_path();
        std::fs::write(&tmp, json).map_err(|e| Error::Store(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Error::Store(format!("{}: {e}", self.path.display()))
        })
    }

    fn clear(&self) -> Result<(), Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Store(format!("{}: {e}", self.path.display()))),
        }
    }
}
