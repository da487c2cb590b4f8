//! Session persistence and the in-memory session handle.
//!
//! The browser clients kept tokens under well-known local-storage keys;
//! the Rust analogue is a [`SessionStore`] trait with a JSON-file
//! implementation under the platform data directory, plus an in-memory
//! implementation for tests.
//!
//! [`SessionHandle`] is the single owner of the live session. All
//! mutation happens under one synchronous lock acquisition and is
//! written through to the store, so the access/refresh pair is always
//! replaced together.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tradewire_core::session::{AuthTokens, Session};
use tradewire_core::user::UserProfile;

/// Errors from loading or persisting a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable storage for the session (the local-storage analogue).
pub trait SessionStore: Send + Sync {
    /// Read the persisted session, if any.
    fn load(&self) -> Result<Option<Session>, SessionStoreError>;

    /// Persist the session, replacing any previous one.
    fn save(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Remove any persisted session.
    fn clear(&self) -> Result<(), SessionStoreError>;
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// Non-persistent store; sessions live only as long as the process.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: RwLock<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.inner.read().expect("session store lock poisoned").clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        *self.inner.write().expect("session store lock poisoned") = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.inner.write().expect("session store lock poisoned") = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileSessionStore
// ---------------------------------------------------------------------------

/// JSON-file-backed store under the platform data directory.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The well-known default location: `<data_dir>/tradewire/session.json`.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tradewire")
            .join("session.json")
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let session = serde_json::from_str(&contents)?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Shared owner of the live session.
///
/// Cheap to clone; all clones see the same session. Mutations are
/// write-through: the in-memory value changes first, then the store.
/// A store write failure is logged and does not fail the request that
/// triggered it; the in-memory session remains authoritative.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    store: Box<dyn SessionStore>,
    current: RwLock<Option<Session>>,
}

impl SessionHandle {
    /// Create a handle, seeding the in-memory session from the store.
    ///
    /// A corrupt or unreadable persisted session is logged and treated
    /// as logged-out rather than failing construction.
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        let current = match store.load() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load persisted session, starting logged out");
                None
            }
        };

        Self {
            inner: Arc::new(HandleInner {
                store,
                current: RwLock::new(current),
            }),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.access_token().to_string())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.refresh_token().to_string())
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    /// Install a new session (login / sign-up).
    pub fn set(&self, session: Session) {
        if let Err(e) = self.inner.store.save(&session) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
        *self.write() = Some(session);
    }

    /// Swap in a refreshed token pair, keeping the user untouched.
    ///
    /// No-op when there is no live session (a refresh can only happen
    /// against an existing session).
    pub fn replace_tokens(&self, tokens: AuthTokens) {
        let mut guard = self.write();
        if let Some(session) = guard.as_mut() {
            session.replace_tokens(tokens);
            if let Err(e) = self.inner.store.save(session) {
                tracing::warn!(error = %e, "Failed to persist refreshed tokens");
            }
        }
    }

    /// Drop the session everywhere (logout / unrecoverable refresh
    /// failure).
    pub fn clear(&self) {
        if let Err(e) = self.inner.store.clear() {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }
        *self.write() = None;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.inner.current.read().expect("session lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.inner.current.write().expect("session lock poisoned")
    }
}
