use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::error::AdminError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SignedIn,
    SignedOut,
    /// The backend rejected the token (expired or revoked).
    Invalidated,
}

/// Persistent client storage for the bearer token: a single file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> std::io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn save(&self, token: &str) -> std::io::Result<()> {
        std::fs::write(&self.path, token)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

struct SessionInner {
    token: RwLock<Option<String>>,
    store: Option<TokenStore>,
    state: watch::Sender<SessionState>,
}

/// The single source of truth for the current token. Every API call asks
/// the session for the token instead of reading client storage itself.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Restores the session from the token store.
    pub fn restore(store: TokenStore) -> Result<Self, AdminError> {
        let token = store.load()?;
        Ok(Self::build(token, Some(store)))
    }

    /// A session that never touches persistent storage.
    pub fn in_memory(token: Option<String>) -> Self {
        Self::build(token, None)
    }

    fn build(token: Option<String>, store: Option<TokenStore>) -> Self {
        let initial = if token.is_some() {
            SessionState::SignedIn
        } else {
            SessionState::SignedOut
        };
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(SessionInner {
                token: RwLock::new(token),
                store,
                state,
            }),
        }
    }

    /// The bearer token, or `Unauthenticated` when there is none.
    pub fn token(&self) -> Result<String, AdminError> {
        self.inner
            .token
            .read()
            .map_err(|_| AdminError::Unauthenticated)?
            .clone()
            .ok_or(AdminError::Unauthenticated)
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn sign_in(&self, token: String) -> Result<(), AdminError> {
        if let Some(store) = &self.inner.store {
            store.save(&token)?;
        }
        self.replace_token(Some(token));
        self.inner.state.send_replace(SessionState::SignedIn);
        tracing::info!("session signed in");
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), AdminError> {
        self.clear(SessionState::SignedOut)
    }

    /// Called when the backend rejects the token.
    pub fn invalidate(&self) {
        if let Err(err) = self.clear(SessionState::Invalidated) {
            tracing::warn!(error = %err, "failed to clear stored token");
        }
    }

    fn clear(&self, next: SessionState) -> Result<(), AdminError> {
        self.replace_token(None);
        self.inner.state.send_replace(next);
        tracing::info!(state = ?next, "session cleared");
        if let Some(store) = &self.inner.store {
            store.clear()?;
        }
        Ok(())
    }

    fn replace_token(&self, token: Option<String>) {
        match self.inner.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> TokenStore {
        let path = std::env::temp_dir().join(format!(
            "youth-admin-{name}-{}",
            uuid::Uuid::new_v4()
        ));
        TokenStore::new(path)
    }

    #[test]
    fn missing_token_is_unauthenticated() {
        let session = Session::in_memory(None);
        assert_eq!(session.token(), Err(AdminError::Unauthenticated));
        assert_eq!(session.state(), SessionState::SignedOut);
    }

    #[test]
    fn sign_in_persists_and_restores() {
        let store = temp_store("persist");
        let session = Session::restore(store.clone()).unwrap();
        session.sign_in("abc123".to_string()).unwrap();

        let restored = Session::restore(store.clone()).unwrap();
        assert_eq!(restored.token().unwrap(), "abc123");
        assert_eq!(restored.state(), SessionState::SignedIn);

        restored.sign_out().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn invalidate_clears_token_and_notifies() {
        let store = temp_store("invalidate");
        store.save("stale").unwrap();
        let session = Session::restore(store.clone()).unwrap();
        let mut rx = session.subscribe();

        session.invalidate();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::Invalidated);
        assert!(session.token().is_err());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn clones_share_the_token() {
        let session = Session::in_memory(None);
        let other = session.clone();
        session.sign_in("shared".to_string()).unwrap();
        assert_eq!(other.token().unwrap(), "shared");
    }
}
