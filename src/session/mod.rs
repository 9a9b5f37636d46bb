mod storage;

pub use storage::{FileStorage, MemoryStorage, PersistedSession, SessionStorage};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::gateway::CredentialProvider;
use crate::models::User;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub hydrated: bool,
}

impl Session {
    fn is_consistent(&self) -> bool {
        match (self.is_authenticated, &self.token, &self.user) {
            (true, Some(_), Some(_)) => true,
            (false, None, None) => true,
            _ => false,
        }
    }

    fn persisted(&self) -> PersistedSession {
        PersistedSession {
            user: self.user.clone(),
            token: self.token.clone(),
            is_authenticated: self.is_authenticated,
        }
    }

    fn clear_credentials(&mut self) {
        self.user = None;
        self.token = None;
        self.is_authenticated = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not yet restored from storage; an empty session means nothing yet.
    Pending,
    Anonymous,
    Authenticated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Anonymous => write!(f, "anonymous"),
            SessionStatus::Authenticated => write!(f, "authenticated"),
        }
    }
}

/// Holds the signed-in user and bearer token.
///
/// Created with [`SessionStore::init`], restored with [`SessionStore::hydrate`]
/// and flushed with [`SessionStore::teardown`]. Every change is written through
/// to the backing [`SessionStorage`].
pub struct SessionStore {
    state: RwLock<Session>,
    storage: Box<dyn SessionStorage>,
    /// Bumped whenever the signed-in identity changes.
    generation: AtomicU64,
}

impl SessionStore {
    pub fn init(storage: impl SessionStorage + 'static) -> Self {
        Self {
            state: RwLock::new(Session::default()),
            storage: Box::new(storage),
            generation: AtomicU64::new(0),
        }
    }

    pub fn in_memory() -> Self {
        Self::init(MemoryStorage::new())
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Restores the persisted session. Inconsistent state (a token without
    /// the authenticated flag or the reverse) is discarded.
    /// Unreadable storage counts as an empty session and is cleared.
    pub fn hydrate(&self) -> ClientResult<SessionStatus> {
        let persisted = match self.storage.load() {
            Ok(persisted) => persisted,
            Err(ClientError::Json(e)) => {
                warn!("Discarding unreadable persisted session: {}", e);
                self.storage.clear()?;
                None
            }
            Err(e) => return Err(e),
        };

        let mut state = self.write();
        if let Some(persisted) = persisted {
            state.user = persisted.user;
            state.token = persisted.token;
            state.is_authenticated = persisted.is_authenticated;
        }

        if !state.is_consistent() {
            warn!("Discarding inconsistent persisted session");
            state.clear_credentials();
            self.storage.clear()?;
        }

        state.hydrated = true;
        self.bump_generation();
        let status = status_of(&state);
        debug!("Session hydrated: {}", status);
        Ok(status)
    }

    pub fn set_auth(&self, user: User, token: impl Into<String>) {
        let token = token.into();
        if token.trim().is_empty() {
            warn!("Refusing to store an empty token, logging out");
            self.logout();
            return;
        }

        let mut state = self.write();
        state.user = Some(user);
        state.token = Some(token);
        state.is_authenticated = true;
        self.persist(&state);
        self.bump_generation();
        if let Some(user) = &state.user {
            info!("Signed in as {}", user.email);
        }
    }

    /// Replaces the stored user and keeps the current token.
    pub fn update_user(&self, user: User) {
        let mut state = self.write();
        if !state.is_authenticated {
            return;
        }
        state.user = Some(user);
        self.persist(&state);
    }

    pub fn logout(&self) {
        let mut state = self.write();
        state.clear_credentials();
        if let Err(e) = self.storage.clear() {
            warn!("Failed to clear stored session: {}", e);
        }
        self.bump_generation();
        info!("Signed out");
    }

    pub fn teardown(&self) -> ClientResult<()> {
        let mut state = self.write();
        if state.hydrated {
            if state.is_authenticated {
                self.storage.save(&state.persisted())?;
            } else {
                self.storage.clear()?;
            }
        }
        state.hydrated = false;
        Ok(())
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        status_of(&self.read())
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    /// Changes on every sign-in, sign-out and hydration. Anything cached
    /// under an older generation belongs to another identity.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn persist(&self, state: &Session) {
        if let Err(e) = self.storage.save(&state.persisted()) {
            warn!("Failed to persist session: {}", e);
        }
    }
}

fn status_of(state: &Session) -> SessionStatus {
    if !state.hydrated {
        SessionStatus::Pending
    } else if state.is_authenticated {
        SessionStatus::Authenticated
    } else {
        SessionStatus::Anonymous
    }
}

impl CredentialProvider for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }

    fn on_unauthorized(&self) {
        if self.read().token.is_none() {
            return;
        }
        warn!("Token rejected by the server, logging out");
        self.logout();
    }
}
