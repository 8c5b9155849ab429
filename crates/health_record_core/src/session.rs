//! crates/health_record_core/src/session.rs
//!
//! The client's record of who is signed in.
//!
//! A `SessionStore` is created once at the composition root and shared (via
//! `Arc`) with the API client, which reads the bearer token from it, and with
//! every view that needs to know the current user. The user and token are
//! persisted to a `SessionStorage` under the keys `user` and `token`.

use crate::domain::{Session, SessionStatus, UserProfile};
use crate::ports::{PortError, PortResult, SessionStorage};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "token";

/// Route unauthenticated users are sent to.
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone)]
enum SessionState {
    Loading,
    Authenticated(Session),
    Unauthenticated,
}

/// What a protected view is allowed to do right now.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAccess {
    /// The persisted session has not been read yet; render nothing data-dependent.
    Pending,
    Redirect(&'static str),
    Granted(Session),
}

pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Creates a store in the `Loading` state. Call [`SessionStore::initialize`]
    /// before relying on the session.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            state: RwLock::new(SessionState::Loading),
        }
    }

    /// Restores a persisted session, if any.
    ///
    /// Leaves `Loading` exactly once; later calls do nothing. Missing,
    /// partial, unreadable or malformed data all result in `Unauthenticated`.
    pub async fn initialize(&self) -> SessionStatus {
        let mut state = self.state.write().await;
        if !matches!(*state, SessionState::Loading) {
            return status_of(&state);
        }

        *state = match self.read_persisted().await {
            Some(session) => {
                info!("Restored session for {}", session.user.email);
                SessionState::Authenticated(session)
            }
            None => SessionState::Unauthenticated,
        };
        status_of(&state)
    }

    async fn read_persisted(&self) -> Option<Session> {
        let user_json = self.read_key(USER_KEY).await?;
        let token = self.read_key(TOKEN_KEY).await?;
        if token.is_empty() {
            return None;
        }
        match serde_json::from_str::<UserProfile>(&user_json) {
            Ok(user) => Some(Session { user, token }),
            Err(e) => {
                warn!("Ignoring malformed persisted user: {}", e);
                None
            }
        }
    }

    async fn read_key(&self, key: &str) -> Option<String> {
        match self.storage.get_item(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read '{}' from session storage: {}", key, e);
                None
            }
        }
    }

    /// Signs a user in, in memory and in durable storage.
    ///
    /// Both keys are written or neither is: if the token write fails the
    /// previously persisted user is put back and the in-memory session is
    /// left as it was.
    pub async fn login(&self, user: UserProfile, token: String) -> PortResult<()> {
        let user_json = serde_json::to_string(&user)
            .map_err(|e| PortError::Unexpected(format!("Failed to serialize user: {}", e)))?;

        let mut state = self.state.write().await;

        let previous_user = self.read_key(USER_KEY).await;
        self.storage.set_item(USER_KEY, &user_json).await?;
        if let Err(e) = self.storage.set_item(TOKEN_KEY, &token).await {
            let rollback = match &previous_user {
                Some(previous) => self.storage.set_item(USER_KEY, previous).await,
                None => self.storage.remove_item(USER_KEY).await,
            };
            if let Err(rollback) = rollback {
                warn!("Failed to roll back persisted user: {}", rollback);
            }
            return Err(e);
        }

        info!("Signed in as {}", user.email);
        *state = SessionState::Authenticated(Session { user, token });
        Ok(())
    }

    /// Signs out. Memory is always cleared; both keys are always attempted.
    pub async fn logout(&self) -> PortResult<()> {
        let mut state = self.state.write().await;
        *state = SessionState::Unauthenticated;

        let user_result = self.storage.remove_item(USER_KEY).await;
        let token_result = self.storage.remove_item(TOKEN_KEY).await;
        info!("Signed out");
        user_result.and(token_result)
    }

    /// Replaces the stored profile, keeping the token.
    pub async fn update_user(&self, user: UserProfile) -> PortResult<()> {
        let mut state = self.state.write().await;
        let SessionState::Authenticated(session) = &mut *state else {
            return Err(PortError::Unauthorized("Not signed in".to_string()));
        };

        let user_json = serde_json::to_string(&user)
            .map_err(|e| PortError::Unexpected(format!("Failed to serialize user: {}", e)))?;
        self.storage.set_item(USER_KEY, &user_json).await?;
        session.user = user;
        Ok(())
    }

    pub async fn status(&self) -> SessionStatus {
        status_of(&*self.state.read().await)
    }

    pub async fn session(&self) -> Option<Session> {
        match &*self.state.read().await {
            SessionState::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.session().await.map(|s| s.user)
    }

    pub async fn token(&self) -> Option<String> {
        match &*self.state.read().await {
            SessionState::Authenticated(session) => Some(session.token.clone()),
            _ => None,
        }
    }

    /// Gate for protected views.
    pub async fn access(&self) -> ViewAccess {
        match &*self.state.read().await {
            SessionState::Loading => ViewAccess::Pending,
            SessionState::Unauthenticated => ViewAccess::Redirect(LOGIN_ROUTE),
            SessionState::Authenticated(session) => ViewAccess::Granted(session.clone()),
        }
    }
}

fn status_of(state: &SessionState) -> SessionStatus {
    match state {
        SessionState::Loading => SessionStatus::Loading,
        SessionState::Authenticated(_) => SessionStatus::Authenticated,
        SessionState::Unauthenticated => SessionStatus::Unauthenticated,
    }
}
