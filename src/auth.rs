//! Session state: the access/refresh token pair and its lifecycle.
//!
//! [`AuthSession`] is an explicitly constructed context object shared by
//! the HTTP adapter and the application — not a module-level global. It is
//! set on login, read on every request, replaced on a successful token
//! refresh, and cleared on refresh failure or explicit logout.
//!
//! The browser original performed a hard redirect to the login screen on
//! forced logout. Here that side effect becomes a [`SessionEvent`] on a
//! watch channel; hosts subscribe via [`AuthSession::events()`] and route
//! accordingly.

use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, watch};
use tracing::info;

/// The `{access, refresh}` bearer token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// Explicit logout by the user.
    Logout,
    /// The refresh token was rejected or missing after a 401.
    RefreshFailed,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// No credentials held (initial state).
    Unauthenticated,
    SignedIn,
    SignedOut(SignOutReason),
}

struct SessionState {
    tokens: Option<TokenPair>,
    /// Bumped on every token change; lets concurrent 401 handlers detect
    /// that another task already completed a refresh.
    generation: u64,
}

struct AuthInner {
    state: RwLock<SessionState>,
    /// Serialises token refresh attempts: at most one refresh in flight.
    refresh_lock: Mutex<()>,
    events: watch::Sender<SessionEvent>,
}

/// Shared, cloneable session handle.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthInner>,
}

impl AuthSession {
    /// Create an unauthenticated session.
    pub fn new() -> Self {
        Self::build(None, SessionEvent::Unauthenticated)
    }

    /// Create a session from a previously stored token pair.
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self::build(Some(tokens), SessionEvent::SignedIn)
    }

    fn build(tokens: Option<TokenPair>, event: SessionEvent) -> Self {
        let (events, _) = watch::channel(event);
        Self {
            inner: Arc::new(AuthInner {
                state: RwLock::new(SessionState {
                    tokens,
                    generation: 0,
                }),
                refresh_lock: Mutex::new(()),
                events,
            }),
        }
    }

    /// Current token pair, if signed in.
    pub fn tokens(&self) -> Option<TokenPair> {
        self.inner.state.read().expect("auth state lock").tokens.clone()
    }

    /// Current access token, if signed in.
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .expect("auth state lock")
            .tokens
            .as_ref()
            .map(|t| t.access.clone())
    }

    /// Current refresh token, if signed in.
    pub fn refresh_token(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .expect("auth state lock")
            .tokens
            .as_ref()
            .map(|t| t.refresh.clone())
    }

    /// Token generation counter. Changes whenever the pair is set,
    /// replaced or cleared.
    pub fn generation(&self) -> u64 {
        self.inner.state.read().expect("auth state lock").generation
    }

    /// Install a fresh token pair (login).
    pub fn sign_in(&self, tokens: TokenPair) {
        {
            let mut state = self.inner.state.write().expect("auth state lock");
            state.tokens = Some(tokens);
            state.generation += 1;
        }
        info!("session signed in");
        // send_replace: the state must update even with no subscriber yet.
        self.inner.events.send_replace(SessionEvent::SignedIn);
    }

    /// Replace only the access token after a successful refresh; the
    /// refresh token is kept.
    pub(crate) fn replace_access(&self, access: String) {
        let mut state = self.inner.state.write().expect("auth state lock");
        if let Some(tokens) = state.tokens.as_mut() {
            tokens.access = access;
            state.generation += 1;
        }
    }

    /// Clear the token pair and notify subscribers.
    pub fn sign_out(&self, reason: SignOutReason) {
        {
            let mut state = self.inner.state.write().expect("auth state lock");
            state.tokens = None;
            state.generation += 1;
        }
        info!(?reason, "session signed out");
        self.inner.events.send_replace(SessionEvent::SignedOut(reason));
    }

    /// Subscribe to session lifecycle events. The receiver always yields
    /// the latest state first.
    pub fn events(&self) -> watch::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// The process-wide refresh serialisation lock. Held by the HTTP
    /// adapter for the duration of one refresh round trip.
    pub(crate) fn refresh_lock(&self) -> &Mutex<()> {
        &self.inner.refresh_lock
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}
