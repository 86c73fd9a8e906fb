//! Authoritative session state for the current browser user.
//!
//! ARCHITECTURE
//! ============
//! `SessionService` is an explicit handle created once at startup (see
//! `app::SessionProvider`) and shared by cloning. It is the single writer of
//! the credential store and the only place session state changes. Views read
//! a reactive mirror (`state::auth::AuthBinding`) that is pushed every change
//! through `subscribe` and also re-pulls after each action it drives.
//!
//! INVARIANTS
//! ==========
//! - `authenticated` implies identity and token are present and the token was
//!   unexpired when adopted; `is_authenticated` re-checks expiry lazily.
//! - Every failure resets state to empty and clears storage before the error
//!   is returned, so an error never sits beside a half-valid session.
//! - Login attempts are serialized; a second attempt waits for the first.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use leptos::logging::{log, warn};

use crate::config::AuthConfig;
use crate::net::api::{ApiError, AuthApi, status_message};
use crate::net::types::{
    AccountStatus, Credentials, Identity, LoginResponse, RegisterRequest, RegisterResponse, Role, UserId,
    user_id_from_value,
};
use crate::util::storage::{CredentialStore, KeyValueStore};
use crate::util::token;

/// Shown for integrity and stale-session failures; the user is told no more
/// than for a wrong password.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// Snapshot of the session. Always handed out by value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<Identity>,
    pub token: Option<String>,
    pub authenticated: bool,
}

impl SessionState {
    #[must_use]
    pub fn signed_in(token: String, user: Identity) -> Self {
        Self { user: Some(user), token: Some(token), authenticated: true }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }
}

/// Result of restoring a session from storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    NoValidAuthData,
    Expired,
}

impl RestoreOutcome {
    #[must_use]
    pub fn is_restored(self) -> bool {
        self == Self::Restored
    }
}

impl fmt::Display for RestoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Restored => "restored stored session",
            Self::NoValidAuthData => "no valid auth data",
            Self::Expired => "stored token expired",
        })
    }
}

/// Session-layer failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Input rejected before any network call.
    #[error("{0}")]
    Validation(String),
    /// The auth endpoint failed; `message` is already user-facing.
    #[error("{message}")]
    Transport { status: Option<u16>, message: String },
    /// Malformed token, unrecognized response shape or unverifiable write.
    #[error("{0}")]
    Integrity(String),
    /// The session never reached, or fell back out of, the signed-in state.
    #[error("{0}")]
    StaleSession(String),
    #[error("not signed in")]
    NotAuthenticated,
}

impl AuthError {
    /// Text safe to render inline on a form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Transport { message, .. } => message.clone(),
            Self::Integrity(_) | Self::StaleSession(_) => INVALID_CREDENTIALS_MESSAGE.to_owned(),
            Self::NotAuthenticated => "Please sign in to continue".to_owned(),
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message } => {
                let message = status_message(status).map_or_else(
                    || if message.is_empty() { format!("Request failed ({status})") } else { message },
                    str::to_owned,
                );
                Self::Transport { status: Some(status), message }
            }
            ApiError::Network(_) => Self::Transport {
                status: None,
                message: "Unable to reach the server. Check your connection and try again".to_owned(),
            },
            ApiError::Body(_) => Self::Integrity(crate::net::types::UNEXPECTED_RESPONSE_FORMAT.to_owned()),
            ApiError::Unavailable => Self::Transport { status: None, message: ApiError::Unavailable.to_string() },
        }
    }
}

/// Handle returned by [`SessionService::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

struct Inner {
    api: Arc<dyn AuthApi>,
    store: CredentialStore,
    state: Mutex<SessionState>,
    login_gate: futures::lock::Mutex<()>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    min_password_len: usize,
    min_bare_token_len: usize,
}

/// Shared handle to the authoritative session.
#[derive(Clone)]
pub struct SessionService {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shape checks applied before credentials leave the browser.
///
/// # Errors
///
/// Returns `AuthError::Validation` for an email without `@` or a password
/// shorter than `min_password_len` characters.
pub fn validate_credentials(email: &str, password: &str, min_password_len: usize) -> Result<(), AuthError> {
    if !email.trim().contains('@') {
        return Err(AuthError::Validation("Please enter a valid email address".to_owned()));
    }
    if password.chars().count() < min_password_len {
        return Err(AuthError::Validation(format!(
            "Password must be at least {min_password_len} characters"
        )));
    }
    Ok(())
}

/// Build an identity from the claims of a bare token.
///
/// Email comes from `email` or `sub`; id from `id`/`userId`/`user_id`,
/// falling back to the subject. Role defaults to candidate and status to
/// verified unless the token says otherwise.
#[must_use]
pub fn identity_from_token(raw: &str) -> Option<Identity> {
    let decoded = token::decode(raw)?;
    let subject = decoded.subject().filter(|s| !s.trim().is_empty());
    let email = decoded.claim_str("email").or(subject)?.to_owned();
    let id = ["id", "userId", "user_id"]
        .iter()
        .find_map(|key| decoded.payload.get(*key).and_then(user_id_from_value))
        .or_else(|| subject.map(UserId::from))?;
    let mut identity = Identity::new(id, &email, decoded.claim_str("role").map(Role::parse).unwrap_or_default());
    identity.status = Some(decoded.claim_str("status").map_or(AccountStatus::Active, AccountStatus::parse));
    identity.fullname = decoded
        .claim_str("fullname")
        .or_else(|| decoded.claim_str("name"))
        .map(str::to_owned);
    Some(identity)
}

impl SessionService {
    #[must_use]
    pub fn new(config: &AuthConfig, api: Arc<dyn AuthApi>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                store: CredentialStore::new(store, config),
                state: Mutex::new(SessionState::default()),
                login_gate: futures::lock::Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
                min_password_len: config.min_password_len,
                min_bare_token_len: config.min_bare_token_len,
            }),
        }
    }

    /// Browser-backed service: `gloo-net` transport over `localStorage`.
    #[must_use]
    pub fn for_browser(config: &AuthConfig) -> Self {
        Self::new(
            config,
            Arc::new(crate::net::api::HttpAuthApi::new(config)),
            Arc::new(crate::util::storage::LocalStorage),
        )
    }

    // =========================================================
    // Lifecycle
    // =========================================================

    /// Adopt a stored session if it is complete and unexpired; otherwise
    /// clear storage and start empty. Absence is not an error.
    pub fn initialize(&self) -> RestoreOutcome {
        let store = &self.inner.store;
        let outcome = match (store.read_token(), store.read_identity()) {
            (Some(token), Some(user)) if user.is_complete() && token::is_well_formed(&token) => {
                if token::is_expired(&token) {
                    self.reset();
                    RestoreOutcome::Expired
                } else {
                    let info = token::describe(&token);
                    log!(
                        "session: restored user {} ({}), token expires in {:?}s",
                        user.id,
                        user.role,
                        info.seconds_remaining
                    );
                    self.set_state(SessionState::signed_in(token, user));
                    RestoreOutcome::Restored
                }
            }
            _ => {
                if store.has_record() {
                    warn!("session: discarding incomplete or corrupt stored credentials");
                }
                self.reset();
                RestoreOutcome::NoValidAuthData
            }
        };
        if !outcome.is_restored() {
            log!("session: {outcome}");
        }
        outcome
    }

    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// `Validation` for bad input (checked before any network call);
    /// `Transport` for endpoint failures; `Integrity` for unusable responses
    /// or a failed storage write. Every failure leaves the session empty.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionState, AuthError> {
        if let Err(err) = validate_credentials(&credentials.email, &credentials.password, self.inner.min_password_len) {
            warn!("session: login input rejected: {err}");
            self.reset();
            return Err(err);
        }

        let _gate = self.inner.login_gate.lock().await;
        self.reset();

        match self.establish(credentials).await {
            Ok(state) => Ok(state),
            Err(err) => {
                warn!("session: login failed for {}: {err}", credentials.email.trim());
                self.reset();
                Err(err)
            }
        }
    }

    async fn establish(&self, credentials: &Credentials) -> Result<SessionState, AuthError> {
        let body = self.inner.api.login(credentials).await?;
        let response = LoginResponse::from_value(body, self.inner.min_bare_token_len)
            .map_err(|message| AuthError::Integrity(message.to_owned()))?;

        let (raw_token, user) = match response {
            LoginResponse::BareToken(raw_token) => {
                let user = identity_from_token(&raw_token)
                    .ok_or_else(|| AuthError::Integrity("Token payload is missing identity claims".to_owned()))?;
                (raw_token, user)
            }
            LoginResponse::Session { token, user } => (token, user),
        };

        if !token::is_well_formed(&raw_token) {
            return Err(AuthError::Integrity("Malformed token received from server".to_owned()));
        }
        if token::is_expired(&raw_token) {
            return Err(AuthError::Integrity("Server issued an expired token".to_owned()));
        }
        if !self.inner.store.write(&raw_token, &user) {
            return Err(AuthError::Integrity("Failed to persist authentication data".to_owned()));
        }

        log!("session: signed in user {} as {}", user.id, user.role);
        let state = SessionState::signed_in(raw_token, user);
        self.set_state(state.clone());
        Ok(state)
    }

    /// Create an account. Never signs in; callers wanting a session must
    /// call [`Self::login`] afterwards.
    ///
    /// # Errors
    ///
    /// `Validation` for bad input, otherwise the mapped transport error.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, AuthError> {
        validate_credentials(&request.email, &request.password, self.inner.min_password_len)?;
        let response = self.inner.api.register(request).await.map_err(|err| {
            warn!("session: registration failed for {}: {err}", request.email.trim());
            AuthError::from(err)
        })?;
        log!("session: registered {} as {}", request.email.trim(), request.role);
        Ok(response)
    }

    /// Clear storage and state. Unconditional and idempotent.
    pub fn logout(&self) {
        self.reset();
        log!("session: signed out");
    }

    // =========================================================
    // Queries
    // =========================================================

    #[must_use]
    pub fn get_auth_state(&self) -> SessionState {
        lock(&self.inner.state).clone()
    }

    /// Authenticated flag, identity and token present, and the token still
    /// unexpired right now. A token found expired collapses the session.
    pub fn is_authenticated(&self) -> bool {
        let snapshot = self.get_auth_state();
        let valid = snapshot.authenticated
            && snapshot.user.is_some()
            && snapshot.token.as_deref().is_some_and(|t| !token::is_expired(t));
        if snapshot.authenticated && !valid {
            warn!("session: token no longer valid, clearing session");
            self.reset();
        }
        valid
    }

    /// Re-check the held token against the clock, collapsing the session if
    /// it has expired. Returns whether a session is still held.
    pub fn revalidate(&self) -> bool {
        self.is_authenticated()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<Identity> {
        lock(&self.inner.state).user.clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        lock(&self.inner.state).token.clone()
    }

    /// `Authorization` header value for other API clients.
    #[must_use]
    pub fn authorization_header(&self) -> Option<String> {
        if !self.is_authenticated() {
            return None;
        }
        self.token().map(|t| format!("Bearer {t}"))
    }

    /// Replace the signed-in identity (e.g. after activation or a profile
    /// edit) using the same write-then-verify path as login.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a session; `Integrity` when the identity
    /// belongs to another user or the write cannot be verified (the session
    /// is then cleared).
    pub fn update_identity(&self, identity: Identity) -> Result<SessionState, AuthError> {
        if !self.is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        let current = self.get_auth_state();
        let (Some(raw_token), Some(user)) = (current.token, current.user) else {
            return Err(AuthError::NotAuthenticated);
        };
        if user.id != identity.id {
            return Err(AuthError::Integrity("Identity does not match the signed-in user".to_owned()));
        }
        if !self.inner.store.write(&raw_token, &identity) {
            self.reset();
            return Err(AuthError::Integrity("Failed to persist authentication data".to_owned()));
        }
        log!("session: updated identity for user {}", identity.id);
        let state = SessionState::signed_in(raw_token, identity);
        self.set_state(state.clone());
        Ok(state)
    }

    // =========================================================
    // Change notification
    // =========================================================

    /// Register a callback run after every state change.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.inner.listeners).retain(|(listener_id, _)| *listener_id != id.0);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    fn set_state(&self, next: SessionState) {
        {
            let mut state = lock(&self.inner.state);
            if *state == next {
                return;
            }
            *state = next.clone();
        }
        // Listeners run outside both locks so they may query or resubscribe.
        let listeners: Vec<Listener> = lock(&self.inner.listeners).iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener(&next);
        }
    }

    fn reset(&self) {
        self.inner.store.clear();
        self.set_state(SessionState::default());
    }
}
