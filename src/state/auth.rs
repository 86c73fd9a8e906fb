//! Reactive auth state for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Used by route guards and user-aware components to coordinate login
//! redirects and identity-dependent rendering. `AuthBinding` mirrors the
//! authoritative `SessionService` into an `RwSignal<AuthState>`:
//!
//! 1. `mount` restores from storage and subscribes for pushed changes.
//! 2. `login`/`register`/`logout` call the service, then re-pull explicitly.
//! 3. A background timer compares the mirror with the service and adopts the
//!    service's state only when they disagree.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use leptos::logging::{log, warn};
use leptos::prelude::*;

use crate::net::types::{AccountStatus, Credentials, Identity, RegisterRequest, RegisterResponse, Role};
use crate::routes;
use crate::state::session::{AuthError, RestoreOutcome, SessionService, SessionState, SubscriptionId};

/// View-facing snapshot of the session plus load tracking.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<Identity>,
    pub token: Option<String>,
    pub authenticated: bool,
    /// A restore or mount is in progress.
    pub loading: bool,
    /// `mount` has completed at least once.
    pub initialized: bool,
}

impl AuthState {
    /// Copy session fields in, leaving load tracking untouched.
    pub fn adopt(&mut self, session: &SessionState) {
        self.user.clone_from(&session.user);
        self.token.clone_from(&session.token);
        self.authenticated = session.authenticated;
    }

    /// The mirror disagrees with `session` on sign-in or on who is signed in.
    #[must_use]
    pub fn differs_from(&self, session: &SessionState) -> bool {
        self.authenticated != session.authenticated || self.user.as_ref().map(|u| &u.id) != session.user_id()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated && self.user.is_some()
    }

    #[must_use]
    pub fn role(&self) -> Option<&Role> {
        self.user.as_ref().map(|u| &u.role)
    }

    #[must_use]
    pub fn has_role(&self, role: &Role) -> bool {
        self.role() == Some(role)
    }

    #[must_use]
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role().is_some_and(|r| roles.contains(r))
    }

    #[must_use]
    pub fn is_recruiter(&self) -> bool {
        self.has_role(&Role::Recruiter)
    }

    #[must_use]
    pub fn is_candidate(&self) -> bool {
        self.has_role(&Role::Candidate)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(&Role::Admin)
    }

    /// Lifecycle status, honoring the legacy `verified` flag.
    #[must_use]
    pub fn status(&self) -> Option<AccountStatus> {
        self.user.as_ref().and_then(Identity::effective_status)
    }

    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.status() == Some(AccountStatus::Active)
    }

    #[must_use]
    pub fn is_unverified(&self) -> bool {
        self.status() == Some(AccountStatus::Unverified)
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.status() == Some(AccountStatus::Suspended)
    }

    #[must_use]
    pub fn is_banned(&self) -> bool {
        self.status() == Some(AccountStatus::Banned)
    }

    /// Default landing route for the signed-in role.
    #[must_use]
    pub fn dashboard_url(&self) -> &'static str {
        dashboard_for(self.role())
    }
}

/// Role → dashboard. Unknown or missing roles land on the home page.
#[must_use]
pub fn dashboard_for(role: Option<&Role>) -> &'static str {
    match role {
        Some(Role::Recruiter) => routes::RECRUITER_DASHBOARD,
        Some(Role::Candidate) => routes::CANDIDATE_DASHBOARD,
        Some(Role::Admin) => routes::ADMIN_DASHBOARD,
        Some(Role::Other(raw)) => {
            warn!("auth-binding: no dashboard for role {raw:?}, using home");
            routes::HOME
        }
        None => {
            warn!("auth-binding: no role available, using home");
            routes::HOME
        }
    }
}

/// Reactive mirror of a [`SessionService`], provided through Leptos context.
#[derive(Clone)]
pub struct AuthBinding {
    state: RwSignal<AuthState>,
    session: SessionService,
    subscription: Arc<Mutex<Option<SubscriptionId>>>,
    reconciling: Arc<AtomicBool>,
    /// Bumped on every start/stop so a superseded timer loop exits.
    timer_epoch: Arc<AtomicU64>,
}

impl AuthBinding {
    #[must_use]
    pub fn new(session: SessionService) -> Self {
        Self {
            state: RwSignal::new(AuthState { loading: true, ..AuthState::default() }),
            session,
            subscription: Arc::new(Mutex::new(None)),
            reconciling: Arc::new(AtomicBool::new(false)),
            timer_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn state(&self) -> RwSignal<AuthState> {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> &SessionService {
        &self.session
    }

    /// Current mirror value without tracking.
    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.state.get_untracked()
    }

    /// Restore the session, adopt it and start receiving pushed changes.
    pub fn mount(&self) -> RestoreOutcome {
        self.state.update(|s| s.loading = true);
        let outcome = self.session.initialize();
        self.resync();
        self.subscribe_pushes();
        self.state.update(|s| {
            s.loading = false;
            s.initialized = true;
        });
        log!("auth-binding: mounted ({outcome})");
        outcome
    }

    fn subscribe_pushes(&self) {
        let mut slot = self.subscription.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }
        let state = self.state;
        let id = self.session.subscribe(move |session| {
            // The signal may already be disposed if the provider unmounted.
            let _ = state.try_update(|s| s.adopt(session));
        });
        *slot = Some(id);
    }

    /// Re-pull the service state and adopt it.
    pub fn resync(&self) {
        let session = self.session.get_auth_state();
        self.state.update(|s| s.adopt(&session));
    }

    /// Sign in through the service, then re-pull.
    ///
    /// # Errors
    ///
    /// Propagates the service's [`AuthError`].
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionState, AuthError> {
        let result = self.session.login(credentials).await;
        self.resync();
        result
    }

    /// Register through the service, then re-pull. Does not sign in.
    ///
    /// # Errors
    ///
    /// Propagates the service's [`AuthError`].
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, AuthError> {
        let result = self.session.register(request).await;
        self.resync();
        result
    }

    pub fn logout(&self) {
        self.session.logout();
        self.resync();
    }

    /// One drift check. Revalidates the service's token first, then
    /// adopts the service state if the mirror disagrees. Returns whether this
    /// call adopted anything.
    pub fn reconcile_once(&self) -> bool {
        let live = self.session.revalidate();
        let authoritative = self.session.get_auth_state();
        let drifted = self.state.with_untracked(|mirror| mirror.differs_from(&authoritative));
        if drifted {
            warn!("auth-binding: drift detected (service signed in: {live}), adopting session state");
            self.state.update(|s| s.adopt(&authoritative));
        }
        drifted
    }

    /// Poll [`Self::reconcile_once`] every `interval` until [`Self::teardown`].
    /// Only the browser build runs the timer.
    pub fn start_reconciliation(&self, interval: Duration) {
        if self.reconciling.swap(true, Ordering::SeqCst) {
            return;
        }
        let epoch = self.timer_epoch.fetch_add(1, Ordering::SeqCst) + 1;

        #[cfg(feature = "hydrate")]
        {
            let binding = self.clone();
            leptos::task::spawn_local(async move {
                loop {
                    crate::util::timer::sleep(interval).await;
                    if binding.timer_epoch.load(Ordering::SeqCst) != epoch {
                        break;
                    }
                    binding.reconcile_once();
                }
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (interval, epoch);
        }
    }

    #[must_use]
    pub fn is_reconciling(&self) -> bool {
        self.reconciling.load(Ordering::SeqCst)
    }

    /// Stop the reconciliation timer and drop the push subscription.
    pub fn teardown(&self) {
        if self.reconciling.swap(false, Ordering::SeqCst) {
            self.timer_epoch.fetch_add(1, Ordering::SeqCst);
        }
        let subscription = self.subscription.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(id) = subscription {
            self.session.unsubscribe(id);
        }
    }
}
