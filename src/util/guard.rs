//! Per-route authorization decision.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected view runs the same precedence so lifecycle exclusions
//! (banned, suspended, unverified) always win over role exclusions. Banned
//! and suspended users therefore never see unverified or wrong-role
//! messaging.
//!
//! Rules, first match wins:
//! 1. not yet initialized / loading → placeholder, no redirect
//! 2. signed out → sign-in page carrying the requested path
//! 3. banned → banned page
//! 4. suspended → suspended page
//! 5. unverified outside the allow-list → unverified page
//! 6. route needs a verified account and this one is not → unverified page
//! 7. role not allowed → fallback path or the role's own dashboard
//! 8. render
//!
//! A status redirect that points at the page already shown renders it, since
//! that page is the destination. A role redirect never renders: if it points
//! back at the current page it goes home instead, and if that is also the
//! current page the view is denied.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use leptos::logging::warn;

use crate::net::types::{AccountStatus, Role};
use crate::routes;
use crate::state::auth::AuthState;

/// Access requirement attached to a protected view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    /// Empty means any signed-in role.
    pub allowed_roles: Vec<Role>,
    pub require_verified: bool,
    /// Where role mismatches go instead of the role's dashboard.
    pub fallback_path: Option<String>,
}

impl RouteRequirement {
    /// Any signed-in user.
    #[must_use]
    pub fn signed_in() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn roles(roles: &[Role]) -> Self {
        Self { allowed_roles: roles.to_vec(), ..Self::default() }
    }

    #[must_use]
    pub fn verified(mut self) -> Self {
        self.require_verified = true;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, path: &str) -> Self {
        self.fallback_path = Some(path.to_owned());
        self
    }
}

/// What a guarded view should do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    Render,
    Redirect(String),
    /// The role may not see this view and there is nowhere else to send it.
    Denied,
}

/// Decide access to `path` for the mirrored session `state`.
#[must_use]
pub fn evaluate(state: &AuthState, requirement: &RouteRequirement, path: &str) -> GuardDecision {
    if state.loading || !state.initialized {
        return GuardDecision::Loading;
    }

    let Some(user) = state.user.as_ref().filter(|_| state.authenticated) else {
        return redirect_unless_here(path, &routes::login_with_return(path));
    };

    let status = user.effective_status();
    match status {
        Some(AccountStatus::Banned) => return redirect_unless_here(path, routes::BANNED),
        Some(AccountStatus::Suspended) => return redirect_unless_here(path, routes::SUSPENDED),
        Some(AccountStatus::Unverified) if !routes::is_unverified_allowed(path) => {
            return redirect_unless_here(path, routes::UNVERIFIED);
        }
        _ => {}
    }

    if requirement.require_verified && status != Some(AccountStatus::Active) {
        return redirect_unless_here(path, routes::UNVERIFIED);
    }

    if !requirement.allowed_roles.is_empty() && !requirement.allowed_roles.contains(&user.role) {
        let target = requirement
            .fallback_path
            .clone()
            .unwrap_or_else(|| state.dashboard_url().to_owned());
        return redirect_elsewhere(path, &target);
    }

    GuardDecision::Render
}

fn is_here(path: &str, target: &str) -> bool {
    routes::normalize_path(path) == routes::normalize_path(target)
}

/// Redirecting to the page already shown would loop; render it instead.
fn redirect_unless_here(path: &str, target: &str) -> GuardDecision {
    if is_here(path, target) {
        GuardDecision::Render
    } else {
        GuardDecision::Redirect(target.to_owned())
    }
}

/// Role mismatch: leave for `target`, else home, else deny.
fn redirect_elsewhere(path: &str, target: &str) -> GuardDecision {
    if !is_here(path, target) {
        GuardDecision::Redirect(target.to_owned())
    } else if !is_here(path, routes::HOME) {
        warn!("guard: role redirect for {path} points back at itself, sending home");
        GuardDecision::Redirect(routes::HOME.to_owned())
    } else {
        warn!("guard: role not allowed on {path} and no other page to send to");
        GuardDecision::Denied
    }
}

/// Post-login destination taken from the `redirect` query value.
///
/// Anything but a same-origin absolute path is dropped so a crafted link
/// cannot bounce the user off-site after sign-in.
#[must_use]
pub fn login_redirect_target(query_value: Option<&str>) -> Option<String> {
    let target = routes::sanitize_return_path(query_value);
    if target.is_none() && query_value.is_some_and(|raw| !raw.trim().is_empty()) {
        warn!("guard: ignoring unsafe redirect target {query_value:?}");
    }
    target
}
