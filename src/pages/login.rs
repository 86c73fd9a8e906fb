//! Login page and the sign-in submission flow.
//!
//! SYSTEM CONTEXT
//! ==============
//! A successful login response does not by itself mean the app is signed in:
//! storage writes, pushed updates and the binding's re-pull all have to land.
//! `submit_login` checks the session at several points and only hands back a
//! destination once the service and the mirror agree the user is signed in.
//!
//! ERROR HANDLING
//! ==============
//! Every failure surfaces as an `AuthError`; the page renders
//! `user_message()` inline and never navigates on failure.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use std::time::Duration;

use leptos::logging::{error, log, warn};
use leptos::prelude::*;
#[cfg(feature = "hydrate")]
use leptos_router::NavigateOptions;
use leptos_router::hooks::use_query_map;
#[cfg(feature = "hydrate")]
use leptos_router::hooks::use_navigate;

use crate::config::AuthConfig;
use crate::net::types::Credentials;
use crate::routes;
use crate::state::auth::AuthBinding;
use crate::state::session::{AuthError, SessionState};
use crate::util::guard::login_redirect_target;
use crate::util::timer;

/// Outcome of a verified sign-in.
#[derive(Clone, Debug, PartialEq)]
pub struct LoginSuccess {
    pub state: SessionState,
    /// Where the page should navigate next.
    pub destination: String,
}

/// Trim and check raw form input before anything else runs.
///
/// # Errors
///
/// Returns the inline message to show when a field is blank.
pub fn validate_login_input(email: &str, password: &str) -> Result<Credentials, &'static str> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err("Enter both email and password.");
    }
    Ok(Credentials::new(email, password))
}

/// Sign in through `binding` and confirm the session stuck.
///
/// # Errors
///
/// Propagates the service's error, or `StaleSession` when the service is not
/// signed in right after the call or falls back out within `settle_delay`.
pub async fn submit_login(
    binding: &AuthBinding,
    credentials: &Credentials,
    settle_delay: Duration,
    redirect: Option<&str>,
) -> Result<LoginSuccess, AuthError> {
    let session = binding.session();
    let before = session.get_auth_state();
    log!(
        "login: submitting for {} (signed in before: {})",
        credentials.email,
        before.authenticated
    );

    binding.login(credentials).await?;

    if !session.is_authenticated() {
        error!("login: service reported success but holds no session");
        binding.logout();
        return Err(AuthError::StaleSession("Session was not established".to_owned()));
    }
    binding.resync();

    timer::sleep(settle_delay).await;
    confirm_settled(binding)?;

    let destination = login_redirect_target(redirect).unwrap_or_else(|| binding.snapshot().dashboard_url().to_owned());
    log!("login: signed in, continuing to {destination}");
    Ok(LoginSuccess { state: session.get_auth_state(), destination })
}

/// Both the service and the mirror must still be signed in. Otherwise the
/// half-held session is signed out so the error never sits beside it.
fn confirm_settled(binding: &AuthBinding) -> Result<(), AuthError> {
    let service_ok = binding.session().is_authenticated();
    let mirror_ok = binding.snapshot().is_authenticated();
    if service_ok && mirror_ok {
        return Ok(());
    }
    warn!("login: session reverted after sign-in (service: {service_ok}, mirror: {mirror_ok})");
    binding.logout();
    Err(AuthError::StaleSession("Session reverted after sign-in".to_owned()))
}

/// Email + password sign-in form.
#[component]
pub fn LoginPage() -> impl IntoView {
    let binding = expect_context::<AuthBinding>();
    let query = use_query_map();
    let email = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let info = RwSignal::new(String::new());
    let busy = RwSignal::new(false);
    let settle_delay = use_context::<AuthConfig>().unwrap_or_default().settle_delay;

    #[cfg(feature = "hydrate")]
    let navigate = use_navigate();

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if busy.get() {
            return;
        }
        let credentials = match validate_login_input(&email.get(), &password.get()) {
            Ok(credentials) => credentials,
            Err(message) => {
                info.set(message.to_owned());
                return;
            }
        };
        let redirect = query.with(|q| q.get(routes::REDIRECT_PARAM));
        busy.set(true);
        info.set("Signing in...".to_owned());

        #[cfg(feature = "hydrate")]
        {
            let binding = binding.clone();
            let navigate = navigate.clone();
            leptos::task::spawn_local(async move {
                match submit_login(&binding, &credentials, settle_delay, redirect.as_deref()).await {
                    Ok(success) => {
                        info.set(String::new());
                        password.set(String::new());
                        navigate(&success.destination, NavigateOptions::default());
                    }
                    Err(e) => info.set(e.user_message()),
                }
                busy.set(false);
            });
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (&binding, credentials, redirect, settle_delay);
        }
    };

    view! {
        <div class="login-page">
            <div class="login-card">
                <h1>"Sign in"</h1>
                <form class="login-form" on:submit=on_submit>
                    <input
                        class="login-input"
                        type="email"
                        placeholder="you@example.com"
                        prop:value=move || email.get()
                        on:input=move |ev| email.set(event_target_value(&ev))
                    />
                    <input
                        class="login-input"
                        type="password"
                        placeholder="Password"
                        prop:value=move || password.get()
                        on:input=move |ev| password.set(event_target_value(&ev))
                    />
                    <button class="login-button" type="submit" disabled=move || busy.get()>
                        "Sign In"
                    </button>
                </form>
                <Show when=move || !info.get().is_empty()>
                    <p class="login-message">{move || info.get()}</p>
                </Show>
                <p class="login-card__subtitle">
                    "No account? "
                    <a href=routes::REGISTER>"Create one"</a>
                </p>
            </div>
        </div>
    }
}
