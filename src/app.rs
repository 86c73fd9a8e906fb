//! Session provider owning the session handle for the component tree.
//!
//! SYSTEM CONTEXT
//! ==============
//! Wrap the application router in `<SessionProvider>`. It creates the single
//! `SessionService` for the page, mirrors it into an `AuthBinding` and puts
//! both (plus the `AuthConfig`) into Leptos context for `RequireAuth`,
//! `LoginPage` and any component that needs the bearer token.
//!
//! TRADE-OFFS
//! ==========
//! Restoring from storage happens in an effect, so it only runs in the
//! browser. Server-rendered markup keeps the binding in its loading state and
//! guards render their placeholder instead of redirecting to sign-in.

use leptos::prelude::*;

use crate::config::AuthConfig;
use crate::state::auth::AuthBinding;
use crate::state::session::SessionService;

/// Provide the session handle and its reactive mirror to `children`.
#[component]
pub fn SessionProvider(
    /// Overrides for endpoints, storage keys and timings.
    #[prop(optional)]
    config: Option<AuthConfig>,
    children: Children,
) -> impl IntoView {
    let config = config.unwrap_or_default();
    let session = SessionService::for_browser(&config);
    let binding = AuthBinding::new(session.clone());

    provide_context(config.clone());
    provide_context(session);
    provide_context(binding.clone());

    let mount_binding = binding.clone();
    let interval = config.reconcile_interval;
    Effect::new(move || {
        mount_binding.mount();
        mount_binding.start_reconciliation(interval);
    });

    on_cleanup(move || binding.teardown());

    children()
}
