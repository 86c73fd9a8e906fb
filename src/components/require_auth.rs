//! Route wrapper enforcing sign-in, account status and role.
//!
//! SYSTEM CONTEXT
//! ==============
//! Protected views wrap their content in `<RequireAuth>`. The decision itself
//! lives in `util::guard::evaluate`; this component only feeds it the mirrored
//! session and current path, then renders, navigates (replacing history so
//! the back button does not return to a page that bounces again) or shows an
//! access-denied notice.

use leptos::logging::log;
use leptos::prelude::*;
use leptos_router::NavigateOptions;
use leptos_router::hooks::{use_location, use_navigate};

use crate::net::types::Role;
use crate::state::auth::AuthBinding;
use crate::util::guard::{GuardDecision, RouteRequirement, evaluate};

/// Render `children` only when the current visitor satisfies the requirement.
///
/// Expects an [`AuthBinding`] in context (see `app::SessionProvider`).
#[component]
pub fn RequireAuth(
    /// Roles admitted; empty admits any signed-in role.
    #[prop(optional)]
    allowed_roles: Vec<Role>,
    #[prop(optional)] require_verified: bool,
    /// Role-mismatch target instead of the user's dashboard.
    #[prop(optional, into)]
    fallback_path: Option<String>,
    children: ChildrenFn,
) -> impl IntoView {
    let auth = expect_context::<AuthBinding>().state();
    let pathname = use_location().pathname;
    let navigate = use_navigate();

    let requirement = RouteRequirement { allowed_roles, require_verified, fallback_path };
    let decision = Memo::new(move |_| {
        let path = pathname.get();
        auth.with(|state| evaluate(state, &requirement, &path))
    });

    Effect::new(move || {
        if let GuardDecision::Redirect(target) = decision.get() {
            log!("guard: {} -> {target}", pathname.get_untracked());
            navigate(&target, NavigateOptions { replace: true, ..NavigateOptions::default() });
        }
    });

    move || match decision.get() {
        GuardDecision::Render => children().into_any(),
        GuardDecision::Denied => view! {
            <div class="auth-guard auth-guard--denied">
                <p class="auth-guard__message">"You do not have access to this page."</p>
            </div>
        }
        .into_any(),
        GuardDecision::Loading | GuardDecision::Redirect(_) => view! {
            <div class="auth-guard auth-guard--loading">
                <p class="auth-guard__message">"Loading..."</p>
            </div>
        }
        .into_any(),
    }
}
