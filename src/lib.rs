//! # recruit-session
//!
//! Client-side session and authorization layer for the recruitment platform
//! UI (recruiter, candidate and administrator roles).
//!
//! This crate owns the credential token and identity record in the browser:
//! decoding the token, persisting it to `localStorage`, keeping the
//! authoritative session handle and its reactive Leptos mirror consistent,
//! and deciding on every navigation whether the visitor may see a view.
//!
//! Leaf to root: `util::token` → `util::storage` → `state::session` →
//! `state::auth` → `util::guard` / `components::require_auth` →
//! `pages::login`.

pub mod app;
pub mod components;
pub mod config;
pub mod net;
pub mod pages;
pub mod routes;
pub mod state;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;

/// Install the browser console logger and panic hook.
///
/// Safe to call more than once; later calls are ignored by `console_log`.
#[cfg(feature = "hydrate")]
pub fn init_browser_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
}
