//! Route paths the session layer redirects to or reasons about.
//!
//! SYSTEM CONTEXT
//! ==============
//! The guard, the binding's dashboard lookup and the login page all agree on
//! these paths; views themselves are registered by the application router.

#[cfg(test)]
#[path = "routes_test.rs"]
mod routes_test;

pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";
pub const BANNED: &str = "/account/banned";
pub const SUSPENDED: &str = "/account/suspended";
pub const UNVERIFIED: &str = "/account/unverified";
pub const ACTIVATE: &str = "/activate";

pub const RECRUITER_DASHBOARD: &str = "/recruiter/dashboard";
pub const CANDIDATE_DASHBOARD: &str = "/candidate/dashboard";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";

pub const RECRUITER_SETTINGS: &str = "/recruiter/settings";
pub const CANDIDATE_SETTINGS: &str = "/candidate/settings";

/// Query parameter carrying the originally requested path through sign-in.
pub const REDIRECT_PARAM: &str = "redirect";

/// Paths an unverified account may still open.
const UNVERIFIED_ALLOWED: [&str; 4] = [UNVERIFIED, ACTIVATE, RECRUITER_SETTINGS, CANDIDATE_SETTINGS];

/// Strip query string, fragment and trailing slash so comparisons are stable.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { HOME } else { trimmed }
}

/// True if `path` equals `base` or lives underneath it.
#[must_use]
pub fn is_within(path: &str, base: &str) -> bool {
    let path = normalize_path(path);
    let base = normalize_path(base);
    path == base || (path.starts_with(base) && path[base.len()..].starts_with('/'))
}

/// True if an unverified account may view `path`.
#[must_use]
pub fn is_unverified_allowed(path: &str) -> bool {
    UNVERIFIED_ALLOWED.iter().any(|base| is_within(path, base))
}

/// Sign-in URL remembering `requested` for the post-login return.
#[must_use]
pub fn login_with_return(requested: &str) -> String {
    let requested = normalize_path(requested);
    if requested == HOME || is_within(requested, LOGIN) {
        return LOGIN.to_owned();
    }
    let encoded: String = form_urlencoded::byte_serialize(requested.as_bytes()).collect();
    format!("{LOGIN}?{REDIRECT_PARAM}={encoded}")
}

/// Validate a `redirect` query value before navigating to it.
///
/// Only same-origin absolute paths are accepted; protocol-relative
/// (`//host`) and absolute URLs are dropped, as is the sign-in page itself.
#[must_use]
pub fn sanitize_return_path(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if !raw.starts_with('/') || raw.starts_with("//") || raw.contains('\\') {
        return None;
    }
    if is_within(raw, LOGIN) {
        return None;
    }
    Some(raw.to_owned())
}
