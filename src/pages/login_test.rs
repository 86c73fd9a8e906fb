use std::sync::Arc;

use futures::executor::block_on;
use serde_json::json;

use super::*;
use crate::net::api::ApiError;
use crate::net::types::{Role, UserId};
use crate::test_support::{ScriptedApi, candidate_login_body, service_with, valid_token};
use crate::util::storage::MemoryStore;

fn mounted() -> (AuthBinding, Arc<ScriptedApi>) {
    let api = Arc::new(ScriptedApi::default());
    let binding = AuthBinding::new(service_with(api.clone(), Arc::new(MemoryStore::new())));
    binding.mount();
    (binding, api)
}

fn creds() -> Credentials {
    Credentials::new("candidate@test.com", "password")
}

// =============================================================
// validate_login_input
// =============================================================

#[test]
fn validate_login_input_trims_email() {
    assert_eq!(
        validate_login_input("  candidate@test.com ", "password"),
        Ok(Credentials::new("candidate@test.com", "password"))
    );
}

#[test]
fn validate_login_input_keeps_password_verbatim() {
    let credentials = validate_login_input("a@b.com", " pass word ").unwrap();
    assert_eq!(credentials.password, " pass word ");
}

#[test]
fn validate_login_input_requires_both_fields() {
    assert_eq!(validate_login_input("   ", "password"), Err("Enter both email and password."));
    assert_eq!(validate_login_input("a@b.com", ""), Err("Enter both email and password."));
}

// =============================================================
// submit_login
// =============================================================

#[test]
fn submit_login_lands_on_role_dashboard() {
    let (binding, api) = mounted();
    api.push_login(Ok(candidate_login_body(&valid_token("candidate@test.com"))));

    let success = block_on(submit_login(&binding, &creds(), Duration::ZERO, None)).unwrap();
    assert_eq!(success.destination, "/candidate/dashboard");
    assert_eq!(success.state.user_id(), Some(&UserId::Number(102)));
    assert!(binding.snapshot().is_candidate());
}

#[test]
fn submit_login_honors_safe_redirect() {
    let (binding, api) = mounted();
    api.push_login(Ok(candidate_login_body(&valid_token("candidate@test.com"))));

    let success = block_on(submit_login(&binding, &creds(), Duration::ZERO, Some("/candidate/jobs/9"))).unwrap();
    assert_eq!(success.destination, "/candidate/jobs/9");
}

#[test]
fn submit_login_ignores_off_site_redirect() {
    let (binding, api) = mounted();
    api.push_login(Ok(candidate_login_body(&valid_token("candidate@test.com"))));

    let success = block_on(submit_login(&binding, &creds(), Duration::ZERO, Some("//evil.example"))).unwrap();
    assert_eq!(success.destination, "/candidate/dashboard");
}

#[test]
fn submit_login_recruiter_from_bare_token() {
    let (binding, api) = mounted();
    let token = crate::test_support::mint_token(&json!({
        "sub": "rec@test.com",
        "id": 55,
        "role": "recruiter",
        "exp": crate::test_support::FAR_FUTURE,
    }));
    api.push_login(Ok(json!(token)));

    let success = block_on(submit_login(&binding, &creds(), Duration::ZERO, None)).unwrap();
    assert_eq!(success.destination, "/recruiter/dashboard");
    assert_eq!(binding.snapshot().role(), Some(&Role::Recruiter));
}

#[test]
fn submit_login_propagates_transport_error() {
    let (binding, api) = mounted();
    api.push_login(Err(ApiError::Status { status: 401, message: String::new() }));

    let err = block_on(submit_login(&binding, &creds(), Duration::ZERO, None)).unwrap_err();
    assert_eq!(err.user_message(), "Invalid email or password");
    assert!(!binding.snapshot().is_authenticated());
}

#[test]
fn submit_login_rejects_short_bare_string() {
    let (binding, api) = mounted();
    api.push_login(Ok(json!("short-token")));

    let err = block_on(submit_login(&binding, &creds(), Duration::ZERO, None)).unwrap_err();
    assert_eq!(err, AuthError::Integrity("Unexpected response format from server".to_owned()));
    assert!(!binding.session().get_auth_state().authenticated);
}

#[test]
fn submit_login_detects_session_dropped_after_success() {
    let (binding, api) = mounted();
    api.push_login(Ok(candidate_login_body(&valid_token("candidate@test.com"))));

    // Something else signs the user out as soon as the session lands.
    let session = binding.session().clone();
    binding.session().subscribe(move |state| {
        if state.authenticated {
            session.logout();
        }
    });

    let err = block_on(submit_login(&binding, &creds(), Duration::ZERO, None)).unwrap_err();
    assert!(matches!(err, AuthError::StaleSession(_)));
    assert_eq!(err.user_message(), "Invalid email or password");
    assert!(!binding.snapshot().is_authenticated());
}

#[test]
fn mirror_reverting_after_settle_signs_out_service() {
    let (binding, api) = mounted();
    api.push_login(Ok(candidate_login_body(&valid_token("candidate@test.com"))));
    block_on(binding.login(&creds())).unwrap();
    assert!(confirm_settled(&binding).is_ok());

    binding.state().update(|s| s.authenticated = false);
    let err = confirm_settled(&binding).unwrap_err();
    assert!(matches!(err, AuthError::StaleSession(_)));
    assert!(!binding.session().get_auth_state().authenticated);
    assert!(binding.session().token().is_none());
    assert!(!binding.snapshot().is_authenticated());
}
