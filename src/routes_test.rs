use super::*;

// =============================================================
// normalize_path / is_within
// =============================================================

#[test]
fn normalize_path_strips_query_fragment_and_trailing_slash() {
    assert_eq!(normalize_path("/candidate/jobs/?page=2#top"), "/candidate/jobs");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path(""), "/");
}

#[test]
fn is_within_matches_exact_and_nested_paths() {
    assert!(is_within("/activate", ACTIVATE));
    assert!(is_within("/activate/abc123", ACTIVATE));
    assert!(!is_within("/activated", ACTIVATE));
}

// =============================================================
// unverified allow-list
// =============================================================

#[test]
fn unverified_allowed_covers_settings_subtrees() {
    assert!(is_unverified_allowed("/account/unverified"));
    assert!(is_unverified_allowed("/recruiter/settings/profile"));
    assert!(is_unverified_allowed("/candidate/settings"));
    assert!(!is_unverified_allowed("/candidate/dashboard"));
    assert!(!is_unverified_allowed("/admin/settings"));
}

// =============================================================
// sign-in return path
// =============================================================

#[test]
fn login_with_return_encodes_requested_path() {
    assert_eq!(
        login_with_return("/recruiter/jobs/new"),
        "/login?redirect=%2Frecruiter%2Fjobs%2Fnew"
    );
}

#[test]
fn login_with_return_skips_home_and_login() {
    assert_eq!(login_with_return("/"), "/login");
    assert_eq!(login_with_return("/login"), "/login");
}

#[test]
fn sanitize_return_path_accepts_local_paths_only() {
    assert_eq!(sanitize_return_path(Some("/candidate/jobs")), Some("/candidate/jobs".to_owned()));
    assert_eq!(sanitize_return_path(Some("//evil.example.com")), None);
    assert_eq!(sanitize_return_path(Some("https://evil.example.com")), None);
    assert_eq!(sanitize_return_path(Some("/login")), None);
    assert_eq!(sanitize_return_path(None), None);
}
