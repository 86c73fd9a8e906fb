//! Session layer configuration.
//!
//! Every knob has a `DEFAULT_*` constant so the browser build works with
//! `AuthConfig::default()` and tests can override single values.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "/api";
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_REGISTER_PATH: &str = "/auth/register";
pub const DEFAULT_TOKEN_KEY: &str = "token";
pub const DEFAULT_USER_KEY: &str = "user";
pub const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;
/// A bare-string login response must be strictly longer than 20 chars.
pub const DEFAULT_MIN_BARE_TOKEN_LEN: usize = 21;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub api_base_url: String,
    pub login_path: String,
    pub register_path: String,
    pub token_key: String,
    pub user_key: String,
    pub reconcile_interval: Duration,
    pub settle_delay: Duration,
    pub min_password_len: usize,
    pub min_bare_token_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            register_path: DEFAULT_REGISTER_PATH.to_owned(),
            token_key: DEFAULT_TOKEN_KEY.to_owned(),
            user_key: DEFAULT_USER_KEY.to_owned(),
            reconcile_interval: Duration::from_millis(DEFAULT_RECONCILE_INTERVAL_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
            min_bare_token_len: DEFAULT_MIN_BARE_TOKEN_LEN,
        }
    }
}

impl AuthConfig {
    /// Override the API base URL. Trailing slashes are dropped.
    #[must_use]
    pub fn with_api_base_url(mut self, base: &str) -> Self {
        self.api_base_url = base.trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn with_storage_keys(mut self, token_key: &str, user_key: &str) -> Self {
        self.token_key = token_key.to_owned();
        self.user_key = user_key.to_owned();
        self
    }

    #[must_use]
    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Full URL of the login endpoint.
    #[must_use]
    pub fn login_url(&self) -> String {
        join_url(&self.api_base_url, &self.login_path)
    }

    /// Full URL of the registration endpoint.
    #[must_use]
    pub fn register_url(&self) -> String {
        join_url(&self.api_base_url, &self.register_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
