//! Auth REST transport.
//!
//! Client-side (hydrate): real HTTP calls via `gloo-net`.
//! Server-side (SSR) and tests: the `AuthApi` trait is implemented by doubles;
//! `HttpAuthApi` reports itself unavailable outside the browser.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures keep the HTTP status so the session layer can map it
//! onto the fixed user-facing vocabulary in [`status_message`].

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use async_trait::async_trait;
use serde_json::Value;

use super::types::{Credentials, RegisterRequest, RegisterResponse};
use crate::config::AuthConfig;

/// Transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    /// The request never produced a response (offline, CORS, DNS).
    #[error("network error: {0}")]
    Network(String),
    /// The response body could not be read as JSON.
    #[error("invalid response body: {0}")]
    Body(String),
    #[error("not available on server")]
    Unavailable,
}

/// Auth endpoints consumed by the session service.
///
/// `login` returns the raw JSON body; classifying its shape belongs to the
/// session layer.
#[async_trait(?Send)]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<Value, ApiError>;

    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError>;
}

/// Map an HTTP status to the message shown to the user. `None` means the
/// server's own message should pass through.
#[must_use]
pub fn status_message(status: u16) -> Option<&'static str> {
    match status {
        401 => Some("Invalid email or password"),
        403 => Some("Access denied"),
        404 => Some("Service not found"),
        409 => Some("User already exists"),
        500..=599 => Some("Server error, please try again later"),
        _ => None,
    }
}

/// Pull a human-readable message out of an error body.
#[cfg(any(test, feature = "hydrate"))]
fn error_body_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_owned();
            }
        }
        if let Some(text) = value.as_str() {
            return text.to_owned();
        }
    }
    body.trim().to_owned()
}

/// `gloo-net` implementation against the configured API base.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    login_url: String,
    register_url: String,
}

impl HttpAuthApi {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self { login_url: config.login_url(), register_url: config.register_url() }
    }
}

#[cfg(feature = "hydrate")]
async fn post_json<B: serde::Serialize>(url: &str, body: &B) -> Result<gloo_net::http::Response, ApiError> {
    let resp = gloo_net::http::Request::post(url)
        .json(body)
        .map_err(|e| ApiError::Body(e.to_string()))?
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    if !resp.ok() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status { status, message: error_body_message(&text) });
    }
    Ok(resp)
}

#[async_trait(?Send)]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &Credentials) -> Result<Value, ApiError> {
        #[cfg(feature = "hydrate")]
        {
            let resp = post_json(&self.login_url, credentials).await?;
            let text = resp.text().await.map_err(|e| ApiError::Body(e.to_string()))?;
            // Some deployments answer with a text/plain token rather than a JSON string.
            Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (credentials, &self.login_url);
            Err(ApiError::Unavailable)
        }
    }

    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        #[cfg(feature = "hydrate")]
        {
            let resp = post_json(&self.register_url, request).await?;
            resp.json::<RegisterResponse>()
                .await
                .map_err(|e| ApiError::Body(e.to_string()))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (request, &self.register_url);
            Err(ApiError::Unavailable)
        }
    }
}
