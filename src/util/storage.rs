//! Durable credential persistence.
//!
//! SYSTEM CONTEXT
//! ==============
//! `KeyValueStore` abstracts browser `localStorage` so the session service can
//! run against an in-memory map on the server and in tests. `CredentialStore`
//! layers the token + identity record on top with write-then-verify
//! semantics.
//!
//! TRADE-OFFS
//! ==========
//! Browser storage can fail silently (quota, private mode, another tab
//! clearing it). Every write is re-read and re-parsed before it counts, and
//! callers only learn success through the returned `bool`.

#[cfg(test)]
#[path = "storage_test.rs"]
mod storage_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use leptos::logging::{log, warn};

use crate::config::AuthConfig;
use crate::net::types::Identity;
use crate::util::token;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("storage write failed: {0}")]
    Write(String),
}

/// String key-value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns an error if the medium rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str);
}

/// Browser `window.localStorage`, looked up on every call so the handle
/// stays `Send + Sync`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

#[cfg(feature = "hydrate")]
fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        #[cfg(feature = "hydrate")]
        {
            local_storage()?.get_item(key).ok().flatten()
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = key;
            None
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        #[cfg(feature = "hydrate")]
        {
            let storage = local_storage().ok_or(StorageError::Unavailable)?;
            storage
                .set_item(key, value)
                .map_err(|e| StorageError::Write(format!("{e:?}")))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (key, value);
            Err(StorageError::Unavailable)
        }
    }

    fn remove(&self, key: &str) {
        #[cfg(feature = "hydrate")]
        {
            if let Some(storage) = local_storage() {
                let _ = storage.remove_item(key);
            }
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = key;
        }
    }
}

/// In-process store for SSR and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().is_ok_and(|entries| entries.contains_key(key))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

/// Token + identity persisted under two keys.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    token_key: String,
    user_key: String,
}

impl CredentialStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, config: &AuthConfig) -> Self {
        Self { store, token_key: config.token_key.clone(), user_key: config.user_key.clone() }
    }

    /// Persist a token and identity, then read both back to confirm.
    ///
    /// Returns `false` (after clearing) when the token is malformed, the
    /// identity lacks an id or email, a write fails, or the read-back does
    /// not match.
    #[must_use]
    pub fn write(&self, token: &str, identity: &Identity) -> bool {
        if !token::is_well_formed(token) {
            warn!("credential-store: refusing malformed token");
            self.clear();
            return false;
        }
        if !identity.is_complete() {
            warn!("credential-store: refusing identity without id/email");
            self.clear();
            return false;
        }
        let Ok(serialized) = serde_json::to_string(identity) else {
            warn!("credential-store: identity did not serialize");
            self.clear();
            return false;
        };

        self.clear();
        if let Err(e) = self.store.set(&self.token_key, token) {
            warn!("credential-store: token write failed: {e}");
            self.clear();
            return false;
        }
        if let Err(e) = self.store.set(&self.user_key, &serialized) {
            warn!("credential-store: identity write failed: {e}");
            self.clear();
            return false;
        }

        if !self.verify(token, identity) {
            warn!("credential-store: read-back mismatch, rolled back");
            self.clear();
            return false;
        }
        log!("credential-store: saved credentials for user {}", identity.id);
        true
    }

    fn verify(&self, token: &str, identity: &Identity) -> bool {
        let token_ok = self.read_token().is_some_and(|stored| stored == token);
        let identity_ok = self
            .read_identity()
            .is_some_and(|stored| stored.id == identity.id && stored.email == identity.email);
        token_ok && identity_ok
    }

    #[must_use]
    pub fn read_token(&self) -> Option<String> {
        self.store.get(&self.token_key).filter(|t| !t.is_empty())
    }

    /// Stored identity, or `None` when absent or unparseable.
    #[must_use]
    pub fn read_identity(&self) -> Option<Identity> {
        let raw = self.store.get(&self.user_key)?;
        serde_json::from_str(&raw).ok()
    }

    #[must_use]
    pub fn has_record(&self) -> bool {
        self.store.get(&self.token_key).is_some() || self.store.get(&self.user_key).is_some()
    }

    pub fn clear(&self) {
        self.store.remove(&self.token_key);
        self.store.remove(&self.user_key);
    }
}
