//! Shared test doubles: token minting, a scripted auth API and a flaky store.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures::channel::oneshot;
use serde_json::{Value, json};

use crate::config::AuthConfig;
use crate::net::api::{ApiError, AuthApi};
use crate::net::types::{Credentials, RegisterRequest, RegisterResponse};
use crate::state::session::SessionService;
use crate::util::storage::{KeyValueStore, MemoryStore, StorageError};
use crate::util::token::now_ms;

/// Far enough ahead that no test run reaches it.
pub const FAR_FUTURE: i64 = 4_102_444_800;

/// Build an unsigned three-segment token around `payload`.
pub fn mint_token(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({"alg": "HS256", "typ": "JWT"}).to_string());
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

pub fn valid_token(sub: &str) -> String {
    mint_token(&json!({"sub": sub, "iat": 1_700_000_000, "exp": FAR_FUTURE}))
}

pub fn expired_token(sub: &str) -> String {
    mint_token(&json!({"sub": sub, "iat": 1_000, "exp": 2_000}))
}

/// Token that expires `secs` seconds from now.
pub fn token_expiring_in(sub: &str, secs: i64) -> String {
    mint_token(&json!({"sub": sub, "exp": now_ms() / 1000 + secs}))
}

/// `AuthApi` double that replays queued responses and records calls.
#[derive(Default)]
pub struct ScriptedApi {
    logins: Mutex<VecDeque<Result<Value, ApiError>>>,
    registers: Mutex<VecDeque<Result<RegisterResponse, ApiError>>>,
    held_login: Mutex<Option<oneshot::Receiver<()>>>,
    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    /// Ordered record of calls; tests may append their own entries.
    pub journal: Arc<Mutex<Vec<String>>>,
}

impl ScriptedApi {
    pub fn with_login(response: Result<Value, ApiError>) -> Self {
        let api = Self::default();
        api.push_login(response);
        api
    }

    pub fn push_login(&self, response: Result<Value, ApiError>) {
        self.logins.lock().unwrap().push_back(response);
    }

    pub fn push_register(&self, response: Result<RegisterResponse, ApiError>) {
        self.registers.lock().unwrap().push_back(response);
    }

    /// The next `login` call waits until the returned sender fires (or drops).
    pub fn hold_next_login(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.held_login.lock().unwrap() = Some(rx);
        tx
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }
}

#[async_trait(?Send)]
impl AuthApi for ScriptedApi {
    async fn login(&self, credentials: &Credentials) -> Result<Value, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().unwrap().push(format!("api:login {}", credentials.email));
        let held = self.held_login.lock().unwrap().take();
        if let Some(release) = held {
            let _ = release.await;
        }
        self.logins
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted response".to_owned())))
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.registers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted response".to_owned())))
    }
}

/// Store wrapper whose writes can be made to fail or to silently corrupt.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_writes: std::sync::atomic::AtomicBool,
    pub corrupt_writes: std::sync::atomic::AtomicBool,
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write("quota exceeded".to_owned()));
        }
        if self.corrupt_writes.load(Ordering::SeqCst) {
            return self.inner.set(key, "garbage");
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key);
    }
}

pub fn candidate_login_body(token: &str) -> Value {
    json!({
        "token": token,
        "user": {"id": 102, "email": "candidate@test.com", "role": "CANDIDATE", "status": "verified"}
    })
}

/// Session service over a scripted API and the given store.
pub fn service_with(api: Arc<ScriptedApi>, store: Arc<dyn KeyValueStore>) -> SessionService {
    SessionService::new(&AuthConfig::default(), api, store)
}
