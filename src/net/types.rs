//! Auth wire DTOs and the normalized identity model.
//!
//! DESIGN
//! ======
//! The auth API is loose about types (numeric or string ids, any-case roles
//! and statuses, `verified` booleans on older accounts). Everything is
//! normalized here on the way in so the rest of the crate compares enums.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Message for any login body that is neither a token nor `{token, user}`.
pub const UNEXPECTED_RESPONSE_FORMAT: &str = "Unexpected response format from server";

/// User identifier. The API issues numeric ids; tokens minted by older
/// services carry string ids. Serialized back in the shape it arrived in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl UserId {
    /// An id is usable when it is numeric or a non-blank string.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::Number(_) => true,
            Self::Text(text) => !text.trim().is_empty(),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_i64(*n),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        user_id_from_value(&value).ok_or_else(|| D::Error::custom("expected integer or string user id"))
    }
}

/// Interpret a JSON value as a user id, if it is integer-compatible or text.
#[must_use]
pub fn user_id_from_value(value: &Value) -> Option<UserId> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Some(UserId::Number(int));
            }
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64
            {
                return Some(UserId::Number(float as i64));
            }
            None
        }
        Value::String(text) => Some(UserId::Text(text.clone())),
        _ => None,
    }
}

/// Platform role. Parsed case-insensitively, stored upper-case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Recruiter,
    /// Least-privileged role, used when the server omits one.
    #[default]
    Candidate,
    Admin,
    /// Any role this client does not know; kept verbatim (upper-cased).
    Other(String),
}

impl Role {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.as_str() {
            "RECRUITER" => Self::Recruiter,
            "CANDIDATE" => Self::Candidate,
            "ADMIN" | "ADMINISTRATOR" => Self::Admin,
            _ => Self::Other(upper),
        }
    }

    /// Upper-case storage form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Recruiter => "RECRUITER",
            Self::Candidate => "CANDIDATE",
            Self::Admin => "ADMIN",
            Self::Other(raw) => raw,
        }
    }

    /// Lower-case form used in paths and display.
    #[must_use]
    pub fn slug(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account lifecycle status. `VERIFIED` and `ACTIVE` are the same state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountStatus {
    Unverified,
    Active,
    Suspended,
    Banned,
    Other(String),
}

impl AccountStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.as_str() {
            "UNVERIFIED" | "PENDING" => Self::Unverified,
            "VERIFIED" | "ACTIVE" => Self::Active,
            "SUSPENDED" => Self::Suspended,
            "BANNED" => Self::Banned,
            _ => Self::Other(upper),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unverified => "UNVERIFIED",
            Self::Active => "VERIFIED",
            Self::Suspended => "SUSPENDED",
            Self::Banned => "BANNED",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for AccountStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<AccountStatus> for String {
    fn from(value: AccountStatus) -> Self {
        value.as_str().to_owned()
    }
}

/// Normalized user profile as persisted next to the token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
    /// Older accounts report verification as a boolean instead of `status`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "fullName", alias = "full_name")]
    pub fullname: Option<String>,
    /// Profile fields this layer does not interpret, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identity {
    #[must_use]
    pub fn new(id: impl Into<UserId>, email: &str, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.to_owned(),
            role,
            status: None,
            verified: None,
            fullname: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Required fields for persistence: a usable id and a non-blank email.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.id.is_present() && !self.email.trim().is_empty()
    }

    /// Lifecycle status, falling back to the `verified` boolean.
    /// `None` when the account reports neither.
    #[must_use]
    pub fn effective_status(&self) -> Option<AccountStatus> {
        if let Some(status) = &self.status {
            return Some(status.clone());
        }
        self.verified
            .map(|verified| if verified { AccountStatus::Active } else { AccountStatus::Unverified })
    }
}

/// Sign-in form payload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self { email: email.to_owned(), password: password.to_owned() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration payload. Extra profile fields are forwarded untouched.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    pub role: Role,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("fullname", &self.fullname)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// `POST /auth/register` response body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub user: Option<Identity>,
    #[serde(default)]
    pub message: String,
}

/// A login response, classified by its JSON shape.
#[derive(Clone, Debug, PartialEq)]
pub enum LoginResponse {
    /// The body was a bare token string; identity must come from its payload.
    BareToken(String),
    /// The body carried the token and the identity explicitly.
    Session { token: String, user: Identity },
}

impl LoginResponse {
    /// Classify a login body. A bare string shorter than `min_bare_len`
    /// or any other JSON shape is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`UNEXPECTED_RESPONSE_FORMAT`] when the body matches neither shape.
    pub fn from_value(value: Value, min_bare_len: usize) -> Result<Self, &'static str> {
        match value {
            Value::String(token) if token.len() >= min_bare_len => Ok(Self::BareToken(token)),
            Value::Object(mut fields) => {
                let Some(Value::String(token)) = fields.remove("token") else {
                    return Err(UNEXPECTED_RESPONSE_FORMAT);
                };
                let Some(user @ Value::Object(_)) = fields.remove("user") else {
                    return Err(UNEXPECTED_RESPONSE_FORMAT);
                };
                let user: Identity = serde_json::from_value(user).map_err(|_| UNEXPECTED_RESPONSE_FORMAT)?;
                Ok(Self::Session { token, user })
            }
            _ => Err(UNEXPECTED_RESPONSE_FORMAT),
        }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::BareToken(token) | Self::Session { token, .. } => token,
        }
    }
}
