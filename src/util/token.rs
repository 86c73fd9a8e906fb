//! Credential token decoding.
//!
//! Tokens are three dot-separated base64url segments (header, payload,
//! signature). The client decodes header and payload for expiry and identity
//! facts only. The signature is opaque: verifying it needs a secret the
//! browser never holds, so the server stays the trust boundary on every
//! request.
//!
//! Nothing here panics or returns an error. Malformed input decodes to `None`
//! and counts as expired.

#[cfg(test)]
#[path = "token_test.rs"]
mod token_test;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Map, Value};

/// Header and payload of a structurally valid token.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedToken {
    pub header: Map<String, Value>,
    pub payload: Map<String, Value>,
    /// Raw third segment, never verified.
    pub signature: String,
}

impl DecodedToken {
    /// `sub` claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.payload.get("sub").and_then(Value::as_str)
    }

    /// `exp` claim in seconds since the Unix epoch.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        claim_seconds(self.payload.get("exp"))
    }

    /// `iat` claim in seconds since the Unix epoch.
    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        claim_seconds(self.payload.get("iat"))
    }

    /// String claim lookup.
    #[must_use]
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }
}

/// Diagnostic summary for logs; never contains the token itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenInfo {
    pub well_formed: bool,
    pub subject: Option<String>,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub expired: bool,
    pub seconds_remaining: Option<i64>,
}

#[allow(clippy::cast_possible_truncation)]
fn claim_seconds(value: Option<&Value>) -> Option<i64> {
    let value = value?;
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}

fn decode_segment(segment: &str) -> Option<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Split and decode a token. `None` unless there are exactly three
/// segments and the first two are base64url-encoded JSON objects.
#[must_use]
pub fn decode(token: &str) -> Option<DecodedToken> {
    let mut parts = token.trim().split('.');
    let (Some(header), Some(payload), Some(signature), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    Some(DecodedToken {
        header: decode_segment(header)?,
        payload: decode_segment(payload)?,
        signature: signature.to_owned(),
    })
}

/// True when `token` decodes structurally.
#[must_use]
pub fn is_well_formed(token: &str) -> bool {
    decode(token).is_some()
}

/// Expiry check against an explicit clock. Tokens without `exp` count as
/// expired, as do malformed tokens.
#[must_use]
pub fn is_expired_at(token: &str, now_ms: i64) -> bool {
    match decode(token).and_then(|decoded| decoded.expires_at()) {
        Some(exp) => exp.saturating_mul(1000) < now_ms,
        None => true,
    }
}

/// Expiry check against the current wall clock.
#[must_use]
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_ms())
}

/// Summarize a token for logging.
#[must_use]
pub fn describe(token: &str) -> TokenInfo {
    describe_at(token, now_ms())
}

#[must_use]
pub fn describe_at(token: &str, now_ms: i64) -> TokenInfo {
    let Some(decoded) = decode(token) else {
        return TokenInfo {
            well_formed: false,
            subject: None,
            issued_at: None,
            expires_at: None,
            expired: true,
            seconds_remaining: None,
        };
    };
    let expires_at = decoded.expires_at();
    TokenInfo {
        well_formed: true,
        subject: decoded.subject().map(str::to_owned),
        issued_at: decoded.issued_at(),
        expires_at,
        expired: is_expired_at(token, now_ms),
        seconds_remaining: expires_at.map(|exp| exp.saturating_sub(now_ms.div_euclid(1000))),
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    #[cfg(feature = "hydrate")]
    {
        #[allow(clippy::cast_possible_truncation)]
        let now = js_sys::Date::now() as i64;
        now
    }
    #[cfg(not(feature = "hydrate"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }
}
