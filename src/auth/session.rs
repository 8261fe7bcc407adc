// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed cookie sessions.
//!
//! A session is one cookie named [`SESSION_COOKIE_NAME`] whose value is
//!
//! ```text
//! base64url(json(SessionData)) "." base64url(HMAC-SHA256(key, "user-session|" payload))
//! ```
//!
//! The cookie name is bound into the MAC so a value minted for another
//! cookie cannot be replayed here. Nothing is stored server-side; the key
//! passed to [`SessionStore::new`] is the only secret.

use std::convert::Infallible;
use std::fmt;
use std::time::Duration;

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;

use super::error::AuthError;
use crate::models::User;

pub const SESSION_COOKIE_NAME: &str = "user-session";

/// Current [`SessionData`] schema version.
pub const SESSION_SCHEMA_VERSION: u8 = 1;

/// Shortest accepted HMAC key.
pub const MIN_SESSION_KEY_BYTES: usize = 32;

pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

type HmacSha256 = Hmac<Sha256>;

/// Payload carried inside the cookie.
#[derive(Debug, Serialize, Deserialize)]
struct SessionData {
    v: u8,
    #[serde(rename = "UserKey")]
    user_key: String,
    iat: i64,
}

#[derive(Deserialize)]
struct SchemaProbe {
    v: u8,
}

/// An established session read back from a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Subject the session was saved for.
    pub user_key: String,
    /// Unix seconds when the session was issued.
    pub issued_at: i64,
}

/// Attributes written on the `Set-Cookie` header.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub max_age: Duration,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_SESSION_MAX_AGE,
            secure: true,
        }
    }
}

/// Issues and validates session cookies.
pub struct SessionStore {
    key: Vec<u8>,
    settings: CookieSettings,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &"[REDACTED]")
            .field("settings", &self.settings)
            .finish()
    }
}

impl SessionStore {
    pub fn new(key: &[u8], settings: CookieSettings) -> Result<Self, AuthError> {
        if key.len() < MIN_SESSION_KEY_BYTES {
            return Err(AuthError::Internal(format!(
                "session key must be at least {MIN_SESSION_KEY_BYTES} bytes"
            )));
        }
        Ok(Self {
            key: key.to_vec(),
            settings,
        })
    }

    /// Mint a cookie binding the response to `user.sub`.
    pub fn save(&self, user: &User) -> Result<SessionCookie, AuthError> {
        self.issue(&user.sub, Utc::now().timestamp())
    }

    fn issue(&self, subject: &str, issued_at: i64) -> Result<SessionCookie, AuthError> {
        if subject.is_empty() {
            return Err(AuthError::Internal(
                "refusing to save a session without a subject".to_string(),
            ));
        }

        let data = SessionData {
            v: SESSION_SCHEMA_VERSION,
            user_key: subject.to_string(),
            iat: issued_at,
        };
        let json = serde_json::to_vec(&data)
            .map_err(|e| AuthError::Internal(format!("session encoding failed: {e}")))?;
        let payload = Base64UrlUnpadded::encode_string(&json);
        let signature = Base64UrlUnpadded::encode_string(&self.mac(&payload)?.finalize().into_bytes());
        let value = format!("{payload}.{signature}");

        let mut header = format!(
            "{SESSION_COOKIE_NAME}={value}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.settings.max_age.as_secs()
        );
        if self.settings.secure {
            header.push_str("; Secure");
        }
        let header = HeaderValue::from_str(&header)
            .map_err(|e| AuthError::Internal(format!("session cookie is not a header value: {e}")))?;

        Ok(SessionCookie { value, header })
    }

    /// Read and authenticate the session cookie on a request.
    pub fn load(&self, headers: &HeaderMap) -> Result<Session, AuthError> {
        self.load_at(headers, Utc::now().timestamp())
    }

    fn load_at(&self, headers: &HeaderMap, now: i64) -> Result<Session, AuthError> {
        let raw = find_cookie(headers, SESSION_COOKIE_NAME)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::SessionMissing)?;

        let (payload, signature) = raw
            .split_once('.')
            .ok_or_else(|| AuthError::SessionInvalid("value is not payload.signature".into()))?;
        let signature = Base64UrlUnpadded::decode_vec(signature)
            .map_err(|_| AuthError::SessionInvalid("signature is not base64url".into()))?;
        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| AuthError::SessionInvalid("signature mismatch".into()))?;

        // Authentic from here on: a payload we cannot read is our own bug.
        let json = Base64UrlUnpadded::decode_vec(payload)
            .map_err(|_| AuthError::Internal("signed session payload is not base64url".into()))?;
        let probe: SchemaProbe = serde_json::from_slice(&json)
            .map_err(|e| AuthError::Internal(format!("signed session has no version: {e}")))?;
        if probe.v != SESSION_SCHEMA_VERSION {
            return Err(AuthError::SessionInvalid(format!(
                "unsupported session version {}",
                probe.v
            )));
        }
        let data: SessionData = serde_json::from_slice(&json)
            .map_err(|e| AuthError::Internal(format!("signed session does not fit schema: {e}")))?;
        if data.user_key.is_empty() {
            return Err(AuthError::Internal("signed session has an empty UserKey".into()));
        }

        let age = now.saturating_sub(data.iat);
        let max_age = i64::try_from(self.settings.max_age.as_secs()).unwrap_or(i64::MAX);
        if age > max_age {
            return Err(AuthError::SessionInvalid(format!("session expired {age}s after issue")));
        }

        debug!(age_seconds = age, "Session loaded");
        Ok(Session {
            user_key: data.user_key,
            issued_at: data.iat,
        })
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| AuthError::Internal(format!("session key rejected by HMAC: {e}")))?;
        mac.update(SESSION_COOKIE_NAME.as_bytes());
        mac.update(b"|");
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}

/// A freshly minted session, attached to a response as `Set-Cookie`.
///
/// Being [`IntoResponseParts`], it can only be applied while the response
/// head is built, never after the body has started.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    value: String,
    header: HeaderValue,
}

impl SessionCookie {
    /// The cookie value, without attributes.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Full `Set-Cookie` header value.
    pub fn header_value(&self) -> &HeaderValue {
        &self.header
    }
}

impl IntoResponseParts for SessionCookie {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.headers_mut().append(SET_COOKIE, self.header);
        Ok(res)
    }
}

/// Value of cookie `name` across every `Cookie` header on the request.
fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}
