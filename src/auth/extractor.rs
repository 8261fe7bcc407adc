// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential extraction.
//!
//! - [`extract_bearer`] pulls the token out of `Authorization: Bearer <token>`
//!   for the sign-in endpoint.
//! - [`SessionUser`] resolves the caller of a protected route from the
//!   session cookie.
//!
//! ## Usage
//!
//! ```rust,ignore
//! async fn handler(SessionUser(user): SessionUser) -> Json<Vec<Contact>> {
//!     Json(user.contacts)
//! }
//! ```

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::error::AuthError;
use super::middleware::resolve_session_user;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

const BEARER_SCHEME: &str = "bearer";

/// Token from an `Authorization` header value.
///
/// The value must be exactly two whitespace-separated fields, the first of
/// which is `Bearer` in any letter case.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let mut fields = header
        .ok_or(AuthError::MissingOrMalformedToken)?
        .split_whitespace();

    match (fields.next(), fields.next(), fields.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case(BEARER_SCHEME) => {
            Ok(token)
        }
        _ => Err(AuthError::MissingOrMalformedToken),
    }
}

/// [`extract_bearer`] over request headers. Non-ASCII values are malformed.
pub fn bearer_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| AuthError::MissingOrMalformedToken)?;
    extract_bearer(value)
}

/// The user behind a valid session cookie.
///
/// Reuses the user placed in request extensions by
/// [`super::middleware::require_session`] when that layer ran; otherwise
/// loads the session itself. Never creates a session.
#[derive(Debug, Clone)]
pub struct SessionUser(pub User);

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>().cloned() {
            return Ok(SessionUser(user));
        }

        let user = resolve_session_user(state, &parts.headers).await?;
        Ok(SessionUser(user))
    }
}
