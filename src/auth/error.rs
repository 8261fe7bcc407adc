// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::response::{IntoResponse, Response};

use crate::error::{ApiError, ErrorCode};

/// Failures raised while extracting, verifying or resolving credentials.
///
/// The carried strings are diagnostic detail for the server log; clients only
/// ever see the generic message of the mapped [`ErrorCode`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// `Authorization` header absent, empty, or not `Bearer <token>`.
    #[error("authorization header must be 'Bearer <token>'")]
    MissingOrMalformedToken,

    /// Structural, signature or temporal validation failed.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// No key in the issuer's set matches the token's `kid`.
    #[error("no signing key matches kid '{0}'")]
    UnauthorizedKey(String),

    /// Request carries no session cookie.
    #[error("session cookie is missing")]
    SessionMissing,

    /// Session cookie exists but cannot be trusted.
    #[error("session cookie rejected: {0}")]
    SessionInvalid(String),

    /// The identity provider could not be reached or answered nonsense.
    #[error("dependent service failure: {0}")]
    DependentServiceFailure(String),

    #[error("internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Canonical error kind for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::MissingOrMalformedToken
            | AuthError::InvalidToken(_)
            | AuthError::UnauthorizedKey(_)
            | AuthError::SessionMissing
            | AuthError::SessionInvalid(_) => ErrorCode::Unauthorized,
            AuthError::DependentServiceFailure(_) => ErrorCode::DependentServiceFailure,
            AuthError::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let code = err.code();
        ApiError::annotate(err, code)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
