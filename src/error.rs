// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical error kinds and the HTTP error boundary.
//!
//! Every failure that reaches a response is an [`ApiError`]: an underlying
//! error annotated with one of four [`ErrorCode`]s. The code alone decides the
//! status and the fixed message the client sees; the underlying error is only
//! logged server-side.

use std::any::Any;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Internal,
    Unauthorized,
    NotFound,
    DependentServiceFailure,
}

impl ErrorCode {
    /// HTTP status sent to the client for this kind.
    pub fn http_status(self) -> StatusCode {
        match self {
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            // Upstream outages share the status of our own faults.
            ErrorCode::DependentServiceFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed client-facing message. Never derived from the underlying error.
    pub fn public_message(self) -> &'static str {
        match self {
            ErrorCode::Internal => "Internal server error",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::NotFound => "Not found",
            ErrorCode::DependentServiceFailure => "A dependent service is unavailable",
        }
    }
}

/// Wire shape of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorEnvelope {
    /// HTTP status code, repeated in the body.
    pub code: u16,
    /// Generic description of the error kind.
    pub message: String,
}

/// An error on its way to the client.
///
/// Built with [`ApiError::annotate`] when the kind is known, or
/// [`ApiError::new`] when it is not; un-annotated errors are treated as
/// [`ErrorCode::Internal`].
pub struct ApiError {
    code: Option<ErrorCode>,
    source: BoxError,
}

impl ApiError {
    /// Wrap an error without classifying it.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self {
            code: None,
            source: err.into(),
        }
    }

    /// Wrap an error and tag it with an error kind.
    pub fn annotate(err: impl Into<BoxError>, code: ErrorCode) -> Self {
        Self {
            code: Some(code),
            source: err.into(),
        }
    }

    /// The effective kind. Falls back to `Internal` when never annotated.
    pub fn code(&self) -> ErrorCode {
        self.code.unwrap_or(ErrorCode::Internal)
    }

    pub fn is_annotated(&self) -> bool {
        self.code.is_some()
    }

    pub fn status(&self) -> StatusCode {
        self.code().http_status()
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiError")
            .field("code", &self.code)
            .field("source", &self.source)
            .finish()
    }
}

/// Displays the original message, unchanged by annotation.
impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, f)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = code.http_status();

        if status.is_server_error() {
            tracing::error!(
                code = ?code,
                annotated = self.is_annotated(),
                error = %self.source,
                "Request failed"
            );
        } else {
            tracing::warn!(code = ?code, error = %self.source, "Request rejected");
        }

        let body = Json(ErrorEnvelope {
            code: status.as_u16(),
            message: code.public_message().to_string(),
        });
        (status, body).into_response()
    }
}

/// Response used by the panic-recovery layer.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::new(format!("handler panicked: {detail}")).into_response()
}
