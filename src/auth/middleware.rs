// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session middleware and the sign-in flow.
//!
//! ## Protected routes
//!
//! [`require_session`] is applied with `middleware::from_fn_with_state` to a
//! router subtree. It loads the session cookie, resolves the user and stores
//! it in request extensions where [`super::SessionUser`] picks it up. A
//! missing or invalid session answers 401 before the handler runs; a failed
//! user lookup answers 500.
//!
//! ## Sign-in
//!
//! [`sign_in`] verifies a bearer token against the issuer's keys and mints a
//! session cookie for its subject. It is the only place sessions are created.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::Header;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::extractor::bearer_from_headers;
use super::session::SessionCookie;
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;
use crate::store::get_or_create_user;

/// Load the session on `headers` and fetch its user record.
pub async fn resolve_session_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let session = state.sessions.load(headers)?;
    let user = state.users.get_user(&session.user_key).await?;
    Ok(user)
}

/// Reject requests without a valid session; expose the user to handlers.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = resolve_session_user(&state, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Exchange the bearer token on `headers` for a session.
///
/// `cancel` aborts the outbound JWKS fetch; the caller ties it to the
/// lifetime of the inbound request.
#[instrument(skip_all)]
pub async fn sign_in(
    state: &AppState,
    headers: &HeaderMap,
    cancel: &CancellationToken,
) -> Result<(SessionCookie, User), ApiError> {
    let token = bearer_from_headers(headers)?;

    let subject = state
        .verifier
        .verify(token, |header: &Header| {
            let kid = header.kid.clone();
            async move { state.jwks.verification_key(kid.as_deref(), cancel).await }
        })
        .await?;

    let cookie = state.sessions.save(&User::new(subject.as_str()))?;
    let user = get_or_create_user(state.users.as_ref(), &subject).await?;

    info!(user_key = %user.key(), "User signed in");
    Ok((cookie, user))
}
