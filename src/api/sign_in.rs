// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in endpoint.

use axum::{extract::State, http::HeaderMap, Json};
use tokio_util::sync::CancellationToken;

use crate::auth::{self, SessionCookie};
use crate::error::{ApiError, ErrorEnvelope};
use crate::models::User;
use crate::state::AppState;

/// Exchange an Auth0 access token for a session cookie.
///
/// The response sets the `user-session` cookie and returns the stored user
/// record, created on first sign-in.
#[utoipa::path(
    post,
    path = "/signIn",
    tag = "Session",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Signed in; `Set-Cookie` carries the session", body = User),
        (status = 401, description = "Missing, malformed or invalid token", body = ErrorEnvelope),
        (status = 500, description = "Identity provider unreachable or internal failure", body = ErrorEnvelope),
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(SessionCookie, Json<User>), ApiError> {
    // Dropping this future (client gone) cancels the JWKS fetch.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let (cookie, user) = auth::sign_in(&state, &headers, &cancel).await?;
    Ok((cookie, Json(user)))
}
