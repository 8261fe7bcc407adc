// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contact endpoints. Requires a session.

use axum::Json;

use crate::auth::SessionUser;
use crate::error::ErrorEnvelope;
use crate::models::Contact;

/// List the signed-in user's emergency contacts.
#[utoipa::path(
    get,
    path = "/contacts",
    tag = "Contacts",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "Contacts of the session user", body = [Contact]),
        (status = 401, description = "No valid session", body = ErrorEnvelope),
        (status = 500, description = "User lookup failed", body = ErrorEnvelope),
    )
)]
pub async fn list_contacts(SessionUser(user): SessionUser) -> Json<Vec<Contact>> {
    Json(user.contacts)
}
