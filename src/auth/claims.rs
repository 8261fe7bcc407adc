// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims read from issuer tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Registered claims this service relies on.
///
/// `exp` is required and `nbf` is honoured when present; temporal checks are
/// performed by [`super::jwt::JwtVerifier`], not here.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the stable identity, e.g. `foo@bar.com`.
    pub sub: String,

    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Subjects are usually e-mail addresses; keep them out of debug logs.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("iat", &self.iat)
            .field("iss", &self.iss)
            .finish()
    }
}
