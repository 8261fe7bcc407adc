// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Domain records returned by the REST API. Field names are PascalCase on
//! the wire, matching the records the mobile client already consumes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

// =============================================================================
// Users
// =============================================================================

/// An authenticated person and their emergency contacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    /// Stable identity from the issuer's `sub` claim, e.g. `foo@bar.com`.
    #[schema(example = "foo@bar.com")]
    pub sub: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl User {
    /// A fresh record carrying only the subject.
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: String::new(),
            contacts: Vec::new(),
        }
    }

    /// Storage key: lowercase hex SHA-256 of the subject.
    pub fn key(&self) -> String {
        user_key(&self.sub)
    }
}

/// Storage key for a subject without building a [`User`].
pub fn user_key(sub: &str) -> String {
    format!("{:x}", Sha256::digest(sub.as_bytes()))
}

/// Someone to notify when the button is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    pub name: String,
    #[schema(example = "+15551234567")]
    pub phone_number: String,
}
