// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Panic Button API - session and identity service
//!
//! Authenticates mobile clients with Auth0-issued bearer tokens and keeps them
//! signed in through HMAC-signed session cookies, so protected handlers
//! receive a resolved [`models::User`].
//!
//! ## Modules
//!
//! - `api` - HTTP routes and OpenAPI docs (Axum)
//! - `auth` - Bearer extraction, JWKS, JWT verification, sessions
//! - `error` - Canonical error kinds and the HTTP error boundary
//! - `store` - User record storage

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod store;

#[cfg(test)]
mod test_support;
