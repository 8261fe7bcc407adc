// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::error::AuthError;
use crate::auth::jwks::JwksClient;
use crate::auth::jwt::JwtVerifier;
use crate::auth::session::{CookieSettings, SessionStore};
use crate::config::Config;
use crate::store::UserStore;

/// Everything a request handler may touch. Cheap to clone.
///
/// Besides the user store, the only mutable state shared across requests is
/// the JWKS cache inside [`JwksClient`], when enabled.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub jwks: JwksClient,
    pub verifier: Arc<JwtVerifier>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    /// State for the issuer named in `config`.
    pub fn new(config: &Config, users: Arc<dyn UserStore>) -> Result<Self, AuthError> {
        let jwks = JwksClient::for_domain(&config.auth0_domain, config.jwks_timeout)?;
        Self::with_jwks(config, jwks, users)
    }

    /// State with an explicit JWKS client, e.g. one pointed at a local issuer.
    pub fn with_jwks(
        config: &Config,
        jwks: JwksClient,
        users: Arc<dyn UserStore>,
    ) -> Result<Self, AuthError> {
        let sessions = SessionStore::new(
            &config.session_key,
            CookieSettings {
                max_age: config.session_max_age,
                secure: config.cookie_secure,
            },
        )?;

        let jwks = match config.jwks_cache_ttl {
            Some(ttl) => jwks.with_cache_ttl(ttl),
            None => jwks,
        };

        let mut verifier = JwtVerifier::new(config.jwt_leeway_seconds);
        if let Some(audience) = &config.auth0_audience {
            verifier = verifier.with_audience(audience.clone());
        }

        Ok(Self {
            sessions: Arc::new(sessions),
            jwks,
            verifier: Arc::new(verifier),
            users,
        })
    }
}
