// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! # Security
//!
//! - Tokens are size-checked before any parsing
//! - Only RS256, RS384 and RS512 are accepted; `none` and HMAC algorithms
//!   never reach the key resolver
//! - `exp` is required, `nbf` is enforced when present
//! - Failure reasons go to the log only; clients see a generic 401

use std::future::Future;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::claims::Claims;
use super::error::AuthError;
use super::jwks::VerificationKey;

/// Tokens above this size are rejected unparsed.
pub const MAX_TOKEN_BYTES: usize = 8192;

const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Validates issuer-signed tokens and yields their subject.
///
/// The verifier holds no key material; every call receives a resolver that
/// turns the token header into a [`VerificationKey`].
#[derive(Debug, Clone, Default)]
pub struct JwtVerifier {
    leeway_seconds: u64,
    audience: Option<String>,
}

impl JwtVerifier {
    pub fn new(leeway_seconds: u64) -> Self {
        Self {
            leeway_seconds,
            audience: None,
        }
    }

    /// Require tokens to carry this `aud`.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Verify `token` and return its non-empty subject.
    ///
    /// Errors from `resolve` are returned as they are, so an unreachable
    /// issuer stays a dependent-service failure instead of becoming an
    /// invalid token.
    #[instrument(skip_all)]
    pub async fn verify<F, Fut>(&self, token: &str, resolve: F) -> Result<String, AuthError>
    where
        F: FnOnce(&Header) -> Fut,
        Fut: Future<Output = Result<VerificationKey, AuthError>>,
    {
        if token.len() > MAX_TOKEN_BYTES {
            return Err(AuthError::InvalidToken(format!(
                "token is {} bytes, limit is {MAX_TOKEN_BYTES}",
                token.len()
            )));
        }

        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("malformed header: {e}")))?;
        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::InvalidToken(format!(
                "algorithm {:?} is not accepted",
                header.alg
            )));
        }

        let key = resolve(&header).await?;
        let claims = self.decode_claims(token, header.alg, &key.decoding_key()?)?;

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("token has an empty subject".to_string()));
        }

        debug!(kid = %key.kid(), claims = ?claims, "Token verified");
        Ok(claims.sub)
    }

    fn decode_claims(
        &self,
        token: &str,
        alg: Algorithm,
        key: &DecodingKey,
    ) -> Result<Claims, AuthError> {
        decode::<Claims>(token, key, &self.validation(alg))
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidSignature => "signature does not match".to_string(),
                    ErrorKind::ExpiredSignature => "token has expired".to_string(),
                    ErrorKind::ImmatureSignature => "token is not yet valid".to_string(),
                    ErrorKind::InvalidAudience => "audience mismatch".to_string(),
                    ErrorKind::MissingRequiredClaim(claim) => format!("missing claim '{claim}'"),
                    _ => format!("token rejected: {e}"),
                };
                AuthError::InvalidToken(reason)
            })
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = self.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        match &self.audience {
            Some(audience) => {
                validation.set_required_spec_claims(&["exp", "sub", "aud"]);
                validation.set_audience(&[audience]);
            }
            None => {
                validation.set_required_spec_claims(&["exp", "sub"]);
                validation.validate_aud = false;
            }
        }
        validation
    }
}
