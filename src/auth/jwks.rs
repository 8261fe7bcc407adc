// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching.
//!
//! The issuer publishes its signing keys at
//! `https://{domain}/.well-known/jwks.json`. By default the set is fetched
//! fresh for every verification and the key whose `kid` matches the token
//! header is turned into a PEM certificate from its first `x5c` entry.
//!
//! ## Failure classes
//!
//! - Transport problems (DNS, connect, timeout, non-2xx, unparsable body,
//!   caller cancellation) are [`AuthError::DependentServiceFailure`].
//! - A token whose `kid` is absent from the set is
//!   [`AuthError::UnauthorizedKey`].
//!
//! Caching is opt-in through [`JwksClient::with_cache_ttl`].

use std::time::Duration;

use base64ct::{Base64, Encoding};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::AuthError;
use super::key_cache::KeyCache;

/// Well-known path of the key set on the issuer domain.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Default outbound timeout for the JWKS request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const CERTIFICATE_PEM_TAG: &str = "CERTIFICATE";

/// One published key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kty: String,
    #[serde(default)]
    pub kid: String,
    #[serde(default, rename = "use")]
    pub key_use: String,
    /// RSA modulus, base64url.
    #[serde(default)]
    pub n: String,
    /// RSA exponent, base64url.
    #[serde(default)]
    pub e: String,
    /// Certificate chain, standard base64 DER. The first entry holds the key.
    #[serde(default)]
    pub x5c: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    /// First key carrying exactly this `kid`.
    pub fn find(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|key| key.kid == kid)
    }
}

/// Material needed to check the signature of one token.
#[derive(Clone)]
pub struct VerificationKey {
    kid: String,
    certificate_pem: String,
    n: String,
    e: String,
}

impl VerificationKey {
    /// Builds the PEM certificate from the key's first `x5c` entry.
    pub fn from_jwk(jwk: &JsonWebKey) -> Result<Self, AuthError> {
        let leaf = jwk.x5c.first().ok_or_else(|| {
            AuthError::DependentServiceFailure(format!("key '{}' has no x5c certificate", jwk.kid))
        })?;
        let der = Base64::decode_vec(leaf.trim()).map_err(|e| {
            AuthError::DependentServiceFailure(format!(
                "x5c certificate of key '{}' is not base64: {e}",
                jwk.kid
            ))
        })?;

        Ok(Self {
            kid: jwk.kid.clone(),
            certificate_pem: pem::encode(&pem::Pem::new(CERTIFICATE_PEM_TAG, der)),
            n: jwk.n.clone(),
            e: jwk.e.clone(),
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// `-----BEGIN CERTIFICATE-----` framed certificate.
    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    /// RSA decoding key for signature verification.
    ///
    /// Reads the public key out of the certificate; if that fails and the JWK
    /// published `n`/`e`, those are used instead.
    pub fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        match DecodingKey::from_rsa_pem(self.certificate_pem.as_bytes()) {
            Ok(key) => Ok(key),
            Err(pem_err) if !self.n.is_empty() && !self.e.is_empty() => {
                debug!(
                    kid = %self.kid,
                    error = %pem_err,
                    "Certificate unusable, falling back to RSA components"
                );
                DecodingKey::from_rsa_components(&self.n, &self.e).map_err(|e| {
                    AuthError::DependentServiceFailure(format!(
                        "RSA components of key '{}': {e}",
                        self.kid
                    ))
                })
            }
            Err(e) => Err(AuthError::DependentServiceFailure(format!(
                "certificate of key '{}' holds no RSA key: {e}",
                self.kid
            ))),
        }
    }
}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// Fetches the issuer's key set and resolves verification keys by `kid`.
#[derive(Clone)]
pub struct JwksClient {
    jwks_url: Url,
    http_client: reqwest::Client,
    cache: Option<KeyCache>,
}

impl JwksClient {
    /// Client for `https://{domain}/.well-known/jwks.json`.
    pub fn for_domain(domain: &str, timeout: Duration) -> Result<Self, AuthError> {
        let url = Url::parse(&format!("https://{domain}{JWKS_PATH}")).map_err(|e| {
            AuthError::Internal(format!("cannot build JWKS URL for domain '{domain}': {e}"))
        })?;
        Ok(Self::with_url(url, timeout))
    }

    /// Client for an explicit key set URL.
    pub fn with_url(jwks_url: Url, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: None,
        }
    }

    /// Keep fetched keys for `ttl`.
    ///
    /// A stale key is still served while a background task refreshes the
    /// set; an unknown `kid` triggers one shared inline fetch.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = Some(KeyCache::new(ttl));
        self
    }

    pub fn jwks_url(&self) -> &Url {
        &self.jwks_url
    }

    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }

    /// GET the key set, abandoning the request if `cancel` fires first.
    #[instrument(skip_all, fields(url = %self.jwks_url))]
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<JsonWebKeySet, AuthError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("JWKS fetch cancelled by caller");
                Err(AuthError::DependentServiceFailure("JWKS fetch cancelled".to_string()))
            }
            result = self.fetch_uncancellable() => result,
        }
    }

    async fn fetch_uncancellable(&self) -> Result<JsonWebKeySet, AuthError> {
        debug!("Fetching JWKS");

        let response = self
            .http_client
            .get(self.jwks_url.clone())
            .send()
            .await
            .map_err(|e| AuthError::DependentServiceFailure(format!("JWKS request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::DependentServiceFailure(format!(
                "JWKS endpoint returned HTTP {status}"
            )));
        }

        let jwks: JsonWebKeySet = response.json().await.map_err(|e| {
            AuthError::DependentServiceFailure(format!("JWKS response is not a key set: {e}"))
        })?;

        debug!(key_count = jwks.keys.len(), "JWKS fetched");
        Ok(jwks)
    }

    /// Key matching `kid`, from the cache when enabled or a fresh fetch.
    #[instrument(skip(self, cancel))]
    pub async fn verification_key(
        &self,
        kid: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<VerificationKey, AuthError> {
        let Some(kid) = kid.filter(|kid| !kid.is_empty()) else {
            return Err(AuthError::UnauthorizedKey(String::new()));
        };

        let jwk = match &self.cache {
            Some(cache) => cache.key(self, kid, cancel).await?,
            None => self
                .fetch(cancel)
                .await?
                .find(kid)
                .cloned()
                .ok_or_else(|| AuthError::UnauthorizedKey(kid.to_string()))?,
        };

        VerificationKey::from_jwk(&jwk)
    }
}
