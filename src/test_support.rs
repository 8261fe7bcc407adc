// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for unit tests: a fake issuer key pair and helpers to
//! publish it from a mock JWKS endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;
use wiremock::MockServer;

use crate::auth::claims::Claims;
use crate::auth::jwks::{JsonWebKey, JwksClient, JWKS_PATH};
use crate::config::{Config, AUTH0_DOMAIN_ENV, COOKIE_SECURE_ENV, SESSION_KEY_ENV};
use crate::state::AppState;
use crate::store::InMemoryUserStore;

pub const ISSUER_KEY_PEM: &str = include_str!("../tests/fixtures/issuer_key.pem");
pub const ISSUER_CERT_PEM: &str = include_str!("../tests/fixtures/issuer_cert.pem");
const ISSUER_MODULUS: &str = include_str!("../tests/fixtures/issuer_n.txt");

pub const TEST_KID: &str = "test-key-1";

/// The certificate body as it appears in a JWKS `x5c` entry.
pub fn x5c() -> String {
    ISSUER_CERT_PEM
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect()
}

pub fn jwk(kid: &str) -> JsonWebKey {
    JsonWebKey {
        kty: "RSA".into(),
        kid: kid.into(),
        key_use: "sig".into(),
        n: ISSUER_MODULUS.trim().into(),
        e: "AQAB".into(),
        x5c: vec![x5c()],
    }
}

pub fn jwks_body(kids: &[&str]) -> Value {
    json!({ "keys": kids.iter().map(|kid| jwk(kid)).collect::<Vec<_>>() })
}

/// Claims valid for the next hour.
pub fn claims_for(sub: &str) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: sub.into(),
        exp: now + 3600,
        nbf: None,
        iat: Some(now),
        iss: Some("https://tenant.auth0.com/".into()),
    }
}

pub fn sign_token<T: Serialize>(kid: &str, claims: &T) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.into());
    let key = EncodingKey::from_rsa_pem(ISSUER_KEY_PEM.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

pub fn jwks_client(server: &MockServer) -> JwksClient {
    let url = Url::parse(&format!("{}{JWKS_PATH}", server.uri())).unwrap();
    JwksClient::with_url(url, Duration::from_secs(5))
}

/// Application state whose JWKS client targets `issuer_base`.
pub fn test_state(issuer_base: &str) -> AppState {
    let config = Config::from_vars(&HashMap::from([
        (SESSION_KEY_ENV.to_string(), "0123456789abcdef0123456789abcdef".to_string()),
        (AUTH0_DOMAIN_ENV.to_string(), "tenant.auth0.com".to_string()),
        (COOKIE_SECURE_ENV.to_string(), "false".to_string()),
    ]))
    .unwrap();
    let url = Url::parse(&format!("{issuer_base}{JWKS_PATH}")).unwrap();
    let jwks = JwksClient::with_url(url, Duration::from_secs(5));
    AppState::with_jwks(&config, jwks, Arc::new(InMemoryUserStore::new())).unwrap()
}
