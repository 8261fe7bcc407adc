// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fake Auth0 tenant for integration tests.
//!
//! Publishes a fixed RSA key through a wiremock JWKS endpoint and signs
//! tokens with the matching private key.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use panic_button_api::api::router;
use panic_button_api::auth::jwks::{JwksClient, JWKS_PATH};
use panic_button_api::config::Config;
use panic_button_api::state::AppState;
use panic_button_api::store::InMemoryUserStore;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ISSUER_KEY_PEM: &str = include_str!("../fixtures/issuer_key.pem");
const ISSUER_CERT_PEM: &str = include_str!("../fixtures/issuer_cert.pem");
const ISSUER_MODULUS: &str = include_str!("../fixtures/issuer_n.txt");

pub const KID: &str = "tenant-key-2026";
pub const SESSION_KEY: &str = "integration-session-key-0123456789";

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    exp: i64,
    iat: i64,
}

pub struct TestIssuer {
    pub server: MockServer,
}

impl TestIssuer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Serve a key set holding the test key under each of `kids`,
    /// expecting exactly `fetches` requests.
    pub async fn publish(&self, kids: &[&str], fetches: u64) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks(kids)))
            .expect(fetches)
            .mount(&self.server)
            .await;
    }

    pub async fn fail_with(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub fn jwks_client(&self) -> JwksClient {
        let url = Url::parse(&format!("{}{JWKS_PATH}", self.server.uri())).unwrap();
        JwksClient::with_url(url, Duration::from_secs(5))
    }
}

fn jwks(kids: &[&str]) -> Value {
    let x5c: String = ISSUER_CERT_PEM
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let keys: Vec<Value> = kids
        .iter()
        .map(|kid| {
            json!({
                "kty": "RSA",
                "kid": kid,
                "use": "sig",
                "n": ISSUER_MODULUS.trim(),
                "e": "AQAB",
                "x5c": [x5c],
            })
        })
        .collect();
    json!({ "keys": keys })
}

/// RS256 token for `sub`, expiring `ttl_seconds` from now (negative for expired).
pub fn token(kid: &str, sub: &str, ttl_seconds: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = TestClaims {
        sub: sub.to_string(),
        exp: now + ttl_seconds,
        iat: now - 5,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    let key = EncodingKey::from_rsa_pem(ISSUER_KEY_PEM.as_bytes()).unwrap();
    encode(&header, &claims, &key).unwrap()
}

pub fn config(extra: &[(&str, &str)]) -> Config {
    let mut vars = HashMap::from([
        ("SESSION_KEY".to_string(), SESSION_KEY.to_string()),
        ("AUTH0_DOMAIN".to_string(), "tenant.auth0.com".to_string()),
        ("COOKIE_SECURE".to_string(), "false".to_string()),
    ]);
    for (name, value) in extra {
        vars.insert(name.to_string(), value.to_string());
    }
    Config::from_vars(&vars).unwrap()
}

/// Router wired to `issuer`, plus a handle on its user store.
pub fn build_app(issuer: &TestIssuer, config: &Config) -> (Router, Arc<InMemoryUserStore>) {
    let users = Arc::new(InMemoryUserStore::new());
    let state = AppState::with_jwks(config, issuer.jwks_client(), users.clone()).unwrap();
    (router(state), users)
}
