// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Optional JWKS cache.
//!
//! Readers share an immutable snapshot of the key set. Fetches go through a
//! single-flight lock: whoever holds it fetches, everyone queued behind it
//! re-reads the snapshot once they get the lock instead of fetching again.
//!
//! A snapshot older than the TTL is still served when it holds the requested
//! `kid`; the refresh then happens in a background task so the request does
//! not wait on the issuer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::jwks::{JsonWebKey, JsonWebKeySet, JwksClient};

struct Snapshot {
    keys: HashMap<String, JsonWebKey>,
    fetched_at: Instant,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

#[derive(Clone)]
pub(crate) struct KeyCache {
    ttl: Duration,
    snapshot: Arc<RwLock<Option<Arc<Snapshot>>>>,
    refresh: Arc<Mutex<()>>,
}

impl KeyCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            snapshot: Arc::new(RwLock::new(None)),
            refresh: Arc::new(Mutex::new(())),
        }
    }

    async fn current(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().await.clone()
    }

    pub(crate) async fn key(
        &self,
        client: &JwksClient,
        kid: &str,
        cancel: &CancellationToken,
    ) -> Result<JsonWebKey, AuthError> {
        let seen = self.current().await;

        if let Some(snapshot) = &seen {
            if let Some(key) = snapshot.keys.get(kid) {
                if snapshot.is_fresh(self.ttl) {
                    debug!(kid, "JWKS cache hit");
                } else {
                    debug!(kid, "Serving stale JWKS entry");
                    self.spawn_refresh(client);
                }
                return Ok(key.clone());
            }
        }

        let _flight = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(AuthError::DependentServiceFailure(
                    "cancelled while waiting for JWKS refresh".to_string(),
                ));
            }
            guard = self.refresh.lock() => guard,
        };

        // Another request may have refreshed while we queued.
        if let Some(latest) = self.current().await {
            let replaced = seen
                .as_ref()
                .map_or(true, |seen| !Arc::ptr_eq(seen, &latest));
            if replaced {
                return lookup(&latest, kid);
            }
        }

        let snapshot = self.store(client.fetch(cancel).await?).await;
        lookup(&snapshot, kid)
    }

    fn spawn_refresh(&self, client: &JwksClient) {
        let Ok(flight) = Arc::clone(&self.refresh).try_lock_owned() else {
            debug!("JWKS refresh already in flight");
            return;
        };

        let cache = self.clone();
        let client = client.clone();
        tokio::spawn(async move {
            let _flight = flight;
            match client.fetch(&CancellationToken::new()).await {
                Ok(set) => {
                    cache.store(set).await;
                }
                Err(e) => warn!(error = %e, "Background JWKS refresh failed, keeping stale keys"),
            }
        });
    }

    async fn store(&self, set: JsonWebKeySet) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot {
            keys: set
                .keys
                .into_iter()
                .map(|key| (key.kid.clone(), key))
                .collect(),
            fetched_at: Instant::now(),
        });
        *self.snapshot.write().await = Some(Arc::clone(&snapshot));
        info!(key_count = snapshot.keys.len(), "JWKS cache refreshed");
        snapshot
    }
}

fn lookup(snapshot: &Snapshot, kid: &str) -> Result<JsonWebKey, AuthError> {
    snapshot
        .keys
        .get(kid)
        .cloned()
        .ok_or_else(|| AuthError::UnauthorizedKey(kid.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwks::JWKS_PATH;
    use crate::test_support::{jwks_body, jwks_client, TEST_KID};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_body(&[TEST_KID]))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = jwks_client(&server).with_cache_ttl(Duration::from_secs(300));
        let lookups = (0..8).map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .verification_key(Some(TEST_KID), &CancellationToken::new())
                    .await
            })
        });

        for handle in lookups.collect::<Vec<_>>() {
            assert!(handle.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn fresh_hit_skips_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&[TEST_KID])))
            .expect(1)
            .mount(&server)
            .await;

        let client = jwks_client(&server).with_cache_ttl(Duration::from_secs(300));
        let cancel = CancellationToken::new();
        for _ in 0..3 {
            client.verification_key(Some(TEST_KID), &cancel).await.unwrap();
        }
    }

    #[tokio::test]
    async fn unknown_kid_refetches_then_rejects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&[TEST_KID])))
            .expect(2)
            .mount(&server)
            .await;

        let client = jwks_client(&server).with_cache_ttl(Duration::from_secs(300));
        let cancel = CancellationToken::new();
        client.verification_key(Some(TEST_KID), &cancel).await.unwrap();

        let err = client
            .verification_key(Some("unknown"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnauthorizedKey(kid) if kid == "unknown"));
    }

    #[tokio::test]
    async fn stale_entry_is_served_while_refreshing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&[TEST_KID])))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        let client = jwks_client(&server).with_cache_ttl(Duration::from_millis(50));
        let cancel = CancellationToken::new();
        client.verification_key(Some(TEST_KID), &cancel).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The issuer is now slow; the stale key must come back without waiting.
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_body(&[TEST_KID]))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let started = Instant::now();
        let key = client.verification_key(Some(TEST_KID), &cancel).await.unwrap();
        assert_eq!(key.kid(), TEST_KID);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn failed_background_refresh_keeps_stale_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body(&[TEST_KID])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = jwks_client(&server).with_cache_ttl(Duration::from_millis(20));
        let cancel = CancellationToken::new();
        client.verification_key(Some(TEST_KID), &cancel).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        client.verification_key(Some(TEST_KID), &cancel).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        client.verification_key(Some(TEST_KID), &cancel).await.unwrap();
    }
}
