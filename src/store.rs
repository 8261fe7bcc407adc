// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User record storage.
//!
//! Persistence is an external collaborator: handlers talk to the
//! [`UserStore`] trait and the binary wires in [`InMemoryUserStore`].
//! Records are keyed by [`User::key`], never by the raw subject.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::{ApiError, ErrorCode};
use crate::models::{user_key, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no user stored under key {0}")]
    NotFound(String),

    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

/// Every store failure reaching a handler is a server fault, including
/// `NotFound` for a subject that holds a valid session.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::annotate(err, ErrorCode::Internal)
    }
}

/// Lookup and persistence of user records by subject.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, sub: &str) -> Result<User, StoreError>;

    /// Insert or replace the record for `user.sub`.
    async fn put_user(&self, user: &User) -> Result<(), StoreError>;
}

/// Returns the stored record for `sub`, creating a bare one if absent.
pub async fn get_or_create_user(store: &dyn UserStore, sub: &str) -> Result<User, StoreError> {
    match store.get_user(sub).await {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound(_)) => {
            let user = User::new(sub);
            store.put_user(&user).await?;
            tracing::info!(user_key = %user.key(), "Created user record");
            Ok(user)
        }
        Err(e) => Err(e),
    }
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, sub: &str) -> Result<User, StoreError> {
        let key = user_key(sub);
        self.users
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotFound(key))
    }

    async fn put_user(&self, user: &User) -> Result<(), StoreError> {
        self.users.write().await.insert(user.key(), user.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Contact;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryUserStore::new();
        let mut user = User::new("foo@bar.com");
        user.contacts.push(Contact {
            name: "Mum".into(),
            phone_number: "+15551234567".into(),
        });

        store.put_user(&user).await.unwrap();
        assert_eq!(store.get_user("foo@bar.com").await.unwrap(), user);
    }

    #[tokio::test]
    async fn unknown_subject_reports_hashed_key() {
        let store = InMemoryUserStore::new();

        let err = store.get_user("bob").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound(ref key)
                if key == "81b637d8fcd2c6da6359e6963113a1170de795e4b725b84d1e0b4cfd9ec58ce9"
        ));
    }

    #[tokio::test]
    async fn get_or_create_keeps_existing_record() {
        let store = InMemoryUserStore::new();
        let mut user = User::new("bob");
        user.name = "Bob".into();
        store.put_user(&user).await.unwrap();

        let loaded = get_or_create_user(&store, "bob").await.unwrap();
        assert_eq!(loaded.name, "Bob");
    }

    #[tokio::test]
    async fn get_or_create_inserts_bare_record() {
        let store = InMemoryUserStore::new();

        let created = get_or_create_user(&store, "new@bar.com").await.unwrap();
        assert_eq!(created, User::new("new@bar.com"));
        assert!(store.get_user("new@bar.com").await.is_ok());
    }

    #[test]
    fn store_errors_are_internal() {
        let api: ApiError = StoreError::NotFound("abc".into()).into();
        assert_eq!(api.code(), ErrorCode::Internal);
    }
}
