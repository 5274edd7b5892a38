// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identities and the store they live in.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::token::codec::{read, write};
use crate::token::Subject;

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Store-assigned id; `0` until saved.
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

impl Identity {
    /// An unsaved identity.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            email: None,
            password_hash: password_hash.into(),
            last_active: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Value of a lookup field (`id`, `username` or `email`).
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            "username" => Some(self.username.clone()),
            "email" => self.email.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("identity {0} not found")]
    NotFound(u64),

    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
}

/// Persistence for identities.
pub trait IdentityStore: Send + Sync {
    /// Numeric subjects and numeric string subjects both resolve by id.
    fn find_by_id(&self, id: &Subject) -> Option<Identity>;

    /// Identity matching every given field (password excluded).
    fn find_by_credentials(&self, fields: &BTreeMap<String, String>) -> Option<Identity>;

    fn update_active_date(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Insert when `id == 0`, otherwise update. Returns the stored identity.
    fn save(&self, identity: Identity) -> Result<Identity, StoreError>;
}

/// In-memory store used by the server binary and tests.
#[derive(Debug)]
pub struct InMemoryIdentityStore {
    identities: RwLock<BTreeMap<u64, Identity>>,
    next_id: AtomicU64,
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self {
            identities: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        read(&self.identities).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn find_by_id(&self, id: &Subject) -> Option<Identity> {
        let id = match id {
            Subject::Id(id) => *id,
            Subject::Name(name) => name.parse().ok()?,
        };
        read(&self.identities).get(&id).cloned()
    }

    fn find_by_credentials(&self, fields: &BTreeMap<String, String>) -> Option<Identity> {
        if fields.is_empty() {
            return None;
        }
        read(&self.identities)
            .values()
            .find(|identity| {
                fields
                    .iter()
                    .all(|(name, value)| identity.field(name).as_deref() == Some(value.as_str()))
            })
            .cloned()
    }

    fn update_active_date(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut identities = write(&self.identities);
        let stored = identities
            .get_mut(&identity.id)
            .ok_or(StoreError::NotFound(identity.id))?;
        stored.last_active = identity.last_active;
        Ok(())
    }

    fn save(&self, mut identity: Identity) -> Result<Identity, StoreError> {
        let mut identities = write(&self.identities);
        let taken = identities
            .values()
            .any(|other| other.username == identity.username && other.id != identity.id);
        if taken {
            return Err(StoreError::UsernameTaken(identity.username));
        }

        if identity.id == 0 {
            identity.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        } else if !identities.contains_key(&identity.id) {
            return Err(StoreError::NotFound(identity.id));
        }
        identities.insert(identity.id, identity.clone());
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_alice() -> (InMemoryIdentityStore, Identity) {
        let store = InMemoryIdentityStore::new();
        let alice = store
            .save(Identity::new("alice", "hash").with_email("alice@example.com"))
            .unwrap();
        (store, alice)
    }

    #[test]
    fn save_assigns_ids() {
        let (store, alice) = store_with_alice();
        let bob = store.save(Identity::new("bob", "hash")).unwrap();
        assert_eq!(alice.id, 1);
        assert_eq!(bob.id, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let (store, _) = store_with_alice();
        assert_eq!(
            store.save(Identity::new("alice", "other")),
            Err(StoreError::UsernameTaken("alice".to_string()))
        );
    }

    #[test]
    fn find_by_id_accepts_numeric_names() {
        let (store, alice) = store_with_alice();
        assert_eq!(store.find_by_id(&Subject::Id(alice.id)), Some(alice.clone()));
        assert_eq!(store.find_by_id(&Subject::Name("1".into())), Some(alice));
        assert_eq!(store.find_by_id(&Subject::Name("alice".into())), None);
    }

    #[test]
    fn find_by_credentials_matches_all_fields() {
        let (store, alice) = store_with_alice();
        let by_email = BTreeMap::from([("email".to_string(), "alice@example.com".to_string())]);
        assert_eq!(store.find_by_credentials(&by_email), Some(alice));

        let mismatch = BTreeMap::from([
            ("username".to_string(), "alice".to_string()),
            ("email".to_string(), "bob@example.com".to_string()),
        ]);
        assert_eq!(store.find_by_credentials(&mismatch), None);
        assert_eq!(store.find_by_credentials(&BTreeMap::new()), None);
    }

    #[test]
    fn update_active_date_requires_a_stored_identity() {
        let (store, mut alice) = store_with_alice();
        alice.last_active = Some(Utc::now());
        store.update_active_date(&alice).unwrap();
        assert!(store.find_by_id(&Subject::Id(1)).unwrap().last_active.is_some());

        let ghost = Identity {
            id: 99,
            ..Identity::new("ghost", "hash")
        };
        assert_eq!(store.update_active_date(&ghost), Err(StoreError::NotFound(99)));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let (_, alice) = store_with_alice();
        let json = serde_json::to_value(&alice).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
