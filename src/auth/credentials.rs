// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login credentials, password hashing and credential validation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::error::AuthError;
use super::identity::{Identity, IdentityStore};

const PASSWORD_FIELD: &str = "password";

/// Submitted login fields. The password is held apart and zeroed on drop.
#[derive(Default, Deserialize)]
#[serde(from = "BTreeMap<String, String>")]
pub struct Credentials {
    fields: BTreeMap<String, String>,
    password: Option<Zeroizing<String>>,
}

impl From<BTreeMap<String, String>> for Credentials {
    fn from(mut fields: BTreeMap<String, String>) -> Self {
        let password = fields.remove(PASSWORD_FIELD).map(Zeroizing::new);
        Self { fields, password }
    }
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if name == PASSWORD_FIELD {
            self.password = Some(Zeroizing::new(value.into()));
        } else {
            self.fields.insert(name, value.into());
        }
        self
    }

    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.with_field(PASSWORD_FIELD, password)
    }

    /// Number of submitted fields, password included.
    pub fn len(&self) -> usize {
        self.fields.len() + usize::from(self.password.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookup fields, without the password.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// The password, if present and non-empty.
    pub fn password(&self) -> Option<&str> {
        self.password
            .as_ref()
            .map(|p| p.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Drop (and zero) the password.
    pub fn scrub(&mut self) {
        self.password = None;
    }

    pub fn is_scrubbed(&self) -> bool {
        self.password.is_none()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("fields", &self.fields)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Why a credential check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialFailure {
    #[error("bad attempt")]
    BadAttempt,

    #[error("invalid password")]
    InvalidPassword,
}

/// Password hashing scheme.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    fn verify(&self, password: &str, hash: &str) -> bool;

    /// Whether `hash` was produced with outdated parameters.
    fn needs_rehash(&self, hash: &str) -> bool;
}

/// Unix crypt(3) hashes; new hashes use SHA-512 crypt.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixCryptHasher;

const SHA512_CRYPT_PREFIX: &str = "$6$";

impl PasswordHasher for UnixCryptHasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        pwhash::sha512_crypt::hash(password)
            .map_err(|e| AuthError::InternalError(format!("password hashing failed: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        pwhash::unix::verify(password, hash)
    }

    fn needs_rehash(&self, hash: &str) -> bool {
        !hash.starts_with(SHA512_CRYPT_PREFIX)
    }
}

/// Checks credentials and resolves them to an identity.
pub trait CredentialValidator: Send + Sync {
    fn validate(&self, credentials: &mut Credentials) -> Result<Identity, CredentialFailure>;
}

/// Validates against an [`IdentityStore`], upgrading outdated hashes.
pub struct StoreCredentialValidator {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl StoreCredentialValidator {
    pub fn new(store: Arc<dyn IdentityStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }
}

impl CredentialValidator for StoreCredentialValidator {
    fn validate(&self, credentials: &mut Credentials) -> Result<Identity, CredentialFailure> {
        if credentials.len() < 2 {
            return Err(CredentialFailure::BadAttempt);
        }
        let Some(password) = credentials.password() else {
            return Err(CredentialFailure::BadAttempt);
        };

        let mut identity = self
            .store
            .find_by_credentials(credentials.fields())
            .ok_or(CredentialFailure::BadAttempt)?;

        if !self.hasher.verify(password, &identity.password_hash) {
            debug!(user_id = identity.id, "Password mismatch");
            return Err(CredentialFailure::InvalidPassword);
        }

        if self.hasher.needs_rehash(&identity.password_hash) {
            match self.hasher.hash(password) {
                Ok(hash) => {
                    identity.password_hash = hash;
                    match self.store.save(identity.clone()) {
                        Ok(saved) => identity = saved,
                        Err(e) => warn!(user_id = identity.id, error = %e, "Failed to store rehashed password"),
                    }
                }
                Err(e) => warn!(user_id = identity.id, error = %e, "Failed to rehash password"),
            }
        }

        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::{InMemoryIdentityStore, StoreError};
    use crate::token::Subject;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that counts lookups.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryIdentityStore,
        lookups: AtomicUsize,
    }

    impl IdentityStore for CountingStore {
        fn find_by_id(&self, id: &Subject) -> Option<Identity> {
            self.inner.find_by_id(id)
        }

        fn find_by_credentials(&self, fields: &BTreeMap<String, String>) -> Option<Identity> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_credentials(fields)
        }

        fn update_active_date(&self, identity: &Identity) -> Result<(), StoreError> {
            self.inner.update_active_date(identity)
        }

        fn save(&self, identity: Identity) -> Result<Identity, StoreError> {
            self.inner.save(identity)
        }
    }

    fn setup(hash: &str) -> (Arc<CountingStore>, StoreCredentialValidator) {
        let store = Arc::new(CountingStore::default());
        store.save(Identity::new("alice", hash)).unwrap();
        let validator = StoreCredentialValidator::new(store.clone(), Arc::new(UnixCryptHasher));
        (store, validator)
    }

    #[test]
    fn deserializes_from_flat_object() {
        let credentials: Credentials =
            serde_json::from_str(r#"{"username":"alice","password":"s3cret"}"#).unwrap();
        assert_eq!(credentials.len(), 2);
        assert_eq!(credentials.password(), Some("s3cret"));
        assert!(!credentials.fields().contains_key("password"));
    }

    #[test]
    fn debug_redacts_password() {
        let credentials = Credentials::new().with_field("username", "alice").with_password("s3cret");
        assert!(!format!("{credentials:?}").contains("s3cret"));
    }

    #[test]
    fn scrub_removes_password() {
        let mut credentials = Credentials::new().with_password("s3cret");
        credentials.scrub();
        assert!(credentials.is_scrubbed());
        assert_eq!(credentials.password(), None);
    }

    #[test]
    fn missing_password_never_reaches_the_store() {
        let hash = UnixCryptHasher.hash("s3cret").unwrap();
        let (store, validator) = setup(&hash);

        let mut only_username = Credentials::new().with_field("username", "alice").with_field("email", "x");
        assert_eq!(validator.validate(&mut only_username), Err(CredentialFailure::BadAttempt));

        let mut only_password = Credentials::new().with_password("s3cret");
        assert_eq!(validator.validate(&mut only_password), Err(CredentialFailure::BadAttempt));

        let mut empty_password = Credentials::new().with_field("username", "alice").with_password("");
        assert_eq!(validator.validate(&mut empty_password), Err(CredentialFailure::BadAttempt));

        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_user_is_bad_attempt() {
        let (_, validator) = setup(&UnixCryptHasher.hash("s3cret").unwrap());
        let mut credentials = Credentials::new().with_field("username", "mallory").with_password("s3cret");
        assert_eq!(validator.validate(&mut credentials), Err(CredentialFailure::BadAttempt));
    }

    #[test]
    fn wrong_password_is_invalid_password() {
        let (_, validator) = setup(&UnixCryptHasher.hash("s3cret").unwrap());
        let mut credentials = Credentials::new().with_field("username", "alice").with_password("guess");
        assert_eq!(validator.validate(&mut credentials), Err(CredentialFailure::InvalidPassword));
    }

    #[test]
    fn valid_credentials_resolve_identity() {
        let (_, validator) = setup(&UnixCryptHasher.hash("s3cret").unwrap());
        let mut credentials = Credentials::new().with_field("username", "alice").with_password("s3cret");
        let identity = validator.validate(&mut credentials).unwrap();
        assert_eq!(identity.username, "alice");
    }

    #[test]
    fn outdated_hash_is_upgraded() {
        let md5 = pwhash::md5_crypt::hash("s3cret").unwrap();
        let (store, validator) = setup(&md5);

        let mut credentials = Credentials::new().with_field("username", "alice").with_password("s3cret");
        let identity = validator.validate(&mut credentials).unwrap();
        assert!(identity.password_hash.starts_with(SHA512_CRYPT_PREFIX));

        let stored = store.find_by_id(&Subject::Id(identity.id)).unwrap();
        assert!(UnixCryptHasher.verify("s3cret", &stored.password_hash));
        assert!(!UnixCryptHasher.needs_rehash(&stored.password_hash));
    }
}
