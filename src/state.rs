// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::audit::{AuditSink, TracingAuditSink};
use crate::auth::{
    AuthError, Authenticator, Credentials, Identity, IdentityStore, InMemoryIdentityStore,
    PasswordHasher, RequestContext, StoreCredentialValidator, StoreError, UnixCryptHasher,
};
use crate::config::TokenConfig;
use crate::token::TokenEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: TokenEngine,
    pub store: Arc<dyn IdentityStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub audit: Arc<dyn AuditSink>,
    validator: Arc<StoreCredentialValidator>,
}

impl AppState {
    pub fn new(
        engine: TokenEngine,
        store: Arc<dyn IdentityStore>,
        hasher: Arc<dyn PasswordHasher>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let validator = Arc::new(StoreCredentialValidator::new(store.clone(), hasher.clone()));
        Self {
            engine,
            store,
            hasher,
            audit,
            validator,
        }
    }

    /// In-memory identities, Unix crypt passwords, audit to the log.
    pub fn in_memory(config: TokenConfig) -> Self {
        Self::new(
            TokenEngine::new(config),
            Arc::new(InMemoryIdentityStore::new()),
            Arc::new(UnixCryptHasher),
            Arc::new(TracingAuditSink),
        )
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// A fresh authenticator for one request.
    pub fn authenticator(&self, request: RequestContext) -> Authenticator {
        Authenticator::new(
            self.engine.context(),
            self.validator.clone(),
            self.store.clone(),
            self.audit.clone(),
            request,
        )
    }

    /// Store a new identity from `username`, `password` and optional
    /// `email` fields. The password is scrubbed whatever the outcome.
    pub fn register(&self, credentials: &mut Credentials) -> Result<Identity, AuthError> {
        let result = self.create_identity(credentials);
        credentials.scrub();
        result
    }

    pub fn register_user(&self, username: &str, password: &str) -> Result<Identity, AuthError> {
        self.register(
            &mut Credentials::new()
                .with_field("username", username)
                .with_password(password),
        )
    }

    fn create_identity(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let username = credentials
            .fields()
            .get("username")
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .ok_or(AuthError::BadAttempt)?;
        let password = credentials.password().ok_or(AuthError::BadAttempt)?;

        let mut identity = Identity::new(username, self.hasher.hash(password)?);
        identity.email = credentials.fields().get("email").cloned();
        self.store.save(identity).map_err(|e| match e {
            StoreError::UsernameTaken(_) => AuthError::UsernameTaken,
            other => AuthError::InternalError(other.to_string()),
        })
    }
}
