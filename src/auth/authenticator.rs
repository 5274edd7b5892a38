// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-request authentication state machine.
//!
//! An [`Authenticator`] lives for one request. It starts with no identity;
//! `attempt` (credentials) or `check` (bearer token) log one in, `logout`
//! clears it. Expected failures come back as a failed [`AuthResult`]; only
//! misconfiguration and missing preconditions are returned as `Err`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::credentials::{CredentialValidator, Credentials};
use super::error::AuthError;
use super::identity::{Identity, IdentityStore};
use super::result::{AuthInfo, AuthResult};
use crate::audit::{AuditEvent, AuditEventType, AuditSink};
use crate::token::{Clock, Subject, TokenEngine, TokenError};

/// What the authenticator knows about the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }
}

pub struct Authenticator {
    engine: TokenEngine,
    validator: Arc<dyn CredentialValidator>,
    store: Arc<dyn IdentityStore>,
    audit: Arc<dyn AuditSink>,
    request: RequestContext,
    user: Option<Identity>,
}

impl Authenticator {
    pub fn new(
        engine: TokenEngine,
        validator: Arc<dyn CredentialValidator>,
        store: Arc<dyn IdentityStore>,
        audit: Arc<dyn AuditSink>,
        request: RequestContext,
    ) -> Self {
        Self {
            engine,
            validator,
            store,
            audit,
            request,
            user: None,
        }
    }

    /// Validate credentials and issue a token for the identity.
    ///
    /// The password is scrubbed from `credentials` whatever the outcome.
    pub fn attempt(&mut self, credentials: &mut Credentials) -> Result<AuthResult, AuthError> {
        let validated = self.validator.validate(credentials);
        credentials.scrub();

        let identity = match validated {
            Ok(identity) => identity,
            Err(failure) => {
                self.user = None;
                let reason = AuthError::from(failure);
                info!(reason = %reason, "Login attempt rejected");
                self.audit(AuditEvent::new(AuditEventType::LoginFailed).failed(reason.to_string()));
                return Ok(AuthResult::failure(reason));
            }
        };

        self.login(identity.clone());

        let audience = self.engine.config().audience.clone();
        match self.engine.issue(Some(Subject::Id(identity.id)), audience) {
            Ok(token) => {
                info!(user_id = identity.id, "Login succeeded");
                self.audit(
                    AuditEvent::new(AuditEventType::LoginSucceeded).with_user(identity.id.to_string()),
                );
                Ok(AuthResult::success(AuthInfo::Token(token)))
            }
            Err(e @ TokenError::UnknownAlgorithm { .. }) => Err(e.into()),
            Err(e) => {
                warn!(user_id = identity.id, error = %e, "Token creation failed");
                let reason = AuthError::TokenCreation(e.to_string());
                self.audit(
                    AuditEvent::new(AuditEventType::LoginFailed)
                        .with_user(identity.id.to_string())
                        .failed(reason.to_string()),
                );
                Ok(AuthResult::failure(reason))
            }
        }
    }

    /// Authenticate from an `Authorization` header value.
    pub fn check(&mut self, authorization: &str) -> Result<AuthResult, AuthError> {
        let token = bearer_token(authorization);
        if token.is_empty() {
            return Ok(self.reject(AuthError::MissingToken, None));
        }

        let parsed = match self.engine.load(token) {
            Ok(parsed) => parsed,
            Err(e @ TokenError::UnknownAlgorithm { .. }) => return Err(e.into()),
            Err(e) => return Ok(self.reject(AuthError::from(e), None)),
        };

        let Some(subject) = parsed.claims.sub else {
            return Ok(self.reject(AuthError::InvalidUser, None));
        };
        if let Err(reason) = self.login_by_id(&subject) {
            return Ok(self.reject(reason, Some(subject.to_string())));
        }

        let identity = self.user.clone().ok_or(AuthError::InvalidUser)?;
        debug!(user_id = identity.id, "Token accepted");
        self.audit(AuditEvent::new(AuditEventType::TokenAccepted).with_user(identity.id.to_string()));
        Ok(AuthResult::success(AuthInfo::Identity(identity)))
    }

    fn reject(&mut self, reason: AuthError, subject: Option<String>) -> AuthResult {
        debug!(reason = %reason, "Token rejected");
        let mut event = AuditEvent::new(AuditEventType::TokenRejected).failed(reason.to_string());
        event.user_id = subject;
        self.audit(event);
        AuthResult::failure(reason)
    }

    /// True when an identity is set, otherwise checks the request's header.
    pub fn logged_in(&mut self) -> Result<bool, AuthError> {
        if self.user.is_some() {
            return Ok(true);
        }
        let header = self.request.authorization.clone().unwrap_or_default();
        Ok(self.check(&header)?.is_ok())
    }

    pub fn login(&mut self, identity: Identity) {
        self.user = Some(identity);
    }

    pub fn login_by_id(&mut self, id: &Subject) -> Result<(), AuthError> {
        let identity = self.store.find_by_id(id).ok_or(AuthError::InvalidUser)?;
        self.login(identity);
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Some(identity) = self.user.take() {
            self.audit(AuditEvent::new(AuditEventType::Logout).with_user(identity.id.to_string()));
        }
    }

    pub fn user(&self) -> Option<&Identity> {
        self.user.as_ref()
    }

    /// Stamp `last_active` on the logged-in identity and persist it.
    pub fn record_active_date(&mut self) -> Result<(), AuthError> {
        let now = self.engine.clock().now();
        let user = self
            .user
            .as_mut()
            .ok_or(AuthError::Precondition("record_active_date"))?;

        user.last_active = Some(DateTime::<Utc>::from_timestamp(now, 0).unwrap_or_else(Utc::now));
        self.store
            .update_active_date(user)
            .map_err(|e| AuthError::InternalError(e.to_string()))
    }

    /// The token engine context of this request.
    pub fn engine(&mut self) -> &mut TokenEngine {
        &mut self.engine
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    fn audit(&self, event: AuditEvent) {
        let event = event
            .with_ip(self.request.ip.clone())
            .with_user_agent(self.request.user_agent.clone());
        self.audit.record(&event);
    }
}

/// Strip an optional `Bearer` prefix and surrounding whitespace.
pub fn bearer_token(header: &str) -> &str {
    let header = header.trim();
    header.strip_prefix("Bearer").unwrap_or(header).trim()
}
