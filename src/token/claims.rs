// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claims set, clock and the builder/validator pair.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ClaimError, TokenError};

/// Registered claim names that callers cannot override.
pub const RESERVED_CLAIMS: [&str; 6] = ["iss", "iat", "nbf", "exp", "sub", "aud"];

const REQUIRED_CLAIMS: [&str; 4] = ["iss", "iat", "nbf", "exp"];

/// Token subject: a numeric identity id or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Id(u64),
    Name(String),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Id(id) => write!(f, "{id}"),
            Subject::Name(name) => write!(f, "{name}"),
        }
    }
}

impl From<u64> for Subject {
    fn from(id: u64) -> Self {
        Subject::Id(id)
    }
}

impl From<&str> for Subject {
    fn from(name: &str) -> Self {
        Subject::Name(name.to_string())
    }
}

impl From<String> for Subject {
    fn from(name: String) -> Self {
        Subject::Name(name)
    }
}

/// The token payload.
///
/// `sub` and `aud` are omitted from the JSON when absent, never `null`.
/// Unknown claims are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimsSet {
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<Subject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClaimsSet {
    /// JSON payload bytes.
    pub fn to_payload(&self) -> Result<Vec<u8>, TokenError> {
        serde_json::to_vec(self).map_err(|e| TokenError::Creation(e.to_string()))
    }

    /// Parse a verified payload.
    ///
    /// A payload that is not a JSON object is structurally invalid; a missing
    /// registered claim is a claim failure.
    pub fn from_payload(payload: &[u8]) -> Result<Self, TokenError> {
        let object: Map<String, Value> =
            serde_json::from_slice(payload).map_err(|_| TokenError::Invalid)?;
        if let Some(missing) = REQUIRED_CLAIMS
            .into_iter()
            .find(|name| !object.contains_key(*name))
        {
            return Err(ClaimError::MissingClaim(missing).into());
        }
        serde_json::from_value(Value::Object(object)).map_err(|_| TokenError::Invalid)
    }
}

/// Source of "now" in seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Builds the standard claim set for a new token.
#[derive(Clone)]
pub struct ClaimsBuilder {
    issuer: String,
    clock: Arc<dyn Clock>,
    extra: Map<String, Value>,
}

impl ClaimsBuilder {
    pub fn new(issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer: issuer.into(),
            clock,
            extra: Map::new(),
        }
    }

    /// Add a private claim. Registered claim names are ignored.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if RESERVED_CLAIMS.contains(&name.as_str()) {
            tracing::debug!(claim = %name, "Ignoring attempt to override a registered claim");
        } else {
            self.extra.insert(name, value.into());
        }
        self
    }

    /// `iat = nbf = now`, `exp = now + lifetime`.
    pub fn build(
        &self,
        subject: Option<Subject>,
        audience: Option<String>,
        lifetime: u64,
    ) -> ClaimsSet {
        let now = self.clock.now();
        let lifetime = i64::try_from(lifetime).unwrap_or(i64::MAX);
        ClaimsSet {
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(lifetime),
            sub: subject,
            aud: audience,
            extra: self.extra.clone(),
        }
    }
}

/// Time and issuer checks applied to every verified payload.
#[derive(Clone)]
pub struct ClaimsValidator {
    issuer: String,
    audience: Option<String>,
    leeway: i64,
    clock: Arc<dyn Clock>,
}

impl ClaimsValidator {
    pub fn new(issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: None,
            leeway: 0,
            clock,
        }
    }

    /// Require `aud` to equal `audience`.
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    /// Clock skew tolerance in seconds.
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = i64::try_from(leeway).unwrap_or(i64::MAX);
        self
    }

    /// Checks, in order: issuer, `iat`, `nbf`, `exp`, audience.
    pub fn validate(&self, claims: &ClaimsSet) -> Result<(), ClaimError> {
        let now = self.clock.now();

        if claims.iss != self.issuer {
            return Err(ClaimError::InvalidIssuer);
        }
        if claims.iat > now.saturating_add(self.leeway) {
            return Err(ClaimError::IssuedInFuture);
        }
        if claims.nbf > now.saturating_add(self.leeway) {
            return Err(ClaimError::NotYetValid);
        }
        if now >= claims.exp.saturating_add(self.leeway) {
            return Err(ClaimError::Expired);
        }
        if let Some(expected) = &self.audience {
            if claims.aud.as_deref() != Some(expected.as_str()) {
                return Err(ClaimError::InvalidAudience);
            }
        }
        Ok(())
    }
}
