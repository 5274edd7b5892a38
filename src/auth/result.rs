// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use super::error::AuthError;
use super::identity::Identity;

/// Payload of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthInfo {
    /// Token issued by `attempt`.
    Token(String),
    /// Identity resolved by `check`.
    Identity(Identity),
}

/// Outcome of `attempt` or `check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    success: bool,
    reason: Option<AuthError>,
    extra_info: Option<AuthInfo>,
}

impl AuthResult {
    pub fn success(info: AuthInfo) -> Self {
        Self {
            success: true,
            reason: None,
            extra_info: Some(info),
        }
    }

    pub fn failure(reason: AuthError) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            extra_info: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.success
    }

    pub fn reason(&self) -> Option<&AuthError> {
        self.reason.as_ref()
    }

    pub fn extra_info(&self) -> Option<&AuthInfo> {
        self.extra_info.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        match &self.extra_info {
            Some(AuthInfo::Token(token)) => Some(token),
            _ => None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.extra_info {
            Some(AuthInfo::Identity(identity)) => Some(identity),
            _ => None,
        }
    }

    /// `Ok(info)` on success, `Err(reason)` otherwise.
    pub fn into_result(self) -> Result<AuthInfo, AuthError> {
        match (self.extra_info, self.reason) {
            (Some(info), None) if self.success => Ok(info),
            (_, Some(reason)) => Err(reason),
            _ => Err(AuthError::InternalError("empty authentication result".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_reason() {
        let result = AuthResult::failure(AuthError::MissingToken);
        assert!(!result.is_ok());
        assert_eq!(result.reason().map(ToString::to_string).as_deref(), Some("missing token"));
        assert_eq!(result.into_result(), Err(AuthError::MissingToken));
    }

    #[test]
    fn success_exposes_token() {
        let result = AuthResult::success(AuthInfo::Token("a.b.c".into()));
        assert!(result.is_ok());
        assert_eq!(result.token(), Some("a.b.c"));
        assert!(result.identity().is_none());
    }
}
