// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use super::credentials::CredentialFailure;
use crate::token::{ClaimError, TokenError};

/// Authentication error type.
///
/// Used both as the `reason` of a failed [`AuthResult`](super::AuthResult)
/// and as the rejection of the axum extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No token in the authorization header
    MissingToken,
    /// Token failed structural or cryptographic verification
    InvalidToken,
    /// Token has expired
    TokenExpired,
    /// Token is not yet valid
    TokenNotYetValid,
    /// Token `iat` lies in the future
    TokenIssuedInFuture,
    /// Token issuer is invalid
    InvalidIssuer,
    /// Token audience is invalid
    InvalidAudience,
    /// A required claim is absent
    MissingClaim(&'static str),
    /// Token subject does not resolve to a known identity
    InvalidUser,
    /// Credentials incomplete or unknown user
    BadAttempt,
    /// Password does not match
    InvalidPassword,
    /// Username already registered
    UsernameTaken,
    /// Token could not be built
    TokenCreation(String),
    /// Operation requires a logged-in identity
    Precondition(&'static str),
    /// Algorithm or key configuration is unusable
    Misconfigured(String),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::TokenIssuedInFuture => "token_issued_in_future",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::MissingClaim(_) => "missing_claim",
            AuthError::InvalidUser => "invalid_user",
            AuthError::BadAttempt => "bad_attempt",
            AuthError::InvalidPassword => "invalid_password",
            AuthError::UsernameTaken => "username_taken",
            AuthError::TokenCreation(_) => "token_creation_failed",
            AuthError::Precondition(_) => "precondition_failed",
            AuthError::Misconfigured(_) => "misconfigured",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::TokenNotYetValid
            | AuthError::TokenIssuedInFuture
            | AuthError::InvalidIssuer
            | AuthError::InvalidAudience
            | AuthError::MissingClaim(_)
            | AuthError::InvalidUser
            | AuthError::BadAttempt
            | AuthError::InvalidPassword => StatusCode::UNAUTHORIZED,
            AuthError::UsernameTaken => StatusCode::CONFLICT,
            AuthError::TokenCreation(_)
            | AuthError::Precondition(_)
            | AuthError::Misconfigured(_)
            | AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "missing token"),
            AuthError::InvalidToken => write!(f, "invalid token"),
            AuthError::TokenExpired => write!(f, "token has expired"),
            AuthError::TokenNotYetValid => write!(f, "token is not yet valid"),
            AuthError::TokenIssuedInFuture => write!(f, "token was issued in the future"),
            AuthError::InvalidIssuer => write!(f, "token issuer is invalid"),
            AuthError::InvalidAudience => write!(f, "token audience is invalid"),
            AuthError::MissingClaim(name) => write!(f, "token is missing the `{name}` claim"),
            AuthError::InvalidUser => write!(f, "invalid user"),
            AuthError::BadAttempt => write!(f, "bad attempt"),
            AuthError::InvalidPassword => write!(f, "invalid password"),
            AuthError::UsernameTaken => write!(f, "username is already taken"),
            AuthError::TokenCreation(msg) => write!(f, "{msg}"),
            AuthError::Precondition(operation) => {
                write!(f, "{operation} requires a logged in user")
            }
            AuthError::Misconfigured(msg) => write!(f, "authentication is misconfigured: {msg}"),
            AuthError::InternalError(msg) => write!(f, "internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<ClaimError> for AuthError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::Expired => AuthError::TokenExpired,
            ClaimError::NotYetValid => AuthError::TokenNotYetValid,
            ClaimError::IssuedInFuture => AuthError::TokenIssuedInFuture,
            ClaimError::InvalidIssuer => AuthError::InvalidIssuer,
            ClaimError::InvalidAudience => AuthError::InvalidAudience,
            ClaimError::MissingClaim(name) => AuthError::MissingClaim(name),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Claims(claim) => claim.into(),
            TokenError::Creation(msg) => AuthError::TokenCreation(msg),
            TokenError::NoTokenToSerialize => AuthError::InternalError(err.to_string()),
            TokenError::UnknownAlgorithm { .. }
            | TokenError::UnknownOperation { .. }
            | TokenError::Configuration(_) => AuthError::Misconfigured(err.to_string()),
        }
    }
}

impl From<CredentialFailure> for AuthError {
    fn from(failure: CredentialFailure) -> Self {
        match failure {
            CredentialFailure::BadAttempt => AuthError::BadAttempt,
            CredentialFailure::InvalidPassword => AuthError::InvalidPassword,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(error = %self, "Authentication failed on the server side");
        }
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_token_returns_401() {
        let response = AuthError::MissingToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "missing token");
        assert_eq!(body["error_code"], "missing_token");
    }

    #[tokio::test]
    async fn username_taken_returns_409() {
        let response = AuthError::UsernameTaken.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn claim_failures_keep_their_reason() {
        assert_eq!(AuthError::from(TokenError::Claims(ClaimError::Expired)).to_string(), "token has expired");
        assert_eq!(AuthError::from(TokenError::Invalid).to_string(), "invalid token");
    }

    #[test]
    fn unknown_algorithm_is_misconfiguration() {
        let err = AuthError::from(TokenError::UnknownAlgorithm {
            family: crate::jose::AlgorithmFamily::Dsa,
            id: "A256KW".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
