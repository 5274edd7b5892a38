// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token engine errors.

use thiserror::Error;

use crate::jose::{AlgorithmFamily, JoseError};

/// A claim check that failed after the token was cryptographically verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    NotYetValid,

    #[error("token was issued in the future")]
    IssuedInFuture,

    #[error("token issuer is invalid")]
    InvalidIssuer,

    #[error("token audience is invalid")]
    InvalidAudience,

    #[error("token is missing the `{0}` claim")]
    MissingClaim(&'static str),
}

/// Errors returned by the codecs and the engine.
///
/// `Invalid` is deliberately opaque: malformed encoding, unsupported header
/// algorithms, bad signatures and failed decryption all map to it.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Algorithm id not registered in its family.
    #[error("unknown {family} algorithm `{id}`")]
    UnknownAlgorithm { family: AlgorithmFamily, id: String },

    /// Building the token failed.
    #[error("token creation failed: {0}")]
    Creation(String),

    /// Structural or cryptographic verification failed.
    #[error("token is invalid")]
    Invalid,

    /// The token verified but its claims were rejected.
    #[error(transparent)]
    Claims(#[from] ClaimError),

    /// `serialize` was called with no token given and none held.
    #[error("no token to serialize")]
    NoTokenToSerialize,

    /// The selected codec does not support the command.
    #[error("`{operation}` is not supported by the {codec} codec")]
    UnknownOperation {
        operation: &'static str,
        codec: &'static str,
    },

    /// Engine configuration is unusable.
    #[error("token configuration error: {0}")]
    Configuration(String),
}

impl TokenError {
    /// Map a primitive failure on the creation path.
    pub(crate) fn creation(err: JoseError) -> Self {
        match err {
            JoseError::UnknownAlgorithm { family, id } => TokenError::UnknownAlgorithm { family, id },
            other => TokenError::Creation(other.to_string()),
        }
    }

    /// Map a primitive failure on the load path.
    pub(crate) fn invalid(err: JoseError) -> Self {
        tracing::debug!(error = %err, "Token verification failed");
        TokenError::Invalid
    }
}

impl From<JoseError> for TokenError {
    /// Registry lookups are the only place a bare `?` is used; anything else
    /// is routed through [`TokenError::creation`] or [`TokenError::invalid`].
    fn from(err: JoseError) -> Self {
        TokenError::creation(err)
    }
}
