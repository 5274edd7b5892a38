// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors raised by the JOSE primitives.
//!
//! These never leave the token codecs as-is: creation failures are wrapped in
//! `TokenError::Creation` and every load-side failure collapses into
//! `TokenError::Invalid`.

use thiserror::Error;

use super::registry::AlgorithmFamily;

/// Failure inside a cryptographic primitive or the compact encoding.
#[derive(Debug, Error)]
pub enum JoseError {
    /// Algorithm id is not registered for the requested family.
    #[error("unknown {family} algorithm `{id}`")]
    UnknownAlgorithm { family: AlgorithmFamily, id: String },

    /// Key material is unusable for the algorithm (wrong type, size, curve).
    #[error("invalid key for {alg}: {reason}")]
    InvalidKey { alg: String, reason: String },

    /// A cryptographic operation failed (bad tag, bad signature, unwrap failure).
    #[error("{0}")]
    Crypto(&'static str),

    /// Compact serialization or base64url decoding failed.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// A required header parameter is missing or has the wrong shape.
    #[error("invalid header parameter `{0}`")]
    Header(&'static str),

    /// DEFLATE compression or decompression failed.
    #[error("compression failed: {0}")]
    Compression(String),

    /// JSON encoding of a header or key failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JoseError {
    pub(crate) fn invalid_key(alg: &str, reason: impl Into<String>) -> Self {
        JoseError::InvalidKey {
            alg: alg.to_string(),
            reason: reason.into(),
        }
    }
}
