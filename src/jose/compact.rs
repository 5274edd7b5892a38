// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Compact serialization helpers: base64url segments joined by dots.

use base64ct::{Base64UrlUnpadded, Encoding};

use super::error::JoseError;

/// Upper bound on a compact token accepted for parsing.
pub const MAX_COMPACT_LEN: usize = 64 * 1024;

/// Encode bytes as unpadded base64url.
pub fn b64_encode(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

/// Decode one unpadded base64url segment.
pub fn b64_decode(segment: &str) -> Result<Vec<u8>, JoseError> {
    Base64UrlUnpadded::decode_vec(segment)
        .map_err(|_| JoseError::Malformed("segment is not valid base64url".to_string()))
}

/// Split a compact token into exactly `N` dot-separated segments.
pub fn split<const N: usize>(token: &str) -> Result<[&str; N], JoseError> {
    if token.len() > MAX_COMPACT_LEN {
        return Err(JoseError::Malformed("token exceeds maximum length".to_string()));
    }

    let parts: Vec<&str> = token.split('.').collect();
    let found = parts.len();
    <[&str; N]>::try_from(parts)
        .map_err(|_| JoseError::Malformed(format!("expected {N} segments, found {found}")))
}
