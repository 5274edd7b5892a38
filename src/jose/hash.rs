// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SHA-2 selection and HMAC helpers shared by the HS*, CBC-HS and PBES2
//! algorithms.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// SHA-2 variant used by an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaVariant {
    Sha256,
    Sha384,
    Sha512,
}

impl ShaVariant {
    /// Digest output size in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            ShaVariant::Sha256 => 32,
            ShaVariant::Sha384 => 48,
            ShaVariant::Sha512 => 64,
        }
    }
}

macro_rules! mac_over {
    ($digest:ty, $key:expr, $parts:expr) => {{
        let mut mac = <Hmac<$digest> as Mac>::new_from_slice($key).ok()?;
        for part in $parts {
            mac.update(part);
        }
        mac
    }};
}

/// HMAC over the concatenation of `parts`. `None` only if the key is
/// rejected by the MAC construction.
pub fn hmac(hash: ShaVariant, key: &[u8], parts: &[&[u8]]) -> Option<Vec<u8>> {
    let tag = match hash {
        ShaVariant::Sha256 => mac_over!(Sha256, key, parts).finalize().into_bytes().to_vec(),
        ShaVariant::Sha384 => mac_over!(Sha384, key, parts).finalize().into_bytes().to_vec(),
        ShaVariant::Sha512 => mac_over!(Sha512, key, parts).finalize().into_bytes().to_vec(),
    };
    Some(tag)
}

/// Constant-time check of `expected` against the HMAC of `parts`.
///
/// `expected` may be a left-truncated tag (CBC-HS uses the first half).
pub fn hmac_verify(hash: ShaVariant, key: &[u8], parts: &[&[u8]], expected: &[u8]) -> bool {
    fn check(hash: ShaVariant, key: &[u8], parts: &[&[u8]], expected: &[u8]) -> Option<bool> {
        let ok = match hash {
            ShaVariant::Sha256 => mac_over!(Sha256, key, parts).verify_truncated_left(expected),
            ShaVariant::Sha384 => mac_over!(Sha384, key, parts).verify_truncated_left(expected),
            ShaVariant::Sha512 => mac_over!(Sha512, key, parts).verify_truncated_left(expected),
        };
        Some(ok.is_ok())
    }

    !expected.is_empty() && check(hash, key, parts, expected).unwrap_or(false)
}

/// Plain SHA-256 over the concatenation of `parts`.
pub fn sha256(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}
