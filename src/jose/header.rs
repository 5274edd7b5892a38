// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Protected JOSE header.

use serde::{Deserialize, Serialize};

use super::compact::{b64_decode, b64_encode};
use super::error::JoseError;
use super::jwk::Jwk;

/// Media type written into signed token headers.
pub const JWT_TYPE: &str = "JWT";

/// The protected header shared by both token formats.
///
/// Signed tokens use `alg` and `typ`. Encrypted tokens use `alg`, `enc` and
/// `zip` plus whatever key-management parameters the key encryption
/// algorithm produced (`epk`, `iv`, `tag`, `p2s`, `p2c`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoseHeader {
    pub alg: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Ephemeral public key (ECDH-ES).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<Jwk>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apu: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apv: Option<String>,

    /// Key-wrap IV (AES-GCM key wrapping).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,

    /// Key-wrap authentication tag (AES-GCM key wrapping).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// PBES2 salt input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2s: Option<String>,

    /// PBES2 iteration count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2c: Option<u32>,
}

impl JoseHeader {
    /// Header for a signed token.
    pub fn signed(alg: &str) -> Self {
        Self {
            alg: alg.to_string(),
            typ: Some(JWT_TYPE.to_string()),
            ..Default::default()
        }
    }

    /// Shared protected header for an encrypted token.
    pub fn encrypted(alg: &str, enc: &str, zip: Option<&str>) -> Self {
        Self {
            alg: alg.to_string(),
            enc: Some(enc.to_string()),
            zip: zip.map(str::to_string),
            ..Default::default()
        }
    }

    /// Base64url of the JSON encoding; this string is the integrity input.
    pub fn encode(&self) -> Result<String, JoseError> {
        Ok(b64_encode(&serde_json::to_vec(self)?))
    }

    /// Decode a base64url header segment.
    pub fn decode(segment: &str) -> Result<Self, JoseError> {
        let bytes = b64_decode(segment)?;
        serde_json::from_slice(&bytes)
            .map_err(|_| JoseError::Malformed("header is not a JOSE header object".to_string()))
    }

    /// Decoded value of a base64url header parameter.
    pub(crate) fn binary_param(
        value: Option<&String>,
        name: &'static str,
    ) -> Result<Vec<u8>, JoseError> {
        let value = value.ok_or(JoseError::Header(name))?;
        b64_decode(value).map_err(|_| JoseError::Header(name))
    }
}
