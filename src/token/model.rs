// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token types shared by both codecs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::claims::ClaimsSet;
use crate::jose::JoseHeader;

/// The two token disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// JWS compact: `header.payload.signature`.
    #[default]
    Signed,
    /// JWE compact: `header.encryptedKey.iv.ciphertext.tag`.
    Encrypted,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Signed => "signed",
            TokenType::Encrypted => "encrypted",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signed" | "jws" => Ok(TokenType::Signed),
            "encrypted" | "jwe" => Ok(TokenType::Encrypted),
            other => Err(format!("unknown token type `{other}`")),
        }
    }
}

/// A built or loaded JWS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    pub(crate) header: JoseHeader,
    pub(crate) payload: Vec<u8>,
    pub(crate) signature: Vec<u8>,
    pub(crate) compact: String,
}

impl SignedToken {
    pub fn header(&self) -> &JoseHeader {
        &self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

/// A built or loaded JWE. The plaintext is never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedToken {
    pub(crate) header: JoseHeader,
    pub(crate) encrypted_key: Vec<u8>,
    pub(crate) iv: Vec<u8>,
    pub(crate) ciphertext: Vec<u8>,
    pub(crate) tag: Vec<u8>,
    pub(crate) compact: String,
}

impl EncryptedToken {
    pub fn header(&self) -> &JoseHeader {
        &self.header
    }

    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }
}

/// An immutable token.
///
/// The compact form is kept verbatim, so serializing a loaded token gives
/// back exactly the string it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Signed(SignedToken),
    Encrypted(EncryptedToken),
}

impl Token {
    pub fn token_type(&self) -> TokenType {
        match self {
            Token::Signed(_) => TokenType::Signed,
            Token::Encrypted(_) => TokenType::Encrypted,
        }
    }

    pub fn header(&self) -> &JoseHeader {
        match self {
            Token::Signed(t) => &t.header,
            Token::Encrypted(t) => &t.header,
        }
    }

    /// Compact serialization.
    pub fn compact(&self) -> &str {
        match self {
            Token::Signed(t) => &t.compact,
            Token::Encrypted(t) => &t.compact,
        }
    }

    pub fn into_compact(self) -> String {
        match self {
            Token::Signed(t) => t.compact,
            Token::Encrypted(t) => t.compact,
        }
    }
}

/// Result of a successful `load`: the verified token and its validated claims.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToken {
    pub token: Token,
    pub claims: ClaimsSet,
}

impl ParsedToken {
    pub fn header(&self) -> &JoseHeader {
        self.token.header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_type_parses_aliases() {
        assert_eq!("signed".parse::<TokenType>().unwrap(), TokenType::Signed);
        assert_eq!("JWE".parse::<TokenType>().unwrap(), TokenType::Encrypted);
        assert!("opaque".parse::<TokenType>().is_err());
    }

    #[test]
    fn token_type_serde_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&TokenType::Encrypted).unwrap(),
            r#""encrypted""#
        );
    }
}
