// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The contract both codecs implement, and the commands that reconfigure them.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::claims::ClaimsSet;
use super::error::TokenError;
use super::model::{ParsedToken, Token, TokenType};
use crate::jose::Jwk;

/// Operations every token codec supports.
///
/// Codecs hold algorithms and keys only. The token a request last created or
/// loaded is tracked by its [`TokenEngine`](super::TokenEngine) handle.
/// Anything beyond create/load goes through [`TokenCodec::apply`], which
/// rejects commands the codec has no use for.
pub trait TokenCodec: Send + Sync {
    fn token_type(&self) -> TokenType;

    /// Build a token for `claims`.
    fn create(&self, claims: &ClaimsSet) -> Result<Token, TokenError>;

    /// Verify, then parse and validate the claims of a compact token.
    fn load(&self, token: &str) -> Result<ParsedToken, TokenError>;

    fn apply(&self, command: CodecCommand) -> Result<(), TokenError>;
}

/// Reconfiguration commands. Selection is process-wide: it affects every
/// context sharing the codec.
#[derive(Debug, Clone)]
pub enum CodecCommand {
    /// Signed: replace the active signature algorithm.
    SetSignatureAlgorithm(String),
    /// Signed: replace the signing key.
    SetSigningKey(Jwk),
    /// Encrypted: replace the key encryption algorithm.
    SetKeyEncryptionAlgorithm(String),
    /// Encrypted: replace the content encryption algorithm.
    SetContentEncryptionAlgorithm(String),
    /// Encrypted: set or clear the compression method.
    SetCompression(Option<String>),
    /// Encrypted: replace the key of the active recipient.
    SetRecipient(Jwk),
    /// Encrypted: add or replace a named recipient.
    AddRecipient { name: String, key: Jwk },
    /// Encrypted: make a named recipient the active one.
    SelectRecipient(String),
}

impl CodecCommand {
    pub fn name(&self) -> &'static str {
        match self {
            CodecCommand::SetSignatureAlgorithm(_) => "set_signature_algorithm",
            CodecCommand::SetSigningKey(_) => "set_signing_key",
            CodecCommand::SetKeyEncryptionAlgorithm(_) => "set_key_encryption_algorithm",
            CodecCommand::SetContentEncryptionAlgorithm(_) => "set_content_encryption_algorithm",
            CodecCommand::SetCompression(_) => "set_compression",
            CodecCommand::SetRecipient(_) => "set_recipient",
            CodecCommand::AddRecipient { .. } => "add_recipient",
            CodecCommand::SelectRecipient(_) => "select_recipient",
        }
    }

    pub(crate) fn unsupported(&self, codec: TokenType) -> TokenError {
        TokenError::UnknownOperation {
            operation: self.name(),
            codec: codec.as_str(),
        }
    }
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
