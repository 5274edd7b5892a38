// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted tokens (JWE compact serialization).
//!
//! Tokens are addressed to one recipient at a time: the active recipient
//! (`"main"` unless another one is selected) is used both to encrypt and to
//! decrypt.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::claims::{ClaimsSet, ClaimsValidator};
use super::codec::{read, write, CodecCommand, TokenCodec};
use super::error::TokenError;
use super::model::{EncryptedToken, ParsedToken, Token, TokenType};
use crate::jose::compact::{b64_decode, b64_encode, split};
use crate::jose::{
    AlgorithmRegistry, CompressionMethod, ContentEncryptionAlgorithm, JoseHeader, Jwk,
    KeyEncryptionAlgorithm,
};

/// Name of the recipient used unless another is selected.
pub const DEFAULT_RECIPIENT: &str = "main";

struct EncryptedState {
    kea: Arc<dyn KeyEncryptionAlgorithm>,
    cea: Arc<dyn ContentEncryptionAlgorithm>,
    zip: Option<Arc<dyn CompressionMethod>>,
    recipients: BTreeMap<String, Jwk>,
    active: String,
}

struct Snapshot {
    kea: Arc<dyn KeyEncryptionAlgorithm>,
    cea: Arc<dyn ContentEncryptionAlgorithm>,
    zip: Option<Arc<dyn CompressionMethod>>,
    key: Option<Jwk>,
    recipient: String,
}

/// JWE codec: key management + content encryption + optional compression.
pub struct EncryptedTokenCodec {
    registry: Arc<AlgorithmRegistry>,
    validator: ClaimsValidator,
    state: RwLock<EncryptedState>,
}

impl EncryptedTokenCodec {
    pub fn new(
        registry: Arc<AlgorithmRegistry>,
        kea: &str,
        cea: &str,
        zip: Option<&str>,
        recipients: BTreeMap<String, Jwk>,
        validator: ClaimsValidator,
    ) -> Result<Self, TokenError> {
        let kea = registry.key_encryption(kea)?;
        let cea = registry.content_encryption(cea)?;
        let zip = zip.map(|id| registry.compression(id)).transpose()?;
        Ok(Self {
            registry,
            validator,
            state: RwLock::new(EncryptedState {
                kea,
                cea,
                zip,
                recipients,
                active: DEFAULT_RECIPIENT.to_string(),
            }),
        })
    }

    /// `(alg, enc, zip)` currently in use.
    pub fn algorithms(&self) -> (String, String, Option<String>) {
        let state = read(&self.state);
        (
            state.kea.id().to_string(),
            state.cea.id().to_string(),
            state.zip.as_ref().map(|z| z.id().to_string()),
        )
    }

    pub fn set_key_encryption_algorithm(&self, id: &str) -> Result<(), TokenError> {
        let kea = self.registry.key_encryption(id)?;
        write(&self.state).kea = kea;
        Ok(())
    }

    pub fn set_content_encryption_algorithm(&self, id: &str) -> Result<(), TokenError> {
        let cea = self.registry.content_encryption(id)?;
        write(&self.state).cea = cea;
        Ok(())
    }

    pub fn set_compression(&self, id: Option<&str>) -> Result<(), TokenError> {
        let zip = id.map(|id| self.registry.compression(id)).transpose()?;
        write(&self.state).zip = zip;
        Ok(())
    }

    /// Replace the key of the active recipient.
    pub fn set_recipient(&self, key: Jwk) {
        let mut state = write(&self.state);
        let active = state.active.clone();
        state.recipients.insert(active, key);
    }

    pub fn add_recipient(&self, name: impl Into<String>, key: Jwk) {
        write(&self.state).recipients.insert(name.into(), key);
    }

    pub fn select_recipient(&self, name: &str) -> Result<(), TokenError> {
        let mut state = write(&self.state);
        if !state.recipients.contains_key(name) {
            return Err(TokenError::Configuration(format!("no recipient named `{name}`")));
        }
        state.active = name.to_string();
        Ok(())
    }

    /// Name of the active recipient.
    pub fn recipient(&self) -> String {
        read(&self.state).active.clone()
    }

    fn snapshot(&self) -> Snapshot {
        let state = read(&self.state);
        Snapshot {
            kea: state.kea.clone(),
            cea: state.cea.clone(),
            zip: state.zip.clone(),
            key: state.recipients.get(&state.active).cloned(),
            recipient: state.active.clone(),
        }
    }

    /// Compression method named by an inbound `zip` header.
    fn inbound_compression(
        &self,
        header: &JoseHeader,
        active: Option<&Arc<dyn CompressionMethod>>,
    ) -> Result<Option<Arc<dyn CompressionMethod>>, TokenError> {
        match (header.zip.as_deref(), active) {
            (None, _) => Ok(None),
            (Some(id), Some(active)) if id == active.id() => Ok(Some(active.clone())),
            (Some(id), _) => self
                .registry
                .compression(id)
                .map(Some)
                .map_err(TokenError::invalid),
        }
    }
}

impl TokenCodec for EncryptedTokenCodec {
    fn token_type(&self) -> TokenType {
        TokenType::Encrypted
    }

    fn create(&self, claims: &ClaimsSet) -> Result<Token, TokenError> {
        let snapshot = self.snapshot();
        let key = snapshot.key.ok_or_else(|| {
            TokenError::Creation(format!("no key for recipient `{}`", snapshot.recipient))
        })?;
        let payload = claims.to_payload()?;

        let mut header = JoseHeader::encrypted(
            snapshot.kea.id(),
            snapshot.cea.id(),
            snapshot.zip.as_ref().map(|z| z.id()),
        );
        let wrapped = snapshot
            .kea
            .wrap(&key, snapshot.cea.as_ref(), &mut header)
            .map_err(TokenError::creation)?;
        let encoded_header = header.encode().map_err(TokenError::creation)?;

        let plaintext = match &snapshot.zip {
            Some(zip) => zip.compress(&payload).map_err(TokenError::creation)?,
            None => payload,
        };
        let iv = snapshot.cea.generate_iv();
        let (ciphertext, tag) = snapshot
            .cea
            .encrypt(&wrapped.cek, &iv, encoded_header.as_bytes(), &plaintext)
            .map_err(TokenError::creation)?;

        let compact = format!(
            "{encoded_header}.{}.{}.{}.{}",
            b64_encode(&wrapped.encrypted_key),
            b64_encode(&iv),
            b64_encode(&ciphertext),
            b64_encode(&tag),
        );

        debug!(
            alg = snapshot.kea.id(),
            enc = snapshot.cea.id(),
            recipient = %snapshot.recipient,
            "Encrypted token created"
        );
        Ok(Token::Encrypted(EncryptedToken {
            header,
            encrypted_key: wrapped.encrypted_key,
            iv,
            ciphertext,
            tag,
            compact,
        }))
    }

    fn load(&self, token: &str) -> Result<ParsedToken, TokenError> {
        let snapshot = self.snapshot();
        let Some(key) = snapshot.key else {
            debug!(recipient = %snapshot.recipient, "No key for active recipient");
            return Err(TokenError::Invalid);
        };

        let [encoded_header, encoded_key, encoded_iv, encoded_ciphertext, encoded_tag] =
            split::<5>(token).map_err(TokenError::invalid)?;
        let header = JoseHeader::decode(encoded_header).map_err(TokenError::invalid)?;
        if header.alg != snapshot.kea.id() || header.enc.as_deref() != Some(snapshot.cea.id()) {
            debug!(
                alg = %header.alg,
                enc = ?header.enc,
                "Rejected token algorithms"
            );
            return Err(TokenError::Invalid);
        }
        let zip = self.inbound_compression(&header, snapshot.zip.as_ref())?;

        let encrypted_key = b64_decode(encoded_key).map_err(TokenError::invalid)?;
        let iv = b64_decode(encoded_iv).map_err(TokenError::invalid)?;
        let ciphertext = b64_decode(encoded_ciphertext).map_err(TokenError::invalid)?;
        let tag = b64_decode(encoded_tag).map_err(TokenError::invalid)?;

        let cek = snapshot
            .kea
            .unwrap(&key, snapshot.cea.as_ref(), &header, &encrypted_key)
            .map_err(TokenError::invalid)?;
        let plaintext = snapshot
            .cea
            .decrypt(&cek, &iv, encoded_header.as_bytes(), &ciphertext, &tag)
            .map_err(TokenError::invalid)?;
        let payload = match zip {
            Some(zip) => zip.decompress(&plaintext).map_err(TokenError::invalid)?,
            None => plaintext,
        };

        // Claims are only looked at once the content authenticated.
        let claims = ClaimsSet::from_payload(&payload)?;
        self.validator.validate(&claims)?;

        let token = Token::Encrypted(EncryptedToken {
            header,
            encrypted_key,
            iv,
            ciphertext,
            tag,
            compact: token.to_string(),
        });
        Ok(ParsedToken { token, claims })
    }

    fn apply(&self, command: CodecCommand) -> Result<(), TokenError> {
        match command {
            CodecCommand::SetKeyEncryptionAlgorithm(id) => self.set_key_encryption_algorithm(&id),
            CodecCommand::SetContentEncryptionAlgorithm(id) => {
                self.set_content_encryption_algorithm(&id)
            }
            CodecCommand::SetCompression(id) => self.set_compression(id.as_deref()),
            CodecCommand::SetRecipient(key) => {
                self.set_recipient(key);
                Ok(())
            }
            CodecCommand::AddRecipient { name, key } => {
                self.add_recipient(name, key);
                Ok(())
            }
            CodecCommand::SelectRecipient(name) => self.select_recipient(&name),
            other => Err(other.unsupported(TokenType::Encrypted)),
        }
    }
}
