// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token engine: picks a codec per token type and forwards to it.
//!
//! Codecs are built lazily on first use and cached for the lifetime of the
//! engine, so algorithm and key changes made through [`TokenEngine::apply`]
//! are visible to every clone. The *selection* of a token type and the last
//! token created or loaded belong to the engine handle: each request context
//! gets its own through [`TokenEngine::context`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::claims::{ClaimsBuilder, ClaimsSet, ClaimsValidator, Clock, Subject, SystemClock};
use super::codec::{read, write, CodecCommand, TokenCodec};
use super::encrypted::EncryptedTokenCodec;
use super::error::TokenError;
use super::model::{ParsedToken, Token, TokenType};
use super::signed::SignedTokenCodec;
use crate::config::TokenConfig;
use crate::jose::AlgorithmRegistry;

/// One of the two codecs.
#[derive(Clone)]
pub enum Codec {
    Signed(Arc<SignedTokenCodec>),
    Encrypted(Arc<EncryptedTokenCodec>),
}

impl Codec {
    fn inner(&self) -> &dyn TokenCodec {
        match self {
            Codec::Signed(codec) => codec.as_ref(),
            Codec::Encrypted(codec) => codec.as_ref(),
        }
    }

    pub fn token_type(&self) -> TokenType {
        self.inner().token_type()
    }

    pub fn create(&self, claims: &ClaimsSet) -> Result<Token, TokenError> {
        self.inner().create(claims)
    }

    pub fn load(&self, token: &str) -> Result<ParsedToken, TokenError> {
        self.inner().load(token)
    }

    pub fn apply(&self, command: CodecCommand) -> Result<(), TokenError> {
        self.inner().apply(command)
    }
}

struct EngineInner {
    config: TokenConfig,
    registry: Arc<AlgorithmRegistry>,
    clock: Arc<dyn Clock>,
    codecs: RwLock<HashMap<TokenType, Codec>>,
}

/// Shared entry point for creating and loading tokens.
#[derive(Clone)]
pub struct TokenEngine {
    inner: Arc<EngineInner>,
    selected: Option<TokenType>,
    last: HashMap<TokenType, Token>,
}

impl TokenEngine {
    /// Engine on the wall clock with a registry built from `config`.
    pub fn new(config: TokenConfig) -> Self {
        let registry = Arc::new(config.registry());
        Self::with_parts(config, registry, Arc::new(SystemClock))
    }

    pub fn with_parts(
        config: TokenConfig,
        registry: Arc<AlgorithmRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                registry,
                clock,
                codecs: RwLock::new(HashMap::new()),
            }),
            selected: None,
            last: HashMap::new(),
        }
    }

    /// A handle sharing codecs with `self`, with no type selected and no
    /// token yet.
    pub fn context(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            selected: None,
            last: HashMap::new(),
        }
    }

    /// Type used when no explicit choice is given.
    pub fn selected(&self) -> TokenType {
        self.selected.unwrap_or(self.inner.config.token_type)
    }

    /// Codec for `token_type`, or for the current selection when `None`.
    ///
    /// An explicit type becomes the new selection.
    pub fn service(&mut self, token_type: Option<TokenType>) -> Result<Codec, TokenError> {
        if let Some(token_type) = token_type {
            self.selected = Some(token_type);
        }
        self.codec(self.selected())
    }

    fn codec(&self, token_type: TokenType) -> Result<Codec, TokenError> {
        if let Some(codec) = read(&self.inner.codecs).get(&token_type) {
            return Ok(codec.clone());
        }

        let mut codecs = write(&self.inner.codecs);
        if let Some(codec) = codecs.get(&token_type) {
            return Ok(codec.clone());
        }
        let codec = self.build(token_type)?;
        debug!(token_type = %token_type, "Token codec initialized");
        codecs.insert(token_type, codec.clone());
        Ok(codec)
    }

    fn build(&self, token_type: TokenType) -> Result<Codec, TokenError> {
        let config = &self.inner.config;
        let registry = Arc::clone(&self.inner.registry);
        let validator = self.validator();

        Ok(match token_type {
            TokenType::Signed => Codec::Signed(Arc::new(SignedTokenCodec::new(
                registry,
                &config.dsa,
                config.signing_key.clone(),
                validator,
            )?)),
            TokenType::Encrypted => Codec::Encrypted(Arc::new(EncryptedTokenCodec::new(
                registry,
                &config.kea,
                &config.cea,
                config.compression.as_deref(),
                config.recipients.clone(),
                validator,
            )?)),
        })
    }

    fn validator(&self) -> ClaimsValidator {
        let config = &self.inner.config;
        ClaimsValidator::new(config.issuer.clone(), Arc::clone(&self.inner.clock))
            .with_audience(config.audience.clone())
            .with_leeway(config.leeway)
    }

    /// Builder preloaded with the configured issuer and clock.
    pub fn claims_builder(&self) -> ClaimsBuilder {
        ClaimsBuilder::new(self.inner.config.issuer.clone(), Arc::clone(&self.inner.clock))
    }

    pub fn create(&mut self, claims: &ClaimsSet) -> Result<String, TokenError> {
        let codec = self.service(None)?;
        let token = codec.create(claims)?;
        let compact = token.compact().to_string();
        self.last.insert(codec.token_type(), token);
        Ok(compact)
    }

    pub fn load(&mut self, token: &str) -> Result<ParsedToken, TokenError> {
        let codec = self.service(None)?;
        let parsed = codec.load(token)?;
        self.last.insert(codec.token_type(), parsed.token.clone());
        Ok(parsed)
    }

    /// Compact form of `token`, or of this handle's last token of the
    /// selected type.
    pub fn serialize(&self, token: Option<&Token>) -> Result<String, TokenError> {
        token
            .or_else(|| self.last_token())
            .map(|token| token.compact().to_string())
            .ok_or(TokenError::NoTokenToSerialize)
    }

    pub fn apply(&mut self, command: CodecCommand) -> Result<(), TokenError> {
        self.service(None)?.apply(command)
    }

    /// Last token of the selected type this handle created or loaded.
    pub fn last_token(&self) -> Option<&Token> {
        self.last.get(&self.selected())
    }

    pub fn produced(&self) -> bool {
        self.last_token().is_some()
    }

    /// Build the standard claims for `subject` and create a token.
    pub fn issue(
        &mut self,
        subject: Option<Subject>,
        audience: Option<String>,
    ) -> Result<String, TokenError> {
        let claims = self
            .claims_builder()
            .build(subject, audience, self.inner.config.lifetime);
        self.create(&claims)
    }

    pub fn registry(&self) -> &Arc<AlgorithmRegistry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &TokenConfig {
        &self.inner.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }
}
