// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Algorithm registry.
//!
//! Maps `(family, id)` to a factory producing the concrete algorithm. Built
//! once at startup and shared behind an `Arc`; later registrations are
//! allowed but take a write lock.
//!
//! Lookups never fall back across families: `A256KW` is a key encryption
//! algorithm and resolving it as a signature algorithm fails.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::cea::{AesCbcHmacContent, AesGcmContent, ContentEncryptionAlgorithm};
use super::dsa::{
    EcdsaSignature, EdDsaSignature, HmacSignature, NoSignature, RsaPadding, RsaSignature,
    SignatureAlgorithm,
};
use super::error::JoseError;
use super::hash::ShaVariant;
use super::jwk::EcCurve;
use super::kea::{
    AesGcmKeyWrap, AesKeyWrap, DirectKey, EcdhEs, KeyEncryptionAlgorithm, Pbes2, RsaKeyEncryption,
    RsaScheme,
};
use super::zip::{CompressionMethod, Deflate};

/// Default PBES2 salt input size in bytes.
pub const DEFAULT_PBES2_SALT_SIZE: usize = 64;

/// Default PBES2 iteration count.
pub const DEFAULT_PBES2_ITERATIONS: u32 = 4096;

/// The four algorithm families a token can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmFamily {
    /// Digital signature (JWS `alg`).
    Dsa,
    /// Key encryption (JWE `alg`).
    Kea,
    /// Content encryption (JWE `enc`).
    Cea,
    /// Compression (JWE `zip`).
    Compression,
}

impl fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmFamily::Dsa => write!(f, "signature"),
            AlgorithmFamily::Kea => write!(f, "key encryption"),
            AlgorithmFamily::Cea => write!(f, "content encryption"),
            AlgorithmFamily::Compression => write!(f, "compression"),
        }
    }
}

type Factory<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

/// Factory for one algorithm; the variant fixes the family.
#[derive(Clone)]
pub enum AlgorithmFactory {
    Dsa(Factory<dyn SignatureAlgorithm>),
    Kea(Factory<dyn KeyEncryptionAlgorithm>),
    Cea(Factory<dyn ContentEncryptionAlgorithm>),
    Compression(Factory<dyn CompressionMethod>),
}

impl AlgorithmFactory {
    pub fn dsa<A, F>(factory: F) -> Self
    where
        A: SignatureAlgorithm + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        AlgorithmFactory::Dsa(Arc::new(move || Arc::new(factory()) as Arc<dyn SignatureAlgorithm>))
    }

    pub fn kea<A, F>(factory: F) -> Self
    where
        A: KeyEncryptionAlgorithm + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        AlgorithmFactory::Kea(Arc::new(move || {
            Arc::new(factory()) as Arc<dyn KeyEncryptionAlgorithm>
        }))
    }

    pub fn cea<A, F>(factory: F) -> Self
    where
        A: ContentEncryptionAlgorithm + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        AlgorithmFactory::Cea(Arc::new(move || {
            Arc::new(factory()) as Arc<dyn ContentEncryptionAlgorithm>
        }))
    }

    pub fn compression<A, F>(factory: F) -> Self
    where
        A: CompressionMethod + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        AlgorithmFactory::Compression(Arc::new(move || {
            Arc::new(factory()) as Arc<dyn CompressionMethod>
        }))
    }

    pub fn family(&self) -> AlgorithmFamily {
        match self {
            AlgorithmFactory::Dsa(_) => AlgorithmFamily::Dsa,
            AlgorithmFactory::Kea(_) => AlgorithmFamily::Kea,
            AlgorithmFactory::Cea(_) => AlgorithmFamily::Cea,
            AlgorithmFactory::Compression(_) => AlgorithmFamily::Compression,
        }
    }
}

impl fmt::Debug for AlgorithmFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AlgorithmFactory").field(&self.family()).finish()
    }
}

/// A resolved algorithm instance.
#[derive(Clone)]
pub enum Algorithm {
    Dsa(Arc<dyn SignatureAlgorithm>),
    Kea(Arc<dyn KeyEncryptionAlgorithm>),
    Cea(Arc<dyn ContentEncryptionAlgorithm>),
    Compression(Arc<dyn CompressionMethod>),
}

impl Algorithm {
    pub fn id(&self) -> &str {
        match self {
            Algorithm::Dsa(a) => a.id(),
            Algorithm::Kea(a) => a.id(),
            Algorithm::Cea(a) => a.id(),
            Algorithm::Compression(a) => a.id(),
        }
    }
}

/// Registry of every algorithm a codec may be configured with.
pub struct AlgorithmRegistry {
    entries: RwLock<HashMap<(AlgorithmFamily, String), AlgorithmFactory>>,
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("AlgorithmRegistry")
            .field("entries", &count)
            .finish()
    }
}

impl AlgorithmRegistry {
    /// Registry with every built-in algorithm and default PBES2 parameters.
    pub fn new() -> Self {
        Self::with_pbes2(DEFAULT_PBES2_SALT_SIZE, DEFAULT_PBES2_ITERATIONS)
    }

    /// Registry with no algorithms at all.
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with every built-in algorithm and the given PBES2 parameters.
    pub fn with_pbes2(salt_size: usize, iterations: u32) -> Self {
        let registry = Self::empty();
        registry.register_signatures();
        registry.register_key_encryption(salt_size, iterations);
        registry.register_content_encryption();
        registry.register("DEF", AlgorithmFactory::compression(|| Deflate));
        registry
    }

    /// Register `factory` under `id` in the factory's family, replacing any
    /// previous entry for that pair.
    pub fn register(&self, id: &str, factory: AlgorithmFactory) {
        let key = (factory.family(), id.to_string());
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, factory);
    }

    /// Whether `id` is registered in `family`.
    pub fn contains(&self, family: AlgorithmFamily, id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(family, id.to_string()))
    }

    /// Sorted ids registered in `family`.
    pub fn ids(&self, family: AlgorithmFamily) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(f, _)| *f == family)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Build a fresh instance of `id` in `family`.
    pub fn resolve(&self, family: AlgorithmFamily, id: &str) -> Result<Algorithm, JoseError> {
        let factory = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(family, id.to_string()))
            .cloned()
            .ok_or_else(|| JoseError::UnknownAlgorithm {
                family,
                id: id.to_string(),
            })?;

        Ok(match factory {
            AlgorithmFactory::Dsa(f) => Algorithm::Dsa(f()),
            AlgorithmFactory::Kea(f) => Algorithm::Kea(f()),
            AlgorithmFactory::Cea(f) => Algorithm::Cea(f()),
            AlgorithmFactory::Compression(f) => Algorithm::Compression(f()),
        })
    }

    pub fn signature(&self, id: &str) -> Result<Arc<dyn SignatureAlgorithm>, JoseError> {
        match self.resolve(AlgorithmFamily::Dsa, id)? {
            Algorithm::Dsa(alg) => Ok(alg),
            _ => Err(unknown(AlgorithmFamily::Dsa, id)),
        }
    }

    pub fn key_encryption(&self, id: &str) -> Result<Arc<dyn KeyEncryptionAlgorithm>, JoseError> {
        match self.resolve(AlgorithmFamily::Kea, id)? {
            Algorithm::Kea(alg) => Ok(alg),
            _ => Err(unknown(AlgorithmFamily::Kea, id)),
        }
    }

    pub fn content_encryption(
        &self,
        id: &str,
    ) -> Result<Arc<dyn ContentEncryptionAlgorithm>, JoseError> {
        match self.resolve(AlgorithmFamily::Cea, id)? {
            Algorithm::Cea(alg) => Ok(alg),
            _ => Err(unknown(AlgorithmFamily::Cea, id)),
        }
    }

    pub fn compression(&self, id: &str) -> Result<Arc<dyn CompressionMethod>, JoseError> {
        match self.resolve(AlgorithmFamily::Compression, id)? {
            Algorithm::Compression(alg) => Ok(alg),
            _ => Err(unknown(AlgorithmFamily::Compression, id)),
        }
    }

    fn register_signatures(&self) {
        for (id, hash) in [
            ("HS256", ShaVariant::Sha256),
            ("HS384", ShaVariant::Sha384),
            ("HS512", ShaVariant::Sha512),
        ] {
            self.register(id, AlgorithmFactory::dsa(move || HmacSignature::new(id, hash)));
        }

        for (id, hash, padding) in [
            ("RS256", ShaVariant::Sha256, RsaPadding::Pkcs1v15),
            ("RS384", ShaVariant::Sha384, RsaPadding::Pkcs1v15),
            ("RS512", ShaVariant::Sha512, RsaPadding::Pkcs1v15),
            ("PS256", ShaVariant::Sha256, RsaPadding::Pss),
            ("PS384", ShaVariant::Sha384, RsaPadding::Pss),
            ("PS512", ShaVariant::Sha512, RsaPadding::Pss),
        ] {
            self.register(
                id,
                AlgorithmFactory::dsa(move || RsaSignature::new(id, hash, padding)),
            );
        }

        for (id, curve) in [
            ("ES256", EcCurve::P256),
            ("ES384", EcCurve::P384),
            ("ES512", EcCurve::P521),
        ] {
            self.register(id, AlgorithmFactory::dsa(move || EcdsaSignature::new(id, curve)));
        }

        self.register("EdDSA", AlgorithmFactory::dsa(|| EdDsaSignature));
        self.register("none", AlgorithmFactory::dsa(|| NoSignature));
        self.register("None", AlgorithmFactory::dsa(|| NoSignature));
    }

    fn register_key_encryption(&self, salt_size: usize, iterations: u32) {
        for (id, len) in [("A128KW", 16), ("A192KW", 24), ("A256KW", 32)] {
            self.register(id, AlgorithmFactory::kea(move || AesKeyWrap::new(id, len)));
        }
        for (id, len) in [("A128GCMKW", 16), ("A192GCMKW", 24), ("A256GCMKW", 32)] {
            self.register(id, AlgorithmFactory::kea(move || AesGcmKeyWrap::new(id, len)));
        }

        self.register("dir", AlgorithmFactory::kea(|| DirectKey));
        self.register("Dir", AlgorithmFactory::kea(|| DirectKey));

        self.register("ECDH-ES", AlgorithmFactory::kea(EcdhEs::direct));
        for (id, len) in [
            ("ECDH-ES+A128KW", 16),
            ("ECDH-ES+A192KW", 24),
            ("ECDH-ES+A256KW", 32),
        ] {
            self.register(id, AlgorithmFactory::kea(move || EcdhEs::with_key_wrap(id, len)));
        }

        for (id, hash) in [
            ("PBES2-HS256+A128KW", ShaVariant::Sha256),
            ("PBES2-HS384+A192KW", ShaVariant::Sha384),
            ("PBES2-HS512+A256KW", ShaVariant::Sha512),
        ] {
            self.register(
                id,
                AlgorithmFactory::kea(move || Pbes2::new(id, hash, salt_size, iterations)),
            );
        }

        for (id, scheme) in [
            ("RSA1_5", RsaScheme::Pkcs1v15),
            ("RSA-OAEP", RsaScheme::OaepSha1),
            ("RSA-OAEP-256", RsaScheme::OaepSha256),
        ] {
            self.register(id, AlgorithmFactory::kea(move || RsaKeyEncryption::new(id, scheme)));
        }
    }

    fn register_content_encryption(&self) {
        for (id, len) in [("A128GCM", 16), ("A192GCM", 24), ("A256GCM", 32)] {
            self.register(id, AlgorithmFactory::cea(move || AesGcmContent::new(id, len)));
        }
        for (id, hash) in [
            ("A128CBC-HS256", ShaVariant::Sha256),
            ("A192CBC-HS384", ShaVariant::Sha384),
            ("A256CBC-HS512", ShaVariant::Sha512),
        ] {
            self.register(id, AlgorithmFactory::cea(move || AesCbcHmacContent::new(id, hash)));
        }
    }
}

fn unknown(family: AlgorithmFamily, id: &str) -> JoseError {
    JoseError::UnknownAlgorithm {
        family,
        id: id.to_string(),
    }
}
