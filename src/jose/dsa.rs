// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Digital signature algorithms (JWS `alg`).
//!
//! | id            | primitive                     | key        |
//! |---------------|-------------------------------|------------|
//! | HS256/384/512 | HMAC-SHA-2                    | `oct`      |
//! | RS256/384/512 | RSASSA-PKCS1-v1_5             | `RSA`      |
//! | PS256/384/512 | RSASSA-PSS (MGF1, salt = hash)| `RSA`      |
//! | ES256/384/512 | ECDSA P-256/P-384/P-521       | `EC`       |
//! | EdDSA         | Ed25519                       | `OKP`      |
//! | none          | unsecured, empty signature    | ignored    |

use rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};

use super::error::JoseError;
use super::hash::{hmac, hmac_verify, ShaVariant};
use super::jwk::{EcCurve, Jwk};

/// Smallest RSA modulus accepted for signing or verification, in bytes.
const MIN_RSA_MODULUS_BYTES: usize = 2048 / 8;

/// A JWS signature algorithm.
pub trait SignatureAlgorithm: Send + Sync {
    /// Canonical `alg` identifier written into headers.
    fn id(&self) -> &str;

    /// Sign the JWS signing input (`header.payload`).
    fn sign(&self, key: &Jwk, input: &[u8]) -> Result<Vec<u8>, JoseError>;

    /// Verify `signature` over `input`. Any mismatch is an error.
    fn verify(&self, key: &Jwk, input: &[u8], signature: &[u8]) -> Result<(), JoseError>;
}

// =============================================================================
// HMAC
// =============================================================================

/// HS256, HS384 and HS512.
#[derive(Debug, Clone, Copy)]
pub struct HmacSignature {
    id: &'static str,
    hash: ShaVariant,
}

impl HmacSignature {
    pub const fn new(id: &'static str, hash: ShaVariant) -> Self {
        Self { id, hash }
    }

    fn key(&self, key: &Jwk) -> Result<zeroize::Zeroizing<Vec<u8>>, JoseError> {
        let secret = key.octet_bytes(self.id)?;
        // RFC 7518 section 3.2: key at least as long as the hash output.
        if secret.len() < self.hash.output_len() {
            return Err(JoseError::invalid_key(
                self.id,
                format!("key must be at least {} bytes", self.hash.output_len()),
            ));
        }
        Ok(secret)
    }
}

impl SignatureAlgorithm for HmacSignature {
    fn id(&self) -> &str {
        self.id
    }

    fn sign(&self, key: &Jwk, input: &[u8]) -> Result<Vec<u8>, JoseError> {
        let secret = self.key(key)?;
        hmac(self.hash, &secret, &[input]).ok_or(JoseError::Crypto("hmac computation failed"))
    }

    fn verify(&self, key: &Jwk, input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        let secret = self.key(key)?;
        if signature.len() == self.hash.output_len()
            && hmac_verify(self.hash, &secret, &[input], signature)
        {
            Ok(())
        } else {
            Err(JoseError::Crypto("signature mismatch"))
        }
    }
}

// =============================================================================
// RSA
// =============================================================================

/// RSA padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    Pkcs1v15,
    Pss,
}

/// RS256/384/512 and PS256/384/512.
#[derive(Debug, Clone, Copy)]
pub struct RsaSignature {
    id: &'static str,
    hash: ShaVariant,
    padding: RsaPadding,
}

impl RsaSignature {
    pub const fn new(id: &'static str, hash: ShaVariant, padding: RsaPadding) -> Self {
        Self { id, hash, padding }
    }

    fn check_size(&self, public: &RsaPublicKey) -> Result<(), JoseError> {
        if public.size() < MIN_RSA_MODULUS_BYTES {
            return Err(JoseError::invalid_key(self.id, "RSA modulus must be at least 2048 bits"));
        }
        Ok(())
    }

    fn sign_with(&self, private: RsaPrivateKey, input: &[u8]) -> Result<Vec<u8>, JoseError> {
        macro_rules! sign {
            ($digest:ty) => {
                match self.padding {
                    RsaPadding::Pkcs1v15 => rsa::pkcs1v15::SigningKey::<$digest>::new(private)
                        .try_sign(input)
                        .map(|s| s.to_vec()),
                    RsaPadding::Pss => rsa::pss::BlindedSigningKey::<$digest>::new(private)
                        .try_sign_with_rng(&mut OsRng, input)
                        .map(|s| s.to_vec()),
                }
            };
        }

        let signed = match self.hash {
            ShaVariant::Sha256 => sign!(Sha256),
            ShaVariant::Sha384 => sign!(Sha384),
            ShaVariant::Sha512 => sign!(Sha512),
        };
        signed.map_err(|_| JoseError::Crypto("rsa signing failed"))
    }

    fn verify_with(&self, public: RsaPublicKey, input: &[u8], sig: &[u8]) -> Result<(), JoseError> {
        macro_rules! verify {
            ($digest:ty) => {
                match self.padding {
                    RsaPadding::Pkcs1v15 => rsa::pkcs1v15::Signature::try_from(sig)
                        .and_then(|s| rsa::pkcs1v15::VerifyingKey::<$digest>::new(public).verify(input, &s)),
                    RsaPadding::Pss => rsa::pss::Signature::try_from(sig)
                        .and_then(|s| rsa::pss::VerifyingKey::<$digest>::new(public).verify(input, &s)),
                }
            };
        }

        let verified = match self.hash {
            ShaVariant::Sha256 => verify!(Sha256),
            ShaVariant::Sha384 => verify!(Sha384),
            ShaVariant::Sha512 => verify!(Sha512),
        };
        verified.map_err(|_| JoseError::Crypto("signature mismatch"))
    }
}

impl SignatureAlgorithm for RsaSignature {
    fn id(&self) -> &str {
        self.id
    }

    fn sign(&self, key: &Jwk, input: &[u8]) -> Result<Vec<u8>, JoseError> {
        let private = key.rsa_private(self.id)?;
        self.check_size(&private.to_public_key())?;
        self.sign_with(private, input)
    }

    fn verify(&self, key: &Jwk, input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        let public = key.rsa_public(self.id)?;
        self.check_size(&public)?;
        self.verify_with(public, input, signature)
    }
}

// =============================================================================
// ECDSA
// =============================================================================

/// ES256 (P-256), ES384 (P-384) and ES512 (P-521).
///
/// Signatures are the fixed-width `r || s` concatenation, not DER.
#[derive(Debug, Clone, Copy)]
pub struct EcdsaSignature {
    id: &'static str,
    curve: EcCurve,
}

impl EcdsaSignature {
    pub const fn new(id: &'static str, curve: EcCurve) -> Self {
        Self { id, curve }
    }
}

macro_rules! ecdsa_sign {
    ($curve:ident, $id:expr, $scalar:expr, $input:expr) => {{
        let key = $curve::ecdsa::SigningKey::from_slice($scalar)
            .map_err(|_| JoseError::invalid_key($id, "EC private scalar is out of range"))?;
        let signature: $curve::ecdsa::Signature = key
            .try_sign($input)
            .map_err(|_| JoseError::Crypto("ecdsa signing failed"))?;
        signature.to_bytes().to_vec()
    }};
}

macro_rules! ecdsa_verify {
    ($curve:ident, $id:expr, $sec1:expr, $input:expr, $sig:expr) => {{
        let key = $curve::ecdsa::VerifyingKey::from_sec1_bytes($sec1)
            .map_err(|_| JoseError::invalid_key($id, "EC public point is not on the curve"))?;
        $curve::ecdsa::Signature::from_slice($sig)
            .and_then(|signature| key.verify($input, &signature))
            .map_err(|_| JoseError::Crypto("signature mismatch"))
    }};
}

impl SignatureAlgorithm for EcdsaSignature {
    fn id(&self) -> &str {
        self.id
    }

    fn sign(&self, key: &Jwk, input: &[u8]) -> Result<Vec<u8>, JoseError> {
        let scalar = key.ec_private_scalar(self.id, self.curve)?;
        let signature = match self.curve {
            EcCurve::P256 => ecdsa_sign!(p256, self.id, &scalar, input),
            EcCurve::P384 => ecdsa_sign!(p384, self.id, &scalar, input),
            EcCurve::P521 => ecdsa_sign!(p521, self.id, &scalar, input),
        };
        Ok(signature)
    }

    fn verify(&self, key: &Jwk, input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        let sec1 = key.ec_public_sec1(self.id, self.curve)?;
        match self.curve {
            EcCurve::P256 => ecdsa_verify!(p256, self.id, &sec1, input, signature),
            EcCurve::P384 => ecdsa_verify!(p384, self.id, &sec1, input, signature),
            EcCurve::P521 => ecdsa_verify!(p521, self.id, &sec1, input, signature),
        }
    }
}

// =============================================================================
// EdDSA
// =============================================================================

/// EdDSA over Ed25519.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdDsaSignature;

impl SignatureAlgorithm for EdDsaSignature {
    fn id(&self) -> &str {
        "EdDSA"
    }

    fn sign(&self, key: &Jwk, input: &[u8]) -> Result<Vec<u8>, JoseError> {
        let signing = key.ed25519_signing(self.id())?;
        Ok(signing.sign(input).to_bytes().to_vec())
    }

    fn verify(&self, key: &Jwk, input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        let verifying = key.ed25519_verifying(self.id())?;
        let signature = ed25519_dalek::Signature::from_slice(signature)
            .map_err(|_| JoseError::Crypto("signature mismatch"))?;
        verifying
            .verify_strict(input, &signature)
            .map_err(|_| JoseError::Crypto("signature mismatch"))
    }
}

// =============================================================================
// none
// =============================================================================

/// Unsecured JWS. Only accepted when explicitly made the active algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignature;

impl SignatureAlgorithm for NoSignature {
    fn id(&self) -> &str {
        "none"
    }

    fn sign(&self, _key: &Jwk, _input: &[u8]) -> Result<Vec<u8>, JoseError> {
        Ok(Vec::new())
    }

    fn verify(&self, _key: &Jwk, _input: &[u8], signature: &[u8]) -> Result<(), JoseError> {
        if signature.is_empty() {
            Ok(())
        } else {
            Err(JoseError::Crypto("unsecured token carries a signature"))
        }
    }
}
