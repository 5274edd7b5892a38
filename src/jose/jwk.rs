// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON Web Key material.
//!
//! Keys are configured as JWK objects (`{"kty":"oct","k":"..."}` and friends)
//! and converted into concrete primitive keys on use. The engine never
//! mutates a key it was handed.

use std::fmt;

use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use rand_core::{OsRng, RngCore};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::compact::{b64_decode, b64_encode};
use super::error::JoseError;

/// NIST curves supported for ECDSA and ECDH-ES.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    /// JWK `crv` name.
    pub fn name(&self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::P521 => "P-521",
        }
    }

    /// Size in bytes of one affine coordinate (and of the private scalar).
    pub fn coordinate_len(&self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }

    pub fn from_name(name: &str) -> Option<EcCurve> {
        match name {
            "P-256" => Some(EcCurve::P256),
            "P-384" => Some(EcCurve::P384),
            "P-521" => Some(EcCurve::P521),
            _ => None,
        }
    }
}

/// A JSON Web Key.
///
/// Only the members needed by the supported algorithms are modelled; unknown
/// members (`kid`, `use`, `alg`, ...) are ignored on input.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum Jwk {
    /// Symmetric key (`kty: oct`).
    #[serde(rename = "oct")]
    Octet { k: String },

    /// RSA key; private members are present only on private keys.
    #[serde(rename = "RSA")]
    Rsa {
        n: String,
        e: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        p: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        q: Option<String>,
    },

    /// Elliptic-curve key on a NIST curve.
    #[serde(rename = "EC")]
    Ec {
        crv: String,
        x: String,
        y: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
    },

    /// Octet key pair (Ed25519).
    #[serde(rename = "OKP")]
    Okp {
        crv: String,
        x: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        d: Option<String>,
    },
}

impl Default for Jwk {
    fn default() -> Self {
        Jwk::Octet { k: String::new() }
    }
}

// Never print key material.
impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Jwk::Octet { .. } => f.debug_struct("Jwk").field("kty", &"oct").finish_non_exhaustive(),
            Jwk::Rsa { d, .. } => f
                .debug_struct("Jwk")
                .field("kty", &"RSA")
                .field("private", &d.is_some())
                .finish_non_exhaustive(),
            Jwk::Ec { crv, d, .. } => f
                .debug_struct("Jwk")
                .field("kty", &"EC")
                .field("crv", crv)
                .field("private", &d.is_some())
                .finish_non_exhaustive(),
            Jwk::Okp { crv, d, .. } => f
                .debug_struct("Jwk")
                .field("kty", &"OKP")
                .field("crv", crv)
                .field("private", &d.is_some())
                .finish_non_exhaustive(),
        }
    }
}

impl Jwk {
    /// Symmetric key from raw bytes.
    pub fn octet(bytes: &[u8]) -> Self {
        Jwk::Octet { k: b64_encode(bytes) }
    }

    /// Random symmetric key of `len` bytes.
    pub fn generate_octet(len: usize) -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; len]);
        OsRng.fill_bytes(&mut bytes);
        Jwk::octet(&bytes)
    }

    /// Private RSA JWK from an existing key.
    pub fn from_rsa(key: &RsaPrivateKey) -> Self {
        let primes = key.primes();
        Jwk::Rsa {
            n: b64_encode(&key.n().to_bytes_be()),
            e: b64_encode(&key.e().to_bytes_be()),
            d: Some(b64_encode(&key.d().to_bytes_be())),
            p: primes.first().map(|p| b64_encode(&p.to_bytes_be())),
            q: primes.get(1).map(|q| b64_encode(&q.to_bytes_be())),
        }
    }

    /// Fresh RSA key pair with a modulus of `bits` bits.
    pub fn generate_rsa(bits: usize) -> Result<Self, JoseError> {
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| JoseError::invalid_key("RSA", e.to_string()))?;
        Ok(Jwk::from_rsa(&key))
    }

    /// Fresh EC key pair on `curve`.
    pub fn generate_ec(curve: EcCurve) -> Self {
        macro_rules! generate {
            ($curve:ident) => {{
                use $curve::elliptic_curve::sec1::ToEncodedPoint;
                let secret = $curve::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_encoded_point(false);
                let d = Zeroizing::new(secret.to_bytes().to_vec());
                (
                    point.x().map(|x| x.to_vec()).unwrap_or_default(),
                    point.y().map(|y| y.to_vec()).unwrap_or_default(),
                    b64_encode(&d),
                )
            }};
        }

        let (x, y, d) = match curve {
            EcCurve::P256 => generate!(p256),
            EcCurve::P384 => generate!(p384),
            EcCurve::P521 => generate!(p521),
        };

        Jwk::Ec {
            crv: curve.name().to_string(),
            x: b64_encode(&x),
            y: b64_encode(&y),
            d: Some(d),
        }
    }

    /// Fresh Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let key = Ed25519SigningKey::generate(&mut OsRng);
        let secret = Zeroizing::new(key.to_bytes());
        Jwk::Okp {
            crv: "Ed25519".to_string(),
            x: b64_encode(key.verifying_key().as_bytes()),
            d: Some(b64_encode(&secret[..])),
        }
    }

    /// JWK `kty` value.
    pub fn kty(&self) -> &'static str {
        match self {
            Jwk::Octet { .. } => "oct",
            Jwk::Rsa { .. } => "RSA",
            Jwk::Ec { .. } => "EC",
            Jwk::Okp { .. } => "OKP",
        }
    }

    /// Copy of this key with every private member removed.
    pub fn public_key(&self) -> Jwk {
        match self {
            Jwk::Octet { .. } => self.clone(),
            Jwk::Rsa { n, e, .. } => Jwk::Rsa {
                n: n.clone(),
                e: e.clone(),
                d: None,
                p: None,
                q: None,
            },
            Jwk::Ec { crv, x, y, .. } => Jwk::Ec {
                crv: crv.clone(),
                x: x.clone(),
                y: y.clone(),
                d: None,
            },
            Jwk::Okp { crv, x, .. } => Jwk::Okp {
                crv: crv.clone(),
                x: x.clone(),
                d: None,
            },
        }
    }

    /// Raw bytes of a symmetric key.
    pub fn octet_bytes(&self, alg: &str) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        match self {
            Jwk::Octet { k } => Ok(Zeroizing::new(decode_member(alg, k)?)),
            other => Err(wrong_kty(alg, "oct", other)),
        }
    }

    pub(crate) fn rsa_public(&self, alg: &str) -> Result<RsaPublicKey, JoseError> {
        match self {
            Jwk::Rsa { n, e, .. } => {
                let n = BigUint::from_bytes_be(&decode_member(alg, n)?);
                let e = BigUint::from_bytes_be(&decode_member(alg, e)?);
                RsaPublicKey::new(n, e).map_err(|e| JoseError::invalid_key(alg, e.to_string()))
            }
            other => Err(wrong_kty(alg, "RSA", other)),
        }
    }

    pub(crate) fn rsa_private(&self, alg: &str) -> Result<RsaPrivateKey, JoseError> {
        match self {
            Jwk::Rsa { n, e, d, p, q } => {
                let (Some(d), Some(p), Some(q)) = (d, p, q) else {
                    return Err(JoseError::invalid_key(alg, "RSA private members d, p, q are required"));
                };
                let decode = |member: &str| -> Result<BigUint, JoseError> {
                    Ok(BigUint::from_bytes_be(&decode_member(alg, member)?))
                };
                RsaPrivateKey::from_components(
                    decode(n)?,
                    decode(e)?,
                    decode(d)?,
                    vec![decode(p)?, decode(q)?],
                )
                .map_err(|e| JoseError::invalid_key(alg, e.to_string()))
            }
            other => Err(wrong_kty(alg, "RSA", other)),
        }
    }

    /// Uncompressed SEC1 encoding (`04 || x || y`) of an EC public key.
    pub(crate) fn ec_public_sec1(&self, alg: &str, curve: EcCurve) -> Result<Vec<u8>, JoseError> {
        match self {
            Jwk::Ec { crv, x, y, .. } => {
                check_curve(alg, crv, curve)?;
                let size = curve.coordinate_len();
                let mut sec1 = Vec::with_capacity(1 + 2 * size);
                sec1.push(0x04);
                sec1.extend_from_slice(&left_pad(alg, decode_member(alg, x)?, size)?);
                sec1.extend_from_slice(&left_pad(alg, decode_member(alg, y)?, size)?);
                Ok(sec1)
            }
            other => Err(wrong_kty(alg, "EC", other)),
        }
    }

    /// Private scalar of an EC key, left-padded to the curve size.
    pub(crate) fn ec_private_scalar(
        &self,
        alg: &str,
        curve: EcCurve,
    ) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        match self {
            Jwk::Ec { crv, d: Some(d), .. } => {
                check_curve(alg, crv, curve)?;
                let scalar = left_pad(alg, decode_member(alg, d)?, curve.coordinate_len())?;
                Ok(Zeroizing::new(scalar))
            }
            Jwk::Ec { .. } => Err(JoseError::invalid_key(alg, "EC private member d is required")),
            other => Err(wrong_kty(alg, "EC", other)),
        }
    }

    /// Curve of an EC key.
    pub(crate) fn ec_curve(&self, alg: &str) -> Result<EcCurve, JoseError> {
        match self {
            Jwk::Ec { crv, .. } => EcCurve::from_name(crv)
                .ok_or_else(|| JoseError::invalid_key(alg, format!("unsupported curve {crv}"))),
            other => Err(wrong_kty(alg, "EC", other)),
        }
    }

    pub(crate) fn ed25519_signing(&self, alg: &str) -> Result<Ed25519SigningKey, JoseError> {
        match self {
            Jwk::Okp { crv, d: Some(d), .. } if crv == "Ed25519" => {
                let bytes = Zeroizing::new(decode_member(alg, d)?);
                let secret: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| JoseError::invalid_key(alg, "Ed25519 private key must be 32 bytes"))?;
                Ok(Ed25519SigningKey::from_bytes(&secret))
            }
            Jwk::Okp { crv, d: None, .. } if crv == "Ed25519" => {
                Err(JoseError::invalid_key(alg, "OKP private member d is required"))
            }
            Jwk::Okp { crv, .. } => Err(JoseError::invalid_key(alg, format!("unsupported curve {crv}"))),
            other => Err(wrong_kty(alg, "OKP", other)),
        }
    }

    pub(crate) fn ed25519_verifying(&self, alg: &str) -> Result<Ed25519VerifyingKey, JoseError> {
        match self {
            Jwk::Okp { crv, x, .. } if crv == "Ed25519" => {
                let bytes = decode_member(alg, x)?;
                let public: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| JoseError::invalid_key(alg, "Ed25519 public key must be 32 bytes"))?;
                Ed25519VerifyingKey::from_bytes(&public)
                    .map_err(|e| JoseError::invalid_key(alg, e.to_string()))
            }
            Jwk::Okp { crv, .. } => Err(JoseError::invalid_key(alg, format!("unsupported curve {crv}"))),
            other => Err(wrong_kty(alg, "OKP", other)),
        }
    }
}

fn decode_member(alg: &str, value: &str) -> Result<Vec<u8>, JoseError> {
    b64_decode(value).map_err(|_| JoseError::invalid_key(alg, "key member is not valid base64url"))
}

fn wrong_kty(alg: &str, expected: &str, key: &Jwk) -> JoseError {
    JoseError::invalid_key(alg, format!("expected {expected} key, found {}", key.kty()))
}

fn check_curve(alg: &str, crv: &str, curve: EcCurve) -> Result<(), JoseError> {
    if crv == curve.name() {
        Ok(())
    } else {
        Err(JoseError::invalid_key(
            alg,
            format!("expected curve {}, found {crv}", curve.name()),
        ))
    }
}

fn left_pad(alg: &str, bytes: Vec<u8>, size: usize) -> Result<Vec<u8>, JoseError> {
    if bytes.len() > size {
        return Err(JoseError::invalid_key(alg, "EC coordinate is too long"));
    }
    if bytes.len() == size {
        return Ok(bytes);
    }
    let mut padded = vec![0u8; size - bytes.len()];
    padded.extend_from_slice(&bytes);
    Ok(padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_octet_jwk() {
        let jwk: Jwk = serde_json::from_str(r#"{"kty":"oct","k":"AAEC","kid":"main"}"#).unwrap();
        assert_eq!(jwk.kty(), "oct");
        assert_eq!(jwk.octet_bytes("HS256").unwrap().as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn debug_hides_key_material() {
        let jwk = Jwk::octet(b"super secret key");
        let printed = format!("{jwk:?}");
        assert!(!printed.contains(&b64_encode(b"super secret key")));
    }

    #[test]
    fn public_key_strips_private_members() {
        let jwk = Jwk::generate_ec(EcCurve::P256);
        match jwk.public_key() {
            Jwk::Ec { d, crv, .. } => {
                assert!(d.is_none());
                assert_eq!(crv, "P-256");
            }
            other => panic!("unexpected key {other:?}"),
        }
    }

    #[test]
    fn ec_public_is_uncompressed_sec1() {
        let jwk = Jwk::generate_ec(EcCurve::P521);
        let sec1 = jwk.ec_public_sec1("ES512", EcCurve::P521).unwrap();
        assert_eq!(sec1.len(), 1 + 2 * 66);
        assert_eq!(sec1[0], 0x04);
    }

    #[test]
    fn wrong_curve_is_rejected() {
        let jwk = Jwk::generate_ec(EcCurve::P256);
        let err = jwk.ec_public_sec1("ES384", EcCurve::P384).unwrap_err();
        assert!(matches!(err, JoseError::InvalidKey { .. }));
    }

    #[test]
    fn wrong_key_type_is_rejected() {
        let jwk = Jwk::generate_ed25519();
        assert!(jwk.octet_bytes("HS256").is_err());
        assert!(jwk.ed25519_signing("EdDSA").is_ok());
        assert!(jwk.public_key().ed25519_signing("EdDSA").is_err());
    }
}
