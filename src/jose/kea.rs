// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key management algorithms (JWE `alg`).
//!
//! A key encryption algorithm decides the content encryption key (CEK) for
//! one recipient and produces the encrypted-key segment. Algorithms that need
//! extra parameters (`epk`, `iv`/`tag`, `p2s`/`p2c`) write them into the
//! protected header before it is encoded, so they are covered by the AEAD tag.

use aes::cipher::generic_array::GenericArray;
use aes::{Aes128, Aes192, Aes256};
use aes_kw::Kek;
use rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey};
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use super::cea::{gcm_decrypt, gcm_encrypt, random_bytes, ContentEncryptionAlgorithm};
use super::compact::b64_encode;
use super::error::JoseError;
use super::hash::{sha256, ShaVariant};
use super::header::JoseHeader;
use super::jwk::{EcCurve, Jwk};

/// Highest PBES2 iteration count accepted from an inbound header.
pub const MAX_PBES2_ITERATIONS: u32 = 1_000_000;

const MIN_RSA_MODULUS_BYTES: usize = 2048 / 8;

/// CEK chosen for a recipient plus the encrypted-key segment that carries it.
pub struct WrappedKey {
    pub cek: Zeroizing<Vec<u8>>,
    pub encrypted_key: Vec<u8>,
}

/// A JWE key management algorithm.
pub trait KeyEncryptionAlgorithm: Send + Sync {
    /// Canonical `alg` identifier.
    fn id(&self) -> &str;

    /// Choose a CEK for `cea` and encrypt it to `key`.
    fn wrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        header: &mut JoseHeader,
    ) -> Result<WrappedKey, JoseError>;

    /// Recover the CEK from `encrypted_key` with `key`.
    fn unwrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        header: &JoseHeader,
        encrypted_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, JoseError>;
}

// =============================================================================
// RFC 3394 AES key wrap
// =============================================================================

macro_rules! with_kek {
    ($kek:expr, $op:ident, $data:expr) => {
        match $kek.len() {
            16 => Kek::<Aes128>::new(GenericArray::from_slice($kek)).$op($data),
            24 => Kek::<Aes192>::new(GenericArray::from_slice($kek)).$op($data),
            32 => Kek::<Aes256>::new(GenericArray::from_slice($kek)).$op($data),
            _ => return Err(JoseError::invalid_key("AES-KW", "key must be 128, 192 or 256 bits")),
        }
    };
}

pub(crate) fn aes_kw_wrap(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>, JoseError> {
    with_kek!(kek, wrap_vec, cek).map_err(|_| JoseError::Crypto("aes key wrap failed"))
}

pub(crate) fn aes_kw_unwrap(
    kek: &[u8],
    encrypted_key: &[u8],
    cek_len: usize,
) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    let cek = Zeroizing::new(
        with_kek!(kek, unwrap_vec, encrypted_key)
            .map_err(|_| JoseError::Crypto("aes key unwrap failed"))?,
    );
    check_cek_len(cek, cek_len)
}

fn check_cek_len(cek: Zeroizing<Vec<u8>>, expected: usize) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    if cek.len() != expected {
        return Err(JoseError::Crypto("content key has the wrong length"));
    }
    Ok(cek)
}

fn symmetric_key(key: &Jwk, alg: &str, len: usize) -> Result<Zeroizing<Vec<u8>>, JoseError> {
    let secret = key.octet_bytes(alg)?;
    if secret.len() != len {
        return Err(JoseError::invalid_key(alg, format!("key must be {len} bytes")));
    }
    Ok(secret)
}

/// A128KW, A192KW and A256KW.
#[derive(Debug, Clone, Copy)]
pub struct AesKeyWrap {
    id: &'static str,
    key_len: usize,
}

impl AesKeyWrap {
    pub const fn new(id: &'static str, key_len: usize) -> Self {
        Self { id, key_len }
    }
}

impl KeyEncryptionAlgorithm for AesKeyWrap {
    fn id(&self) -> &str {
        self.id
    }

    fn wrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        _header: &mut JoseHeader,
    ) -> Result<WrappedKey, JoseError> {
        let kek = symmetric_key(key, self.id, self.key_len)?;
        let cek = cea.generate_cek();
        let encrypted_key = aes_kw_wrap(&kek, &cek)?;
        Ok(WrappedKey { cek, encrypted_key })
    }

    fn unwrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        _header: &JoseHeader,
        encrypted_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        let kek = symmetric_key(key, self.id, self.key_len)?;
        aes_kw_unwrap(&kek, encrypted_key, cea.key_len())
    }
}

// =============================================================================
// AES-GCM key wrap
// =============================================================================

/// A128GCMKW, A192GCMKW and A256GCMKW. IV and tag travel in the header.
#[derive(Debug, Clone, Copy)]
pub struct AesGcmKeyWrap {
    id: &'static str,
    key_len: usize,
}

impl AesGcmKeyWrap {
    pub const fn new(id: &'static str, key_len: usize) -> Self {
        Self { id, key_len }
    }
}

impl KeyEncryptionAlgorithm for AesGcmKeyWrap {
    fn id(&self) -> &str {
        self.id
    }

    fn wrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        header: &mut JoseHeader,
    ) -> Result<WrappedKey, JoseError> {
        let kek = symmetric_key(key, self.id, self.key_len)?;
        let cek = cea.generate_cek();
        let iv = random_bytes(12);
        let (encrypted_key, tag) = gcm_encrypt(&kek, &iv, &[], &cek)?;
        header.iv = Some(b64_encode(&iv));
        header.tag = Some(b64_encode(&tag));
        Ok(WrappedKey { cek, encrypted_key })
    }

    fn unwrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        header: &JoseHeader,
        encrypted_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        let kek = symmetric_key(key, self.id, self.key_len)?;
        let iv = JoseHeader::binary_param(header.iv.as_ref(), "iv")?;
        let tag = JoseHeader::binary_param(header.tag.as_ref(), "tag")?;
        let cek = Zeroizing::new(gcm_decrypt(&kek, &iv, &[], encrypted_key, &tag)?);
        check_cek_len(cek, cea.key_len())
    }
}

// =============================================================================
// dir
// =============================================================================

/// Direct use of a shared symmetric key as the CEK.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectKey;

impl KeyEncryptionAlgorithm for DirectKey {
    fn id(&self) -> &str {
        "dir"
    }

    fn wrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        _header: &mut JoseHeader,
    ) -> Result<WrappedKey, JoseError> {
        let cek = symmetric_key(key, self.id(), cea.key_len())?;
        Ok(WrappedKey {
            cek,
            encrypted_key: Vec::new(),
        })
    }

    fn unwrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        _header: &JoseHeader,
        encrypted_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        if !encrypted_key.is_empty() {
            return Err(JoseError::Crypto("direct encryption carries no encrypted key"));
        }
        symmetric_key(key, self.id(), cea.key_len())
    }
}

// =============================================================================
// ECDH-ES
// =============================================================================

/// ECDH-ES and ECDH-ES+A128KW/A192KW/A256KW over P-256, P-384 and P-521.
///
/// Without `wrap_len` the agreed key is the CEK; with it the agreed key
/// wraps a random CEK.
#[derive(Debug, Clone, Copy)]
pub struct EcdhEs {
    id: &'static str,
    wrap_len: Option<usize>,
}

impl EcdhEs {
    pub const fn direct() -> Self {
        Self {
            id: "ECDH-ES",
            wrap_len: None,
        }
    }

    pub const fn with_key_wrap(id: &'static str, key_len: usize) -> Self {
        Self {
            id,
            wrap_len: Some(key_len),
        }
    }

    /// Concat KDF (NIST SP 800-56A, RFC 7518 section 4.6.2) with SHA-256.
    fn derive(
        &self,
        shared: &[u8],
        cea: &dyn ContentEncryptionAlgorithm,
        header: &JoseHeader,
    ) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        let (algorithm_id, key_len) = match self.wrap_len {
            Some(len) => (self.id, len),
            None => (cea.id(), cea.key_len()),
        };
        let apu = optional_param(header.apu.as_ref(), "apu")?;
        let apv = optional_param(header.apv.as_ref(), "apv")?;

        let mut other_info = Vec::new();
        for field in [algorithm_id.as_bytes(), apu.as_slice(), apv.as_slice()] {
            other_info.extend_from_slice(&(field.len() as u32).to_be_bytes());
            other_info.extend_from_slice(field);
        }
        other_info.extend_from_slice(&((key_len * 8) as u32).to_be_bytes());

        let mut derived = Zeroizing::new(Vec::with_capacity(key_len + 32));
        let mut counter: u32 = 1;
        while derived.len() < key_len {
            derived.extend_from_slice(&sha256(&[&counter.to_be_bytes(), shared, &other_info]));
            counter += 1;
        }
        derived.truncate(key_len);
        Ok(derived)
    }
}

fn optional_param(value: Option<&String>, name: &'static str) -> Result<Vec<u8>, JoseError> {
    match value {
        Some(_) => JoseHeader::binary_param(value, name),
        None => Ok(Vec::new()),
    }
}

/// Ephemeral agreement against a recipient public key.
/// Yields `(shared secret, ephemeral x, ephemeral y)`.
macro_rules! ecdh_send {
    ($curve:ident, $alg:expr, $recipient:expr) => {{
        use $curve::elliptic_curve::sec1::ToEncodedPoint;
        let peer = $curve::PublicKey::from_sec1_bytes($recipient)
            .map_err(|_| JoseError::invalid_key($alg, "EC public point is not on the curve"))?;
        let ephemeral = $curve::SecretKey::random(&mut OsRng);
        let shared = $curve::ecdh::diffie_hellman(ephemeral.to_nonzero_scalar(), peer.as_affine());
        let point = ephemeral.public_key().to_encoded_point(false);
        let x = point.x().ok_or(JoseError::Crypto("ephemeral key is the identity"))?.to_vec();
        let y = point.y().ok_or(JoseError::Crypto("ephemeral key is the identity"))?.to_vec();
        (Zeroizing::new(shared.raw_secret_bytes().to_vec()), x, y)
    }};
}

/// Agreement between the recipient private scalar and the sender's `epk`.
macro_rules! ecdh_receive {
    ($curve:ident, $alg:expr, $scalar:expr, $epk:expr) => {{
        let secret = $curve::SecretKey::from_slice($scalar)
            .map_err(|_| JoseError::invalid_key($alg, "EC private scalar is out of range"))?;
        let peer = $curve::PublicKey::from_sec1_bytes($epk)
            .map_err(|_| JoseError::Header("epk"))?;
        let shared = $curve::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
        Zeroizing::new(shared.raw_secret_bytes().to_vec())
    }};
}

impl KeyEncryptionAlgorithm for EcdhEs {
    fn id(&self) -> &str {
        self.id
    }

    fn wrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        header: &mut JoseHeader,
    ) -> Result<WrappedKey, JoseError> {
        let curve = key.ec_curve(self.id)?;
        let recipient = key.ec_public_sec1(self.id, curve)?;
        let (shared, x, y) = match curve {
            EcCurve::P256 => ecdh_send!(p256, self.id, &recipient),
            EcCurve::P384 => ecdh_send!(p384, self.id, &recipient),
            EcCurve::P521 => ecdh_send!(p521, self.id, &recipient),
        };
        header.epk = Some(Jwk::Ec {
            crv: curve.name().to_string(),
            x: b64_encode(&x),
            y: b64_encode(&y),
            d: None,
        });

        let derived = self.derive(&shared, cea, header)?;
        match self.wrap_len {
            None => Ok(WrappedKey {
                cek: derived,
                encrypted_key: Vec::new(),
            }),
            Some(_) => {
                let cek = cea.generate_cek();
                let encrypted_key = aes_kw_wrap(&derived, &cek)?;
                Ok(WrappedKey { cek, encrypted_key })
            }
        }
    }

    fn unwrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        header: &JoseHeader,
        encrypted_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        let curve = key.ec_curve(self.id)?;
        let scalar = key.ec_private_scalar(self.id, curve)?;
        let epk = header
            .epk
            .as_ref()
            .ok_or(JoseError::Header("epk"))?
            .ec_public_sec1(self.id, curve)
            .map_err(|_| JoseError::Header("epk"))?;
        let shared = match curve {
            EcCurve::P256 => ecdh_receive!(p256, self.id, &scalar, &epk),
            EcCurve::P384 => ecdh_receive!(p384, self.id, &scalar, &epk),
            EcCurve::P521 => ecdh_receive!(p521, self.id, &scalar, &epk),
        };

        let derived = self.derive(&shared, cea, header)?;
        match self.wrap_len {
            None if encrypted_key.is_empty() => Ok(derived),
            None => Err(JoseError::Crypto("direct agreement carries no encrypted key")),
            Some(_) => aes_kw_unwrap(&derived, encrypted_key, cea.key_len()),
        }
    }
}

// =============================================================================
// PBES2
// =============================================================================

/// PBES2-HS256+A128KW, PBES2-HS384+A192KW and PBES2-HS512+A256KW.
///
/// The configured key is the password. The PBKDF2 salt is
/// `alg || 0x00 || p2s`.
#[derive(Debug, Clone, Copy)]
pub struct Pbes2 {
    id: &'static str,
    hash: ShaVariant,
    salt_size: usize,
    iterations: u32,
}

impl Pbes2 {
    pub const fn new(id: &'static str, hash: ShaVariant, salt_size: usize, iterations: u32) -> Self {
        Self {
            id,
            hash,
            salt_size,
            iterations,
        }
    }

    fn kek_len(&self) -> usize {
        self.hash.output_len() / 2
    }

    fn derive(&self, password: &[u8], p2s: &[u8], iterations: u32) -> Zeroizing<Vec<u8>> {
        let mut salt = Vec::with_capacity(self.id.len() + 1 + p2s.len());
        salt.extend_from_slice(self.id.as_bytes());
        salt.push(0x00);
        salt.extend_from_slice(p2s);

        let mut kek = Zeroizing::new(vec![0u8; self.kek_len()]);
        match self.hash {
            ShaVariant::Sha256 => pbkdf2::pbkdf2_hmac::<Sha256>(password, &salt, iterations, &mut kek),
            ShaVariant::Sha384 => pbkdf2::pbkdf2_hmac::<Sha384>(password, &salt, iterations, &mut kek),
            ShaVariant::Sha512 => pbkdf2::pbkdf2_hmac::<Sha512>(password, &salt, iterations, &mut kek),
        }
        kek
    }

    fn password(&self, key: &Jwk) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        let password = key.octet_bytes(self.id)?;
        if password.is_empty() {
            return Err(JoseError::invalid_key(self.id, "password must not be empty"));
        }
        Ok(password)
    }
}

impl KeyEncryptionAlgorithm for Pbes2 {
    fn id(&self) -> &str {
        self.id
    }

    fn wrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        header: &mut JoseHeader,
    ) -> Result<WrappedKey, JoseError> {
        let password = self.password(key)?;
        let p2s = random_bytes(self.salt_size);
        let kek = self.derive(&password, &p2s, self.iterations);
        let cek = cea.generate_cek();
        let encrypted_key = aes_kw_wrap(&kek, &cek)?;
        header.p2s = Some(b64_encode(&p2s));
        header.p2c = Some(self.iterations);
        Ok(WrappedKey { cek, encrypted_key })
    }

    fn unwrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        header: &JoseHeader,
        encrypted_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        let password = self.password(key)?;
        let p2s = JoseHeader::binary_param(header.p2s.as_ref(), "p2s")?;
        let p2c = header.p2c.ok_or(JoseError::Header("p2c"))?;
        if p2s.len() < 8 {
            return Err(JoseError::Header("p2s"));
        }
        if p2c == 0 || p2c > MAX_PBES2_ITERATIONS {
            return Err(JoseError::Header("p2c"));
        }
        let kek = self.derive(&password, &p2s, p2c);
        aes_kw_unwrap(&kek, encrypted_key, cea.key_len())
    }
}

// =============================================================================
// RSA
// =============================================================================

/// RSA encryption scheme for the CEK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaScheme {
    /// RSA1_5
    Pkcs1v15,
    /// RSA-OAEP (SHA-1, MGF1-SHA-1)
    OaepSha1,
    /// RSA-OAEP-256
    OaepSha256,
}

/// RSA1_5, RSA-OAEP and RSA-OAEP-256.
#[derive(Debug, Clone, Copy)]
pub struct RsaKeyEncryption {
    id: &'static str,
    scheme: RsaScheme,
}

impl RsaKeyEncryption {
    pub const fn new(id: &'static str, scheme: RsaScheme) -> Self {
        Self { id, scheme }
    }

    fn decrypt(&self, private: &RsaPrivateKey, encrypted_key: &[u8]) -> rsa::Result<Vec<u8>> {
        match self.scheme {
            RsaScheme::Pkcs1v15 => private.decrypt(Pkcs1v15Encrypt, encrypted_key),
            RsaScheme::OaepSha1 => private.decrypt(Oaep::new::<sha1::Sha1>(), encrypted_key),
            RsaScheme::OaepSha256 => private.decrypt(Oaep::new::<Sha256>(), encrypted_key),
        }
    }
}

impl KeyEncryptionAlgorithm for RsaKeyEncryption {
    fn id(&self) -> &str {
        self.id
    }

    fn wrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        _header: &mut JoseHeader,
    ) -> Result<WrappedKey, JoseError> {
        let public = key.rsa_public(self.id)?;
        if public.size() < MIN_RSA_MODULUS_BYTES {
            return Err(JoseError::invalid_key(self.id, "RSA modulus must be at least 2048 bits"));
        }
        let cek = cea.generate_cek();
        let encrypted_key = match self.scheme {
            RsaScheme::Pkcs1v15 => public.encrypt(&mut OsRng, Pkcs1v15Encrypt, &cek),
            RsaScheme::OaepSha1 => public.encrypt(&mut OsRng, Oaep::new::<sha1::Sha1>(), &cek),
            RsaScheme::OaepSha256 => public.encrypt(&mut OsRng, Oaep::new::<Sha256>(), &cek),
        }
        .map_err(|_| JoseError::Crypto("rsa key encryption failed"))?;
        Ok(WrappedKey { cek, encrypted_key })
    }

    fn unwrap(
        &self,
        key: &Jwk,
        cea: &dyn ContentEncryptionAlgorithm,
        _header: &JoseHeader,
        encrypted_key: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        let private = key.rsa_private(self.id)?;
        let decrypted = self.decrypt(&private, encrypted_key).map(Zeroizing::new);

        if self.scheme == RsaScheme::Pkcs1v15 {
            // RFC 7516 section 11.5: a padding failure continues with a random
            // CEK so it is indistinguishable from a bad authentication tag.
            return Ok(match decrypted {
                Ok(cek) if cek.len() == cea.key_len() => cek,
                _ => cea.generate_cek(),
            });
        }

        let cek = decrypted.map_err(|_| JoseError::Crypto("rsa key decryption failed"))?;
        check_cek_len(cek, cea.key_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::cea::{AesCbcHmacContent, AesGcmContent};

    fn cea() -> AesCbcHmacContent {
        AesCbcHmacContent::new("A128CBC-HS256", ShaVariant::Sha256)
    }

    fn round_trip(kea: &dyn KeyEncryptionAlgorithm, key: &Jwk) -> JoseHeader {
        let cea = cea();
        let mut header = JoseHeader::encrypted(kea.id(), cea.id(), None);
        let wrapped = kea.wrap(key, &cea, &mut header).unwrap();
        assert_eq!(wrapped.cek.len(), cea.key_len());
        let cek = kea
            .unwrap(key, &cea, &header, &wrapped.encrypted_key)
            .unwrap();
        assert_eq!(cek.as_slice(), wrapped.cek.as_slice());
        header
    }

    #[test]
    fn aes_kw_matches_rfc3394_vector() {
        let kek: Vec<u8> = (0u8..16).collect();
        let data: Vec<u8> = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]
            .into_iter()
            .chain([0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff])
            .collect();
        let wrapped = aes_kw_wrap(&kek, &data).unwrap();
        assert_eq!(
            wrapped,
            vec![
                0x1f, 0xa6, 0x8b, 0x0a, 0x81, 0x12, 0xb4, 0x47, 0xae, 0xf3, 0x4b, 0xd8, 0xfb,
                0x5a, 0x7b, 0x82, 0x9d, 0x3e, 0x86, 0x23, 0x71, 0xd2, 0xcf, 0xe5
            ]
        );
    }

    #[test]
    fn aes_key_wrap_round_trip() {
        round_trip(&AesKeyWrap::new("A256KW", 32), &Jwk::generate_octet(32));
        round_trip(&AesKeyWrap::new("A128KW", 16), &Jwk::generate_octet(16));
    }

    #[test]
    fn aes_key_wrap_rejects_wrong_kek_size() {
        let kea = AesKeyWrap::new("A256KW", 32);
        let mut header = JoseHeader::default();
        assert!(kea.wrap(&Jwk::generate_octet(16), &cea(), &mut header).is_err());
    }

    #[test]
    fn gcm_key_wrap_writes_iv_and_tag() {
        let header = round_trip(&AesGcmKeyWrap::new("A192GCMKW", 24), &Jwk::generate_octet(24));
        assert!(header.iv.is_some());
        assert!(header.tag.is_some());
    }

    #[test]
    fn direct_uses_key_as_cek() {
        let key = Jwk::generate_octet(32);
        round_trip(&DirectKey, &key);
        let gcm = AesGcmContent::new("A128GCM", 16);
        let mut header = JoseHeader::default();
        assert!(DirectKey.wrap(&key, &gcm, &mut header).is_err());
    }

    #[test]
    fn ecdh_es_direct_and_wrapped_on_every_curve() {
        for curve in [EcCurve::P256, EcCurve::P384, EcCurve::P521] {
            let key = Jwk::generate_ec(curve);
            let header = round_trip(&EcdhEs::direct(), &key);
            assert!(matches!(header.epk, Some(Jwk::Ec { d: None, .. })));
            round_trip(&EcdhEs::with_key_wrap("ECDH-ES+A128KW", 16), &key);
        }
    }

    #[test]
    fn ecdh_es_with_foreign_epk_yields_different_key() {
        let key = Jwk::generate_ec(EcCurve::P256);
        let kea = EcdhEs::with_key_wrap("ECDH-ES+A256KW", 32);
        let cea = cea();
        let mut header = JoseHeader::default();
        let wrapped = kea.wrap(&key, &cea, &mut header).unwrap();
        header.epk = Some(Jwk::generate_ec(EcCurve::P256).public_key());
        assert!(kea.unwrap(&key, &cea, &header, &wrapped.encrypted_key).is_err());
    }

    #[test]
    fn pbes2_round_trip_records_salt_and_count() {
        let kea = Pbes2::new("PBES2-HS256+A128KW", ShaVariant::Sha256, 16, 1000);
        let header = round_trip(&kea, &Jwk::octet(b"correct horse battery staple"));
        assert_eq!(header.p2c, Some(1000));
        assert!(header.p2s.is_some());
    }

    #[test]
    fn pbes2_rejects_excessive_iteration_count() {
        let kea = Pbes2::new("PBES2-HS256+A128KW", ShaVariant::Sha256, 16, 1000);
        let key = Jwk::octet(b"password");
        let cea = cea();
        let mut header = JoseHeader::default();
        let wrapped = kea.wrap(&key, &cea, &mut header).unwrap();
        header.p2c = Some(MAX_PBES2_ITERATIONS + 1);
        let err = kea
            .unwrap(&key, &cea, &header, &wrapped.encrypted_key)
            .unwrap_err();
        assert!(matches!(err, JoseError::Header("p2c")));
    }

    #[test]
    fn rsa_schemes_round_trip() {
        let key = Jwk::generate_rsa(2048).unwrap();
        for (id, scheme) in [
            ("RSA1_5", RsaScheme::Pkcs1v15),
            ("RSA-OAEP", RsaScheme::OaepSha1),
            ("RSA-OAEP-256", RsaScheme::OaepSha256),
        ] {
            let kea = RsaKeyEncryption::new(id, scheme);
            let cea = cea();
            let mut header = JoseHeader::default();
            let wrapped = kea.wrap(&key.public_key(), &cea, &mut header).unwrap();
            let cek = kea.unwrap(&key, &cea, &header, &wrapped.encrypted_key).unwrap();
            assert_eq!(cek.as_slice(), wrapped.cek.as_slice(), "{id}");
        }
    }

    #[test]
    fn rsa1_5_padding_failure_yields_random_cek() {
        let key = Jwk::generate_rsa(2048).unwrap();
        let kea = RsaKeyEncryption::new("RSA1_5", RsaScheme::Pkcs1v15);
        let cea = cea();
        let cek = kea
            .unwrap(&key, &cea, &JoseHeader::default(), &[0u8; 256])
            .unwrap();
        assert_eq!(cek.len(), cea.key_len());
    }
}
