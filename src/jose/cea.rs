// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content encryption algorithms (JWE `enc`).
//!
//! Both families are AEAD constructions: the encoded protected header is the
//! additional authenticated data and the tag travels in the last compact
//! segment.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

use super::error::JoseError;
use super::hash::{hmac, hmac_verify, ShaVariant};

type Aes192Gcm = AesGcm<Aes192, U12>;

const GCM_IV_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;
const CBC_IV_LEN: usize = 16;

/// A JWE content encryption algorithm.
pub trait ContentEncryptionAlgorithm: Send + Sync {
    /// Canonical `enc` identifier.
    fn id(&self) -> &str;

    /// Content encryption key length in bytes.
    fn key_len(&self) -> usize;

    /// Initialization vector length in bytes.
    fn iv_len(&self) -> usize;

    /// Encrypt `plaintext`, returning `(ciphertext, tag)`.
    fn encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JoseError>;

    /// Authenticate and decrypt. The tag is checked before any plaintext is
    /// produced.
    fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JoseError>;

    /// Fresh random content encryption key.
    fn generate_cek(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(random_bytes(self.key_len()))
    }

    /// Fresh random IV.
    fn generate_iv(&self) -> Vec<u8> {
        random_bytes(self.iv_len())
    }
}

/// `len` bytes from the OS random source.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

// =============================================================================
// AES-GCM
// =============================================================================

macro_rules! gcm_seal {
    ($cipher:ty, $key:expr, $iv:expr, $aad:expr, $plaintext:expr) => {{
        let cipher = <$cipher>::new_from_slice($key)
            .map_err(|_| JoseError::invalid_key("AES-GCM", "bad key length"))?;
        let mut buffer = $plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice($iv), $aad, &mut buffer)
            .map_err(|_| JoseError::Crypto("aes-gcm encryption failed"))?;
        (buffer, tag.to_vec())
    }};
}

macro_rules! gcm_open {
    ($cipher:ty, $key:expr, $iv:expr, $aad:expr, $ciphertext:expr, $tag:expr) => {{
        let cipher = <$cipher>::new_from_slice($key)
            .map_err(|_| JoseError::invalid_key("AES-GCM", "bad key length"))?;
        let mut buffer = $ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice($iv),
                $aad,
                &mut buffer,
                GenericArray::from_slice($tag),
            )
            .map_err(|_| JoseError::Crypto("aes-gcm authentication failed"))?;
        buffer
    }};
}

/// AES-GCM encryption with a detached tag; the key size selects AES-128/192/256.
pub(crate) fn gcm_encrypt(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
    if iv.len() != GCM_IV_LEN {
        return Err(JoseError::Crypto("aes-gcm iv must be 96 bits"));
    }
    let sealed = match key.len() {
        16 => gcm_seal!(Aes128Gcm, key, iv, aad, plaintext),
        24 => gcm_seal!(Aes192Gcm, key, iv, aad, plaintext),
        32 => gcm_seal!(Aes256Gcm, key, iv, aad, plaintext),
        _ => return Err(JoseError::invalid_key("AES-GCM", "key must be 128, 192 or 256 bits")),
    };
    Ok(sealed)
}

/// Inverse of [`gcm_encrypt`].
pub(crate) fn gcm_decrypt(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, JoseError> {
    if iv.len() != GCM_IV_LEN || tag.len() != GCM_TAG_LEN {
        return Err(JoseError::Crypto("aes-gcm iv or tag has the wrong length"));
    }
    let opened = match key.len() {
        16 => gcm_open!(Aes128Gcm, key, iv, aad, ciphertext, tag),
        24 => gcm_open!(Aes192Gcm, key, iv, aad, ciphertext, tag),
        32 => gcm_open!(Aes256Gcm, key, iv, aad, ciphertext, tag),
        _ => return Err(JoseError::invalid_key("AES-GCM", "key must be 128, 192 or 256 bits")),
    };
    Ok(opened)
}

/// A128GCM, A192GCM and A256GCM.
#[derive(Debug, Clone, Copy)]
pub struct AesGcmContent {
    id: &'static str,
    key_len: usize,
}

impl AesGcmContent {
    pub const fn new(id: &'static str, key_len: usize) -> Self {
        Self { id, key_len }
    }

    fn check_key(&self, cek: &[u8]) -> Result<(), JoseError> {
        if cek.len() != self.key_len {
            return Err(JoseError::invalid_key(
                self.id,
                format!("content key must be {} bytes", self.key_len),
            ));
        }
        Ok(())
    }
}

impl ContentEncryptionAlgorithm for AesGcmContent {
    fn id(&self) -> &str {
        self.id
    }

    fn key_len(&self) -> usize {
        self.key_len
    }

    fn iv_len(&self) -> usize {
        GCM_IV_LEN
    }

    fn encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
        self.check_key(cek)?;
        gcm_encrypt(cek, iv, aad, plaintext)
    }

    fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JoseError> {
        self.check_key(cek)?;
        gcm_decrypt(cek, iv, aad, ciphertext, tag)
    }
}

// =============================================================================
// AES-CBC + HMAC-SHA-2 (RFC 7518 section 5.2)
// =============================================================================

/// A128CBC-HS256, A192CBC-HS384 and A256CBC-HS512.
///
/// The CEK is split in half: the first half keys the HMAC, the second half
/// keys AES-CBC. The tag is the first half of
/// `HMAC(AAD || IV || ciphertext || AL)` where `AL` is the AAD length in bits
/// as a 64-bit big-endian integer.
#[derive(Debug, Clone, Copy)]
pub struct AesCbcHmacContent {
    id: &'static str,
    hash: ShaVariant,
}

impl AesCbcHmacContent {
    pub const fn new(id: &'static str, hash: ShaVariant) -> Self {
        Self { id, hash }
    }

    fn half(&self) -> usize {
        self.hash.output_len() / 2
    }

    fn split_key<'k>(&self, cek: &'k [u8]) -> Result<(&'k [u8], &'k [u8]), JoseError> {
        if cek.len() != self.key_len() {
            return Err(JoseError::invalid_key(
                self.id,
                format!("content key must be {} bytes", self.key_len()),
            ));
        }
        Ok(cek.split_at(self.half()))
    }

    fn mac_input_len(aad: &[u8]) -> [u8; 8] {
        ((aad.len() as u64) * 8).to_be_bytes()
    }
}

macro_rules! cbc_encrypt {
    ($cipher:ty, $key:expr, $iv:expr, $plaintext:expr) => {
        cbc::Encryptor::<$cipher>::new_from_slices($key, $iv)
            .map(|enc| enc.encrypt_padded_vec_mut::<Pkcs7>($plaintext))
            .map_err(|_| JoseError::Crypto("aes-cbc key or iv has the wrong length"))
    };
}

macro_rules! cbc_decrypt {
    ($cipher:ty, $key:expr, $iv:expr, $ciphertext:expr) => {
        cbc::Decryptor::<$cipher>::new_from_slices($key, $iv)
            .map_err(|_| JoseError::Crypto("aes-cbc key or iv has the wrong length"))
            .and_then(|dec| {
                dec.decrypt_padded_vec_mut::<Pkcs7>($ciphertext)
                    .map_err(|_| JoseError::Crypto("aes-cbc padding is invalid"))
            })
    };
}

impl ContentEncryptionAlgorithm for AesCbcHmacContent {
    fn id(&self) -> &str {
        self.id
    }

    fn key_len(&self) -> usize {
        self.hash.output_len()
    }

    fn iv_len(&self) -> usize {
        CBC_IV_LEN
    }

    fn encrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), JoseError> {
        let (mac_key, enc_key) = self.split_key(cek)?;
        let ciphertext = match self.hash {
            ShaVariant::Sha256 => cbc_encrypt!(Aes128, enc_key, iv, plaintext),
            ShaVariant::Sha384 => cbc_encrypt!(Aes192, enc_key, iv, plaintext),
            ShaVariant::Sha512 => cbc_encrypt!(Aes256, enc_key, iv, plaintext),
        }?;

        let al = Self::mac_input_len(aad);
        let mut tag = hmac(self.hash, mac_key, &[aad, iv, &ciphertext, &al])
            .ok_or(JoseError::Crypto("hmac computation failed"))?;
        tag.truncate(self.half());
        Ok((ciphertext, tag))
    }

    fn decrypt(
        &self,
        cek: &[u8],
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, JoseError> {
        let (mac_key, enc_key) = self.split_key(cek)?;
        let al = Self::mac_input_len(aad);
        if tag.len() != self.half()
            || !hmac_verify(self.hash, mac_key, &[aad, iv, ciphertext, &al], tag)
        {
            return Err(JoseError::Crypto("authentication tag mismatch"));
        }

        match self.hash {
            ShaVariant::Sha256 => cbc_decrypt!(Aes128, enc_key, iv, ciphertext),
            ShaVariant::Sha384 => cbc_decrypt!(Aes192, enc_key, iv, ciphertext),
            ShaVariant::Sha512 => cbc_decrypt!(Aes256, enc_key, iv, ciphertext),
        }
    }
}
