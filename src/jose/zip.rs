// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Payload compression (JWE `zip`).

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use super::error::JoseError;

/// Largest payload a compressed token may inflate to.
pub const MAX_DECOMPRESSED_LEN: u64 = 256 * 1024;

/// A JWE compression method.
pub trait CompressionMethod: Send + Sync {
    /// `zip` header value.
    fn id(&self) -> &str;

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, JoseError>;

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, JoseError>;
}

/// `DEF`: raw DEFLATE (RFC 1951), no zlib or gzip framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deflate;

impl CompressionMethod for Deflate {
    fn id(&self) -> &str {
        "DEF"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, JoseError> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(data)
            .map_err(|e| JoseError::Compression(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| JoseError::Compression(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, JoseError> {
        let mut inflated = Vec::new();
        DeflateDecoder::new(data)
            .take(MAX_DECOMPRESSED_LEN + 1)
            .read_to_end(&mut inflated)
            .map_err(|e| JoseError::Compression(e.to_string()))?;
        if inflated.len() as u64 > MAX_DECOMPRESSED_LEN {
            return Err(JoseError::Compression("payload exceeds size limit".to_string()));
        }
        Ok(inflated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deflate_round_trip() {
        let data = br#"{"iss":"Shield","sub":42,"iss2":"Shield","iss3":"Shield"}"#;
        let packed = Deflate.compress(data).unwrap();
        assert_eq!(Deflate.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn output_is_raw_deflate() {
        let packed = Deflate.compress(b"hello").unwrap();
        let mut out = Vec::new();
        flate2::read::DeflateDecoder::new(&packed[..])
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"hello");
        // No zlib header (0x78 ..).
        assert_ne!(packed[0], 0x78);
    }

    #[test]
    fn decompression_bomb_is_rejected() {
        let packed = Deflate
            .compress(&vec![b'a'; MAX_DECOMPRESSED_LEN as usize + 10])
            .unwrap();
        assert!(matches!(
            Deflate.decompress(&packed),
            Err(JoseError::Compression(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Deflate.decompress(&[0xff, 0xff, 0xff]).is_err());
    }
}
