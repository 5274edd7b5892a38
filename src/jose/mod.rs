// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JOSE primitives used by the token codecs.
//!
//! This is deliberately not a general JOSE library: one protected header, one
//! recipient, compact serialization only.
//!
//! - `registry` - `(family, id)` to algorithm factory
//! - `dsa` - JWS signature algorithms
//! - `kea` - JWE key management algorithms
//! - `cea` - JWE content encryption algorithms
//! - `zip` - JWE payload compression
//! - `jwk` - key material
//! - `header` - the protected header
//! - `compact` - base64url segments

pub mod cea;
pub mod compact;
pub mod dsa;
pub mod error;
pub mod hash;
pub mod header;
pub mod jwk;
pub mod kea;
pub mod registry;
pub mod zip;

pub use cea::ContentEncryptionAlgorithm;
pub use dsa::SignatureAlgorithm;
pub use error::JoseError;
pub use header::JoseHeader;
pub use jwk::{EcCurve, Jwk};
pub use kea::{KeyEncryptionAlgorithm, WrappedKey};
pub use registry::{Algorithm, AlgorithmFactory, AlgorithmFamily, AlgorithmRegistry};
pub use zip::CompressionMethod;
