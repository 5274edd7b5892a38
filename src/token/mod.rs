// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token lifecycle: claims, the two codecs, and the engine that dispatches
//! between them.
//!
//! ## Verification order
//!
//! `load` always runs the structural and cryptographic checks first (segment
//! count, header, signature or decryption) and only then parses and
//! validates the claims. Every failure before the claims collapses into
//! [`TokenError::Invalid`]; claim failures keep their own [`ClaimError`].

pub mod claims;
pub mod codec;
pub mod encrypted;
pub mod engine;
pub mod error;
pub mod model;
pub mod signed;

pub use claims::{ClaimsBuilder, ClaimsSet, ClaimsValidator, Clock, FixedClock, Subject, SystemClock};
pub use codec::{CodecCommand, TokenCodec};
pub use encrypted::{EncryptedTokenCodec, DEFAULT_RECIPIENT};
pub use engine::{Codec, TokenEngine};
pub use error::{ClaimError, TokenError};
pub use model::{EncryptedToken, ParsedToken, SignedToken, Token, TokenType};
pub use signed::SignedTokenCodec;
