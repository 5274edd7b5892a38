// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed tokens (JWS compact serialization).

use std::sync::{Arc, RwLock};

use tracing::debug;

use super::claims::{ClaimsSet, ClaimsValidator};
use super::codec::{read, write, CodecCommand, TokenCodec};
use super::error::TokenError;
use super::model::{ParsedToken, SignedToken, Token, TokenType};
use crate::jose::compact::{b64_decode, b64_encode, split};
use crate::jose::{AlgorithmRegistry, JoseHeader, Jwk, SignatureAlgorithm};

struct SignedState {
    algorithm: Arc<dyn SignatureAlgorithm>,
    key: Jwk,
}

/// JWS codec: one signing key, one active signature algorithm.
pub struct SignedTokenCodec {
    registry: Arc<AlgorithmRegistry>,
    validator: ClaimsValidator,
    state: RwLock<SignedState>,
}

impl SignedTokenCodec {
    pub fn new(
        registry: Arc<AlgorithmRegistry>,
        algorithm: &str,
        key: Jwk,
        validator: ClaimsValidator,
    ) -> Result<Self, TokenError> {
        let algorithm = registry.signature(algorithm)?;
        Ok(Self {
            registry,
            validator,
            state: RwLock::new(SignedState {
                algorithm,
                key,
            }),
        })
    }

    /// Id of the active signature algorithm.
    pub fn algorithm(&self) -> String {
        read(&self.state).algorithm.id().to_string()
    }

    pub fn set_algorithm(&self, id: &str) -> Result<(), TokenError> {
        let algorithm = self.registry.signature(id)?;
        debug!(alg = algorithm.id(), "Signature algorithm selected");
        write(&self.state).algorithm = algorithm;
        Ok(())
    }

    pub fn set_key(&self, key: Jwk) {
        write(&self.state).key = key;
    }

    fn snapshot(&self) -> (Arc<dyn SignatureAlgorithm>, Jwk) {
        let state = read(&self.state);
        (state.algorithm.clone(), state.key.clone())
    }
}

impl TokenCodec for SignedTokenCodec {
    fn token_type(&self) -> TokenType {
        TokenType::Signed
    }

    fn create(&self, claims: &ClaimsSet) -> Result<Token, TokenError> {
        let (algorithm, key) = self.snapshot();
        let payload = claims.to_payload()?;

        let header = JoseHeader::signed(algorithm.id());
        let encoded_header = header.encode().map_err(TokenError::creation)?;
        let signing_input = format!("{encoded_header}.{}", b64_encode(&payload));
        let signature = algorithm
            .sign(&key, signing_input.as_bytes())
            .map_err(TokenError::creation)?;
        let compact = format!("{signing_input}.{}", b64_encode(&signature));

        debug!(alg = algorithm.id(), "Signed token created");
        Ok(Token::Signed(SignedToken {
            header,
            payload,
            signature,
            compact,
        }))
    }

    fn load(&self, token: &str) -> Result<ParsedToken, TokenError> {
        let (algorithm, key) = self.snapshot();

        let [encoded_header, encoded_payload, encoded_signature] =
            split::<3>(token).map_err(TokenError::invalid)?;
        let header = JoseHeader::decode(encoded_header).map_err(TokenError::invalid)?;
        if header.alg != algorithm.id() {
            debug!(expected = algorithm.id(), found = %header.alg, "Rejected token algorithm");
            return Err(TokenError::Invalid);
        }

        let signature = b64_decode(encoded_signature).map_err(TokenError::invalid)?;
        let signing_input = &token[..encoded_header.len() + 1 + encoded_payload.len()];
        algorithm
            .verify(&key, signing_input.as_bytes(), &signature)
            .map_err(TokenError::invalid)?;

        // Claims are only looked at once the signature holds.
        let payload = b64_decode(encoded_payload).map_err(TokenError::invalid)?;
        let claims = ClaimsSet::from_payload(&payload)?;
        self.validator.validate(&claims)?;

        let token = Token::Signed(SignedToken {
            header,
            payload,
            signature,
            compact: token.to_string(),
        });
        Ok(ParsedToken { token, claims })
    }

    fn apply(&self, command: CodecCommand) -> Result<(), TokenError> {
        match command {
            CodecCommand::SetSignatureAlgorithm(id) => self.set_algorithm(&id),
            CodecCommand::SetSigningKey(key) => {
                self.set_key(key);
                Ok(())
            }
            other => Err(other.unsupported(TokenType::Signed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::claims::{ClaimsBuilder, FixedClock, Subject};
    use crate::token::error::ClaimError;

    const NOW: i64 = 1_700_000_000;

    fn codec(alg: &str, key: Jwk) -> (SignedTokenCodec, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(NOW));
        let validator = ClaimsValidator::new("Shield", clock.clone());
        let codec =
            SignedTokenCodec::new(Arc::new(AlgorithmRegistry::new()), alg, key, validator).unwrap();
        (codec, clock)
    }

    fn claims(clock: Arc<FixedClock>) -> ClaimsSet {
        ClaimsBuilder::new("Shield", clock).build(Some(Subject::Id(42)), None, 3600)
    }

    #[test]
    fn create_then_load() {
        let (codec, clock) = codec("HS256", Jwk::generate_octet(32));
        let token = codec.create(&claims(clock)).unwrap().into_compact();
        assert_eq!(token.split('.').count(), 3);

        let parsed = codec.load(&token).unwrap();
        assert_eq!(parsed.claims.sub, Some(Subject::Id(42)));
        assert_eq!(parsed.header().typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn loaded_token_keeps_its_compact_form() {
        let (codec, clock) = codec("ES256", Jwk::generate_ec(crate::jose::EcCurve::P256));
        let created = codec.create(&claims(clock)).unwrap();
        let parsed = codec.load(created.compact()).unwrap();
        assert_eq!(parsed.token, created);
    }

    #[test]
    fn header_algorithm_must_match_active_one() {
        let key = Jwk::generate_octet(64);
        let (hs512, clock) = codec("HS512", key.clone());
        let token = hs512.create(&claims(clock)).unwrap().into_compact();

        let (hs256, _) = codec("HS256", key);
        assert!(matches!(hs256.load(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn unsecured_token_is_rejected_by_hmac_codec() {
        let key = Jwk::generate_octet(32);
        let (none, clock) = codec("none", key.clone());
        let token = none.create(&claims(clock)).unwrap().into_compact();
        assert!(token.ends_with('.'));

        let (hs256, _) = codec("HS256", key);
        assert!(matches!(hs256.load(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn flipped_signature_byte_is_invalid() {
        let (codec, clock) = codec("HS256", Jwk::generate_octet(32));
        let token = codec.create(&claims(clock)).unwrap().into_compact();
        let [h, p, s] = split::<3>(&token).unwrap();
        let mut signature = b64_decode(s).unwrap();
        signature[5] ^= 0x01;
        let tampered = format!("{h}.{p}.{}", b64_encode(&signature));
        assert!(matches!(codec.load(&tampered), Err(TokenError::Invalid)));
    }

    #[test]
    fn expired_token_reports_claim_error() {
        let (codec, clock) = codec("HS256", Jwk::generate_octet(32));
        let token = codec.create(&claims(clock.clone())).unwrap().into_compact();
        clock.advance(3601);
        assert!(matches!(
            codec.load(&token),
            Err(TokenError::Claims(ClaimError::Expired))
        ));
    }

    #[test]
    fn set_algorithm_requires_a_signature_algorithm() {
        let (codec, _) = codec("HS256", Jwk::generate_octet(32));
        assert!(matches!(
            codec.apply(CodecCommand::SetSignatureAlgorithm("A256KW".into())),
            Err(TokenError::UnknownAlgorithm { .. })
        ));
        codec
            .apply(CodecCommand::SetSignatureAlgorithm("HS384".into()))
            .unwrap();
        assert_eq!(codec.algorithm(), "HS384");
    }

    #[test]
    fn encryption_commands_are_unknown_operations() {
        let (codec, _) = codec("HS256", Jwk::generate_octet(32));
        let err = codec
            .apply(CodecCommand::SetCompression(None))
            .unwrap_err();
        assert!(matches!(err, TokenError::UnknownOperation { operation: "set_compression", .. }));
    }

    #[test]
    fn wrong_key_type_fails_creation() {
        let (codec, clock) = codec("RS256", Jwk::generate_octet(32));
        assert!(matches!(
            codec.create(&claims(clock)),
            Err(TokenError::Creation(_))
        ));
    }
}
