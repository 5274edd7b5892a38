// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed tokens must be readable by, and accept tokens from, an
//! independent JWT implementation.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{json, Value};

use relational_token_auth::config::TokenConfig;
use relational_token_auth::jose::{AlgorithmRegistry, Jwk};
use relational_token_auth::token::{FixedClock, Subject, TokenEngine, TokenError};

const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef0123456789abcdef";

fn engine(dsa: &str) -> TokenEngine {
    let config = TokenConfig {
        dsa: dsa.to_string(),
        signing_key: Jwk::octet(SECRET),
        lifetime: 600,
        ..TokenConfig::default()
    };
    let clock = Arc::new(FixedClock::new(chrono::Utc::now().timestamp()));
    TokenEngine::with_parts(config, Arc::new(AlgorithmRegistry::new()), clock)
}

fn validation(alg: Algorithm) -> Validation {
    let mut validation = Validation::new(alg);
    validation.set_issuer(&["Shield"]);
    validation
}

#[test]
fn our_hs256_token_verifies_with_jsonwebtoken() {
    let mut engine = engine("HS256");
    let token = engine.issue(Some(Subject::Id(42)), None).unwrap();

    let data = decode::<Value>(
        &token,
        &DecodingKey::from_secret(SECRET),
        &validation(Algorithm::HS256),
    )
    .unwrap();
    assert_eq!(data.header.alg, Algorithm::HS256);
    assert_eq!(data.claims["sub"], 42);
    assert_eq!(data.claims["iss"], "Shield");
}

#[test]
fn our_hs384_token_verifies_with_jsonwebtoken() {
    let mut engine = engine("HS384");
    let token = engine.issue(Some(Subject::Name("alice".into())), None).unwrap();

    let data = decode::<Value>(
        &token,
        &DecodingKey::from_secret(SECRET),
        &validation(Algorithm::HS384),
    )
    .unwrap();
    assert_eq!(data.claims["sub"], "alice");
}

#[test]
fn jsonwebtoken_token_loads() {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "iss": "Shield",
        "iat": now,
        "nbf": now,
        "exp": now + 600,
        "sub": 7,
        "role": "admin",
    });
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    let mut engine = engine("HS256");
    let parsed = engine.load(&token).unwrap();
    assert_eq!(parsed.claims.sub, Some(Subject::Id(7)));
    assert_eq!(parsed.claims.extra["role"], "admin");
    assert_eq!(engine.serialize(None).unwrap(), token);
}

#[test]
fn jsonwebtoken_token_with_other_algorithm_is_rejected() {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({"iss": "Shield", "iat": now, "nbf": now, "exp": now + 600});
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    let mut engine = engine("HS256");
    assert!(matches!(engine.load(&token), Err(TokenError::Invalid)));
}

#[test]
fn jsonwebtoken_token_without_nbf_is_missing_a_claim() {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({"iss": "Shield", "iat": now, "exp": now + 600});
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    let mut engine = engine("HS256");
    assert!(matches!(engine.load(&token), Err(TokenError::Claims(_))));
}
