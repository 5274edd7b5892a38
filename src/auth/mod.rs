// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Stateless authentication on top of the token engine.
//!
//! ## Auth Flow
//!
//! 1. Client posts credentials to `/auth/login`
//! 2. `Authenticator::attempt` validates them and issues a token whose `sub`
//!    is the identity id
//! 3. Client sends `Authorization: Bearer <token>`
//! 4. `Authenticator::check`:
//!    - verifies (or decrypts) the token
//!    - validates issuer, time and audience claims
//!    - resolves `sub` → identity through the `IdentityStore`
//!
//! ## Security
//!
//! - Passwords are zeroed as soon as validation finishes
//! - Structural and cryptographic failures are reported only as "invalid token"
//! - Every check is recorded to the audit sink with client IP and user agent

pub mod authenticator;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod result;

pub use authenticator::{bearer_token, Authenticator, RequestContext};
pub use credentials::{
    CredentialFailure, CredentialValidator, Credentials, PasswordHasher, StoreCredentialValidator,
    UnixCryptHasher,
};
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use identity::{Identity, IdentityStore, InMemoryIdentityStore, StoreError};
pub use result::{AuthInfo, AuthResult};
