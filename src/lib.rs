// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Token Auth - Stateless Token Authentication Engine
//!
//! Issues self-contained compact JOSE tokens (signed JWS or encrypted JWE)
//! for authenticated identities and authenticates later requests from the
//! bearer token alone, without server-side sessions.
//!
//! ## Modules
//!
//! - `jose` - Algorithm registry and JOSE primitives (JWS/JWE algorithms, JWK)
//! - `token` - Claims, the signed and encrypted codecs, and the token engine
//! - `auth` - Credential validation, the authenticator and axum extractors
//! - `audit` - Authentication audit trail
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod jose;
pub mod state;
pub mod token;
