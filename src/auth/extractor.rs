// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated identities.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is the resolved Identity
//! }
//! ```
//!
//! Once `Auth` succeeded, the type of the token that authenticated the
//! request is available to later extractors as `Extension<TokenType>`.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{
        header::{AUTHORIZATION, USER_AGENT},
        request::Parts,
    },
};

use super::{AuthError, AuthInfo, Identity, RequestContext};
use crate::state::AppState;
use crate::token::Token;

const FORWARDED_FOR: &str = "x-forwarded-for";

impl RequestContext {
    /// Authorization header, client IP and user agent of a request.
    ///
    /// The IP comes from the first `X-Forwarded-For` entry, falling back to
    /// the peer address when the server was started with connect info.
    pub fn from_parts(parts: &Parts) -> Self {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let forwarded = header(FORWARDED_FOR)
            .and_then(|value| value.split(',').next().map(|ip| ip.trim().to_string()))
            .filter(|ip| !ip.is_empty());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            authorization: header(AUTHORIZATION.as_str()),
            ip: forwarded.or(peer),
            user_agent: header(USER_AGENT.as_str()),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_parts(parts))
    }
}

/// Extractor for authenticated identities.
///
/// Runs `Authenticator::check` on the request's `Authorization` header and
/// rejects with the failure reason.
pub struct Auth(pub Identity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A previous extractor on this request already resolved the identity
        if let Some(identity) = parts.extensions.get::<Identity>().cloned() {
            return Ok(Auth(identity));
        }

        let request = RequestContext::from_parts(parts);
        let header = request.authorization.clone().unwrap_or_default();
        let mut authenticator = state.authenticator(request);

        match authenticator.check(&header)?.into_result()? {
            AuthInfo::Identity(identity) => {
                let verified = authenticator.engine().last_token().map(Token::token_type);
                if let Some(token_type) = verified {
                    parts.extensions.insert(token_type);
                }
                parts.extensions.insert(identity.clone());
                Ok(Auth(identity))
            }
            AuthInfo::Token(_) => Err(AuthError::InternalError(
                "token check returned a token".to_string(),
            )),
        }
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct OptionalAuth(pub Option<Identity>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(identity)) => Ok(OptionalAuth(Some(identity))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::config::TokenConfig;
    use crate::jose::Jwk;
    use crate::token::{TokenType, DEFAULT_RECIPIENT};
    use axum::http::Request;

    fn create_test_state() -> AppState {
        let config = TokenConfig {
            signing_key: Jwk::generate_octet(32),
            ..TokenConfig::default()
        };
        let state = AppState::in_memory(config);
        state.register_user("alice", "s3cret").unwrap();
        state
    }

    fn login(state: &AppState) -> String {
        let mut authenticator = state.authenticator(RequestContext::default());
        let mut credentials = Credentials::new()
            .with_field("username", "alice")
            .with_password("s3cret");
        authenticator
            .attempt(&mut credentials)
            .unwrap()
            .token()
            .unwrap()
            .to_string()
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder()
            .uri("/test")
            .header("user-agent", "tests/1.0")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn request_context_reads_headers() {
        let context = RequestContext::from_parts(&parts(Some("Bearer abc")));
        assert_eq!(context.authorization.as_deref(), Some("Bearer abc"));
        assert_eq!(context.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(context.user_agent.as_deref(), Some("tests/1.0"));
    }

    #[tokio::test]
    async fn auth_extractor_requires_token() {
        let state = create_test_state();
        let result = Auth::from_request_parts(&mut parts(None), &state).await;
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_token() {
        let state = create_test_state();
        let token = login(&state);
        let mut parts = parts(Some(&format!("Bearer {token}")));

        let Auth(identity) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(identity.username, "alice");
        assert!(parts.extensions.get::<Identity>().is_some());
        assert_eq!(parts.extensions.get::<TokenType>(), Some(&TokenType::Signed));
    }

    #[tokio::test]
    async fn auth_extractor_records_encrypted_token_type() {
        let config = TokenConfig {
            token_type: TokenType::Encrypted,
            recipients: [(DEFAULT_RECIPIENT.to_string(), Jwk::generate_octet(32))].into(),
            ..TokenConfig::default()
        };
        let state = AppState::in_memory(config);
        state.register_user("alice", "s3cret").unwrap();
        let token = login(&state);
        let mut parts = parts(Some(&format!("Bearer {token}")));

        Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(parts.extensions.get::<TokenType>(), Some(&TokenType::Encrypted));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_tampered_token() {
        let state = create_test_state();
        let mut token = login(&state);
        token.push('x');

        let result = Auth::from_request_parts(&mut parts(Some(&token)), &state).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn optional_auth_never_rejects() {
        let state = create_test_state();
        let OptionalAuth(identity) = OptionalAuth::from_request_parts(&mut parts(None), &state)
            .await
            .unwrap();
        assert!(identity.is_none());
    }
}
