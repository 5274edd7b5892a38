// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;
use tracing::info;

use crate::audit::{AuditEvent, AuditEventType};
use crate::auth::{Auth, AuthError, AuthInfo, Credentials, Identity, RequestContext};
use crate::error::ApiError;
use crate::state::AppState;
use crate::token::{Subject, TokenType};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub identity: Identity,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub identity: Identity,
    pub token_type: TokenType,
}

/// Exchange credentials for a token.
pub async fn login(
    State(state): State<AppState>,
    request: RequestContext,
    Json(mut credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, AuthError> {
    let mut authenticator = state.authenticator(request);
    let result = authenticator.attempt(&mut credentials)?;

    let AuthInfo::Token(token) = result.into_result()? else {
        return Err(AuthError::InternalError("login produced no token".to_string()));
    };
    let identity = authenticator
        .user()
        .cloned()
        .ok_or(AuthError::InvalidUser)?;

    Ok(Json(LoginResponse { identity, token }))
}

/// Create an identity and log it in.
pub async fn register(
    State(state): State<AppState>,
    request: RequestContext,
    Json(mut credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let identity = state.register(&mut credentials).map_err(|e| match e {
        AuthError::BadAttempt => ApiError::bad_request("username and password are required"),
        other => other.into(),
    })?;
    info!(user_id = identity.id, "Identity registered");

    let mut authenticator = state.authenticator(request);
    authenticator.login(identity.clone());
    let audience = state.engine.config().audience.clone();
    let token = authenticator
        .engine()
        .issue(Some(Subject::Id(identity.id)), audience)
        .map_err(AuthError::from)?;

    state.audit.record(
        &AuditEvent::new(AuditEventType::Registered)
            .with_user(identity.id.to_string())
            .with_ip(authenticator.request().ip.clone())
            .with_user_agent(authenticator.request().user_agent.clone()),
    );

    Ok((StatusCode::CREATED, Json(LoginResponse { identity, token })))
}

/// The identity behind the bearer token, and the kind of token it used.
pub async fn profile(
    Auth(identity): Auth,
    Extension(token_type): Extension<TokenType>,
) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        identity,
        token_type,
    })
}
