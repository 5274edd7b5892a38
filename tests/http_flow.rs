// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login and bearer authentication through the HTTP router.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use relational_token_auth::api::router;
use relational_token_auth::audit::{AuditEventType, JsonlAuditSink};
use relational_token_auth::config::TokenConfig;
use relational_token_auth::jose::Jwk;
use relational_token_auth::state::AppState;
use relational_token_auth::token::{TokenType, DEFAULT_RECIPIENT};

fn encrypted_config() -> TokenConfig {
    TokenConfig {
        token_type: TokenType::Encrypted,
        recipients: BTreeMap::from([(DEFAULT_RECIPIENT.to_string(), Jwk::generate_octet(32))]),
        ..TokenConfig::default()
    }
}

fn app(config: TokenConfig, audit: Arc<JsonlAuditSink>) -> Router {
    let state = AppState::in_memory(config).with_audit(audit);
    state.register_user("alice", "s3cret").unwrap();
    router(state)
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"username": "alice", "password": "s3cret"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await["token"]
        .as_str()
        .unwrap()
        .to_string()
}

fn profile_request(authorization: &str) -> Request<Body> {
    Request::builder()
        .uri("/auth/profile")
        .header(header::AUTHORIZATION, authorization)
        .header(header::USER_AGENT, "integration/1.0")
        .header("x-forwarded-for", "198.51.100.4")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn encrypted_token_round_trip_over_http() {
    let temp = TempDir::new().unwrap();
    let audit = Arc::new(JsonlAuditSink::open(temp.path().join("audit.jsonl")).unwrap());
    let app = app(encrypted_config(), audit.clone());

    let token = login(&app).await;
    assert_eq!(token.split('.').count(), 5);

    let response = app
        .clone()
        .oneshot(profile_request(&format!("Bearer {token}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["identity"]["username"], "alice");
    assert_eq!(body["token_type"], "encrypted");

    let events = audit.read_events().unwrap();
    let accepted = events
        .iter()
        .find(|e| e.event_type == AuditEventType::TokenAccepted)
        .unwrap();
    assert_eq!(accepted.ip_address.as_deref(), Some("198.51.100.4"));
    assert_eq!(accepted.user_agent.as_deref(), Some("integration/1.0"));
}

#[tokio::test]
async fn token_without_bearer_prefix_is_accepted() {
    let temp = TempDir::new().unwrap();
    let audit = Arc::new(JsonlAuditSink::open(temp.path().join("audit.jsonl")).unwrap());
    let app = app(encrypted_config(), audit);

    let token = login(&app).await;
    let response = app.oneshot(profile_request(&token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejected_tokens_are_audited() {
    let temp = TempDir::new().unwrap();
    let audit = Arc::new(JsonlAuditSink::open(temp.path().join("audit.jsonl")).unwrap());
    let app = app(
        TokenConfig {
            signing_key: Jwk::generate_octet(32),
            ..TokenConfig::default()
        },
        audit.clone(),
    );

    let response = app
        .oneshot(profile_request("Bearer a.b.c"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "invalid token");

    let events = audit.read_events().unwrap();
    let rejected = events.last().unwrap();
    assert_eq!(rejected.event_type, AuditEventType::TokenRejected);
    assert!(!rejected.success);
    assert_eq!(rejected.error.as_deref(), Some("invalid token"));
}

#[tokio::test]
async fn login_without_password_is_bad_attempt() {
    let temp = TempDir::new().unwrap();
    let audit = Arc::new(JsonlAuditSink::open(temp.path().join("audit.jsonl")).unwrap());
    let app = app(encrypted_config(), audit);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"username": "alice"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "bad attempt");
}
