// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod auth;
pub mod health;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/profile", get(auth::profile));

    Router::new()
        .route("/health", get(health::liveness))
        .nest("/auth", auth_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::jose::Jwk;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::in_memory(TokenConfig {
            signing_key: Jwk::generate_octet(32),
            ..TokenConfig::default()
        });
        state.register_user("alice", "s3cret").unwrap();
        router(state)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn login_then_profile() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                json!({"username": "alice", "password": "s3cret"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["identity"]["username"], "alice");
        assert!(body["identity"].get("password_hash").is_none());
        let token = body["token"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/profile")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["identity"]["username"], "alice");
        assert_eq!(body["token_type"], "signed");
    }

    #[tokio::test]
    async fn wrong_password_is_401_with_reason() {
        let response = app()
            .oneshot(post_json(
                "/auth/login",
                json!({"username": "alice", "password": "nope"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid password");
        assert_eq!(body["error_code"], "invalid_password");
    }

    #[tokio::test]
    async fn profile_without_token_is_401() {
        let response = app()
            .oneshot(Request::builder().uri("/auth/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "missing_token");
    }

    #[tokio::test]
    async fn register_creates_and_conflicts() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/register",
                json!({"username": "bob", "password": "hunter2", "email": "bob@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["identity"]["email"], "bob@example.com");
        assert!(body["token"].as_str().is_some());

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/register",
                json!({"username": "bob", "password": "other"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .oneshot(post_json("/auth/register", json!({"username": "carol"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
