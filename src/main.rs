// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{error::Error, net::SocketAddr, sync::Arc};

use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relational_token_auth::{
    api::router,
    audit::JsonlAuditSink,
    config::{ServerConfig, TokenConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    jose::{EcCurve, JoseError, Jwk},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let server = ServerConfig::from_env();
    let mut config = TokenConfig::from_env()?;
    if !config.has_signing_key() {
        warn!(
            alg = %config.dsa,
            "No signing key configured; using a random one. Tokens will not survive a restart"
        );
        config.signing_key = ephemeral_signing_key(&config.dsa)?;
    }
    info!(
        issuer = %config.issuer,
        token_type = %config.token_type,
        lifetime = config.lifetime,
        "Token configuration loaded"
    );

    let mut state = AppState::in_memory(config);
    if let Some(path) = &server.audit_log_path {
        state = state.with_audit(Arc::new(JsonlAuditSink::open(path)?));
        info!(path = %path.display(), "Audit events written to file");
    }
    if let Some((username, password)) = &server.demo_user {
        let identity = state.register_user(username, password)?;
        info!(user_id = identity.id, username = %identity.username, "Demo user seeded");
    }

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Token auth server listening on http://{addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

/// A throwaway key usable with `alg`.
fn ephemeral_signing_key(alg: &str) -> Result<Jwk, JoseError> {
    Ok(match alg {
        "ES256" => Jwk::generate_ec(EcCurve::P256),
        "ES384" => Jwk::generate_ec(EcCurve::P384),
        "ES512" => Jwk::generate_ec(EcCurve::P521),
        "EdDSA" => Jwk::generate_ed25519(),
        a if a.starts_with("RS") || a.starts_with("PS") => Jwk::generate_rsa(2048)?,
        _ => Jwk::generate_octet(64),
    })
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
