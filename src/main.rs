// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use relational_service_auth::{
    api::router,
    config::{Config, LogFormat, LOG_FORMAT_ENV},
    logging::init_tracing,
    state::AppState,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let log_format = std::env::var(LOG_FORMAT_ENV)
        .map(|v| LogFormat::parse(&v))
        .unwrap_or_default();
    init_tracing(log_format);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    if config.jwt_secret.is_none() {
        warn!("JWT_SECRET not set; bearer tokens will be rejected as misconfigured");
    }

    let state = AppState::from_config(&config).expect("Failed to build service client");

    let shutdown = CancellationToken::new();
    tokio::spawn(state.limiter.clone().run_sweeper(shutdown.clone()));

    let app = router(state);

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .expect("Failed to parse bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");

    info!(
        %addr,
        service_id = %config.service_id,
        auth_service = %config.auth_service_url,
        trusted_proxies = config.trusted_proxies.len(),
        "Relational service auth listening (docs at /docs)"
    );

    let signal = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received");
        signal.cancel();
    })
    .await
    .expect("HTTP server failed");

    shutdown.cancel();
}
