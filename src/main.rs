// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, time::Duration};

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bank_cards_server::{
    api::router,
    auth::TokenService,
    cards::CardCipher,
    config::{AppConfig, LogFormat, TlsPaths, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::Database,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_on_ctrl_c(handle: Handle<SocketAddr>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

/// Serve `app` on `addr` until `handle` is shut down.
async fn serve(
    app: Router,
    addr: SocketAddr,
    tls: Option<&TlsPaths>,
    handle: Handle<SocketAddr>,
) -> std::io::Result<()> {
    match tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            tracing::info!(%addr, "Bank cards server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            tracing::warn!(%addr, "TLS not configured; serving plain HTTP (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    }
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("Invalid configuration");
    init_tracing(config.log_format);
    tracing::debug!(?config, "Loaded configuration");

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let database_path = config.database_path();
    let db = Database::open(&database_path).expect("Failed to open database");
    tracing::info!(path = %database_path.display(), "Database opened");

    let tokens = TokenService::new(
        &config.jwt_secret,
        config.token_ttl(),
        config.jwt_allow_insecure_secret,
    )
    .expect("Invalid JWT secret");
    let cipher = CardCipher::new(&config.card_encryption_secret, &config.card_encryption_salt)
        .expect("Invalid card encryption key material");

    let state = AppState::new(db, tokens, cipher);

    if let Some(admin) = &config.admin {
        state
            .auth
            .bootstrap_admin(admin)
            .expect("Failed to create bootstrap admin");
    }

    let app = router(state);
    let addr = config.bind_addr().expect("Failed to parse bind address");

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    serve(app, addr, config.tls.as_ref(), handle)
        .await
        .expect("Server failed");
}
