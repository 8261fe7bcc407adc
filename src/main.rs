// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, sync::Arc};

use panic_button_api::{
    api::router,
    config::{Config, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    state::AppState,
    store::InMemoryUserStore,
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;
    info!(config = ?config, "Configuration loaded");

    let state = AppState::new(&config, Arc::new(InMemoryUserStore::new()))?;
    if state.jwks.is_caching() {
        info!(ttl = ?config.jwks_cache_ttl, "JWKS caching enabled");
    }
    let app = router(state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!(
        address = %config.bind_address,
        "Panic Button API listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

/// JSON logs when `LOG_FORMAT=json`, human-readable otherwise.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = env::var(LOG_FORMAT_ENV)
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for SIGINT"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
