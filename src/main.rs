// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use flightwatch_server::{
    api::router,
    auth::{AuthConfig, AuthError, JwksManager},
    config::{AppConfig, ConfigError},
    logging::{self, LogFormat},
    state::AppState,
    storage::{build_pool, run_migrations, PgSubscriptionRepository, StorageError},
};

/// Failures that abort startup.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("initial JWKS fetch failed: {}", .0.detail().unwrap_or("unknown error"))]
    Jwks(AuthError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();

    if let Err(e) = logging::init(LogFormat::from_env()) {
        eprintln!("failed to install tracing subscriber: {e}");
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;

    let pool = build_pool(
        &config.database.url,
        config.database.max_connections,
    )
    .await?;
    run_migrations(&pool).await?;
    info!(
        max_connections = config.database.max_connections,
        "Database ready"
    );

    let jwks = Arc::new(JwksManager::new(config.auth.jwks_url()?.as_str())?);
    jwks.refresh().await.map_err(StartupError::Jwks)?;
    info!(jwks_url = jwks.jwks_url(), "Signing keys loaded");

    let shutdown = CancellationToken::new();
    let refresher = tokio::spawn(
        jwks.clone()
            .run_refresh(config.auth.jwks_refresh_interval, shutdown.clone()),
    );

    let state = AppState::new(
        Arc::new(PgSubscriptionRepository::new(pool)),
        AuthConfig::new(jwks, &config.auth),
    );
    let app = router(state, &config.server.cors_allowed_origins);

    let listener = TcpListener::bind(config.server.addr).await?;
    info!(addr = %config.server.addr, "Flightwatch server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    let _ = refresher.await;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and cancels background tasks.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }

    shutdown.cancel();
}
