//! Inkpad server entry point.
//!
//! Resolves configuration, builds the storage provider and core subsystems,
//! then starts the Axum HTTP server with graceful shutdown. A background
//! rate-limit sweep worker runs alongside the server and is cancelled on
//! shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use inkpad_core::content::ContentStore;
use inkpad_core::credentials::{AdminCredentials, CredentialChecker};
use inkpad_core::ratelimit::{MemoryRateLimitStore, RateLimitStore};
use inkpad_core::session::SessionManager;
use inkpad_core::validate::PasswordPolicy;
use inkpad_storage::StorageConfig;

use inkpad_server::config::ServerConfig;
use inkpad_server::routes;
use inkpad_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(production = config.production, "Inkpad starting");

    let state = build_app_state(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweep_handle = {
        let store = Arc::clone(&state.rate_limiter);
        let interval_secs = config.sweep_interval_secs;
        let mut rx = shutdown_rx;
        tokio::spawn(async move {
            sweep_worker(store, &mut rx, interval_secs).await;
        })
    };

    let app = routes::router(Arc::clone(&state));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Inkpad listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx))
    .await
    .context("server error")?;

    info!("waiting for background workers to stop");
    let _ = tokio::time::timeout(Duration::from_secs(10), sweep_handle).await;

    info!("Inkpad server stopped");
    Ok(())
}

/// Build the shared application state from resolved configuration.
///
/// Fails when the session secret is missing or too short; a server that
/// cannot sign sessions must not start.
fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let secret = config
        .session_secret
        .as_deref()
        .context("INKPAD_SESSION_SECRET must be set (at least 32 bytes)")?;
    let sessions =
        SessionManager::new(secret.as_bytes()).context("INKPAD_SESSION_SECRET rejected")?;

    let admin = config
        .admin_username
        .clone()
        .zip(config.admin_password.clone())
        .and_then(|(username, password)| AdminCredentials::new(username, password));
    if admin.is_none() {
        warn!("admin credentials are not configured, every login will fail");
    }
    let credentials = CredentialChecker::new(
        admin,
        PasswordPolicy {
            min_len: config.min_password_len,
        },
    );

    let provider = StorageConfig::select(config.selection_inputs()).build();
    let content = ContentStore::with_max_file_size(provider, config.max_file_size);

    let rate_limiter: Arc<dyn RateLimitStore> = Arc::new(MemoryRateLimitStore::default());

    Ok(Arc::new(AppState {
        content,
        credentials,
        sessions,
        rate_limiter,
        production: config.production,
        max_file_size: config.max_file_size,
    }))
}

/// Background worker that periodically drops expired rate-limit entries.
async fn sweep_worker(
    store: Arc<dyn RateLimitStore>,
    shutdown: &mut watch::Receiver<bool>,
    interval_secs: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    info!(interval_secs, "rate-limit sweep worker started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                store.sweep().await;
            }
            _ = shutdown.changed() => {
                info!("rate-limit sweep worker shutting down");
                return;
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM, then broadcast shutdown.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    let _ = shutdown_tx.send(true);
}
