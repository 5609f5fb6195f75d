use anyhow::{Context, Result};
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{dropbox_client::DropboxClient, fs_service, sync_service::SyncService};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("content_sync=info,tower_http=info")),
        )
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting content-sync with config: {:?}", cfg);

    // --- Ensure working directories exist ---
    fs_service::ensure_directories_exist(&[cfg.downloads_dir.clone(), cfg.uploads_dir.clone()])
        .context("creating working directories")?;

    // --- Start Dropbox sync poller ---
    let client =
        DropboxClient::new(cfg.dropbox_token.clone()).context("building Dropbox client")?;
    let shutdown = CancellationToken::new();
    let poller = SyncService::new(client, cfg.remote_folder.clone(), cfg.downloads_dir.clone())
        .spawn(cfg.sync_interval, shutdown.clone());

    // --- Build router ---
    let state = AppState::new(cfg.downloads_dir.clone(), cfg.uploads_dir.clone());
    let app = routes::routes::routes(state, cfg.body_limit_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown signal received"),
                _ = signal.cancelled() => {}
            }
        })
        .await?;

    // --- Stop background work ---
    poller.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}
