mod config;
mod routes;
mod state;
mod triggers;

use std::net::SocketAddr;
use std::sync::Arc;

use lapse_db::Database;
use lapse_jobs::SqliteStore;
use lapse_storage::Storage;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::state::AppStateInner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lapse=debug,lapse_jobs=debug,lapse_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init DB and storage
    let db = Arc::new(Database::open(&config.db_path)?);
    let store = SqliteStore::new(db);
    let storage = Arc::new(Storage::new(config.storage_dir.clone()).await?);

    let (events, event_rx) = mpsc::unbounded_channel();
    let state = state::install(AppStateInner {
        store: store.clone(),
        storage: storage.clone(),
        config: config.clone(),
        events,
    })?;

    tokio::spawn(triggers::run_message_trigger(store.clone(), event_rx));
    tokio::spawn(triggers::run_reaper_loop(
        store,
        storage,
        config.reaper(),
        config.reap_interval_secs,
    ));

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Lapse server listening on {}", addr);
    info!(
        "Post retention: {} hours, reaper every {} seconds, media bucket {}",
        config.post_retention_hours, config.reap_interval_secs, config.bucket
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
