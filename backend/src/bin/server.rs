//! Purretys HTTP server binary.
//!
//! Loads settings, builds the repository and pet engine, starts background
//! maintenance and serves the REST, WebSocket and SSE API until Ctrl-C or
//! SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin purretys-server
//! PORT=9000 RUST_LOG=debug cargo run --bin purretys-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`, `PORT`: bind address (default 0.0.0.0:8000)
//! - `SECRET_KEY`: JWT signing secret, required outside development
//! - `PURRETYS_CONFIG`: path to a TOML settings file
//! - `RUST_LOG`: log filter (default: info)

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use purretys::config::Settings;
use purretys::db::RepositoryFactory;
use purretys::http::{create_router, AppState};
use purretys::services::{listen_for_shutdown, spawn_maintenance};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let settings = Settings::load().context("loading settings")?;
    info!(environment = %settings.environment, "Starting Purretys server");

    let repository =
        RepositoryFactory::from_config(&settings.repository).context("initializing repository")?;
    info!("Repository initialized successfully");

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid HOST/PORT")?;
    let decay_every = Duration::from_secs(settings.game.decay_interval_secs.max(1));

    let state = AppState::new(repository, settings);
    let shutdown = listen_for_shutdown();
    let mut stop = shutdown.subscribe();
    let maintenance = spawn_maintenance(state.engine.clone(), decay_every, shutdown.clone());
    let hub = state.hub.clone();

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop.recv().await;
            // Streaming responses never finish on their own.
            hub.disconnect_all();
        })
        .await?;

    shutdown.shutdown();
    let _ = maintenance.await;
    info!("Server stopped");
    Ok(())
}
