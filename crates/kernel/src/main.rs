//! Lamprey
//!
//! HTTP editor in front of the page store and the deployment pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lamprey_kernel::{AppState, ArticleRenderer, Config, PageService, PageStore, deploy, routes};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting Lamprey");

    // Refuses to start without exactly one deployment target.
    let config = Config::from_env().context("failed to load configuration")?;

    let renderer = match &config.templates_dir {
        Some(dir) => ArticleRenderer::new(dir)?,
        None => ArticleRenderer::builtin()?,
    };
    let renderer = Arc::new(renderer);

    let deployer = deploy::from_target(&config.deploy_target, renderer.clone())
        .context("failed to configure deployment")?;
    info!(backend = deployer.name(), "Deployment target configured");

    let store = PageStore::open(&config.store)
        .await
        .context("failed to open page store")?;

    let pages = PageService::new(store.clone(), deployer, config.deploy_timeout);
    let state = AppState::new(pages, renderer, config.route_prefix());

    let static_dir = config.deploy_target.local_folder();
    if let Some(dir) = static_dir {
        info!(dir = ?dir, "Serving deployed files");
    }
    let app = routes::router(state, static_dir);

    let listener = tokio::net::TcpListener::bind(&config.http_address)
        .await
        .context("failed to bind to address")?;

    info!(addr = %config.http_address, prefix = config.route_prefix(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
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
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
