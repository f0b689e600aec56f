//! API server setup.

use std::sync::Arc;

use anyhow::Context;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::routes;
use super::session::{session_layer, SessionSigner, SessionStore};
use crate::config::AppConfig;
use crate::downloader::{Downloader, StreamExtractor};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub downloader: Arc<Downloader>,
    pub sessions: Arc<SessionStore>,
    pub signer: Arc<SessionSigner>,
}

impl AppState {
    pub fn new(config: AppConfig, extractor: Arc<dyn StreamExtractor>) -> Self {
        let downloader = Downloader::new(extractor)
            .with_settle_delay(config.settle_delay)
            .with_retry_policy(config.retry);
        Self {
            signer: Arc::new(SessionSigner::new(&config.session_secret)),
            sessions: Arc::new(SessionStore::new(config.session_idle)),
            config: Arc::new(config),
            downloader: Arc::new(downloader),
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    routes::router()
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.socket_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
