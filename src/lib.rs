pub mod api;
pub mod config;
pub mod downloader;
pub mod logging;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use api::AppState;
use config::AppConfig;
use downloader::YtDlpExtractor;

/// Prepare the temp root, probe for yt-dlp and serve until shutdown.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.temp_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.temp_dir.display()))?;
    info!(temp_dir = %config.temp_dir.display(), "Temp directory ready");

    let extractor_config = config.extractor.clone();
    let extractor = tokio::task::spawn_blocking(move || YtDlpExtractor::new(extractor_config))
        .await
        .context("yt-dlp probe panicked")?;

    let state = AppState::new(config, Arc::new(extractor));
    api::serve(state).await
}
