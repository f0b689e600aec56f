//! Application configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::api::session::DEFAULT_SESSION_IDLE;
use crate::downloader::{ExtractorConfig, RetryPolicy};

pub const DEFAULT_SESSION_SECRET: &str = "youtube-downloader-secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind address (`BIND_ADDRESS`)
    pub bind_address: String,
    /// Listen port (`PORT`)
    pub port: u16,
    /// Root for per-download subdirectories (`TEMP_DIR`)
    pub temp_dir: PathBuf,
    /// Session signing key (`SESSION_SECRET`)
    pub session_secret: String,
    /// Idle lifetime of server-side session data (`SESSION_IDLE_SECS`)
    pub session_idle: Duration,
    pub extractor: ExtractorConfig,
    /// Pause after each extraction
    pub settle_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            temp_dir: PathBuf::from("temp"),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            session_idle: DEFAULT_SESSION_IDLE,
            extractor: ExtractorConfig::default(),
            settle_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `BIND_ADDRESS`, `PORT`
    /// - `TEMP_DIR`, `SESSION_SECRET`, `SESSION_IDLE_SECS`
    /// - `YTDLP_PYTHON`, `YTDLP_PATH`
    /// - `EXTRACTOR_TIMEOUT_SECS`, `DOWNLOAD_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind_address) = non_empty("BIND_ADDRESS") {
            config.bind_address = bind_address;
        }
        if let Some(port) = non_empty("PORT").and_then(|p| p.trim().parse().ok()) {
            config.port = port;
        }
        if let Some(temp_dir) = non_empty("TEMP_DIR") {
            config.temp_dir = PathBuf::from(temp_dir);
        }
        if let Some(secret) = non_empty("SESSION_SECRET") {
            config.session_secret = secret;
        }
        if let Some(secs) = non_empty("SESSION_IDLE_SECS").and_then(|s| s.trim().parse().ok()) {
            config.session_idle = Duration::from_secs(secs);
        }

        config.extractor.python_cmd = non_empty("YTDLP_PYTHON");
        config.extractor.binary_path = non_empty("YTDLP_PATH");
        if let Some(secs) = non_empty("EXTRACTOR_TIMEOUT_SECS").and_then(|s| s.trim().parse().ok()) {
            config.extractor.info_timeout_secs = secs;
        }
        if let Some(secs) = non_empty("DOWNLOAD_TIMEOUT_SECS").and_then(|s| s.trim().parse().ok()) {
            config.extractor.download_timeout_secs = secs;
        }

        if config.session_secret == DEFAULT_SESSION_SECRET {
            warn!("SESSION_SECRET is not set; using the built-in placeholder");
        }

        config
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
