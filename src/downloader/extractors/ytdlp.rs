// yt-dlp extractor
//
// Prefers `python3 -m yt_dlp` when the module is importable and falls back
// to the native `yt-dlp` binary otherwise. Both speak the same CLI, so the
// only difference is the program and its leading arguments.

use async_trait::async_trait;
use std::process::Command as StdCommand;
use tracing::{debug, info};

use super::traits::StreamExtractor;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadTarget, ExtractedVideo, StreamInfo};
use crate::downloader::utils::run_output_with_timeout;

/// Settings for spawning yt-dlp
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Interpreter override (`YTDLP_PYTHON`)
    pub python_cmd: Option<String>,
    /// Native binary override (`YTDLP_PATH`)
    pub binary_path: Option<String>,
    /// Timeout for `--dump-json` in seconds
    pub info_timeout_secs: u64,
    /// Timeout for one download attempt in seconds
    pub download_timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            python_cmd: None,
            binary_path: None,
            info_timeout_secs: 30,
            download_timeout_secs: 600,
        }
    }
}

/// How yt-dlp gets invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YtDlpCommand {
    /// `<python> -m yt_dlp ...`
    Python(String),
    /// `<yt-dlp> ...`
    Binary(String),
}

impl YtDlpCommand {
    fn program(&self) -> &str {
        match self {
            Self::Python(py) => py,
            Self::Binary(bin) => bin,
        }
    }

    fn args(&self, rest: Vec<String>) -> Vec<String> {
        match self {
            Self::Python(_) => {
                let mut args = vec!["-m".to_string(), "yt_dlp".to_string()];
                args.extend(rest);
                args
            }
            Self::Binary(_) => rest,
        }
    }
}

pub struct YtDlpExtractor {
    command: YtDlpCommand,
    config: ExtractorConfig,
}

impl YtDlpExtractor {
    /// Probe the system once and pick python module or native binary.
    pub fn new(config: ExtractorConfig) -> Self {
        let python = config
            .python_cmd
            .clone()
            .unwrap_or_else(Self::find_python);

        let command = if Self::python_has_ytdlp(&python) {
            YtDlpCommand::Python(python)
        } else {
            let binary = config.binary_path.clone().unwrap_or_else(Self::find_ytdlp);
            YtDlpCommand::Binary(binary)
        };

        info!(program = command.program(), "Using yt-dlp via {:?}", command);
        Self { command, config }
    }

    pub fn with_command(command: YtDlpCommand, config: ExtractorConfig) -> Self {
        Self { command, config }
    }

    pub fn command(&self) -> &YtDlpCommand {
        &self.command
    }

    fn find_python() -> String {
        let candidates = ["python3", "/opt/homebrew/bin/python3", "/usr/local/bin/python3"];

        for cmd in candidates {
            if let Ok(output) = StdCommand::new(cmd).arg("--version").output() {
                if output.status.success() {
                    return cmd.to_string();
                }
            }
        }

        "python3".to_string()
    }

    fn python_has_ytdlp(python: &str) -> bool {
        match StdCommand::new(python).args(["-c", "import yt_dlp"]).output() {
            Ok(out) => out.status.success(),
            Err(_) => false,
        }
    }

    fn find_ytdlp() -> String {
        let common_paths = [
            "/opt/homebrew/bin/yt-dlp",
            "/usr/local/bin/yt-dlp",
            "/usr/bin/yt-dlp",
        ];

        for path in common_paths {
            if std::path::Path::new(path).exists() {
                return path.to_string();
            }
        }

        "yt-dlp".to_string()
    }

    fn info_args(&self, url: &str, user_agent: &str) -> Vec<String> {
        self.command.args(vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            "15".to_string(),
            "--user-agent".to_string(),
            user_agent.to_string(),
            "--".to_string(),
            url.to_string(),
        ])
    }

    fn download_args(&self, target: &DownloadTarget, user_agent: &str) -> Vec<String> {
        self.command.args(vec![
            "--format".to_string(),
            target.itag.to_string(),
            "--output".to_string(),
            target.output_path.to_string_lossy().to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-part".to_string(),
            "--force-overwrites".to_string(),
            "--user-agent".to_string(),
            user_agent.to_string(),
            "--".to_string(),
            target.url.clone(),
        ])
    }

    /// Parse `--dump-json` output
    pub fn parse_json(stdout: &[u8]) -> Result<ExtractedVideo, DownloadError> {
        let json: serde_json::Value = serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

        let streams: Vec<StreamInfo> = json["formats"]
            .as_array()
            .map(|formats| formats.iter().map(Self::parse_stream).collect())
            .unwrap_or_default();

        Ok(ExtractedVideo {
            title: json["title"]
                .as_str()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            author: json["uploader"]
                .as_str()
                .or_else(|| json["channel"].as_str())
                .unwrap_or("Unknown")
                .to_string(),
            thumbnail_url: json["thumbnail"].as_str().unwrap_or("").to_string(),
            length_seconds: json["duration"].as_f64().unwrap_or(0.0).max(0.0) as u64,
            views: json["view_count"].as_u64().unwrap_or(0),
            streams,
        })
    }

    fn parse_stream(f: &serde_json::Value) -> StreamInfo {
        let has_codec = |key: &str| f[key].as_str().is_some_and(|c| !c.is_empty() && c != "none");
        let has_video = has_codec("vcodec");
        let has_audio = has_codec("acodec");

        StreamInfo {
            format_id: f["format_id"].as_str().unwrap_or("").to_string(),
            mime_type: f["ext"]
                .as_str()
                .and_then(|ext| mime_type_for(ext, has_video, has_audio)),
            height: f["height"].as_u64().map(|h| h as u32),
            fps: f["fps"].as_f64().map(|fps| fps as f32),
            abr: f["abr"].as_f64().map(|abr| abr as f32),
            filesize: f["filesize"]
                .as_u64()
                .or_else(|| f["filesize_approx"].as_u64()),
            has_video,
            has_audio,
        }
    }
}

/// MIME type the way YouTube labels its containers
fn mime_type_for(ext: &str, has_video: bool, has_audio: bool) -> Option<String> {
    if ext.is_empty() {
        return None;
    }
    if has_video {
        Some(format!("video/{}", ext))
    } else if has_audio {
        let subtype = if ext == "m4a" { "mp4" } else { ext };
        Some(format!("audio/{}", subtype))
    } else {
        None
    }
}

#[async_trait]
impl StreamExtractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        match self.command {
            YtDlpCommand::Python(_) => "python-yt-dlp",
            YtDlpCommand::Binary(_) => "yt-dlp",
        }
    }

    async fn extract(
        &self,
        url: &str,
        user_agent: &str,
    ) -> Result<ExtractedVideo, DownloadError> {
        let args = self.info_args(url, user_agent);
        debug!(extractor = self.name(), url, "Fetching video info");

        let output = run_output_with_timeout(
            self.command.program(),
            args,
            self.config.info_timeout_secs,
        )
        .await?;

        if !output.status.success() {
            return Err(DownloadError::from_stderr(&String::from_utf8_lossy(
                &output.stderr,
            )));
        }

        Self::parse_json(&output.stdout)
    }

    async fn download_stream(
        &self,
        target: &DownloadTarget,
        user_agent: &str,
    ) -> Result<(), DownloadError> {
        let args = self.download_args(target, user_agent);
        debug!(
            extractor = self.name(),
            url = %target.url,
            itag = target.itag,
            "Downloading stream"
        );

        let output = run_output_with_timeout(
            self.command.program(),
            args,
            self.config.download_timeout_secs,
        )
        .await?;

        if !output.status.success() {
            return Err(DownloadError::from_stderr(&String::from_utf8_lossy(
                &output.stderr,
            )));
        }

        if !target.output_path.exists() {
            return Err(DownloadError::Upstream(format!(
                "yt-dlp reported success but {} is missing",
                target.output_path.display()
            )));
        }

        Ok(())
    }
}
