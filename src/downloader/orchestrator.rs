// Downloader: metadata lookup and retried stream download on top of a StreamExtractor

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::errors::DownloadError;
use super::extractors::StreamExtractor;
use super::models::{
    DownloadTarget, ExtractedVideo, FileType, FormatDescriptor, FormatKind, StreamInfo,
    VideoMetadata,
};
use super::retry::{RetryOutcome, RetryPolicy};
use super::user_agents::random_user_agent;
use super::utils::{build_filename, format_duration, format_file_size, unix_timestamp};
use super::validation::is_valid_youtube_url;

pub struct Downloader {
    extractor: Arc<dyn StreamExtractor>,
    /// Pause after each extraction before reading its results
    settle_delay: Duration,
    retry: RetryPolicy,
}

impl Downloader {
    pub fn new(extractor: Arc<dyn StreamExtractor>) -> Self {
        Self {
            extractor,
            settle_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    async fn fetch(&self, url: &str) -> Result<ExtractedVideo, DownloadError> {
        let user_agent = random_user_agent();
        let video = self.extractor.extract(url, user_agent).await?;
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        Ok(video)
    }

    /// Look up title, author, thumbnail and the downloadable formats.
    pub async fn get_video_info(&self, url: &str) -> Result<VideoMetadata, DownloadError> {
        if !is_valid_youtube_url(url) {
            return Err(DownloadError::invalid_url());
        }

        let video = self.fetch(url).await.inspect_err(|e| {
            error!(extractor = self.extractor.name(), error = %e, "Failed to fetch video info");
        })?;

        let Some(title) = video.title.clone() else {
            error!("Failed to get video title");
            return Err(DownloadError::MissingTitle);
        };

        let formats = build_formats(&video.streams);
        if formats.is_empty() {
            return Err(DownloadError::NoFormats);
        }

        Ok(VideoMetadata {
            title,
            author: video.author,
            thumbnail_url: video.thumbnail_url,
            duration: format_duration(video.length_seconds),
            views: video.views,
            formats,
        })
    }

    /// Download stream `itag` of `url` into `download_dir`, returning the absolute file path.
    pub async fn download(
        &self,
        url: &str,
        itag: u32,
        download_dir: &Path,
        file_type: FileType,
    ) -> Result<PathBuf, DownloadError> {
        if !is_valid_youtube_url(url) {
            return Err(DownloadError::invalid_url());
        }

        let video = self.fetch(url).await?;

        let Some(stream) = video.stream_by_itag(itag) else {
            error!(itag, "Stream not found");
            return Err(DownloadError::StreamNotFound(itag));
        };

        let title = video.title.as_deref().unwrap_or("video");
        let filename = build_filename(
            title,
            unix_timestamp(),
            stream.mime_type.as_deref(),
            file_type,
        );
        let target = DownloadTarget {
            url: url.to_string(),
            itag,
            output_path: std::path::absolute(download_dir.join(&filename))?,
        };

        let outcome = self
            .retry
            .run(|attempt| {
                info!(url, itag, attempt, "Downloading");
                let target = &target;
                async move {
                    self.extractor
                        .download_stream(target, random_user_agent())
                        .await
                }
            })
            .await;

        match outcome {
            RetryOutcome::Succeeded { attempts, .. } => {
                info!(path = %target.output_path.display(), attempts, "Downloaded");
                Ok(target.output_path)
            }
            RetryOutcome::Exhausted { error, attempts } => {
                warn!(attempts, error = %error, "Giving up on download");
                Err(error)
            }
        }
    }
}

/// Progressive streams by descending resolution, then audio-only streams by
/// descending bitrate. Streams missing a required field are skipped.
pub fn build_formats(streams: &[StreamInfo]) -> Vec<FormatDescriptor> {
    let mut video: Vec<&StreamInfo> = streams.iter().filter(|s| s.is_progressive()).collect();
    video.sort_by(|a, b| b.height.cmp(&a.height));

    let mut audio: Vec<&StreamInfo> = streams.iter().filter(|s| s.is_audio_only()).collect();
    audio.sort_by(|a, b| {
        b.abr
            .unwrap_or(0.0)
            .total_cmp(&a.abr.unwrap_or(0.0))
            .then_with(|| b.abr.is_some().cmp(&a.abr.is_some()))
    });

    video
        .into_iter()
        .chain(audio)
        .filter_map(|stream| match describe(stream) {
            Ok(descriptor) => Some(descriptor),
            Err(reason) => {
                warn!(format_id = %stream.format_id, "Skipping stream: {}", reason);
                None
            }
        })
        .collect()
}

fn describe(stream: &StreamInfo) -> Result<FormatDescriptor, String> {
    let itag = stream
        .itag()
        .ok_or_else(|| format!("non-numeric itag {:?}", stream.format_id))?;
    let mime_type = stream.mime_type.clone().ok_or("missing mime type")?;
    let filesize = stream.filesize.ok_or("missing file size")?;
    let extension = mime_type
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    let kind = if stream.has_video {
        let height = stream.height.ok_or("missing resolution")?;
        FormatKind::Video {
            resolution: format!("{}p", height),
            fps: stream.fps.map(|f| f.round() as u32).unwrap_or(0),
        }
    } else {
        let abr = stream.abr.ok_or("missing bitrate")?;
        FormatKind::Audio {
            abr: format!("{}kbps", abr.round() as u32),
        }
    };

    Ok(FormatDescriptor {
        itag,
        mime_type,
        kind,
        file_size: format_file_size(filesize),
        extension,
    })
}
