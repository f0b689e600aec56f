//! In-memory extractor for tests.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{subscriber::DefaultGuard, Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::downloader::errors::DownloadError;
use crate::downloader::extractors::StreamExtractor;
use crate::downloader::models::{DownloadTarget, ExtractedVideo, StreamInfo};

pub fn progressive_stream(itag: u32, height: u32) -> StreamInfo {
    StreamInfo {
        format_id: itag.to_string(),
        mime_type: Some("video/mp4".to_string()),
        height: Some(height),
        fps: Some(30.0),
        abr: None,
        filesize: Some(u64::from(height) * 10_000),
        has_video: true,
        has_audio: true,
    }
}

pub fn audio_stream(itag: u32, abr: f32) -> StreamInfo {
    StreamInfo {
        format_id: itag.to_string(),
        mime_type: Some("audio/mp4".to_string()),
        height: None,
        fps: None,
        abr: Some(abr),
        filesize: Some(1_048_576),
        has_video: false,
        has_audio: true,
    }
}

/// Serves a fixed video. Downloads write a small file to the target path,
/// after failing the configured number of times.
#[derive(Default)]
pub struct MockExtractor {
    video: ExtractedVideo,
    extract_error: Option<String>,
    failing_downloads: u32,
    extract_calls: AtomicU32,
    download_calls: AtomicU32,
}

impl MockExtractor {
    pub fn with_video(video: ExtractedVideo) -> Self {
        Self {
            video,
            ..Default::default()
        }
    }

    pub fn sample() -> Self {
        Self::with_video(ExtractedVideo {
            title: Some("Sample: Video".to_string()),
            author: "Sample Channel".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
            length_seconds: 212,
            views: 1234,
            streams: vec![
                progressive_stream(18, 360),
                progressive_stream(22, 720),
                audio_stream(140, 128.0),
            ],
        })
    }

    pub fn failing_extract(stderr: &str) -> Self {
        Self {
            extract_error: Some(stderr.to_string()),
            ..Default::default()
        }
    }

    pub fn fail_downloads(mut self, times: u32) -> Self {
        self.failing_downloads = times;
        self
    }

    pub fn extract_calls(&self) -> u32 {
        self.extract_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> u32 {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamExtractor for MockExtractor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn extract(
        &self,
        _url: &str,
        _user_agent: &str,
    ) -> Result<ExtractedVideo, DownloadError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        match &self.extract_error {
            Some(stderr) => Err(DownloadError::from_stderr(stderr)),
            None => Ok(self.video.clone()),
        }
    }

    async fn download_stream(
        &self,
        target: &DownloadTarget,
        _user_agent: &str,
    ) -> Result<(), DownloadError> {
        let call = self.download_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failing_downloads {
            return Err(DownloadError::Upstream(format!("connection reset (call {call})")));
        }
        std::fs::write(&target.output_path, format!("itag {}", target.itag))?;
        Ok(())
    }
}

/// Counts WARN events on the current thread while installed.
#[derive(Clone, Default)]
pub struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
