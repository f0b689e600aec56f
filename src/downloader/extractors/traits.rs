// StreamExtractor trait

use async_trait::async_trait;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadTarget, ExtractedVideo};

/// Backend that resolves a video URL into metadata and streams, and can
/// write one stream to disk.
#[async_trait]
pub trait StreamExtractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Fetch metadata and the current stream list.
    async fn extract(&self, url: &str, user_agent: &str)
        -> Result<ExtractedVideo, DownloadError>;

    /// Download the stream `target.itag` to exactly `target.output_path`.
    async fn download_stream(
        &self,
        target: &DownloadTarget,
        user_agent: &str,
    ) -> Result<(), DownloadError>;
}
