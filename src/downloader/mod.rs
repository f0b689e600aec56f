// Downloader module - extraction adapter around yt-dlp

pub mod errors;
pub mod extractors;
pub mod models;
pub mod orchestrator;
pub mod retry;
pub mod user_agents;
pub mod utils;
pub mod validation;

pub use errors::DownloadError;
pub use extractors::{ExtractorConfig, StreamExtractor, YtDlpExtractor};
pub use models::{FileType, FormatDescriptor, FormatKind, VideoMetadata};
pub use orchestrator::Downloader;
pub use retry::{RetryOutcome, RetryPolicy};
pub use validation::is_valid_youtube_url;
