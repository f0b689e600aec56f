// Common data models for downloader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Video metadata returned to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    pub thumbnail_url: String,
    /// Formatted as `H:MM:SS` or `M:SS`
    pub duration: String,
    pub views: u64,
    pub formats: Vec<FormatDescriptor>,
}

/// One downloadable encoding of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub itag: u32,
    pub mime_type: String,
    #[serde(flatten)]
    pub kind: FormatKind,
    /// Human-readable, e.g. "12.40 MB"
    pub file_size: String,
    pub extension: String,
}

/// Kind-specific fields, tagged as `"type": "video" | "audio"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FormatKind {
    Video { resolution: String, fps: u32 },
    Audio { abr: String },
}

impl FormatDescriptor {
    pub fn is_audio(&self) -> bool {
        matches!(self.kind, FormatKind::Audio { .. })
    }
}

/// Raw stream as reported by an extractor, before it becomes a descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    /// Upstream format id; numeric for YouTube
    pub format_id: String,
    pub mime_type: Option<String>,
    pub height: Option<u32>,
    pub fps: Option<f32>,
    /// Audio bitrate in kbps
    pub abr: Option<f32>,
    /// Exact or approximate size in bytes
    pub filesize: Option<u64>,
    pub has_video: bool,
    pub has_audio: bool,
}

impl StreamInfo {
    /// Audio and video muxed together
    pub fn is_progressive(&self) -> bool {
        self.has_video && self.has_audio
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    pub fn itag(&self) -> Option<u32> {
        self.format_id.parse().ok()
    }
}

/// Everything one extraction run reports about a video
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedVideo {
    pub title: Option<String>,
    pub author: String,
    pub thumbnail_url: String,
    pub length_seconds: u64,
    pub views: u64,
    pub streams: Vec<StreamInfo>,
}

impl ExtractedVideo {
    pub fn stream_by_itag(&self, itag: u32) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.itag() == Some(itag))
    }
}

/// Client hint for the desired container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    Audio,
    #[default]
    Video,
}

impl FileType {
    /// Anything other than "audio" is treated as video.
    pub fn from_hint(hint: &str) -> Self {
        if hint.trim().eq_ignore_ascii_case("audio") {
            Self::Audio
        } else {
            Self::Video
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// A download request resolved against the live stream list
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub url: String,
    pub itag: u32,
    pub output_path: PathBuf,
}
