// Error types for the extraction adapter

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// URL failed syntactic validation, or the extraction tool rejected it
    #[error("{0}")]
    InvalidUrl(String),

    /// The extraction tool ran but reported a failure
    #[error("Error processing YouTube video: {0}")]
    Upstream(String),

    /// yt-dlp or python not found in system
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Subprocess did not finish in time
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// Failed to parse yt-dlp JSON output
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Metadata came back without a title
    #[error("Could not retrieve video information. Please try again or try a different video.")]
    MissingTitle,

    /// Every stream was filtered out or failed field extraction
    #[error("No downloadable formats found for this video. It may be protected or region-restricted.")]
    NoFormats,

    /// The requested itag is no longer in the live stream list
    #[error("Stream with itag {0} not found")]
    StreamNotFound(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl DownloadError {
    pub fn invalid_url() -> Self {
        Self::InvalidUrl(
            "Invalid YouTube URL. Please enter a valid YouTube video URL.".to_string(),
        )
    }

    /// Failures of this process rather than of the user's input or the upstream video.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Classify stderr of a failed extraction run.
    pub fn from_stderr(stderr: &str) -> Self {
        let trimmed = stderr.trim();

        if trimmed.contains("Unsupported URL")
            || trimmed.contains("Incomplete YouTube ID")
            || trimmed.contains("is not a valid URL")
        {
            return Self::InvalidUrl(
                "Invalid YouTube URL. The provided URL does not match a YouTube video."
                    .to_string(),
            );
        }

        if trimmed.contains("No module named yt_dlp")
            || trimmed.contains("command not found")
            || trimmed.contains("No such file or directory")
        {
            return Self::ToolNotFound(first_line(trimmed));
        }

        Self::Upstream(first_line(trimmed))
    }
}

fn first_line(s: &str) -> String {
    s.lines()
        .find(|line| line.contains("ERROR"))
        .or_else(|| s.lines().next())
        .unwrap_or("unknown error")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_url_is_invalid() {
        let err = DownloadError::from_stderr("ERROR: Unsupported URL: https://example.com");
        assert!(matches!(err, DownloadError::InvalidUrl(_)));
        assert!(err.to_string().contains("does not match a YouTube video"));
    }

    #[test]
    fn test_missing_module_is_tool_not_found() {
        let err = DownloadError::from_stderr("/usr/bin/python3: No module named yt_dlp");
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }

    #[test]
    fn test_upstream_keeps_error_line() {
        let stderr = "WARNING: something\nERROR: [youtube] abc: Video unavailable\n";
        let err = DownloadError::from_stderr(stderr);
        match err {
            DownloadError::Upstream(msg) => {
                assert_eq!(msg, "ERROR: [youtube] abc: Video unavailable")
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_only_io_is_internal() {
        assert!(DownloadError::Io(std::io::Error::other("disk")).is_internal());
        assert!(!DownloadError::NoFormats.is_internal());
        assert!(!DownloadError::Unexpected("x".into()).is_internal());
    }
}
