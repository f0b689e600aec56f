// Syntactic YouTube URL check. No network access.

use regex::Regex;

lazy_static::lazy_static! {
    static ref YOUTUBE_URL_RE: Regex = Regex::new(
        r"^(https?://)?(www\.)?(youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/watch\?.*v=|youtube\.com/shorts/)([a-zA-Z0-9_-]{11})([^a-zA-Z0-9_-].*)?$"
    ).unwrap();
}

/// Length of a YouTube video id
const VIDEO_ID_LEN: usize = 11;

/// Check if the URL looks like a YouTube video URL.
pub fn is_valid_youtube_url(url: &str) -> bool {
    if YOUTUBE_URL_RE.is_match(url) {
        return true;
    }

    // Looser shapes, e.g. m.youtube.com or extra path segments
    if url.contains("youtube.com") {
        if let Some((_, rest)) = url.split_once("v=") {
            let video_id = rest.split('&').next().unwrap_or("");
            return video_id.chars().count() == VIDEO_ID_LEN;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_shapes() {
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "http://youtube.com/watch?v=dQw4w9WgXcQ",
            "youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/a1_b-C2d3E4",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://youtu.be/dQw4w9WgXcQ?si=abc",
        ];
        for url in urls {
            assert!(is_valid_youtube_url(url), "expected valid: {url}");
        }
    }

    #[test]
    fn test_rejects_wrong_id_length() {
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXc",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQQ",
            "https://youtu.be/short",
            "https://youtu.be/dQw4w9WgXcQQ",
            "https://www.youtube.com/shorts/a1_b-C2d3E4x",
            "https://www.youtube.com/embed/abc",
        ];
        for url in urls {
            assert!(!is_valid_youtube_url(url), "expected invalid: {url}");
        }
    }

    #[test]
    fn test_rejects_other_domains() {
        let urls = [
            "",
            "not a url",
            "https://vimeo.com/123456789",
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/",
            "https://www.youtube.com/channel/UC1234567890",
        ];
        for url in urls {
            assert!(!is_valid_youtube_url(url), "expected invalid: {url}");
        }
    }

    #[test]
    fn test_fallback_for_other_hosts_of_youtube() {
        assert!(is_valid_youtube_url(
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&list=xyz"
        ));
        assert!(!is_valid_youtube_url(
            "https://m.youtube.com/watch?v=dQw4w9WgXcQQ"
        ));
    }
}
