// Extraction backends
//
// yt-dlp is driven as a subprocess, through the python module when it is
// importable and through the native binary otherwise.

mod traits;
mod ytdlp;

pub use traits::StreamExtractor;
pub use ytdlp::{ExtractorConfig, YtDlpCommand, YtDlpExtractor};
