//! HTTP handlers.

use std::path::Path;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::pages::render_index;
use super::server::AppState;
use super::session::{DownloadRecord, FlashLevel, Session};
use crate::downloader::{is_valid_youtube_url, DownloadError, FileType, VideoMetadata};

pub const SERVE_DOWNLOAD_PATH: &str = "/serve_download";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/get_video_info", post(get_video_info))
        .route("/download", post(download))
        .route(SERVE_DOWNLOAD_PATH, get(serve_download))
        .route("/clear_temp", get(clear_temp))
}

#[derive(Debug, Deserialize)]
pub struct VideoInfoForm {
    #[serde(default)]
    pub video_url: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub itag: String,
    #[serde(default)]
    pub file_type: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub message: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

async fn index(session: Session) -> Html<String> {
    Html(render_index(&session.take_flashes()))
}

async fn get_video_info(
    State(state): State<AppState>,
    Form(form): Form<VideoInfoForm>,
) -> ApiResult<Json<VideoMetadata>> {
    let url = form.video_url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("Please enter a YouTube URL"));
    }

    match state.downloader.get_video_info(url).await {
        Ok(info) => Ok(Json(info)),
        Err(e) if e.is_internal() => {
            error!(error = %e, "Error getting video info");
            Err(ApiError::internal(format!("Error: {}", e)))
        }
        Err(e) => Err(ApiError::bad_request(e.to_string())),
    }
}

async fn download(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<DownloadForm>,
) -> ApiResult<Json<DownloadResponse>> {
    let url = form.video_url.trim();
    let itag = form.itag.trim();
    if url.is_empty() || itag.is_empty() {
        return Err(ApiError::bad_request(
            "Missing video URL or format selection",
        ));
    }
    let itag: u32 = itag
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid format selection: {}", itag)))?;
    if !is_valid_youtube_url(url) {
        return Err(ApiError::bad_request(DownloadError::invalid_url().to_string()));
    }
    let file_type = FileType::from_hint(&form.file_type);

    let download_id = Uuid::new_v4();
    let download_dir = state.config.temp_dir.join(download_id.to_string());
    session.start_download(DownloadRecord::new(download_id, download_dir.clone()));

    tokio::fs::create_dir_all(&download_dir).await.map_err(|e| {
        error!(dir = %download_dir.display(), error = %e, "Error during download");
        ApiError::internal(format!("Download failed: {}", e))
    })?;

    info!(%download_id, itag, %file_type, "Starting download");
    match state
        .downloader
        .download(url, itag, &download_dir, file_type)
        .await
    {
        Ok(path) => {
            if !session.finish_download(download_id, path) {
                debug!(%download_id, "Download superseded by a newer request");
            }
            Ok(Json(DownloadResponse {
                success: true,
                message: "Download completed".to_string(),
                download_url: SERVE_DOWNLOAD_PATH.to_string(),
            }))
        }
        Err(e) => {
            error!(%download_id, error = %e, "Download error");
            Err(ApiError::internal("Failed to download video"))
        }
    }
}

async fn serve_download(session: Session) -> Response {
    let path = session
        .download()
        .and_then(|record| record.path)
        .filter(|path| path.is_file());

    let Some(path) = path else {
        session.flash(
            FlashLevel::Error,
            "Download expired or not found. Please try again.",
        );
        return redirect_home();
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Error serving download");
            session.flash(
                FlashLevel::Error,
                format!("Error retrieving your download: {}", e),
            );
            return redirect_home();
        }
    };

    let mut headers = vec![
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&path)),
    ];
    if let Ok(metadata) = file.metadata().await {
        headers.push((header::CONTENT_LENGTH, metadata.len().to_string()));
    }

    let body = Body::from_stream(ReaderStream::new(file));
    let mut response = body.into_response();
    for (name, value) in headers {
        match value.parse() {
            Ok(value) => {
                response.headers_mut().insert(name, value);
            }
            Err(e) => error!(header = %name, error = %e, "Invalid response header"),
        }
    }
    response
}

/// 302 to the home page, where pending flashes are shown.
fn redirect_home() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/")]).into_response()
}

/// `attachment` with an ASCII fallback name and the RFC 5987 UTF-8 name.
fn content_disposition(path: &Path) -> String {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "download".to_string());
    let ascii: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(&filename)
    )
}

async fn clear_temp(session: Session) -> ApiResult<Json<SuccessResponse>> {
    if let Some(record) = session.download() {
        match tokio::fs::remove_dir_all(&record.dir).await {
            Ok(()) => info!(dir = %record.dir.display(), "Removed download directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                error!(dir = %record.dir.display(), error = %e, "Error clearing temp files");
                return Err(ApiError::internal(e.to_string()));
            }
        }
        session.clear_download();
    }

    Ok(Json(SuccessResponse { success: true }))
}
