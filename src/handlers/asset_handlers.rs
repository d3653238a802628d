//! Static image serving.
//!
//! Images that predate the remote media store (or were placed there by an
//! operator) live under the configured upload directory and are served
//! directly from disk, streamed rather than buffered.

use crate::{errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use std::io;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// GET `/uploads/images/{*path}` — stream a file from the upload directory.
pub async fn serve_image(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    ensure_path_safe(&path)?;

    let file_path = state.upload_dir.join(&path);
    let file = File::open(&file_path).await.map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            AppError::not_found(format!("no such image `{}`", path))
        } else {
            AppError::internal(err.to_string())
        }
    })?;

    let metadata = file
        .metadata()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    if metadata.is_dir() {
        return Err(AppError::not_found(format!("no such image `{}`", path)));
    }

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&path)),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&metadata.len().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    Ok(response)
}

/// Basic path validation to avoid trivial traversal vectors.
///
/// Rejects empty paths, absolute paths, `..` components, and control bytes.
fn ensure_path_safe(path: &str) -> Result<(), AppError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|segment| segment == "..")
        || path
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');

    if invalid {
        return Err(AppError::bad_request("invalid image path"));
    }
    Ok(())
}

/// Content type guessed from the file extension; octet-stream otherwise.
fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit('.').next().unwrap_or_default();
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}
