use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Serve a stored object by its key under the public media prefix.
///
/// Only meaningful for the filesystem backend; an S3 deployment points
/// `storage.public_base_url` at the bucket instead.
#[instrument(skip(state))]
pub async fn get_media(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let url = format!("{}/{}", state.store.base_url().trim_end_matches('/'), key);
    let reader = state.store.get_stream(&url).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = mime_guess::from_path(&key)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
