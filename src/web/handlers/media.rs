use crate::services::media::{resolve_media_path, POST_IMAGE_DIR};
use crate::web::error::AppResult;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub async fn post_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let Some(file_path) = resolve_media_path(&state.media_dir, POST_IMAGE_DIR, &filename) else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let content = tokio::fs::read(&file_path).await?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();

    Ok((
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        content,
    )
        .into_response())
}
