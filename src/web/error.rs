use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failures a handler cannot turn into a page of its own. Not-found and form
/// errors are rendered by the handlers; these end the request.
pub enum AppError {
    /// Malformed request body, such as a truncated multipart upload.
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            Self::Internal(err) => {
                tracing::error!("Application error: {:?}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}

impl AppError {
    pub fn multipart(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;
