use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

use crate::models::image::SourceImageError;
use crate::services::album::AlbumError;
use crate::services::dispatcher::DispatchError;

/// Error type for HTTP handlers, rendered as `{ "error", "code" }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Job {0} not found in this session")]
    JobNotFound(String),

    #[error("Image for {0} is not ready")]
    ImageNotReady(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Album(#[from] AlbumError),

    #[error(transparent)]
    SourceImage(#[from] SourceImageError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::SessionNotFound(_) | ApiError::JobNotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ApiError::ImageNotReady(_) => (StatusCode::CONFLICT, "NOT_READY"),
            ApiError::Dispatch(e) => match e {
                DispatchError::EmptySelection => (StatusCode::BAD_REQUEST, "EMPTY_SELECTION"),
                DispatchError::UnknownJob(_) => (StatusCode::NOT_FOUND, "UNKNOWN_STYLE"),
                DispatchError::RunInProgress => (StatusCode::CONFLICT, "RUN_IN_PROGRESS"),
                DispatchError::RetryInProgress => (StatusCode::CONFLICT, "RETRY_IN_PROGRESS"),
            },
            ApiError::Album(e) => match e {
                AlbumError::NothingGenerated | AlbumError::Incomplete { .. } => {
                    (StatusCode::CONFLICT, "ALBUM_INCOMPLETE")
                }
                AlbumError::Decode { .. } | AlbumError::Encode(_) => {
                    tracing::error!(error = %e, "Album composition failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, "ALBUM_FAILED")
                }
            },
            ApiError::SourceImage(_) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_IMAGE"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = match &self {
            ApiError::Internal(_) => "An internal error occurred".to_string(),
            ApiError::Album(AlbumError::Decode { .. } | AlbumError::Encode(_)) => {
                "Sorry, there was an error creating your album. Please try again.".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
