use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::routes::error::{ApiError, ApiResult};
use crate::routes::session_or_404;
use crate::services::album::{self, AlbumError};

/// GET /api/v1/sessions/{session_id}/album — Download the composed album.
///
/// Declines with 409 until every selected image is done.
pub async fn download_album(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let session = session_or_404(&state, session_id)?;
    let selection = session
        .selection()
        .ok_or(ApiError::Album(AlbumError::NothingGenerated))?;
    let compositor = state.compositor.clone();

    // Decoding and resizing every result is CPU-bound.
    let page = tokio::task::spawn_blocking(move || {
        album::compose_album(session.store(), &selection, compositor.as_ref())
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok((
        [
            (header::CONTENT_TYPE, page.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"ai-photoshoot-album.jpg\"".to_string(),
            ),
        ],
        page.bytes().to_vec(),
    ))
}
