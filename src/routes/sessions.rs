use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{JobView, SessionCreatedResponse, SessionResponse};
use crate::models::image::SourceImage;
use crate::routes::error::{ApiError, ApiResult};
use crate::routes::session_or_404;

/// POST /api/v1/sessions — Upload the source photo and open a session.
pub async fn create_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<SessionCreatedResponse>)> {
    let mut image_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("image") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            image_data = Some(data.to_vec());
        }
    }

    let image_data =
        image_data.ok_or_else(|| ApiError::BadRequest("missing `image` field".to_string()))?;
    let source = SourceImage::from_bytes(image_data)?;
    let session = state.sessions.create(source);

    Ok((
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id: session.id,
            content_type: session.source.content_type(),
            created_at: session.created_at,
        }),
    ))
}

/// GET /api/v1/sessions/{session_id} — Current status of every job.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let session = session_or_404(&state, session_id)?;
    let store = session.store();
    let jobs = store
        .snapshot()
        .iter()
        .map(|entry| JobView::from_entry(session_id, entry))
        .collect();

    Ok(Json(SessionResponse {
        session_id,
        running: session.dispatcher.is_running(),
        settled: store.is_settled(),
        counts: store.counts().into(),
        jobs,
    }))
}

/// DELETE /api/v1/sessions/{session_id} — Start over.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.sessions.remove(session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(session_id))
    }
}
