use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{AcceptedResponse, StartRunRequest};
use crate::models::job::slugify;
use crate::routes::error::{ApiError, ApiResult};
use crate::routes::session_or_404;
use crate::services::catalog;
use crate::services::dispatcher::RetryStart;

/// POST /api/v1/sessions/{session_id}/runs — Generate the selected styles.
///
/// Jobs are visible as pending when this returns; the batch itself runs in
/// the background.
pub async fn start_run(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<StartRunRequest>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let session = session_or_404(&state, session_id)?;
    let selection = catalog::select(&request.jobs)?;

    let batch = session.dispatcher.admit(&selection)?;
    session.set_selection(selection.clone());
    let jobs: Vec<String> = selection.names().map(str::to_string).collect();

    tracing::info!(session_id = %session_id, epoch = batch.epoch(), jobs = jobs.len(), "Batch accepted");

    let task_session = session.clone();
    tokio::spawn(async move {
        batch.execute(&task_session.source).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            session_id,
            message: format!("Generating {} images", jobs.len()),
            jobs,
        }),
    ))
}

/// POST /api/v1/sessions/{session_id}/jobs/{name}/retry — Regenerate one image.
pub async fn retry_job(
    State(state): State<AppState>,
    Path((session_id, name)): Path<(Uuid, String)>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse>)> {
    let session = session_or_404(&state, session_id)?;

    let retry = match session.dispatcher.admit_retry(&name)? {
        RetryStart::Started(retry) => retry,
        RetryStart::Skipped => {
            return Ok((
                StatusCode::CONFLICT,
                Json(AcceptedResponse {
                    session_id,
                    jobs: vec![name],
                    message: "Image is already being generated".to_string(),
                }),
            ))
        }
        RetryStart::NotInSession => return Err(ApiError::JobNotFound(name)),
    };

    let task_session = session.clone();
    tokio::spawn(async move {
        retry.execute(&task_session.source).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            session_id,
            message: format!("Regenerating {}", name),
            jobs: vec![name],
        }),
    ))
}

/// GET /api/v1/sessions/{session_id}/jobs/{name}/image — Download one result.
pub async fn download_image(
    State(state): State<AppState>,
    Path((session_id, name)): Path<(Uuid, String)>,
) -> ApiResult<impl IntoResponse> {
    let session = session_or_404(&state, session_id)?;
    let status = session
        .store()
        .get(&name)
        .ok_or_else(|| ApiError::JobNotFound(name.clone()))?;
    let image = status
        .image()
        .cloned()
        .ok_or_else(|| ApiError::ImageNotReady(name.clone()))?;

    let disposition = format!(
        "attachment; filename=\"ai-photoshoot-{}.{}\"",
        slugify(&name),
        image.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        image.bytes().to_vec(),
    ))
}
