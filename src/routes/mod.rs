pub mod album;
pub mod error;
pub mod health;
pub mod jobs;
pub mod metrics;
pub mod sessions;
pub mod styles;

use std::sync::Arc;

use crate::app_state::AppState;
use crate::routes::error::ApiError;
use crate::services::session::Session;

/// Resolve a session id from the path or fail with 404.
pub(crate) fn session_or_404(state: &AppState, id: uuid::Uuid) -> Result<Arc<Session>, ApiError> {
    state.sessions.get(id).ok_or(ApiError::SessionNotFound(id))
}
