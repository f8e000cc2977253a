use std::sync::Arc;

use crate::services::{
    album::{Compositor, GridAlbumCompositor},
    session::SessionRegistry,
    transform::ImageTransform,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub compositor: Arc<dyn Compositor>,
    pub worker_count: usize,
}

impl AppState {
    pub fn new(
        transform: Arc<dyn ImageTransform>,
        compositor: GridAlbumCompositor,
        worker_count: usize,
    ) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(transform, worker_count)),
            compositor: Arc::new(compositor),
            worker_count,
        }
    }
}
