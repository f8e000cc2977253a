use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::image::SourceImage;
use crate::models::job::RunSelection;
use crate::services::dispatcher::Dispatcher;
use crate::services::store::JobStateStore;
use crate::services::transform::ImageTransform;

/// One uploaded photo and everything generated from it.
///
/// A session owns its own job store and dispatcher. Resetting a session
/// drops it from the registry; calls still in flight finish against the
/// detached store and their results go nowhere.
pub struct Session {
    pub id: Uuid,
    pub source: SourceImage,
    pub created_at: DateTime<Utc>,
    pub dispatcher: Dispatcher,
    selection: Mutex<Option<RunSelection>>,
}

impl Session {
    pub fn store(&self) -> &Arc<JobStateStore> {
        self.dispatcher.store()
    }

    /// The selection of the most recent batch, if one was started.
    pub fn selection(&self) -> Option<RunSelection> {
        self.selection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// True while a batch is admitted or a single-job retry is unfinished.
    pub fn is_busy(&self) -> bool {
        self.dispatcher.is_running() || self.store().retries_in_flight() > 0
    }

    pub fn set_selection(&self, selection: RunSelection) {
        *self
            .selection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(selection);
    }
}

/// In-memory sessions keyed by id.
pub struct SessionRegistry {
    transform: Arc<dyn ImageTransform>,
    worker_count: usize,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(transform: Arc<dyn ImageTransform>, worker_count: usize) -> Self {
        Self {
            transform,
            worker_count,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self, source: SourceImage) -> Arc<Session> {
        let session = Arc::new(Session {
            id: Uuid::new_v4(),
            source,
            created_at: Utc::now(),
            dispatcher: Dispatcher::new(
                self.transform.clone(),
                Arc::new(JobStateStore::new()),
                self.worker_count,
            ),
            selection: Mutex::new(None),
        });
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(session.id, session.clone());
        tracing::info!(session_id = %session.id, content_type = session.source.content_type(), "Session created");
        session
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&id)
            .cloned()
    }

    /// Discard a session. Its store is cleared so late results are dropped
    /// even by holders of the old `Arc`.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id);
        match removed {
            Some(session) => {
                session.store().clear();
                tracing::info!(session_id = %id, "Session reset");
                true
            }
            None => false,
        }
    }

    /// Remove every idle session created more than `ttl` ago.
    pub fn evict_older_than(&self, ttl: Duration) -> usize {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => self.evict_created_before(Utc::now() - ttl),
            Err(_) => 0,
        }
    }

    /// Remove every idle session created before `cutoff`, returning how many
    /// went. Sessions with work in flight are kept until a later sweep.
    pub fn evict_created_before(&self, cutoff: DateTime<Utc>) -> usize {
        let expired: Vec<Uuid> = self
            .sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|session| session.created_at < cutoff && !session.is_busy())
            .map(|session| session.id)
            .collect();

        let evicted = expired.into_iter().filter(|id| self.remove(*id)).count();
        if evicted > 0 {
            tracing::info!(evicted, remaining = self.len(), "Expired sessions evicted");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::ImageHandle;
    use crate::models::job::JobStatus;
    use crate::services::catalog;
    use crate::services::transform::TransformError;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl ImageTransform for Unreachable {
        async fn transform(
            &self,
            _source: &SourceImage,
            _directive: &str,
        ) -> Result<ImageHandle, TransformError> {
            panic!("transform must not be called");
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(Unreachable), 2)
    }

    fn source() -> SourceImage {
        SourceImage::from_bytes(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec()).unwrap()
    }

    #[test]
    fn test_idle_sessions_past_cutoff_are_evicted() {
        let registry = registry();
        let session = registry.create(source());
        let later = Utc::now() + chrono::Duration::seconds(1);

        assert_eq!(registry.evict_older_than(Duration::from_secs(3600)), 0);
        assert!(registry.get(session.id).is_some());

        assert_eq!(registry.evict_created_before(later), 1);
        assert!(registry.get(session.id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_eviction_clears_store_of_held_session() {
        let registry = registry();
        let session = registry.create(source());
        let selection = catalog::select(&["Walking Pose"]).unwrap();
        let epoch = session.store().reset(&selection);
        session.store().complete(
            epoch,
            "Walking Pose",
            JobStatus::Failed {
                message: "rate limited".into(),
            },
        );

        assert_eq!(
            registry.evict_created_before(Utc::now() + chrono::Duration::seconds(1)),
            1
        );
        assert!(session.store().is_empty());
    }

    #[test]
    fn test_busy_session_survives_sweep() {
        let registry = registry();
        let session = registry.create(source());
        let selection = catalog::select(&["Walking Pose", "Candid Moment"]).unwrap();
        let batch = session.dispatcher.admit(&selection).unwrap();
        assert!(session.is_busy());

        let later = Utc::now() + chrono::Duration::seconds(1);
        assert_eq!(registry.evict_created_before(later), 0);
        assert!(registry.get(session.id).is_some());

        drop(batch);
        assert!(!session.is_busy());
        assert_eq!(registry.evict_created_before(later), 1);
        assert!(session.store().is_empty());
    }
}
