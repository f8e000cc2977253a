//! Per-session job state.
//!
//! The store maps job names to their current [`JobStatus`], in the order the
//! jobs were selected. Every write is a single-key upsert behind one mutex.
//! Each reset bumps an epoch; completions carry the epoch they started under
//! and are dropped when the store has moved on, so a call that outlives a
//! reset can never resurrect stale state.
//!
//! The store also counts admitted single-job retries that have not finished.
//! A batch reset is refused while any are outstanding, so a job name never
//! has two transform calls in flight at once.

use std::sync::{Mutex, MutexGuard};

use crate::models::image::ImageHandle;
use crate::models::job::{JobStatus, RunSelection};

/// Generation counter for the store contents.
pub type Epoch = u64;

/// One row of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEntry {
    pub name: String,
    pub status: JobStatus,
}

/// Outcome of trying to claim a job for a single re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAdmission {
    /// The job was terminal and is now `Pending` under this epoch.
    Admitted(Epoch),
    /// A run for this job is already in flight.
    AlreadyPending,
    /// The job is not part of the current session.
    NotInSession,
}

/// Status tallies for progress display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub pending: usize,
    pub done: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct Inner {
    epoch: Epoch,
    entries: Vec<JobEntry>,
    retries_in_flight: usize,
}

impl Inner {
    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }
}

#[derive(Debug, Default)]
pub struct JobStateStore {
    inner: Mutex<Inner>,
}

impl JobStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the contents with one `Pending` entry per selected job.
    pub fn reset(&self, selection: &RunSelection) -> Epoch {
        Self::reset_locked(&mut self.lock(), selection)
    }

    /// Like [`reset`](Self::reset), but refused with `None` while a retry
    /// admitted by [`begin_retry`](Self::begin_retry) is still unfinished.
    pub fn try_reset(&self, selection: &RunSelection) -> Option<Epoch> {
        let mut inner = self.lock();
        if inner.retries_in_flight > 0 {
            tracing::debug!(
                retries = inner.retries_in_flight,
                "Job store reset refused, retries in flight"
            );
            return None;
        }
        Some(Self::reset_locked(&mut inner, selection))
    }

    fn reset_locked(inner: &mut Inner, selection: &RunSelection) -> Epoch {
        inner.epoch += 1;
        inner.entries = selection
            .names()
            .map(|name| JobEntry {
                name: name.to_string(),
                status: JobStatus::Pending,
            })
            .collect();
        tracing::debug!(epoch = inner.epoch, jobs = inner.entries.len(), "Job store reset");
        inner.epoch
    }

    /// Drop every entry. Results still in flight will be discarded.
    pub fn clear(&self) -> Epoch {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.entries.clear();
        inner.epoch
    }

    pub fn epoch(&self) -> Epoch {
        self.lock().epoch
    }

    /// Atomically move a terminal job back to `Pending` for a single re-run.
    pub fn begin_retry(&self, name: &str) -> RetryAdmission {
        let mut inner = self.lock();
        let epoch = inner.epoch;
        let Some(idx) = inner.position(name) else {
            return RetryAdmission::NotInSession;
        };
        let entry = &mut inner.entries[idx];
        if entry.status.is_pending() {
            return RetryAdmission::AlreadyPending;
        }
        entry.status = JobStatus::Pending;
        inner.retries_in_flight += 1;
        RetryAdmission::Admitted(epoch)
    }

    /// Release one retry admitted by [`begin_retry`](Self::begin_retry).
    pub fn finish_retry(&self) {
        let mut inner = self.lock();
        inner.retries_in_flight = inner.retries_in_flight.saturating_sub(1);
    }

    pub fn retries_in_flight(&self) -> usize {
        self.lock().retries_in_flight
    }

    /// Record the result of a run started under `epoch`.
    ///
    /// Returns false when the write was dropped because the store was reset
    /// since, or the job is no longer part of it.
    pub fn complete(&self, epoch: Epoch, name: &str, status: JobStatus) -> bool {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            tracing::debug!(
                job = %name,
                epoch,
                current_epoch = inner.epoch,
                "Dropping result from superseded session state"
            );
            return false;
        }
        match inner.position(name) {
            Some(idx) => {
                inner.entries[idx].status = status;
                true
            }
            None => {
                tracing::debug!(job = %name, "Dropping result for job outside the session");
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<JobStatus> {
        let inner = self.lock();
        inner.position(name).map(|idx| inner.entries[idx].status.clone())
    }

    /// All entries in selection order.
    pub fn snapshot(&self) -> Vec<JobEntry> {
        self.lock().entries.clone()
    }

    /// Successful results in selection order.
    pub fn done_results(&self) -> Vec<(String, ImageHandle)> {
        self.lock()
            .entries
            .iter()
            .filter_map(|e| e.status.image().map(|img| (e.name.clone(), img.clone())))
            .collect()
    }

    pub fn counts(&self) -> StoreCounts {
        self.lock()
            .entries
            .iter()
            .fold(StoreCounts::default(), |mut counts, e| {
                match e.status {
                    JobStatus::Pending => counts.pending += 1,
                    JobStatus::Done { .. } => counts.done += 1,
                    JobStatus::Failed { .. } => counts.failed += 1,
                }
                counts
            })
    }

    /// True when the store holds at least one job and none is pending.
    pub fn is_settled(&self) -> bool {
        let inner = self.lock();
        !inner.entries.is_empty() && inner.entries.iter().all(|e| e.status.is_terminal())
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog;

    fn selection() -> RunSelection {
        catalog::select(&["Smiling Portrait", "Walking Pose", "Candid Moment"]).unwrap()
    }

    fn done(bytes: &[u8]) -> JobStatus {
        JobStatus::Done {
            image: ImageHandle::new(bytes.to_vec(), "image/png"),
        }
    }

    #[test]
    fn test_reset_marks_every_selected_job_pending() {
        let store = JobStateStore::new();
        store.reset(&selection());
        let names: Vec<_> = store.snapshot().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Smiling Portrait", "Walking Pose", "Candid Moment"]);
        assert_eq!(store.counts().pending, 3);
        assert!(!store.is_settled());
    }

    #[test]
    fn test_complete_updates_only_its_key() {
        let store = JobStateStore::new();
        let epoch = store.reset(&selection());
        assert!(store.complete(epoch, "Walking Pose", done(b"walk")));
        assert!(store.get("Smiling Portrait").unwrap().is_pending());
        assert_eq!(store.get("Walking Pose").unwrap().label(), "done");
        assert_eq!(
            store.counts(),
            StoreCounts {
                pending: 2,
                done: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn test_stale_epoch_write_is_dropped() {
        let store = JobStateStore::new();
        let old = store.reset(&selection());
        let new = store.reset(&selection());
        assert_ne!(old, new);
        assert!(!store.complete(old, "Walking Pose", done(b"late")));
        assert!(store.get("Walking Pose").unwrap().is_pending());
    }

    #[test]
    fn test_write_after_clear_is_dropped() {
        let store = JobStateStore::new();
        let epoch = store.reset(&selection());
        store.clear();
        assert!(!store.complete(epoch, "Walking Pose", done(b"late")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_key_never_inserted() {
        let store = JobStateStore::new();
        let epoch = store.reset(&selection());
        assert!(!store.complete(epoch, "Side Profile", done(b"x")));
        assert_eq!(store.len(), 3);
        assert!(store.get("Side Profile").is_none());
    }

    #[test]
    fn test_begin_retry_guards() {
        let store = JobStateStore::new();
        let epoch = store.reset(&selection());
        assert_eq!(store.begin_retry("Walking Pose"), RetryAdmission::AlreadyPending);
        assert_eq!(store.begin_retry("Side Profile"), RetryAdmission::NotInSession);

        store.complete(
            epoch,
            "Walking Pose",
            JobStatus::Failed {
                message: "rate limited".into(),
            },
        );
        assert_eq!(store.begin_retry("Walking Pose"), RetryAdmission::Admitted(epoch));
        assert!(store.get("Walking Pose").unwrap().is_pending());
        assert_eq!(store.begin_retry("Walking Pose"), RetryAdmission::AlreadyPending);
    }

    #[test]
    fn test_reset_refused_while_retry_outstanding() {
        let store = JobStateStore::new();
        let epoch = store.reset(&selection());
        store.complete(epoch, "Walking Pose", done(b"walk"));
        assert_eq!(store.begin_retry("Walking Pose"), RetryAdmission::Admitted(epoch));
        assert_eq!(store.retries_in_flight(), 1);

        assert_eq!(store.try_reset(&selection()), None);
        assert_eq!(store.epoch(), epoch);
        assert!(store.get("Walking Pose").unwrap().is_pending());

        store.finish_retry();
        assert_eq!(store.retries_in_flight(), 0);
        assert_eq!(store.try_reset(&selection()), Some(epoch + 1));
    }

    #[test]
    fn test_done_results_in_selection_order() {
        let store = JobStateStore::new();
        let epoch = store.reset(&selection());
        store.complete(epoch, "Candid Moment", done(b"c"));
        store.complete(epoch, "Smiling Portrait", done(b"s"));
        store.complete(
            epoch,
            "Walking Pose",
            JobStatus::Failed {
                message: "boom".into(),
            },
        );
        let names: Vec<_> = store.done_results().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Smiling Portrait", "Candid Moment"]);
        assert!(store.is_settled());
    }
}
