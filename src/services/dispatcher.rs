//! Bounded-concurrency dispatch of transform jobs.
//!
//! A batch seeds one FIFO queue and drains it with a fixed number of workers.
//! Workers are plain futures joined on the calling task, so at most
//! `worker_count` transform calls are ever in flight for a batch. Single-job
//! retries bypass the queue and the bound entirely; the store's pending check
//! keeps a job from running twice at once. A batch is not admitted while a
//! retry is still outstanding, since the reset would re-queue a job whose
//! previous call has not returned.
//!
//! Both operations come in two halves: a synchronous admission that updates
//! the store, and an async execution. Callers that hand execution to a
//! background task still get admission errors and visible `Pending` entries
//! before they return.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::models::image::SourceImage;
use crate::models::job::{JobSpec, JobStatus, RunSelection};
use crate::services::catalog;
use crate::services::runner;
use crate::services::store::{Epoch, JobStateStore, RetryAdmission};
use crate::services::transform::ImageTransform;

/// Workers per batch when not configured otherwise.
pub const DEFAULT_WORKER_COUNT: usize = 2;

type RunQueue = Mutex<VecDeque<&'static JobSpec>>;

/// Totals for one finished batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub epoch: Epoch,
    pub done: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Default, Clone, Copy)]
struct WorkerTally {
    done: usize,
    failed: usize,
}

/// What a single-job retry ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// The job ran again and reached this terminal status.
    Completed(JobStatus),
    /// The job was already pending; nothing was started.
    Skipped,
    /// The job is not part of the current session; nothing was started.
    NotInSession,
}

pub struct Dispatcher {
    transform: Arc<dyn ImageTransform>,
    store: Arc<JobStateStore>,
    worker_count: usize,
    run_guard: Arc<tokio::sync::Mutex<()>>,
}

impl Dispatcher {
    pub fn new(
        transform: Arc<dyn ImageTransform>,
        store: Arc<JobStateStore>,
        worker_count: usize,
    ) -> Self {
        Self {
            transform,
            store,
            worker_count: worker_count.max(1),
            run_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn store(&self) -> &Arc<JobStateStore> {
        &self.store
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// True while a batch is admitted or being drained.
    pub fn is_running(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Run every selected job and wait until all of them are terminal.
    ///
    /// Individual failures are recorded and never abort the batch.
    pub async fn run(
        &self,
        selection: &RunSelection,
        source: &SourceImage,
    ) -> Result<RunSummary, DispatchError> {
        let batch = self.admit(selection)?;
        Ok(batch.execute(source).await)
    }

    /// Claim the dispatcher for a batch and reset the store to one `Pending`
    /// entry per selected job, without starting any work.
    ///
    /// Only one batch may be admitted at a time, and none while a single-job
    /// retry is unfinished; both cases are rejected without touching the
    /// store. The claim is released when the returned batch finishes or is
    /// dropped.
    pub fn admit(&self, selection: &RunSelection) -> Result<AdmittedBatch, DispatchError> {
        if selection.is_empty() {
            return Err(DispatchError::EmptySelection);
        }
        let running = self
            .run_guard
            .clone()
            .try_lock_owned()
            .map_err(|_| DispatchError::RunInProgress)?;

        let epoch = self.store.try_reset(selection).ok_or_else(|| {
            tracing::warn!(
                retries = self.store.retries_in_flight(),
                "Batch rejected, retries still in flight"
            );
            DispatchError::RetryInProgress
        })?;
        Ok(AdmittedBatch {
            transform: self.transform.clone(),
            store: self.store.clone(),
            worker_count: self.worker_count,
            epoch,
            jobs: selection.len(),
            queue: Mutex::new(selection.specs().iter().copied().collect()),
            _running: running,
        })
    }

    /// Re-run one job outside the batch queue and wait for its new status.
    ///
    /// A job that is currently pending is left alone. Other jobs' entries are
    /// never touched, and no batch needs to be active.
    pub async fn retry(
        &self,
        name: &str,
        source: &SourceImage,
    ) -> Result<RetryOutcome, DispatchError> {
        Ok(match self.admit_retry(name)? {
            RetryStart::Started(retry) => RetryOutcome::Completed(retry.execute(source).await),
            RetryStart::Skipped => RetryOutcome::Skipped,
            RetryStart::NotInSession => RetryOutcome::NotInSession,
        })
    }

    /// Move a terminal job back to `Pending` and hand back the call to make.
    pub fn admit_retry(&self, name: &str) -> Result<RetryStart, DispatchError> {
        let spec = catalog::lookup(name).inspect_err(|_| {
            tracing::error!(job = %name, "Style not found, retry aborted");
        })?;

        Ok(match self.store.begin_retry(spec.name) {
            RetryAdmission::Admitted(epoch) => RetryStart::Started(PreparedRetry {
                transform: self.transform.clone(),
                store: self.store.clone(),
                spec,
                epoch,
                _release: RetryRelease(self.store.clone()),
            }),
            RetryAdmission::AlreadyPending => {
                tracing::debug!(job = %spec.name, "Retry ignored, job already pending");
                RetryStart::Skipped
            }
            RetryAdmission::NotInSession => {
                tracing::warn!(job = %spec.name, "Retry ignored, job not in current session");
                RetryStart::NotInSession
            }
        })
    }
}

/// A batch whose jobs are visible as `Pending` and waiting to be drained.
pub struct AdmittedBatch {
    transform: Arc<dyn ImageTransform>,
    store: Arc<JobStateStore>,
    worker_count: usize,
    epoch: Epoch,
    jobs: usize,
    queue: RunQueue,
    _running: tokio::sync::OwnedMutexGuard<()>,
}

impl AdmittedBatch {
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Drain the queue with `worker_count` workers and wait for all of them.
    pub async fn execute(self, source: &SourceImage) -> RunSummary {
        let start = Instant::now();
        tracing::info!(
            epoch = self.epoch,
            jobs = self.jobs,
            workers = self.worker_count,
            "Starting batch"
        );

        let workers = (0..self.worker_count).map(|worker| self.drain(worker, source));
        let tallies = join_all(workers).await;

        let summary = RunSummary {
            epoch: self.epoch,
            done: tallies.iter().map(|t| t.done).sum(),
            failed: tallies.iter().map(|t| t.failed).sum(),
            elapsed: start.elapsed(),
        };

        tracing::info!(
            epoch = self.epoch,
            done = summary.done,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Batch finished"
        );

        summary
    }

    /// Worker loop: pop, run, record, until the queue is empty.
    async fn drain(&self, worker: usize, source: &SourceImage) -> WorkerTally {
        let mut tally = WorkerTally::default();
        while let Some(spec) = pop_next(&self.queue) {
            tracing::debug!(worker, job = %spec.name, "Worker picked up job");
            let status =
                runner::outcome(runner::run_job(self.transform.as_ref(), spec, source).await);
            match status {
                JobStatus::Done { .. } => tally.done += 1,
                _ => tally.failed += 1,
            }
            self.store.complete(self.epoch, spec.name, status);
        }
        tracing::debug!(worker, "Worker exiting, queue drained");
        tally
    }
}

/// Result of asking to re-run a job.
pub enum RetryStart {
    Started(PreparedRetry),
    Skipped,
    NotInSession,
}

/// A job already marked `Pending` for a single re-run.
///
/// Until this is executed or dropped, no batch can be admitted on the same
/// store.
pub struct PreparedRetry {
    transform: Arc<dyn ImageTransform>,
    store: Arc<JobStateStore>,
    spec: &'static JobSpec,
    epoch: Epoch,
    _release: RetryRelease,
}

/// Hands the retry slot back to the store however the retry ends.
struct RetryRelease(Arc<JobStateStore>);

impl Drop for RetryRelease {
    fn drop(&mut self) {
        self.0.finish_retry();
    }
}

impl PreparedRetry {
    pub fn job(&self) -> &'static JobSpec {
        self.spec
    }

    /// Make the transform call and record its result.
    pub async fn execute(self, source: &SourceImage) -> JobStatus {
        tracing::info!(job = %self.spec.name, epoch = self.epoch, "Regenerating image");
        let status =
            runner::outcome(runner::run_job(self.transform.as_ref(), self.spec, source).await);
        if !self.store.complete(self.epoch, self.spec.name, status.clone()) {
            tracing::info!(job = %self.spec.name, "Session moved on, retry result discarded");
        }
        status
    }
}

fn pop_next(queue: &RunQueue) -> Option<&'static JobSpec> {
    queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop_front()
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("No styles selected")]
    EmptySelection,

    #[error("A batch is already running for this session")]
    RunInProgress,

    #[error("An image is still being regenerated for this session")]
    RetryInProgress,

    #[error("Unknown style: {0}")]
    UnknownJob(String),
}
