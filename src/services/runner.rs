use std::time::Instant;

use crate::models::image::{ImageHandle, SourceImage};
use crate::models::job::{JobSpec, JobStatus};
use crate::services::transform::{ImageTransform, TransformError};

/// Run one job template against the source photo.
///
/// No retries happen here; re-running a job is the caller's decision.
pub async fn run_job(
    transform: &dyn ImageTransform,
    spec: &JobSpec,
    source: &SourceImage,
) -> Result<ImageHandle, TransformError> {
    tracing::debug!(job = %spec.name, "Calling image transform");
    metrics::gauge!("transform_jobs_in_flight").increment(1.0);
    let start = Instant::now();

    let result = transform.transform(source, spec.directive).await;

    let elapsed = start.elapsed();
    metrics::gauge!("transform_jobs_in_flight").decrement(1.0);
    metrics::histogram!("transform_duration_seconds").record(elapsed.as_secs_f64());

    match &result {
        Ok(image) => {
            metrics::counter!("transform_jobs_total", "outcome" => "done").increment(1);
            tracing::info!(
                job = %spec.name,
                duration_ms = elapsed.as_millis() as u64,
                bytes = image.len(),
                "Transform complete"
            );
        }
        Err(e) => {
            metrics::counter!("transform_jobs_total", "outcome" => "failed").increment(1);
            tracing::error!(
                job = %spec.name,
                duration_ms = elapsed.as_millis() as u64,
                error = %e,
                "Transform failed"
            );
        }
    }

    result
}

/// Turn a runner result into the terminal status recorded in the store.
pub fn outcome(result: Result<ImageHandle, TransformError>) -> JobStatus {
    match result {
        Ok(image) => JobStatus::Done { image },
        Err(e) => JobStatus::Failed {
            message: failure_message(&e),
        },
    }
}

fn failure_message(error: &TransformError) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        "An unknown error occurred.".to_string()
    } else {
        message
    }
}
