use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Register descriptions for the metrics the dispatcher and album emit.
pub fn describe() {
    metrics::describe_counter!(
        "transform_jobs_total",
        "Transform calls finished, labelled by outcome"
    );
    metrics::describe_histogram!(
        "transform_duration_seconds",
        "Wall time of one transform call"
    );
    metrics::describe_gauge!(
        "transform_jobs_in_flight",
        "Transform calls currently awaiting the model"
    );
    metrics::describe_counter!(
        "album_compositions_total",
        "Album requests, labelled composed, declined or failed"
    );
}

/// GET /metrics — Prometheus text exposition.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
