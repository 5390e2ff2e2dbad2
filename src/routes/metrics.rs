use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the job pipeline metrics.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "recipe_jobs_submitted_total",
        "Jobs handed to the background executor"
    );
    metrics::describe_counter!(
        "recipe_jobs_completed_total",
        "Jobs that reached the completed state"
    );
    metrics::describe_counter!(
        "recipe_jobs_failed_total",
        "Jobs that reached the failed state"
    );
    metrics::describe_histogram!(
        "recipe_engine_call_seconds",
        metrics::Unit::Seconds,
        "Latency of detection and generation engine calls"
    );
}
