use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: ComponentHealth,
    pub queue: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
}

impl ComponentHealth {
    fn ok(latency_ms: u64, backend: Option<&'static str>) -> Self {
        Self {
            status: "ok".to_string(),
            latency_ms: Some(latency_ms),
            backend,
        }
    }

    fn error(backend: Option<&'static str>) -> Self {
        Self {
            status: "error".to_string(),
            latency_ms: None,
            backend,
        }
    }
}

/// GET /health: dependency status for the database and job queue.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_start = std::time::Instant::now();
    let database = match state.recipes.ping().await {
        Ok(()) => ComponentHealth::ok(db_start.elapsed().as_millis() as u64, None),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            ComponentHealth::error(None)
        }
    };

    let backend = Some(state.submitter.backend());
    let queue_start = std::time::Instant::now();
    let queue = match state.submitter.health_check().await {
        Ok(()) => ComponentHealth::ok(queue_start.elapsed().as_millis() as u64, backend),
        Err(e) => {
            tracing::warn!(error = %e, "Queue health check failed");
            ComponentHealth::error(backend)
        }
    };

    let all_healthy = database.status == "ok" && queue.status == "ok";
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { database, queue },
    };

    (status_code, Json(response))
}
