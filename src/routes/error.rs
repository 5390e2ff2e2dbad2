use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::StoreError;
use crate::jobs::orchestrator::JobError;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

/// Error returned by route handlers.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    NotFound(&'static str),
    Conflict(String),
    BadRequest(String),
    Internal,
}

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }

    /// Map an orchestrator error, naming the missing resource on 404.
    pub fn from_job(err: JobError, what: &'static str) -> Self {
        match err {
            JobError::NotFound => ApiError::NotFound(what),
            JobError::Conflict(msg) => ApiError::Conflict(msg),
            JobError::BadRequest(msg) => ApiError::BadRequest(msg),
            other => {
                tracing::error!(error = %other, "Job operation failed");
                ApiError::Internal
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Storage operation failed");
        ApiError::Internal
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::BadRequest(report.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_errors_map_to_status_codes() {
        let cases = [
            (JobError::NotFound, StatusCode::NOT_FOUND),
            (JobError::Conflict("dup".into()), StatusCode::CONFLICT),
            (JobError::BadRequest("early".into()), StatusCode::BAD_REQUEST),
            (
                JobError::Store(StoreError::Corrupt("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from_job(err, "Job").into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let (_, detail) = ApiError::from(StoreError::Corrupt("secret table state".into()))
            .status_and_detail();
        assert_eq!(detail, "Internal server error");
    }
}
