use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use fm_core::JobId;

/// Errors surfaced synchronously to an HTTP caller.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Pipeline(#[from] fm_core::Error),

    #[error("Reconstruction already running for {0}")]
    AlreadyRunning(JobId),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Job not running: {0}")]
    NotRunning(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Pipeline(fm_core::Error::Validation(_)) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Pipeline(fm_core::Error::NotFound(_)) | Self::NotRunning(_) => StatusCode::NOT_FOUND,
            Self::AlreadyRunning(_) => StatusCode::CONFLICT,
            Self::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Pipeline(fm_core::Error::NotFound(path)) => {
                format!("Upload directory not found: {}", path.display())
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
