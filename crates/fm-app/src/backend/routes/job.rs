use std::sync::Arc;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use fm_core::JobId;
use crate::backend::schemas::{HealthResponse, JobStatusResponse, ReconstructRequest, ReconstructResponse};
use crate::backend::state::MeshState;
use crate::error::AppError;
use crate::registry::RunningJob;

pub async fn start_reconstruction(
    State(state): State<Arc<MeshState>>,
    body: Result<Json<ReconstructRequest>, JsonRejection>,
) -> Result<Json<ReconstructResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let id = state.orchestrator.submit(req.identifier.as_deref())?;
    Ok(Json(ReconstructResponse {
        message: "Reconstruction started.".to_string(),
        identifier: id.to_string(),
    }))
}

pub async fn list_jobs(State(state): State<Arc<MeshState>>) -> Json<Vec<RunningJob>> {
    Json(state.orchestrator.registry().running())
}

pub async fn job_status(
    State(state): State<Arc<MeshState>>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let id = JobId::parse(&id)?;
    let started_at = state
        .orchestrator
        .registry()
        .running()
        .into_iter()
        .find(|job| job.identifier == id.as_str())
        .map(|job| job.started_at);
    Ok(Json(JobStatusResponse {
        identifier: id.to_string(),
        running: started_at.is_some(),
        started_at,
    }))
}

pub async fn cancel_job(
    State(state): State<Arc<MeshState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = JobId::parse(&id)?;
    if state.orchestrator.cancel(&id) {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(AppError::NotRunning(id.to_string()))
    }
}

pub async fn health(State(state): State<Arc<MeshState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        running_jobs: state.orchestrator.registry().running().len(),
    })
}
