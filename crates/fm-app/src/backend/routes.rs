use std::sync::Arc;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use crate::backend::routes::job::{cancel_job, health, job_status, list_jobs, start_reconstruction};
use crate::backend::routes::upload::upload_images;
use crate::backend::state::MeshState;

mod job;
mod upload;

/// Photo sets are large; axum's 2 MiB default would reject most of them.
const UPLOAD_BODY_LIMIT: usize = 1024 * 1024 * 1024;

pub fn api_routes() -> Router<Arc<MeshState>> {
    Router::new()
        .route("/upload", post(start_reconstruction))
        .route(
            "/images",
            post(upload_images).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(job_status).delete(cancel_job))
        .route("/health", get(health))
}
