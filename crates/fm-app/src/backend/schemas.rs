use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /upload`. Older clients send the id as `timestamp`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconstructRequest {
    #[serde(default, alias = "timestamp")]
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconstructResponse {
    pub message: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub message: String,
    pub identifier: String,
    pub images: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusResponse {
    pub identifier: String,
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub running_jobs: usize,
}
