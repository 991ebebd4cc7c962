use std::path::Path;
use std::sync::Arc;
use axum::Json;
use axum::extract::{Multipart, State};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use fm_core::JobId;
use crate::backend::schemas::UploadResponse;
use crate::backend::state::MeshState;
use crate::error::AppError;

/// Store the `images` parts of a multipart body under a fresh job id and start
/// reconstructing it.
pub async fn upload_images(
    State(state): State<Arc<MeshState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let id = new_job_id()?;
    let dir = id.dir_under(&state.orchestrator.config().upload_root);

    let images = match store_images(&mut multipart, &dir).await {
        Ok(n) => n,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                warn!(job = %id, "Failed to remove partial upload: {cleanup}");
            }
            return Err(e);
        }
    };
    info!(job = %id, images, "Images uploaded");

    state.orchestrator.submit(Some(id.as_str()))?;
    Ok(Json(UploadResponse {
        message: "Images uploaded.".to_string(),
        identifier: id.to_string(),
        images,
    }))
}

/// `{YYYYmmdd_HHMMSS}_{8 hex}`; the suffix keeps same-second uploads apart.
fn new_job_id() -> Result<JobId, AppError> {
    let suffix = Uuid::new_v4().simple().to_string();
    let raw = format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &suffix[..8]);
    Ok(JobId::parse(&raw)?)
}

async fn store_images(multipart: &mut Multipart, dir: &Path) -> Result<usize, AppError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| fm_core::Error::io_at(dir, e))?;

    let mut count = 0;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if !matches!(field.name(), Some("images" | "images[]")) {
            continue;
        }
        let name = stored_file_name(field.file_name(), count);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        if data.is_empty() {
            continue;
        }
        let path = dir.join(name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| fm_core::Error::io_at(&path, e))?;
        count += 1;
    }

    if count == 0 {
        return Err(AppError::BadRequest("No images uploaded.".to_string()));
    }
    Ok(count)
}

/// Index-prefixed, path-free version of the client's file name.
fn stored_file_name(client_name: Option<&str>, index: usize) -> String {
    let base = client_name
        .and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let clean: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let clean = clean.trim_start_matches('.');
    if clean.is_empty() {
        format!("{index:04}_image.jpg")
    } else {
        format!("{index:04}_{clean}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_file_name() {
        assert_eq!(stored_file_name(Some("IMG_0001.JPG"), 0), "0000_IMG_0001.JPG");
        assert_eq!(stored_file_name(Some("../../etc/passwd"), 3), "0003_passwd");
        assert_eq!(stored_file_name(Some("my photo (1).png"), 12), "0012_my_photo__1_.png");
        assert_eq!(stored_file_name(Some(".hidden"), 1), "0001_hidden");
        assert_eq!(stored_file_name(None, 2), "0002_image.jpg");
    }

    #[test]
    fn test_new_job_id_shape() {
        let id = new_job_id().unwrap();
        let s = id.as_str();
        assert_eq!(s.len(), "20260101_120000_".len() + 8);
        assert!(s[..8].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(&s[8..9], "_");
        assert_ne!(new_job_id().unwrap(), id);
    }
}
