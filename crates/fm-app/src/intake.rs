use std::path::PathBuf;
use fm_core::{Error, JobId, Result};
use crate::config::ServiceConfig;

/// Per-job directories resolved from the configured roots.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDirs {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Validate `raw_id`, require its upload directory and create its output directory.
///
/// Runs on the request path so that bad requests fail before any task is spawned.
pub fn resolve(config: &ServiceConfig, raw_id: Option<&str>) -> Result<(JobId, JobDirs)> {
    let id = JobId::parse(raw_id.unwrap_or_default())?;
    let input = id.dir_under(&config.upload_root);
    let output = id.dir_under(&config.output_root);

    if !input.is_dir() {
        return Err(Error::NotFound(input));
    }
    std::fs::create_dir_all(&output).map_err(|e| Error::io_at(&output, e))?;

    Ok((id, JobDirs { input, output }))
}
