//! Artifact names and the existence check that decides whether a stage succeeded.
//!
//! Exit codes of the external tools are not trusted; a stage has succeeded
//! exactly when its artifact is a regular file on disk.

use std::path::{Path, PathBuf};
use crate::error::{Error, Result};

/// Raw mesh written by the reconstruction engine.
pub const RAW_MESH_ARTIFACT: &str = "texturedMesh.obj";

/// Final scaled model written by the scaling stage.
pub const EXPORT_ARTIFACT: &str = "model.glb";

/// File extension accepted by the mesh importer.
pub const RAW_MESH_EXTENSION: &str = "obj";

pub fn raw_mesh_path(output_dir: &Path) -> PathBuf {
    output_dir.join(RAW_MESH_ARTIFACT)
}

pub fn export_path(output_dir: &Path) -> PathBuf {
    output_dir.join(EXPORT_ARTIFACT)
}

/// True when the reconstruction engine left its mesh in `output_dir`.
pub fn verify(output_dir: &Path) -> bool {
    verify_file(&raw_mesh_path(output_dir))
}

pub fn verify_file(path: &Path) -> bool {
    path.is_file()
}

/// Like [`verify_file`] but fails with [`Error::Verification`].
pub fn require_file(path: &Path) -> Result<()> {
    if verify_file(path) {
        Ok(())
    } else {
        Err(Error::Verification(path.to_path_buf()))
    }
}
