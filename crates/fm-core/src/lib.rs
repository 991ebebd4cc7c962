pub mod artifact;
pub mod error;
mod job;
mod measurement;
mod scale;

pub use error::{Error, Result};
pub use job::{CallbackPayload, JobId, JobStatus};
pub use measurement::Measurement;
pub use scale::{MeshGeometry, ScaleFactor};
