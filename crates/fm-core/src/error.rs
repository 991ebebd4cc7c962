use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes shared by every stage of the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or a value is out of its domain.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A directory, image or input file does not exist.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The external engine could not be started or died abnormally.
    #[error("process error: {0}")]
    Process(String),

    /// An expected output artifact is absent after an apparently successful step.
    #[error("expected artifact missing: {}", .0.display())]
    Verification(PathBuf),

    /// Malformed numeric or file input.
    #[error("parse error: {0}")]
    Parse(String),

    /// Callback or detector service could not be reached.
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(details: impl Into<String>) -> Self {
        Self::Validation(details.into())
    }

    pub fn parse(details: impl Into<String>) -> Self {
        Self::Parse(details.into())
    }

    /// Map an I/O failure on `path`, keeping "file does not exist" distinct.
    pub fn io_at(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.into())
        } else {
            Self::Io(err)
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
