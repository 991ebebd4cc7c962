use std::fmt;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

const MAX_JOB_ID_LEN: usize = 128;

/// Caller-supplied job identifier, safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn parse(raw: &str) -> Result<Self> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(Error::validation("missing identifier"));
        }
        if id.len() > MAX_JOB_ID_LEN {
            return Err(Error::validation(format!(
                "identifier longer than {MAX_JOB_ID_LEN} bytes"
            )));
        }
        if id == "." || id == ".." {
            return Err(Error::validation(format!("identifier '{id}' is not a directory name")));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        {
            return Err(Error::validation(format!(
                "identifier '{id}' contains forbidden character {bad:?}"
            )));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `root/{id}`
    pub fn dir_under(&self, root: &Path) -> std::path::PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        JobId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    ModelMissing,
    Error,
    Exception,
    Timeout,
    Cancelled,
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::ModelMissing => "model_missing",
            Self::Error => "error",
            Self::Exception => "exception",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal report posted to the caller, once per job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallbackPayload {
    pub identifier: String,
    pub status: JobStatus,
    pub message: String,
}

impl CallbackPayload {
    pub fn new(id: &JobId, status: JobStatus, message: impl Into<String>) -> Self {
        Self {
            identifier: id.to_string(),
            status,
            message: message.into(),
        }
    }
}
