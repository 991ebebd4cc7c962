use std::path::{Path, PathBuf};
use std::time::Duration;
use fm_core::{Error, Result};

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_UPLOAD_DIR: &str = "../storage/app/public/uploads";
const DEFAULT_OUTPUT_DIR: &str = "./outputs";
const DEFAULT_CALLBACK_PORT: u16 = 8000;
const CALLBACK_PATH: &str = "/api/photogrammetry/callback";
const DEFAULT_RECONSTRUCT_TIMEOUT_SECS: u64 = 6 * 60 * 60;
const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 10;

/// Service settings, read once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub upload_root: PathBuf,
    pub output_root: PathBuf,
    pub reconstruct_program: PathBuf,
    /// Inserted before `--input/--output`.
    pub reconstruct_args: Vec<String>,
    pub callback_url: String,
    pub reconstruct_timeout: Duration,
    pub callback_timeout: Duration,
}

impl ServiceConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(Error::parse(format!("invalid .env file: {e}"))),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(var("MESH_PORT"), "MESH_PORT", DEFAULT_PORT)?;
        let reconstruct_program = var("MESHROOM_PATH")
            .map(PathBuf::from)
            .ok_or_else(|| Error::validation("MESHROOM_PATH must point to the reconstruction engine"))?;
        let reconstruct_args = var("MESHROOM_ARGS")
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let callback_url = match var("CALLBACK_URL") {
            Some(url) => url,
            None => {
                let port = parse_or(var("CALLBACK_PORT"), "CALLBACK_PORT", DEFAULT_CALLBACK_PORT)?;
                format!("http://localhost:{port}{CALLBACK_PATH}")
            }
        };

        Ok(Self {
            port,
            upload_root: absolute(var("UPLOAD_DIR").as_deref().unwrap_or(DEFAULT_UPLOAD_DIR))?,
            output_root: absolute(var("OUTPUT_DIR").as_deref().unwrap_or(DEFAULT_OUTPUT_DIR))?,
            reconstruct_program,
            reconstruct_args,
            callback_url,
            reconstruct_timeout: Duration::from_secs(parse_or(
                var("RECONSTRUCT_TIMEOUT_SECS"),
                "RECONSTRUCT_TIMEOUT_SECS",
                DEFAULT_RECONSTRUCT_TIMEOUT_SECS,
            )?),
            callback_timeout: Duration::from_secs(parse_or(
                var("CALLBACK_TIMEOUT_SECS"),
                "CALLBACK_TIMEOUT_SECS",
                DEFAULT_CALLBACK_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| Error::validation(format!("{key} must be a number, got '{v}'"))),
    }
}

fn absolute(path: &str) -> Result<PathBuf> {
    Ok(std::path::absolute(Path::new(path))?)
}
