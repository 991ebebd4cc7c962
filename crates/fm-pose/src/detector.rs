// crates/fm-pose/src/detector.rs

use std::io::Cursor;
use std::time::Duration;
use image::{DynamicImage, ImageFormat};
use serde::Deserialize;
use fm_core::{Error, Result};
use crate::landmark::Landmark;

/// Pose-landmark detection for a single still image.
///
/// `Ok(None)` means the image was processed but no person was found.
pub trait PoseDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Option<Vec<Landmark>>>;
}

/// Detector backed by a pose-estimation HTTP service.
///
/// The image is posted as PNG; the service answers with
/// `{"landmarks": [{"x":..,"y":..,"z":..,"visibility":..}, ...]}`,
/// an empty or absent list meaning no pose.
pub struct HttpPoseDetector {
    client: reqwest::blocking::Client,
    url: String,
}

#[derive(Deserialize)]
struct DetectResponse {
    #[serde(default)]
    landmarks: Option<Vec<Landmark>>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpPoseDetector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl PoseDetector for HttpPoseDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Option<Vec<Landmark>>> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::parse(format!("Failed to encode image: {e}")))?;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .body(png)
            .send()
            .map_err(|e| Error::Network(format!("Failed to reach pose service at {}: {e}", self.url)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::Network(format!("Pose service returned HTTP {status}: {body}")));
        }

        let result: DetectResponse = response
            .json()
            .map_err(|e| Error::parse(format!("Failed to parse pose service response: {e}")))?;

        if let Some(err) = result.error {
            return Err(Error::Process(format!("Pose service error: {err}")));
        }
        Ok(result.landmarks.filter(|l| !l.is_empty()))
    }
}
