use std::path::Path;
use image::DynamicImage;
use fm_core::{Error, Measurement, Result};
use crate::detector::PoseDetector;
use crate::landmark::{Landmark, PoseLandmark};

/// Fewest keypoints a detection must carry to contain both hips.
const MIN_LANDMARKS: usize = PoseLandmark::RightHip as usize + 1;

/// Turns a front and a side photograph into body distances.
///
/// Distances are measured in the detector's normalised coordinate space and
/// are not converted to centimetres; `height_cm` is carried through from the
/// reference height given at construction.
pub struct MeasurementExtractor<D> {
    detector: D,
    reference_height_cm: f64,
}

impl<D: PoseDetector> MeasurementExtractor<D> {
    pub fn new(detector: D, reference_height_cm: f64) -> Self {
        Self {
            detector,
            reference_height_cm,
        }
    }

    pub fn extract(&self, front_image: &Path, side_image: &Path) -> Result<Measurement> {
        let front = self.landmarks(front_image)?;
        let side = self.landmarks(side_image)?;

        let shoulder = distance(&front, PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder)?;
        let torso = distance(&front, PoseLandmark::LeftShoulder, PoseLandmark::LeftHip)?;
        let depth = distance(&side, PoseLandmark::LeftShoulder, PoseLandmark::LeftHip)?;

        let mut measurement = Measurement::new(self.reference_height_cm, shoulder)?;
        measurement.torso_height = Some(torso);
        measurement.side_depth = Some(depth);
        log::info!(
            "Extracted shoulder={shoulder:.4} torso={torso:.4} side_depth={depth:.4} (normalised units)"
        );
        Ok(measurement)
    }

    fn landmarks(&self, path: &Path) -> Result<Vec<Landmark>> {
        let image = read_image(path)?;
        let landmarks = self
            .detector
            .detect(&image)?
            .ok_or_else(|| Error::validation(format!("No landmarks detected in {}", path.display())))?;
        if landmarks.len() < MIN_LANDMARKS {
            return Err(Error::validation(format!(
                "Detector returned {} landmarks for {}, expected at least {MIN_LANDMARKS}",
                landmarks.len(),
                path.display(),
            )));
        }
        Ok(landmarks)
    }
}

fn read_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| {
        log::warn!("Cannot read image {}: {e}", path.display());
        Error::NotFound(path.to_path_buf())
    })
}

fn distance(landmarks: &[Landmark], a: PoseLandmark, b: PoseLandmark) -> Result<f64> {
    match (a.pick(landmarks), b.pick(landmarks)) {
        (Some(a), Some(b)) => Ok(a.distance(b)),
        _ => Err(Error::validation(format!("landmarks {a:?}/{b:?} missing"))),
    }
}
