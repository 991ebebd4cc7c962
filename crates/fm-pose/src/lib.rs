mod detector;
mod extractor;
mod landmark;

pub use detector::{HttpPoseDetector, PoseDetector};
pub use extractor::MeasurementExtractor;
pub use landmark::{Landmark, PoseLandmark};
