use serde::{Deserialize, Serialize};

/// Body keypoint in the detector's normalised image space.
///
/// `x`/`y` are fractions of the image width/height; `z` is depth on roughly
/// the same scale as `x`, with the hips' midpoint as origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default = "full_visibility")]
    pub visibility: f64,
}

fn full_visibility() -> f64 {
    1.0
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, visibility: 1.0 }
    }

    pub fn distance(&self, other: &Landmark) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Indices into the 33-point BlazePose landmark list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseLandmark {
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftHip = 23,
    RightHip = 24,
}

impl PoseLandmark {
    /// Number of keypoints in a full detection.
    pub const COUNT: usize = 33;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn pick(self, landmarks: &[Landmark]) -> Option<&Landmark> {
        landmarks.get(self.index())
    }
}
