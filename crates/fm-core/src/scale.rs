use serde::Serialize;
use crate::error::{Error, Result};
use crate::measurement::Measurement;

/// Model dimensions read from a mesh's axis-aligned bounding box, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeshGeometry {
    pub height_m: f64,
    pub shoulder_width_m: f64,
}

impl MeshGeometry {
    pub fn new(height_m: f64, shoulder_width_m: f64) -> Self {
        Self { height_m, shoulder_width_m }
    }

    pub fn height_cm(&self) -> f64 {
        self.height_m * 100.0
    }

    pub fn shoulder_cm(&self) -> f64 {
        self.shoulder_width_m * 100.0
    }
}

/// Uniform scale chosen so that neither target measurement is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleFactor {
    pub by_height: f64,
    pub by_shoulder: f64,
    pub uniform: f64,
}

impl ScaleFactor {
    pub fn compute(target: &Measurement, model: &MeshGeometry) -> Result<Self> {
        for (name, v) in [("height", model.height_m), ("shoulder width", model.shoulder_width_m)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(Error::validation(format!(
                    "degenerate mesh: model {name} is {v} m"
                )));
            }
        }

        let by_height = target.height_cm / model.height_cm();
        let by_shoulder = target.shoulder_cm / model.shoulder_cm();
        let uniform = by_height.min(by_shoulder);
        if !uniform.is_finite() || uniform <= 0.0 {
            return Err(Error::validation(format!("scale factor {uniform} is not usable")));
        }

        Ok(Self { by_height, by_shoulder, uniform })
    }

    /// Which measurement bounds the fit.
    pub fn is_height_bound(&self) -> bool {
        self.by_height <= self.by_shoulder
    }
}
