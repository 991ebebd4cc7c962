use std::path::PathBuf;
use serde::Serialize;
use fm_core::{Measurement, MeshGeometry, Result, ScaleFactor};
use crate::export::export_glb;
use crate::material::apply_monochrome;
use crate::scaler::scale_to_measurement;
use crate::scene::Scene;

/// Inputs of the scaling stage: raw mesh in, scaled GLB out.
#[derive(Debug, Clone)]
pub struct ScalingJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub measurements: PathBuf,
    /// Replaces `height_cm` from the measurement file, in centimetres.
    pub height_override: Option<f64>,
    pub monochrome: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScaleReport {
    pub factor: ScaleFactor,
    pub before: MeshGeometry,
    pub after: MeshGeometry,
    pub material: Option<String>,
    pub output: PathBuf,
}

impl ScalingJob {
    /// Import, scale, optionally recolour, export, verify. Stops at the first failure.
    pub fn run(&self) -> Result<ScaleReport> {
        let measurement = Measurement::load(&self.measurements, self.height_override)?;

        let mut scene = Scene::import_obj(&self.input)?;
        scene.bake_transforms();
        let before = scene.geometry();

        let factor = scale_to_measurement(&mut scene, &measurement)?;

        let material = self.monochrome.map(|rgb| {
            let id = apply_monochrome(&mut scene, rgb);
            scene
                .materials
                .get(id)
                .map(|m| m.name.clone())
                .unwrap_or_default()
        });

        export_glb(&scene, &self.output)?;

        Ok(ScaleReport {
            factor,
            before,
            after: scene.geometry(),
            material,
            output: self.output.clone(),
        })
    }
}
