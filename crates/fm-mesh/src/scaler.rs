use fm_core::{Measurement, Result, ScaleFactor};
use crate::scene::Scene;

/// Fit the scene to `target` with a single uniform factor.
///
/// Pending transforms are baked before measuring, and the chosen factor is
/// baked into the vertices afterwards, so the scene leaves with identity
/// transforms and a bounding box that reflects the scaled size.
pub fn scale_to_measurement(scene: &mut Scene, target: &Measurement) -> Result<ScaleFactor> {
    scene.bake_transforms();
    let before = scene.geometry();
    let factor = ScaleFactor::compute(target, &before)?;

    log::info!(
        "Model {:.2} x {:.2} cm, target {:.2} x {:.2} cm: sf_height={:.4} sf_shoulder={:.4} uniform={:.4}",
        before.height_cm(),
        before.shoulder_cm(),
        target.height_cm,
        target.shoulder_cm,
        factor.by_height,
        factor.by_shoulder,
        factor.uniform
    );

    scene.scale_uniform(factor.uniform);
    scene.bake_transforms();
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::{DMat4, DVec3};
    use crate::scene::tests::box_part;

    fn body(height: f64, shoulder: f64) -> Scene {
        let mut scene = Scene::new();
        scene.add_part(box_part(DVec3::new(-shoulder / 2.0, 0.0, -0.1), DVec3::new(shoulder, height, 0.2)));
        scene
    }

    #[test]
    fn test_height_bound_fit() {
        let mut scene = body(1.6, 0.35);
        let target = Measurement::new(170.0, 40.0).unwrap();
        let sf = scale_to_measurement(&mut scene, &target).unwrap();
        assert_relative_eq!(sf.uniform, 1.0625, epsilon = 1e-12);

        let after = scene.geometry();
        assert_relative_eq!(after.height_cm(), 170.0, epsilon = 1e-9);
        assert_relative_eq!(after.shoulder_cm(), 37.1875, epsilon = 1e-9);
        assert!(after.shoulder_cm() < target.shoulder_cm);
        assert!(scene.parts.iter().all(|p| p.transform == DMat4::IDENTITY));
    }

    #[test]
    fn test_existing_transform_is_baked_first() {
        let mut scene = body(0.8, 0.175);
        scene.parts[0].transform = DMat4::from_scale(DVec3::splat(2.0));
        let target = Measurement::new(170.0, 40.0).unwrap();
        let sf = scale_to_measurement(&mut scene, &target).unwrap();
        assert_relative_eq!(sf.uniform, 1.0625, epsilon = 1e-12);
        assert_relative_eq!(scene.geometry().height_cm(), 170.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_mesh_fails_cleanly() {
        let mut scene = body(0.0, 0.35);
        let before = scene.parts[0].positions.clone();
        let err = scale_to_measurement(&mut scene, &Measurement::new(170.0, 40.0).unwrap()).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(scene.parts[0].positions, before);
    }

    #[test]
    fn test_empty_scene_fails() {
        let mut scene = Scene::new();
        assert!(scale_to_measurement(&mut scene, &Measurement::new(170.0, 40.0).unwrap()).is_err());
    }

    #[test]
    fn test_same_input_same_factor() {
        let target = Measurement::new(181.0, 44.0).unwrap();
        let a = scale_to_measurement(&mut body(1.71, 0.41), &target).unwrap();
        let b = scale_to_measurement(&mut body(1.71, 0.41), &target).unwrap();
        assert_eq!(a, b);
    }
}
