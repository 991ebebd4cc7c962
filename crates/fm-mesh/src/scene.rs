use glam::{DMat3, DMat4, DVec3};
use fm_core::MeshGeometry;
use crate::material::{MaterialId, MaterialLibrary};

/// One drawable part of an imported model.
#[derive(Debug, Clone)]
pub struct MeshPart {
    pub name: String,
    pub positions: Vec<DVec3>,
    /// Empty, or one per position.
    pub normals: Vec<DVec3>,
    /// Empty, or one per position. OBJ convention (origin bottom-left).
    pub uvs: Vec<[f32; 2]>,
    /// Triangle list into `positions`.
    pub indices: Vec<u32>,
    /// Object transform not yet applied to the vertices.
    pub transform: DMat4,
    pub material: Option<MaterialId>,
}

impl MeshPart {
    pub fn new(name: impl Into<String>, positions: Vec<DVec3>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            positions,
            normals: Vec::new(),
            uvs: Vec::new(),
            indices,
            transform: DMat4::IDENTITY,
            material: None,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Apply `transform` to the vertex data and reset it to identity.
    pub fn bake(&mut self) {
        if self.transform == DMat4::IDENTITY {
            return;
        }
        let t = self.transform;
        for p in &mut self.positions {
            *p = t.transform_point3(*p);
        }

        let linear = DMat3::from_mat4(t);
        let det = linear.determinant();
        if det.abs() > f64::EPSILON {
            let normal_matrix = linear.inverse().transpose();
            for n in &mut self.normals {
                *n = (normal_matrix * *n).normalize_or_zero();
            }
        }
        // Mirroring transforms flip winding.
        if det < 0.0 {
            for tri in self.indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }
        self.transform = DMat4::IDENTITY;
    }

    fn world_points(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.positions.iter().map(|p| self.transform.transform_point3(*p))
    }
}

/// World-space axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }

    fn grow(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }
}

/// Explicit session for one import-scale-recolor-export run.
///
/// Every operation takes the scene it works on; nothing is shared between
/// scenes, so independent runs never observe each other's parts or materials.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub parts: Vec<MeshPart>,
    pub materials: MaterialLibrary,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_part(&mut self, part: MeshPart) {
        self.parts.push(part);
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.positions.len()).sum()
    }

    /// Bounding box over every part, with pending transforms taken into account.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut points = self.parts.iter().flat_map(MeshPart::world_points);
        let first = points.next()?;
        let mut bounds = Aabb { min: first, max: first };
        for p in points {
            bounds.grow(p);
        }
        Some(bounds)
    }

    /// Height is the Y extent, shoulder width the X extent (Y-up models).
    pub fn geometry(&self) -> MeshGeometry {
        match self.bounds() {
            Some(b) => {
                let e = b.extent();
                MeshGeometry::new(e.y, e.x)
            }
            None => MeshGeometry::new(0.0, 0.0),
        }
    }

    pub fn bake_transforms(&mut self) {
        for part in &mut self.parts {
            part.bake();
        }
    }

    /// Multiply every part's transform by a uniform scale about the origin.
    pub fn scale_uniform(&mut self, factor: f64) {
        let s = DMat4::from_scale(DVec3::splat(factor));
        for part in &mut self.parts {
            part.transform = s * part.transform;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Axis-aligned box of the given size with its lowest corner at `origin`.
    pub(crate) fn box_part(origin: DVec3, size: DVec3) -> MeshPart {
        let corners: Vec<DVec3> = (0..8)
            .map(|i| {
                origin
                    + DVec3::new(
                        if i & 1 != 0 { size.x } else { 0.0 },
                        if i & 2 != 0 { size.y } else { 0.0 },
                        if i & 4 != 0 { size.z } else { 0.0 },
                    )
            })
            .collect();
        let indices = vec![
            0, 2, 1, 1, 2, 3, 4, 5, 6, 5, 7, 6, 0, 1, 4, 1, 5, 4, 2, 6, 3, 3, 6, 7, 0, 4, 2, 2, 4, 6, 1, 3,
            5, 3, 7, 5,
        ];
        MeshPart::new("box", corners, indices)
    }

    #[test]
    fn test_geometry_uses_y_for_height() {
        let mut scene = Scene::new();
        scene.add_part(box_part(DVec3::new(-0.2, 0.0, -0.1), DVec3::new(0.4, 1.7, 0.25)));
        let geo = scene.geometry();
        assert_relative_eq!(geo.height_m, 1.7);
        assert_relative_eq!(geo.shoulder_width_m, 0.4);
    }

    #[test]
    fn test_bounds_span_all_parts() {
        let mut scene = Scene::new();
        scene.add_part(box_part(DVec3::ZERO, DVec3::ONE));
        scene.add_part(box_part(DVec3::new(2.0, -1.0, 0.0), DVec3::ONE));
        let b = scene.bounds().unwrap();
        assert_relative_eq!(b.min.y, -1.0);
        assert_relative_eq!(b.max.x, 3.0);
    }

    #[test]
    fn test_empty_scene_has_zero_geometry() {
        let scene = Scene::new();
        assert!(scene.bounds().is_none());
        assert_eq!(scene.geometry(), MeshGeometry::new(0.0, 0.0));
    }

    #[test]
    fn test_bounds_see_pending_transform() {
        let mut scene = Scene::new();
        let mut part = box_part(DVec3::ZERO, DVec3::ONE);
        part.transform = DMat4::from_translation(DVec3::new(0.0, 5.0, 0.0));
        scene.add_part(part);
        assert_relative_eq!(scene.bounds().unwrap().min.y, 5.0);
    }

    #[test]
    fn test_bake_moves_vertices_and_resets_transform() {
        let mut part = box_part(DVec3::ZERO, DVec3::ONE);
        part.normals = vec![DVec3::Y; part.positions.len()];
        part.transform = DMat4::from_scale(DVec3::new(2.0, 2.0, 2.0));
        part.bake();
        assert_eq!(part.transform, DMat4::IDENTITY);
        assert_relative_eq!(part.positions[7].x, 2.0);
        assert_relative_eq!(part.normals[0].length(), 1.0);
    }

    #[test]
    fn test_mirror_flips_winding() {
        let mut part = box_part(DVec3::ZERO, DVec3::ONE);
        let before = part.indices[..3].to_vec();
        part.transform = DMat4::from_scale(DVec3::new(-1.0, 1.0, 1.0));
        part.bake();
        assert_eq!(part.indices[..3], [before[0], before[2], before[1]]);
    }
}
