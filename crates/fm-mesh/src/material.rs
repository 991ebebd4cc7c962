use std::collections::HashMap;
use std::path::PathBuf;
use crate::scene::Scene;

const MONOCHROME_ROUGHNESS: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

impl MaterialId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Linear RGBA.
    pub base_color: [f32; 4],
    pub roughness: f32,
    pub metallic: f32,
    pub base_color_texture: Option<PathBuf>,
}

impl Material {
    pub fn flat(name: impl Into<String>, rgb: [f64; 3]) -> Self {
        Self {
            name: name.into(),
            base_color: [rgb[0] as f32, rgb[1] as f32, rgb[2] as f32, 1.0],
            roughness: MONOCHROME_ROUGHNESS,
            metallic: 0.0,
            base_color_texture: None,
        }
    }
}

/// Materials of one scene, unique by name.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    by_name: HashMap<String, MaterialId>,
}

impl MaterialLibrary {
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<MaterialId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials.iter().enumerate().map(|(i, m)| (MaterialId(i), m))
    }

    /// Returns the existing id when a material with the same name is present.
    pub fn insert(&mut self, material: Material) -> MaterialId {
        if let Some(id) = self.find(&material.name) {
            return id;
        }
        let id = MaterialId(self.materials.len());
        self.by_name.insert(material.name.clone(), id);
        self.materials.push(material);
        id
    }

    /// Flat-colour material for `rgb`, created on first use.
    pub fn monochrome(&mut self, rgb: [f64; 3]) -> MaterialId {
        let key = monochrome_key(rgb);
        match self.find(&key) {
            Some(id) => id,
            None => self.insert(Material::flat(key, rgb)),
        }
    }
}

/// `Monochrome_R_G_B` with each component rounded to two decimals.
pub fn monochrome_key(rgb: [f64; 3]) -> String {
    format!("Monochrome_{:.2}_{:.2}_{:.2}", rgb[0], rgb[1], rgb[2])
}

/// Assign one flat-colour material to every part, replacing prior assignments.
pub fn apply_monochrome(scene: &mut Scene, rgb: [f64; 3]) -> MaterialId {
    if rgb.iter().any(|c| !(0.0..=1.0).contains(c)) {
        log::warn!("Colour components {rgb:?} fall outside [0, 1]");
    }
    let id = scene.materials.monochrome(rgb);
    for part in &mut scene.parts {
        part.material = Some(id);
    }
    log::info!("Applied monochrome RGB={rgb:?} to {} parts", scene.parts.len());
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use crate::scene::tests::box_part;

    #[test]
    fn test_key_rounds_to_two_decimals() {
        assert_eq!(monochrome_key([0.8, 0.2, 0.123]), "Monochrome_0.80_0.20_0.12");
        assert_eq!(monochrome_key([0.801, 0.2, 0.12]), monochrome_key([0.8, 0.2, 0.12]));
    }

    #[test]
    fn test_same_colour_reuses_material() {
        let mut scene = Scene::new();
        scene.add_part(box_part(DVec3::ZERO, DVec3::ONE));

        let first = apply_monochrome(&mut scene, [0.8, 0.2, 0.2]);
        let second = apply_monochrome(&mut scene, [0.8, 0.2, 0.2]);
        assert_eq!(first, second);
        assert_eq!(scene.materials.len(), 1);
        assert_eq!(scene.parts[0].material, Some(first));
    }

    #[test]
    fn test_replaces_existing_assignment() {
        let mut scene = Scene::new();
        let textured = scene.materials.insert(Material {
            name: "skin".into(),
            base_color: [1.0; 4],
            roughness: 1.0,
            metallic: 0.0,
            base_color_texture: Some("texture_1001.png".into()),
        });
        for i in 0..3 {
            let mut part = box_part(DVec3::splat(i as f64), DVec3::ONE);
            part.material = Some(textured);
            scene.add_part(part);
        }

        let mono = apply_monochrome(&mut scene, [0.5, 0.5, 0.5]);
        assert_ne!(mono, textured);
        assert!(scene.parts.iter().all(|p| p.material == Some(mono)));
        let m = scene.materials.get(mono).unwrap();
        assert_eq!(m.base_color, [0.5, 0.5, 0.5, 1.0]);
        assert!(m.base_color_texture.is_none());
    }

    #[test]
    fn test_out_of_range_is_accepted() {
        let mut scene = Scene::new();
        scene.add_part(box_part(DVec3::ZERO, DVec3::ONE));
        let id = apply_monochrome(&mut scene, [1.5, -0.1, 0.0]);
        assert_eq!(scene.materials.get(id).unwrap().name, "Monochrome_1.50_-0.10_0.00");
    }
}
