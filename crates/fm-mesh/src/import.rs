use std::path::Path;
use glam::DVec3;
use fm_core::artifact::RAW_MESH_EXTENSION;
use fm_core::{Error, Result};
use crate::material::{Material, MaterialId};
use crate::scene::{MeshPart, Scene};

impl Scene {
    /// Load a Wavefront OBJ (and its MTL, when present) into a fresh scene.
    pub fn import_obj(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_obj = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(RAW_MESH_EXTENSION));
        if !is_obj {
            return Err(Error::validation(format!(
                "only .{RAW_MESH_EXTENSION} files are supported, got {}",
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, materials) = tobj::load_obj(path, &options)
            .map_err(|e| Error::parse(format!("cannot read {}: {e}", path.display())))?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut scene = Scene::new();

        let obj_materials = match materials {
            Ok(materials) => materials,
            Err(e) => {
                log::warn!("Ignoring materials of {}: {e}", path.display());
                Vec::new()
            }
        };
        let material_ids: Vec<MaterialId> = obj_materials
            .iter()
            .map(|m| scene.materials.insert(convert_material(m, base_dir)))
            .collect();

        for model in models {
            let mesh = model.mesh;
            let positions = mesh
                .positions
                .chunks_exact(3)
                .map(|p| DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64))
                .collect();
            let mut part = MeshPart::new(model.name, positions, mesh.indices);
            part.normals = mesh
                .normals
                .chunks_exact(3)
                .map(|n| DVec3::new(n[0] as f64, n[1] as f64, n[2] as f64))
                .collect();
            part.uvs = mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect();
            if part.normals.len() != part.positions.len() {
                part.normals.clear();
            }
            if part.uvs.len() != part.positions.len() {
                part.uvs.clear();
            }
            part.material = mesh.material_id.and_then(|i| material_ids.get(i).copied());
            scene.add_part(part);
        }

        if scene.parts.is_empty() {
            return Err(Error::validation(format!("{} contains no mesh", path.display())));
        }
        log::info!(
            "Imported {} parts ({} vertices, {} materials) from {}",
            scene.parts.len(),
            scene.vertex_count(),
            scene.materials.len(),
            path.display()
        );
        Ok(scene)
    }
}

fn convert_material(m: &tobj::Material, base_dir: &Path) -> Material {
    let [r, g, b] = m.diffuse.unwrap_or([1.0, 1.0, 1.0]);
    let alpha = m.dissolve.unwrap_or(1.0);
    Material {
        name: m.name.clone(),
        base_color: [r, g, b, alpha],
        roughness: 1.0,
        metallic: 0.0,
        base_color_texture: m
            .diffuse_texture
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|t| base_dir.join(t)),
    }
}
