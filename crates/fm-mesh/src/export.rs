use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::Path;
use gltf::json;
use json::validation::{Checked::Valid, USize64};
use fm_core::artifact::require_file;
use fm_core::{Error, Result};
use crate::material::{Material, MaterialId};
use crate::scene::{MeshPart, Scene};

const GLB_HEADER_LEN: usize = 12;
const GLB_CHUNK_HEADER_LEN: usize = 8;

/// Write the scene as binary glTF and confirm the file landed on disk.
pub fn export_glb(scene: &Scene, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if scene.parts.is_empty() {
        return Err(Error::validation("nothing to export: scene has no parts"));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let (root, bin) = build_document(scene)?;
    let json_bytes = serde_json::to_vec(&root)
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
    let length = GLB_HEADER_LEN
        + GLB_CHUNK_HEADER_LEN
        + padded_len(json_bytes.len())
        + GLB_CHUNK_HEADER_LEN
        + bin.len();
    let length = u32::try_from(length)
        .map_err(|_| Error::validation("model exceeds the 4 GiB binary glTF limit"))?;

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header { magic: *b"glTF", version: 2, length },
        json: Cow::Owned(json_bytes),
        bin: Some(Cow::Owned(bin)),
    };
    let file = std::fs::File::create(path).map_err(|e| Error::io_at(path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    glb.to_writer(&mut writer)
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
    writer.flush()?;

    require_file(path)?;
    log::info!("Verified GLB exists: {}", path.display());
    Ok(())
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// Accumulates the single binary buffer and the views into it.
struct BinaryBuffer {
    data: Vec<u8>,
}

impl BinaryBuffer {
    const INDEX: u32 = 0;

    fn push_view(
        &mut self,
        root: &mut json::Root,
        bytes: &[u8],
        target: Option<json::buffer::Target>,
    ) -> json::Index<json::buffer::View> {
        self.data.resize(padded_len(self.data.len()), 0);
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        root.push(json::buffer::View {
            buffer: json::Index::new(Self::INDEX),
            byte_length: USize64::from(bytes.len()),
            byte_offset: Some(USize64::from(offset)),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: target.map(Valid),
        })
    }

    fn finish(mut self, root: &mut json::Root) -> Vec<u8> {
        self.data.resize(padded_len(self.data.len()), 0);
        root.push(json::Buffer {
            byte_length: USize64::from(self.data.len()),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            uri: None,
        });
        self.data
    }
}

fn build_document(scene: &Scene) -> Result<(json::Root, Vec<u8>)> {
    let mut root = json::Root::default();
    root.asset.generator = Some(format!("fitmesh {}", env!("CARGO_PKG_VERSION")));
    let mut buffer = BinaryBuffer { data: Vec::new() };

    // Materials no part refers to any more (e.g. replaced by a monochrome) are left out.
    let used: HashSet<MaterialId> = scene.parts.iter().filter_map(|p| p.material).collect();
    let mut material_indices = HashMap::new();
    for (id, material) in scene.materials.iter().filter(|(id, _)| used.contains(id)) {
        let index = push_material(&mut root, &mut buffer, material)?;
        material_indices.insert(id, index);
    }

    let mut nodes = Vec::with_capacity(scene.parts.len());
    for part in &scene.parts {
        let material = part.material.and_then(|id| material_indices.get(&id).copied());
        let primitive = push_primitive(&mut root, &mut buffer, part, material);
        let mesh = root.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(part.name.clone()),
            primitives: vec![primitive],
            weights: None,
        });
        nodes.push(root.push(json::Node {
            mesh: Some(mesh),
            name: Some(part.name.clone()),
            ..Default::default()
        }));
    }

    let scene_index = root.push(json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        nodes,
    });
    root.scene = Some(scene_index);

    let bin = buffer.finish(&mut root);
    Ok((root, bin))
}

fn push_primitive(
    root: &mut json::Root,
    buffer: &mut BinaryBuffer,
    part: &MeshPart,
    material: Option<json::Index<json::Material>>,
) -> json::mesh::Primitive {
    // Transforms are expected to be baked; apply them here anyway so the
    // exported vertices always match what `Scene::bounds` reports.
    let mut baked = part.clone();
    baked.bake();

    let positions: Vec<[f32; 3]> = baked
        .positions
        .iter()
        .map(|p| [p.x as f32, p.y as f32, p.z as f32])
        .collect();
    let (min, max) = positions.iter().fold(
        ([f32::INFINITY; 3], [f32::NEG_INFINITY; 3]),
        |(mut lo, mut hi), p| {
            for k in 0..3 {
                lo[k] = lo[k].min(p[k]);
                hi[k] = hi[k].max(p[k]);
            }
            (lo, hi)
        },
    );

    let mut attributes = BTreeMap::new();
    let view = buffer.push_view(root, bytemuck::cast_slice(&positions), Some(json::buffer::Target::ArrayBuffer));
    let accessor = push_accessor(
        root,
        view,
        positions.len(),
        json::accessor::ComponentType::F32,
        json::accessor::Type::Vec3,
        Some((min.to_vec(), max.to_vec())),
    );
    attributes.insert(Valid(json::mesh::Semantic::Positions), accessor);

    if !baked.normals.is_empty() {
        let normals: Vec<[f32; 3]> = baked
            .normals
            .iter()
            .map(|n| [n.x as f32, n.y as f32, n.z as f32])
            .collect();
        let view = buffer.push_view(root, bytemuck::cast_slice(&normals), Some(json::buffer::Target::ArrayBuffer));
        let accessor = push_accessor(
            root,
            view,
            normals.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Vec3,
            None,
        );
        attributes.insert(Valid(json::mesh::Semantic::Normals), accessor);
    }

    if !baked.uvs.is_empty() {
        // glTF puts the texture origin at the top-left corner.
        let uvs: Vec<[f32; 2]> = baked.uvs.iter().map(|[u, v]| [*u, 1.0 - *v]).collect();
        let view = buffer.push_view(root, bytemuck::cast_slice(&uvs), Some(json::buffer::Target::ArrayBuffer));
        let accessor = push_accessor(
            root,
            view,
            uvs.len(),
            json::accessor::ComponentType::F32,
            json::accessor::Type::Vec2,
            None,
        );
        attributes.insert(Valid(json::mesh::Semantic::TexCoords(0)), accessor);
    }

    let view = buffer.push_view(
        root,
        bytemuck::cast_slice(&baked.indices),
        Some(json::buffer::Target::ElementArrayBuffer),
    );
    let indices = push_accessor(
        root,
        view,
        baked.indices.len(),
        json::accessor::ComponentType::U32,
        json::accessor::Type::Scalar,
        None,
    );

    json::mesh::Primitive {
        attributes,
        extensions: Default::default(),
        extras: Default::default(),
        indices: Some(indices),
        material,
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    }
}

fn push_accessor(
    root: &mut json::Root,
    view: json::Index<json::buffer::View>,
    count: usize,
    component: json::accessor::ComponentType,
    type_: json::accessor::Type,
    bounds: Option<(Vec<f32>, Vec<f32>)>,
) -> json::Index<json::Accessor> {
    let (min, max) = match bounds {
        Some((lo, hi)) => (Some(json::Value::from(lo)), Some(json::Value::from(hi))),
        None => (None, None),
    };
    root.push(json::Accessor {
        buffer_view: Some(view),
        byte_offset: None,
        count: USize64::from(count),
        component_type: Valid(json::accessor::GenericComponentType(component)),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(type_),
        min,
        max,
        name: None,
        normalized: false,
        sparse: None,
    })
}

fn push_material(
    root: &mut json::Root,
    buffer: &mut BinaryBuffer,
    material: &Material,
) -> Result<json::Index<json::Material>> {
    let texture = match &material.base_color_texture {
        Some(path) => embed_texture(root, buffer, path)?,
        None => None,
    };

    Ok(root.push(json::Material {
        name: Some(material.name.clone()),
        pbr_metallic_roughness: json::material::PbrMetallicRoughness {
            base_color_factor: json::material::PbrBaseColorFactor(material.base_color),
            base_color_texture: texture.map(|index| json::texture::Info {
                index,
                tex_coord: 0,
                extensions: Default::default(),
                extras: Default::default(),
            }),
            metallic_factor: json::material::StrengthFactor(material.metallic),
            roughness_factor: json::material::StrengthFactor(material.roughness),
            ..Default::default()
        },
        ..Default::default()
    }))
}

/// Missing or unsupported textures are skipped; the colour factor still applies.
fn embed_texture(
    root: &mut json::Root,
    buffer: &mut BinaryBuffer,
    path: &Path,
) -> Result<Option<json::Index<json::Texture>>> {
    let mime = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => {
            log::warn!("Skipping texture with unsupported format: {}", path.display());
            return Ok(None);
        }
    };
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Texture not found, exporting without it: {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(Error::io_at(path, e)),
    };

    let view = buffer.push_view(root, &bytes, None);
    let image = root.push(json::Image {
        buffer_view: Some(view),
        mime_type: Some(json::image::MimeType(mime.to_string())),
        name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        uri: None,
        extensions: Default::default(),
        extras: Default::default(),
    });
    Ok(Some(root.push(json::Texture {
        name: None,
        sampler: None,
        source: image,
        extensions: Default::default(),
        extras: Default::default(),
    })))
}
