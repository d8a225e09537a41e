//! Decoding of uploaded model bytes into renderable mesh instances.

use super::fit::{FitGuard, FitTransform};
use super::{Blob, ModelFormat};
use crate::geometry::{Aabb, MeshData};
use crate::materials::MaterialOverride;
use glam::Mat4;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, Cursor};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("glTF decode failed: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("OBJ decode failed: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("model contains no triangle geometry")]
    Empty,
    #[error("object handle {0} has been revoked")]
    Revoked(String),
    #[error("loader thread exited without a result")]
    WorkerLost,
}

/// A material as found in the file, before any scene override.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedMaterial {
    pub name: String,
    pub base: MaterialOverride,
}

/// One mesh placed in model space.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub mesh: Arc<MeshData>,
    pub transform: Mat4,
    /// Index into [`LoadedModel::materials`].
    pub material: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelStats {
    pub format: ModelFormat,
    pub mesh_count: usize,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub material_count: usize,
    /// Size after fit-to-view.
    pub dimensions: [f32; 3],
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub format: ModelFormat,
    pub instances: Vec<MeshInstance>,
    pub materials: Vec<NamedMaterial>,
    bounds: Option<Aabb>,
    fit: FitGuard,
}

impl LoadedModel {
    fn new(format: ModelFormat, instances: Vec<MeshInstance>, materials: Vec<NamedMaterial>) -> Self {
        let bounds = instances
            .iter()
            .filter_map(|instance| instance.mesh.transformed_bounds(&instance.transform))
            .reduce(|a, b| a.union(&b));
        Self {
            format,
            instances,
            materials,
            bounds,
            fit: FitGuard::new(),
        }
    }

    /// Bounds in model space, before fitting.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Center and scale the model once; repeated calls are no-ops.
    pub fn fit_to_view(&mut self, target_size: f32) -> FitTransform {
        self.fit.fit(self.bounds, target_size)
    }

    pub fn is_fitted(&self) -> bool {
        self.fit.applied().is_some()
    }

    pub fn root_transform(&self) -> Mat4 {
        self.fit.matrix()
    }

    pub fn material_map(&self) -> BTreeMap<String, MaterialOverride> {
        self.materials
            .iter()
            .map(|material| (material.name.clone(), material.base.clone()))
            .collect()
    }

    pub fn stats(&self) -> ModelStats {
        let dimensions = match (self.bounds, self.fit.applied()) {
            (Some(bounds), Some(fit)) => fit.apply_to_bounds(&bounds).size().to_array(),
            (Some(bounds), None) => bounds.size().to_array(),
            (None, _) => [0.0; 3],
        };
        ModelStats {
            format: self.format,
            mesh_count: self.instances.len(),
            vertex_count: self.instances.iter().map(|i| i.mesh.vertex_count()).sum(),
            triangle_count: self.instances.iter().map(|i| i.mesh.triangle_count()).sum(),
            material_count: self.materials.len(),
            dimensions,
        }
    }
}

pub fn decode(format: ModelFormat, blob: &Blob) -> Result<LoadedModel, LoadError> {
    let model = match format {
        ModelFormat::Glb | ModelFormat::Gltf => decode_gltf(&blob.bytes, blob.base_dir())?,
        ModelFormat::Obj => decode_obj(&blob.bytes, blob.base_dir())?,
    };
    if model.instances.iter().all(|instance| instance.mesh.is_empty()) {
        return Err(LoadError::Empty);
    }
    Ok(LoadedModel::new(format, model.instances, model.materials))
}

struct Decoded {
    instances: Vec<MeshInstance>,
    materials: Vec<NamedMaterial>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum MaterialKey {
    Index(usize),
    Default,
}

/// Deduplicates materials by source key and keeps names unique.
#[derive(Default)]
struct MaterialTable {
    slots: Vec<NamedMaterial>,
    by_key: HashMap<MaterialKey, usize>,
}

impl MaterialTable {
    fn slot<F>(&mut self, key: MaterialKey, name: Option<&str>, describe: F) -> usize
    where
        F: FnOnce() -> MaterialOverride,
    {
        if let Some(&slot) = self.by_key.get(&key) {
            return slot;
        }
        let name = self.unique_name(name);
        let slot = self.slots.len();
        self.slots.push(NamedMaterial {
            name,
            base: describe(),
        });
        self.by_key.insert(key, slot);
        slot
    }

    fn unique_name(&self, name: Option<&str>) -> String {
        let base = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("Material_{}", self.slots.len()),
        };
        let taken = |candidate: &str| self.slots.iter().any(|slot| slot.name == candidate);
        if !taken(&base) {
            return base;
        }
        (1..)
            .map(|k| format!("{}_{}", base, k))
            .find(|candidate| !taken(candidate))
            .unwrap_or(base)
    }
}

fn decode_gltf(bytes: &[u8], base_dir: Option<&Path>) -> Result<Decoded, LoadError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, base_dir, blob)?;

    let mut materials = MaterialTable::default();
    let mut meshes: HashMap<(usize, usize), Arc<MeshData>> = HashMap::new();
    let mut instances = Vec::new();

    let mut add_mesh = |mesh: gltf::Mesh<'_>, transform: Mat4| {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "Skipping {:?} primitive in mesh {}",
                    primitive.mode(),
                    mesh.index()
                );
                continue;
            }
            let key = (mesh.index(), primitive.index());
            let data = match meshes.get(&key).cloned() {
                Some(data) => data,
                None => {
                    let reader = primitive.reader(|buffer| {
                        buffers.get(buffer.index()).map(|data| data.0.as_slice())
                    });
                    let Some(positions) = reader.read_positions() else {
                        continue;
                    };
                    let positions: Vec<[f32; 3]> = positions.collect();
                    let normals: Vec<[f32; 3]> = reader
                        .read_normals()
                        .map(|normals| normals.collect())
                        .unwrap_or_default();
                    let indices: Vec<u32> = match reader.read_indices() {
                        Some(indices) => indices.into_u32().collect(),
                        None => (0..positions.len() as u32).collect(),
                    };
                    let data = Arc::new(MeshData::triangles(positions, normals, indices));
                    meshes.insert(key, data.clone());
                    data
                }
            };

            let material = primitive.material();
            let slot = match material.index() {
                Some(index) => materials.slot(MaterialKey::Index(index), material.name(), || {
                    let pbr = material.pbr_metallic_roughness();
                    let [r, g, b, _] = pbr.base_color_factor();
                    MaterialOverride::new(
                        [r, g, b].map(linear_to_srgb),
                        pbr.metallic_factor(),
                        pbr.roughness_factor(),
                    )
                }),
                None => materials.slot(MaterialKey::Default, None, MaterialOverride::default),
            };
            instances.push(MeshInstance {
                mesh: data,
                transform,
                material: slot,
            });
        }
    };

    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            let mut stack: Vec<(gltf::Node<'_>, Mat4)> =
                scene.nodes().map(|node| (node, Mat4::IDENTITY)).collect();
            while let Some((node, parent)) = stack.pop() {
                let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
                if let Some(mesh) = node.mesh() {
                    add_mesh(mesh, world);
                }
                stack.extend(node.children().map(|child| (child, world)));
            }
        }
        None => {
            log::warn!("glTF has no scenes; placing every mesh at the origin");
            for mesh in document.meshes() {
                add_mesh(mesh, Mat4::IDENTITY);
            }
        }
    }

    log::debug!(
        "glTF decoded: {} instance(s), {} material(s)",
        instances.len(),
        materials.slots.len()
    );
    Ok(Decoded {
        instances,
        materials: materials.slots,
    })
}

fn decode_obj(bytes: &[u8], base_dir: Option<&Path>) -> Result<Decoded, LoadError> {
    let mut reader = BufReader::new(Cursor::new(bytes));
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, mtl_result) = tobj::load_obj_buf(&mut reader, &options, |mtl_path| match base_dir {
        Some(dir) => tobj::load_mtl(dir.join(mtl_path)),
        None => Err(tobj::LoadError::OpenFileFailed),
    })?;
    let obj_materials = mtl_result.unwrap_or_else(|err| {
        log::warn!("OBJ material library unavailable ({}); using defaults", err);
        Vec::new()
    });

    let mut materials = MaterialTable::default();
    let mut instances = Vec::with_capacity(models.len());
    for model in models {
        let mesh = model.mesh;
        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let normals: Vec<[f32; 3]> = mesh
            .normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect();
        if positions.is_empty() || mesh.indices.is_empty() {
            log::debug!("Skipping empty OBJ object '{}'", model.name);
            continue;
        }
        let data = Arc::new(MeshData::triangles(positions, normals, mesh.indices));

        let slot = match mesh
            .material_id
            .and_then(|id| obj_materials.get(id).map(|material| (id, material)))
        {
            Some((id, material)) => materials.slot(MaterialKey::Index(id), Some(&material.name), || {
                match material.diffuse {
                    Some(rgb) => MaterialOverride::new(
                        rgb,
                        MaterialOverride::DEFAULT_METALNESS,
                        MaterialOverride::DEFAULT_ROUGHNESS,
                    ),
                    None => MaterialOverride::default(),
                }
            }),
            None => materials.slot(MaterialKey::Default, None, MaterialOverride::default),
        };
        instances.push(MeshInstance {
            mesh: data,
            transform: Mat4::IDENTITY,
            material: slot,
        });
    }

    Ok(Decoded {
        instances,
        materials: materials.slots,
    })
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Binary glTF with one triangle mesh used by two nodes, the second a
    /// child translated by +4 on X.
    pub(crate) fn triangle_glb() -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bin: Vec<u8> = positions.iter().flat_map(|v| v.to_le_bytes()).collect();
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [
                {"mesh": 0, "children": [1]},
                {"mesh": 0, "translation": [4.0, 0.0, 0.0]}
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "material": 0}]}],
            "materials": [{"pbrMetallicRoughness": {
                "baseColorFactor": [1.0, 0.0, 0.0, 1.0],
                "metallicFactor": 0.25,
                "roughnessFactor": 0.5
            }}],
            "buffers": [{"byteLength": 36}],
            "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 36}],
            "accessors": [{
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            }]
        }"#;
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    pub(crate) fn quad_obj() -> &'static [u8] {
        b"mtllib missing.mtl\no quad\nv 0 0 0\nv 2 0 0\nv 2 1 0\nv 0 1 0\nusemtl red\nf 1 2 3 4\n"
    }

    fn blob(bytes: Vec<u8>) -> Blob {
        Blob {
            bytes: bytes.into(),
            source: None,
        }
    }

    #[test]
    fn glb_hierarchy_is_flattened_with_shared_mesh() {
        let model = decode(ModelFormat::Glb, &blob(triangle_glb())).unwrap();
        assert_eq!(model.instances.len(), 2);
        assert!(Arc::ptr_eq(&model.instances[0].mesh, &model.instances[1].mesh));

        let bounds = model.bounds().unwrap();
        assert_eq!(bounds.min.to_array(), [0.0, 0.0, 0.0]);
        assert_eq!(bounds.max.to_array(), [5.0, 1.0, 0.0]);
    }

    #[test]
    fn glb_material_is_extracted_as_srgb_hex() {
        let model = decode(ModelFormat::Glb, &blob(triangle_glb())).unwrap();
        let materials = model.material_map();
        assert_eq!(materials.len(), 1);
        let material = &materials["Material_0"];
        assert_eq!(material.color, "ff0000");
        assert_eq!(material.metalness, 0.25);
        assert_eq!(material.roughness, 0.5);
        assert!(!material.wireframe);
    }

    #[test]
    fn missing_normals_are_computed() {
        let model = decode(ModelFormat::Glb, &blob(triangle_glb())).unwrap();
        let mesh = &model.instances[0].mesh;
        assert_eq!(mesh.normals.len(), 3);
        assert!(mesh.normals.iter().all(|n| (n[2] - 1.0).abs() < 1e-6));
    }

    #[test]
    fn fitted_stats_report_target_size() {
        let mut model = decode(ModelFormat::Glb, &blob(triangle_glb())).unwrap();
        assert!(!model.is_fitted());
        let fit = model.fit_to_view(4.0);
        assert!((fit.scale - 0.8).abs() < 1e-6);
        let stats = model.stats();
        assert_eq!(stats.mesh_count, 2);
        assert_eq!(stats.vertex_count, 6);
        assert_eq!(stats.triangle_count, 2);
        assert!((stats.dimensions[0] - 4.0).abs() < 1e-5);
    }

    #[test]
    fn external_buffer_without_base_dir_fails() {
        let json = br#"{
            "asset": {"version": "2.0"},
            "buffers": [{"uri": "missing.bin", "byteLength": 36}]
        }"#;
        let result = decode(ModelFormat::Gltf, &blob(json.to_vec()));
        assert!(matches!(result, Err(LoadError::Gltf(_))));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = decode(ModelFormat::Glb, &blob(b"not a model".to_vec()));
        assert!(result.is_err());
    }

    #[test]
    fn obj_without_material_library_uses_defaults() {
        let mut model = decode(ModelFormat::Obj, &blob(quad_obj().to_vec())).unwrap();
        assert_eq!(model.instances.len(), 1);
        assert_eq!(model.materials.len(), 1);
        assert_eq!(model.materials[0].base, MaterialOverride::default());

        model.fit_to_view(4.0);
        let stats = model.stats();
        assert_eq!(stats.vertex_count, 4);
        assert_eq!(stats.triangle_count, 2);
        assert!((stats.dimensions[0] - 4.0).abs() < 1e-5);
        assert!((stats.dimensions[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn obj_with_no_faces_is_empty() {
        let result = decode(ModelFormat::Obj, &blob(b"v 0 0 0\nv 1 0 0\n".to_vec()));
        assert!(matches!(result, Err(LoadError::Empty)));
    }

    #[test]
    fn colliding_material_names_get_suffixes() {
        let mut table = MaterialTable::default();
        let a = table.slot(MaterialKey::Index(0), Some("Paint"), MaterialOverride::default);
        let b = table.slot(MaterialKey::Index(1), Some("Paint"), MaterialOverride::default);
        let again = table.slot(MaterialKey::Index(0), Some("Paint"), MaterialOverride::default);
        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(table.slots[b].name, "Paint_1");
    }
}
