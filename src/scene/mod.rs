use crate::assets::{ObjectUrl, Upload};
use crate::materials::{ArtisticStyle, MaterialOverride};
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Millisecond creation timestamp, unique within a store.
pub type SceneId = u64;

/// Camera pose captured from the viewer: position and XYZ euler rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

/// User placement of a model on top of its fit-to-view transform.
/// Rotation is XYZ euler in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub translation: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl ModelTransform {
    pub const IDENTITY: Self = Self {
        translation: [0.0; 3],
        rotation: [0.0; 3],
        scale: [1.0; 3],
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn matrix(&self) -> Mat4 {
        let [rx, ry, rz] = self.rotation.map(f32::to_radians);
        Mat4::from_scale_rotation_translation(
            Vec3::from(self.scale),
            Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            Vec3::from(self.translation),
        )
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// How a new upload relates to the scenes already loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    #[default]
    Replace,
    Add,
}

impl UploadMode {
    pub fn label(self) -> &'static str {
        match self {
            UploadMode::Replace => "Replace",
            UploadMode::Add => "Add",
        }
    }
}

/// Upload metadata a scene is created from.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDraft {
    pub url: ObjectUrl,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub last_modified: Option<SystemTime>,
    pub digest: String,
}

impl From<&Upload> for SceneDraft {
    fn from(upload: &Upload) -> Self {
        Self {
            url: upload.url.clone(),
            name: upload.name.clone(),
            mime_type: upload.mime_type.clone(),
            size: upload.size,
            last_modified: upload.last_modified,
            digest: upload.digest.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub id: SceneId,
    pub created_at: SystemTime,
    pub url: ObjectUrl,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub last_modified: Option<SystemTime>,
    pub digest: String,
    pub materials: BTreeMap<String, MaterialOverride>,
    pub camera_state: Option<CameraState>,
    pub artistic_style: ArtisticStyle,
    pub transform: ModelTransform,
}

/// Fields to merge into an existing scene; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneUpdate {
    pub name: Option<String>,
    pub materials: Option<BTreeMap<String, MaterialOverride>>,
    pub camera_state: Option<Option<CameraState>>,
    pub artistic_style: Option<ArtisticStyle>,
    pub transform: Option<ModelTransform>,
}

impl SceneUpdate {
    pub fn materials(materials: BTreeMap<String, MaterialOverride>) -> Self {
        Self {
            materials: Some(materials),
            ..Self::default()
        }
    }

    pub fn camera(state: CameraState) -> Self {
        Self {
            camera_state: Some(Some(state)),
            ..Self::default()
        }
    }

    pub fn style(style: ArtisticStyle) -> Self {
        Self {
            artistic_style: Some(style),
            ..Self::default()
        }
    }

    pub fn transform(transform: ModelTransform) -> Self {
        Self {
            transform: Some(transform),
            ..Self::default()
        }
    }

    fn merge_into(self, scene: &mut Scene) {
        if let Some(name) = self.name {
            scene.name = name;
        }
        if let Some(materials) = self.materials {
            scene.materials = materials;
        }
        if let Some(camera_state) = self.camera_state {
            scene.camera_state = camera_state;
        }
        if let Some(style) = self.artistic_style {
            scene.artistic_style = style;
        }
        if let Some(transform) = self.transform {
            scene.transform = transform;
        }
    }
}

/// Ordered list of uploaded scenes plus the single current selection.
///
/// The current scene is tracked by id, so reading it through `current()` and
/// through `scenes()` always observes the same record.
#[derive(Debug, Default)]
pub struct SceneStore {
    scenes: Vec<Scene>,
    current: Option<SceneId>,
    last_id: SceneId,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn current_id(&self) -> Option<SceneId> {
        self.current
    }

    pub fn current(&self) -> Option<&Scene> {
        self.current.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|scene| scene.id == id)
    }

    fn get_mut(&mut self, id: SceneId) -> Option<&mut Scene> {
        self.scenes.iter_mut().find(|scene| scene.id == id)
    }

    /// Append a scene for `draft` and make it current.
    pub fn add_scene(&mut self, draft: SceneDraft) -> &Scene {
        let now = SystemTime::now();
        let millis = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64;
        let id = millis.max(self.last_id + 1);
        self.last_id = id;

        log::info!("Scene {} added: {} ({} bytes)", id, draft.name, draft.size);
        self.scenes.push(Scene {
            id,
            created_at: now,
            url: draft.url,
            name: draft.name,
            mime_type: draft.mime_type,
            size: draft.size,
            last_modified: draft.last_modified,
            digest: draft.digest,
            materials: BTreeMap::new(),
            camera_state: None,
            artistic_style: ArtisticStyle::default(),
            transform: ModelTransform::IDENTITY,
        });
        self.current = Some(id);
        &self.scenes[self.scenes.len() - 1]
    }

    /// Remove a scene. Removing the current scene leaves no selection.
    pub fn remove_scene(&mut self, id: SceneId) -> Option<Scene> {
        let index = self.scenes.iter().position(|scene| scene.id == id)?;
        let removed = self.scenes.remove(index);
        if self.current == Some(id) {
            self.current = None;
        }
        log::info!("Scene {} removed: {}", id, removed.name);
        Some(removed)
    }

    /// Shallow-merge `update` into the scene. Unknown ids are ignored.
    pub fn update_scene(&mut self, id: SceneId, update: SceneUpdate) -> bool {
        match self.get_mut(id) {
            Some(scene) => {
                update.merge_into(scene);
                true
            }
            None => {
                log::debug!("Ignoring update for unknown scene {}", id);
                false
            }
        }
    }

    pub fn clear_scenes(&mut self) -> Vec<Scene> {
        self.current = None;
        let cleared = std::mem::take(&mut self.scenes);
        if !cleared.is_empty() {
            log::info!("Cleared {} scene(s)", cleared.len());
        }
        cleared
    }

    pub fn set_current(&mut self, id: SceneId) -> bool {
        if self.get(id).is_some() {
            self.current = Some(id);
            true
        } else {
            false
        }
    }

    /// Replace the override for one material name.
    pub fn set_material(&mut self, id: SceneId, name: &str, value: MaterialOverride) -> bool {
        match self.get_mut(id) {
            Some(scene) => {
                scene.materials.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Create a scene for a fresh upload. In `Replace` mode existing scenes are
    /// cleared first and returned so their object handles can be released.
    pub fn ingest_upload(&mut self, upload: &Upload, mode: UploadMode) -> (SceneId, Vec<Scene>) {
        let dropped = match mode {
            UploadMode::Replace if !self.scenes.is_empty() => self.clear_scenes(),
            _ => Vec::new(),
        };
        let id = self.add_scene(SceneDraft::from(upload)).id;
        (id, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{BlobStore, ModelFormat};

    fn draft(blobs: &mut BlobStore, name: &str) -> SceneDraft {
        let url = blobs.create_object_url(vec![1, 2, 3].into(), None);
        SceneDraft {
            url,
            name: name.to_string(),
            mime_type: "model/gltf-binary".to_string(),
            size: 3,
            last_modified: None,
            digest: String::new(),
        }
    }

    fn upload(blobs: &mut BlobStore, name: &str) -> Upload {
        Upload::from_bytes(blobs, name, ModelFormat::Glb, vec![7; 16], None, None)
    }

    #[test]
    fn ids_strictly_increase_under_rapid_adds() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let ids: Vec<SceneId> = (0..50)
            .map(|i| store.add_scene(draft(&mut blobs, &format!("m{i}.glb"))).id)
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(store.current_id(), ids.last().copied());
    }

    #[test]
    fn new_scene_starts_clean() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let scene = store.add_scene(draft(&mut blobs, "a.obj"));
        assert!(scene.materials.is_empty());
        assert!(scene.camera_state.is_none());
        assert_eq!(scene.artistic_style, ArtisticStyle::Standard);
        assert!(scene.transform.is_identity());
    }

    #[test]
    fn transform_update_leaves_other_fields() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let id = store.add_scene(draft(&mut blobs, "a.obj")).id;
        store.update_scene(id, SceneUpdate::style(ArtisticStyle::Toon));
        let moved = ModelTransform {
            translation: [1.0, 2.0, 3.0],
            ..ModelTransform::IDENTITY
        };
        assert!(store.update_scene(id, SceneUpdate::transform(moved)));

        let scene = store.current().unwrap();
        assert_eq!(scene.transform, moved);
        assert_eq!(scene.artistic_style, ArtisticStyle::Toon);
        let origin = scene.transform.matrix().transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn transform_matrix_applies_scale_before_rotation() {
        let t = ModelTransform {
            translation: [0.0, 1.0, 0.0],
            rotation: [0.0, 0.0, 90.0],
            scale: [2.0, 1.0, 1.0],
        };
        let p = t.matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-5, "{p:?}");
    }

    #[test]
    fn clear_then_add_leaves_one_current_scene() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        store.add_scene(draft(&mut blobs, "a.glb"));
        store.add_scene(draft(&mut blobs, "b.glb"));
        assert_eq!(store.clear_scenes().len(), 2);
        assert!(store.current().is_none());

        let id = store.add_scene(draft(&mut blobs, "c.glb")).id;
        assert_eq!(store.scenes().len(), 1);
        assert_eq!(store.current_id(), Some(id));
    }

    #[test]
    fn update_unknown_id_changes_nothing() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        store.add_scene(draft(&mut blobs, "a.glb"));
        let before = store.scenes().to_vec();
        assert!(!store.update_scene(42, SceneUpdate::style(ArtisticStyle::Neon)));
        assert_eq!(store.scenes(), before.as_slice());
    }

    #[test]
    fn update_is_visible_through_current_and_list() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let id = store.add_scene(draft(&mut blobs, "a.glb")).id;
        let state = CameraState {
            position: [1.0, 2.0, 3.0],
            rotation: [0.1, 0.2, 0.3],
        };
        store.update_scene(id, SceneUpdate::camera(state));
        store.update_scene(id, SceneUpdate::style(ArtisticStyle::Glass));

        let current = store.current().unwrap();
        assert_eq!(current.camera_state, Some(state));
        assert_eq!(current.artistic_style, ArtisticStyle::Glass);
        assert_eq!(store.scenes()[0], *current);
    }

    #[test]
    fn removing_current_scene_clears_selection() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let first = store.add_scene(draft(&mut blobs, "a.glb")).id;
        let second = store.add_scene(draft(&mut blobs, "b.glb")).id;

        assert!(store.remove_scene(second).is_some());
        assert!(store.current().is_none());
        assert_eq!(store.scenes().len(), 1);

        store.set_current(first);
        store.remove_scene(999);
        assert_eq!(store.current_id(), Some(first));
    }

    #[test]
    fn set_material_replaces_by_key() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let id = store.add_scene(draft(&mut blobs, "a.glb")).id;
        store.set_material(id, "Body", MaterialOverride::default());
        let red = MaterialOverride {
            color: "ff0000".into(),
            ..MaterialOverride::default()
        };
        store.set_material(id, "Body", red.clone());
        let materials = &store.current().unwrap().materials;
        assert_eq!(materials.len(), 1);
        assert_eq!(materials["Body"], red);
    }

    #[test]
    fn replace_upload_returns_dropped_scenes() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let first = upload(&mut blobs, "a.glb");
        let second = upload(&mut blobs, "b.glb");

        let (_, dropped) = store.ingest_upload(&first, UploadMode::Replace);
        assert!(dropped.is_empty());
        let (id, dropped) = store.ingest_upload(&second, UploadMode::Replace);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].url, first.url);
        assert_eq!(store.scenes().len(), 1);
        assert_eq!(store.current_id(), Some(id));
    }

    #[test]
    fn add_upload_keeps_existing_scenes() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        store.ingest_upload(&upload(&mut blobs, "a.glb"), UploadMode::Add);
        let (id, dropped) = store.ingest_upload(&upload(&mut blobs, "b.glb"), UploadMode::Add);
        assert!(dropped.is_empty());
        assert_eq!(store.scenes().len(), 2);
        assert_eq!(store.current_id(), Some(id));
    }
}
