//! The model viewport: keeps the displayed model in step with the current
//! scene and turns it into a draw list.

use crate::assets::loader::{LoadError, LoadedModel, ModelStats};
use crate::assets::worker::AssetLoader;
use crate::assets::{BlobStore, ModelFormat, ObjectUrl};
use crate::config::ViewerConfig;
use crate::render::camera::OrbitCamera;
use crate::render::draw::{placeholder_mesh, DrawList};
use crate::render::lighting::LightRig;
use crate::materials::ShadingParams;
use crate::scene::{ModelTransform, Scene, SceneId, SceneStore, SceneUpdate};
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Box shown instead of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Loading,
    Unsupported,
    Failed,
}

impl Placeholder {
    pub fn color(self) -> [f32; 3] {
        match self {
            Placeholder::Loading => [0x4a as f32 / 255.0, 0x6b as f32 / 255.0, 1.0],
            Placeholder::Unsupported => [1.0, 0xa5 as f32 / 255.0, 0.0],
            Placeholder::Failed => [1.0, 0.0, 0.0],
        }
    }
}

/// Which part of the model transform the gizmo edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl GizmoMode {
    pub const ALL: [GizmoMode; 3] = [GizmoMode::Translate, GizmoMode::Rotate, GizmoMode::Scale];

    pub fn label(self) -> &'static str {
        match self {
            GizmoMode::Translate => "Move",
            GizmoMode::Rotate => "Rotate",
            GizmoMode::Scale => "Scale",
        }
    }

    /// The vector of `transform` this mode edits.
    pub fn component(self, transform: &mut ModelTransform) -> &mut [f32; 3] {
        match self {
            GizmoMode::Translate => &mut transform.translation,
            GizmoMode::Rotate => &mut transform.rotation,
            GizmoMode::Scale => &mut transform.scale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gizmo {
    pub enabled: bool,
    pub mode: GizmoMode,
}

enum Content {
    Empty,
    Loading {
        scene: SceneId,
        url: ObjectUrl,
        generation: u64,
    },
    Ready {
        scene: SceneId,
        url: ObjectUrl,
        model: LoadedModel,
    },
    Unavailable {
        scene: SceneId,
        url: ObjectUrl,
        placeholder: Placeholder,
        message: String,
    },
}

impl Content {
    fn shows(&self, scene: &Scene) -> bool {
        match self {
            Content::Empty => false,
            Content::Loading { scene: id, url, .. }
            | Content::Ready { scene: id, url, .. }
            | Content::Unavailable { scene: id, url, .. } => *id == scene.id && *url == scene.url,
        }
    }
}

/// What the viewport is showing, for status text.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerStatus<'a> {
    Empty,
    Loading,
    Ready,
    Unavailable { placeholder: Placeholder, message: &'a str },
}

pub struct Viewer {
    pub camera: OrbitCamera,
    pub lights: LightRig,
    pub show_grid: bool,
    pub gizmo: Gizmo,
    fit_target: f32,
    loader: AssetLoader,
    content: Content,
}

impl Viewer {
    pub const GRID_SIZE: f32 = 20.0;
    pub const GRID_DIVISIONS: u32 = 20;
    pub const GIZMO_LENGTH: f32 = 2.5;

    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            camera: OrbitCamera::new(Vec3::from(config.camera_position), Vec3::ZERO),
            lights: LightRig::viewer(),
            show_grid: true,
            gizmo: Gizmo::default(),
            fit_target: config.fit_target,
            loader: AssetLoader::new(),
            content: Content::Empty,
        }
    }

    /// Follow the store's current scene: start a load when it changed and
    /// pick up the result of the latest load once it arrives.
    pub fn sync(&mut self, store: &mut SceneStore, blobs: &BlobStore) {
        let Some(scene) = store.current() else {
            if !matches!(self.content, Content::Empty) {
                log::debug!("No current scene, viewport cleared");
                self.content = Content::Empty;
            }
            return;
        };
        if !self.content.shows(scene) {
            let id = scene.id;
            self.content = self.begin_load(scene, blobs);
            store.update_scene(id, SceneUpdate::camera(self.camera.camera_state()));
        }
        self.receive(store);
    }

    fn begin_load(&mut self, scene: &Scene, blobs: &BlobStore) -> Content {
        let unavailable = |placeholder, message: String| {
            log::error!("Cannot display '{}': {}", scene.name, message);
            Content::Unavailable {
                scene: scene.id,
                url: scene.url.clone(),
                placeholder,
                message,
            }
        };
        let format = match ModelFormat::detect(&scene.name) {
            Ok(format) => format,
            Err(err) => return unavailable(Placeholder::Unsupported, err.to_string()),
        };
        let Some(blob) = blobs.resolve(&scene.url) else {
            let err = LoadError::Revoked(scene.url.to_string());
            return unavailable(Placeholder::Failed, err.to_string());
        };
        let generation = self.loader.request(scene.url.clone(), format, blob);
        log::info!("Loading '{}' as {} (generation {})", scene.name, format.label(), generation);
        Content::Loading {
            scene: scene.id,
            url: scene.url.clone(),
            generation,
        }
    }

    fn receive(&mut self, store: &mut SceneStore) {
        let Some(outcome) = self.loader.poll_latest() else {
            return;
        };
        let (scene, url) = match &self.content {
            Content::Loading {
                scene,
                url,
                generation,
            } if *generation == outcome.generation => (*scene, url.clone()),
            _ => return,
        };
        self.content = match outcome.result {
            Ok(mut model) => {
                let fit = model.fit_to_view(self.fit_target);
                let stats = model.stats();
                log::info!(
                    "Model ready: {} meshes, {} triangles, {} materials, scale {:.3}",
                    stats.mesh_count,
                    stats.triangle_count,
                    stats.material_count,
                    fit.scale
                );
                let keep_overrides = store.get(scene).is_some_and(|s| !s.materials.is_empty());
                if !keep_overrides {
                    store.update_scene(scene, SceneUpdate::materials(model.material_map()));
                }
                Content::Ready { scene, url, model }
            }
            Err(err) => {
                log::error!("Failed to load model {}: {}", url, err);
                Content::Unavailable {
                    scene,
                    url,
                    placeholder: Placeholder::Failed,
                    message: err.to_string(),
                }
            }
        };
    }

    pub fn status(&self) -> ViewerStatus<'_> {
        match &self.content {
            Content::Empty => ViewerStatus::Empty,
            Content::Loading { .. } => ViewerStatus::Loading,
            Content::Ready { .. } => ViewerStatus::Ready,
            Content::Unavailable {
                placeholder,
                message,
                ..
            } => ViewerStatus::Unavailable {
                placeholder: *placeholder,
                message,
            },
        }
    }

    pub fn stats(&self) -> Option<ModelStats> {
        match &self.content {
            Content::Ready { model, .. } => Some(model.stats()),
            _ => None,
        }
    }

    /// Material names of the displayed model, in file order.
    pub fn material_names(&self) -> Vec<&str> {
        match &self.content {
            Content::Ready { model, .. } => model.materials.iter().map(|m| m.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Store the camera pose on the current scene.
    pub fn record_camera(&self, store: &mut SceneStore) {
        if let Some(id) = store.current_id() {
            store.update_scene(id, SceneUpdate::camera(self.camera.camera_state()));
        }
    }

    pub fn draw_list(&self, store: &SceneStore) -> DrawList {
        let mut list = DrawList::new(self.lights.clone());
        if self.show_grid {
            list.push_grid(Self::GRID_SIZE, Self::GRID_DIVISIONS, DrawList::GRID_COLOR);
        }
        match &self.content {
            Content::Empty => {}
            Content::Loading { .. } => push_placeholder(&mut list, Placeholder::Loading),
            Content::Unavailable { placeholder, .. } => push_placeholder(&mut list, *placeholder),
            Content::Ready { scene, model, .. } => {
                let Some(scene) = store.get(*scene) else {
                    return list;
                };
                let placement = scene.transform.matrix();
                let root = placement * model.root_transform();
                for instance in &model.instances {
                    let shading = match model.materials.get(instance.material) {
                        Some(material) => scene
                            .artistic_style
                            .shading(material.base.rgb(), scene.materials.get(&material.name)),
                        None => scene.artistic_style.shading([0.8; 3], None),
                    };
                    list.push(instance.mesh.clone(), root * instance.transform, shading);
                }
                if self.gizmo.enabled {
                    let [rx, ry, rz] = scene.transform.rotation.map(f32::to_radians);
                    let pose = Mat4::from_rotation_translation(
                        Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
                        Vec3::from(scene.transform.translation),
                    );
                    list.push_axes_at(pose, Self::GIZMO_LENGTH);
                }
            }
        }
        list
    }
}

fn push_placeholder(list: &mut DrawList, placeholder: Placeholder) {
    list.push(
        placeholder_mesh(),
        Mat4::IDENTITY,
        ShadingParams::unlit(placeholder.color()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::loader::tests::quad_obj;
    use crate::assets::Upload;
    use crate::materials::ArtisticStyle;
    use crate::scene::UploadMode;
    use std::time::{Duration, Instant};

    fn viewer() -> Viewer {
        Viewer::new(&ViewerConfig::default())
    }

    fn wait_until_settled(viewer: &mut Viewer, store: &mut SceneStore, blobs: &BlobStore) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while viewer.status() == ViewerStatus::Loading {
            assert!(Instant::now() < deadline, "load never finished");
            std::thread::sleep(Duration::from_millis(5));
            viewer.sync(store, blobs);
        }
    }

    fn last_color(list: &DrawList) -> Option<[f32; 3]> {
        list.items.last().map(|item| item.shading.color)
    }

    #[test]
    fn empty_store_draws_only_the_grid() {
        let mut store = SceneStore::new();
        let blobs = BlobStore::new();
        let mut viewer = viewer();
        viewer.sync(&mut store, &blobs);
        assert_eq!(viewer.status(), ViewerStatus::Empty);
        assert_eq!(viewer.draw_list(&store).items.len(), 1);

        viewer.show_grid = false;
        assert!(viewer.draw_list(&store).items.is_empty());
    }

    #[test]
    fn loaded_model_fills_materials_and_camera() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let upload = Upload::from_bytes(&mut blobs, "quad.obj", ModelFormat::Obj, quad_obj().to_vec(), None, None);
        let (id, _) = store.ingest_upload(&upload, UploadMode::Replace);

        let mut viewer = viewer();
        viewer.sync(&mut store, &blobs);
        assert_eq!(last_color(&viewer.draw_list(&store)), Some(Placeholder::Loading.color()));
        assert!(store.get(id).and_then(|s| s.camera_state).is_some());

        wait_until_settled(&mut viewer, &mut store, &blobs);
        assert_eq!(viewer.status(), ViewerStatus::Ready);
        let scene = store.get(id).unwrap();
        assert!(!scene.materials.is_empty());
        assert_eq!(viewer.material_names().len(), scene.materials.len());

        let stats = viewer.stats().unwrap();
        assert_eq!(stats.triangle_count, 2);
        assert!((stats.dimensions[0] - 4.0).abs() < 1e-4);
    }

    #[test]
    fn style_changes_reach_the_draw_list() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let upload = Upload::from_bytes(&mut blobs, "quad.obj", ModelFormat::Obj, quad_obj().to_vec(), None, None);
        let (id, _) = store.ingest_upload(&upload, UploadMode::Replace);
        let mut viewer = viewer();
        viewer.sync(&mut store, &blobs);
        wait_until_settled(&mut viewer, &mut store, &blobs);

        store.update_scene(id, SceneUpdate::style(ArtisticStyle::Glass));
        let glass = viewer.draw_list(&store);
        assert!(glass.items.last().unwrap().shading.is_blended());

        store.update_scene(id, SceneUpdate::style(ArtisticStyle::Wireframe));
        let wire = viewer.draw_list(&store);
        let shading = wire.items.last().unwrap().shading;
        assert!(shading.wireframe);
        assert_eq!(shading.transmission, 0.0);
        assert_eq!(shading.opacity, 1.0);
    }

    #[test]
    fn unsupported_name_shows_orange_placeholder() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let upload = Upload::from_bytes(&mut blobs, "quad.obj", ModelFormat::Obj, quad_obj().to_vec(), None, None);
        let (id, _) = store.ingest_upload(&upload, UploadMode::Replace);
        store.update_scene(
            id,
            SceneUpdate {
                name: Some("quad.stl".to_string()),
                ..SceneUpdate::default()
            },
        );

        let mut viewer = viewer();
        viewer.sync(&mut store, &blobs);
        assert!(matches!(
            viewer.status(),
            ViewerStatus::Unavailable {
                placeholder: Placeholder::Unsupported,
                ..
            }
        ));
        assert_eq!(last_color(&viewer.draw_list(&store)), Some(Placeholder::Unsupported.color()));
    }

    #[test]
    fn revoked_handle_and_bad_bytes_show_red_placeholder() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let upload = Upload::from_bytes(&mut blobs, "broken.gltf", ModelFormat::Gltf, b"not json".to_vec(), None, None);
        store.ingest_upload(&upload, UploadMode::Replace);
        let mut viewer = viewer();
        viewer.sync(&mut store, &blobs);
        wait_until_settled(&mut viewer, &mut store, &blobs);
        assert_eq!(last_color(&viewer.draw_list(&store)), Some(Placeholder::Failed.color()));

        let other = Upload::from_bytes(&mut blobs, "quad.obj", ModelFormat::Obj, quad_obj().to_vec(), None, None);
        store.ingest_upload(&other, UploadMode::Add);
        blobs.revoke_object_url(&other.url);
        viewer.sync(&mut store, &blobs);
        assert!(matches!(
            viewer.status(),
            ViewerStatus::Unavailable {
                placeholder: Placeholder::Failed,
                ..
            }
        ));
    }

    #[test]
    fn model_transform_composes_over_the_fit() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let upload = Upload::from_bytes(&mut blobs, "quad.obj", ModelFormat::Obj, quad_obj().to_vec(), None, None);
        let (id, _) = store.ingest_upload(&upload, UploadMode::Replace);
        let mut viewer = viewer();
        viewer.show_grid = false;
        viewer.sync(&mut store, &blobs);
        wait_until_settled(&mut viewer, &mut store, &blobs);

        let fitted = viewer.draw_list(&store).items[0].instances[0];
        let dimensions = viewer.stats().unwrap().dimensions;
        let placed = ModelTransform {
            translation: [1.0, -2.0, 0.5],
            rotation: [0.0, 45.0, 0.0],
            scale: [2.0, 2.0, 2.0],
        };
        store.update_scene(id, SceneUpdate::transform(placed));
        viewer.sync(&mut store, &blobs);

        let list = viewer.draw_list(&store);
        assert_eq!(list.items.len(), 1);
        let expected = placed.matrix() * fitted;
        assert!(list.items[0].instances[0].abs_diff_eq(expected, 1e-5));
        assert_eq!(viewer.stats().unwrap().dimensions, dimensions);
        assert_eq!(viewer.status(), ViewerStatus::Ready);

        viewer.gizmo.enabled = true;
        let with_gizmo = viewer.draw_list(&store);
        assert_eq!(with_gizmo.items.len(), 4);
        let origin = with_gizmo.items[1].instances[0].transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(1.0, -2.0, 0.5)).length() < 1e-5);
    }

    #[test]
    fn gizmo_modes_edit_their_own_component() {
        let mut transform = ModelTransform::IDENTITY;
        GizmoMode::Rotate.component(&mut transform)[1] = 30.0;
        GizmoMode::Scale.component(&mut transform)[0] = 0.5;
        assert_eq!(transform.rotation, [0.0, 30.0, 0.0]);
        assert_eq!(transform.scale, [0.5, 1.0, 1.0]);
        assert_eq!(transform.translation, [0.0; 3]);
    }

    #[test]
    fn removing_the_current_scene_clears_the_view() {
        let mut blobs = BlobStore::new();
        let mut store = SceneStore::new();
        let upload = Upload::from_bytes(&mut blobs, "quad.obj", ModelFormat::Obj, quad_obj().to_vec(), None, None);
        let (id, _) = store.ingest_upload(&upload, UploadMode::Replace);
        let mut viewer = viewer();
        viewer.sync(&mut store, &blobs);
        store.remove_scene(id);
        viewer.sync(&mut store, &blobs);
        assert_eq!(viewer.status(), ViewerStatus::Empty);
    }
}
