use crate::assets::{read_upload, BlobStore, DropBatch, UploadError};
use crate::config::ViewerConfig;
use crate::scene::{Scene, SceneId, SceneStore, SceneUpdate, UploadMode};
use crate::ui::UiAction;
use crate::viewer::Viewer;
use std::path::Path;

/// Window-independent application state: the scene store, the object
/// handles behind it and the model viewer.
pub struct Session {
    pub store: SceneStore,
    pub blobs: BlobStore,
    pub viewer: Viewer,
    pub upload_mode: UploadMode,
}

impl Session {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            store: SceneStore::new(),
            blobs: BlobStore::new(),
            viewer: Viewer::new(config),
            upload_mode: config.upload_mode,
        }
    }

    pub fn open_path(&mut self, path: &Path) -> Result<SceneId, UploadError> {
        let upload = read_upload(path, &mut self.blobs)?;
        let (id, dropped) = self.store.ingest_upload(&upload, self.upload_mode);
        self.release(&dropped);
        Ok(id)
    }

    /// Handle the first file of a drop; the rest are logged and ignored.
    pub fn open_dropped(&mut self, batch: &mut DropBatch) -> Option<SceneId> {
        let path = batch.take_first()?;
        match self.open_path(&path) {
            Ok(id) => Some(id),
            Err(err) => {
                log::error!("Rejected dropped file: {}", err);
                None
            }
        }
    }

    fn release(&mut self, scenes: &[Scene]) {
        let revoked = self.blobs.revoke_all(scenes.iter().map(|scene| &scene.url));
        if revoked > 0 {
            log::debug!("Released {} object handle(s)", revoked);
        }
    }

    pub fn delete_scene(&mut self, id: SceneId) {
        if let Some(scene) = self.store.remove_scene(id) {
            self.release(std::slice::from_ref(&scene));
        }
    }

    pub fn reset(&mut self) {
        let cleared = self.store.clear_scenes();
        self.release(&cleared);
        self.viewer.camera.reset();
        self.viewer.gizmo.enabled = false;
        log::info!("Scene reset");
    }

    /// Apply a store-level UI action. Shell actions (file picker,
    /// fullscreen) are handled by the caller and ignored here.
    pub fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::SelectScene(id) => {
                self.store.set_current(id);
            }
            UiAction::DeleteScene(id) => self.delete_scene(id),
            UiAction::ResetScene => self.reset(),
            UiAction::SetStyle(id, style) => {
                log::debug!("Scene {} style -> {}", id, style);
                self.store.update_scene(id, SceneUpdate::style(style));
            }
            UiAction::SetTransform(id, transform) => {
                self.store.update_scene(id, SceneUpdate::transform(transform));
            }
            UiAction::SetMaterial { scene, name, value } => {
                self.store.set_material(scene, &name, value);
            }
            UiAction::CameraInteractionEnded => self.viewer.record_camera(&mut self.store),
            UiAction::OpenFilePicker | UiAction::ToggleFullscreen => {}
        }
    }

    /// Per-frame bookkeeping before the UI runs.
    pub fn update(&mut self) {
        self.viewer.sync(&mut self.store, &self.blobs);
    }
}
