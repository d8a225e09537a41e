//! Procedural shape galleries. Each gallery owns its controls, light rig and
//! camera and turns them into a [`DrawList`] every frame; none of them touch
//! the scene store.

pub mod advanced;
pub mod artistic;
pub mod geometric;
pub mod instanced;
pub mod metaballs;
pub mod parametric;

pub use advanced::{AdvancedGallery, AdvancedMode, GeneratorShape};
pub use artistic::{ArtisticForm, ArtisticGallery, WireframeBase};
pub use geometric::{GeometricGallery, GeometricShape};

use crate::geometry::MeshData;
use crate::render::camera::{OrbitCamera, ViewPreset};
use crate::render::draw::DrawList;
use crate::render::lighting::LightRig;
use glam::{EulerRot, Mat4, Vec3};
use std::sync::Arc;

/// What the UI and the viewport need from any gallery.
pub trait Gallery {
    fn title(&self) -> &'static str;
    fn lights_mut(&mut self) -> &mut LightRig;
    fn camera_mut(&mut self) -> &mut OrbitCamera;
    fn view_presets(&self) -> &'static [ViewPreset];
    /// Build this frame's geometry. `time` is seconds since start-up.
    fn draw_list(&mut self, time: f32) -> DrawList;
}

/// One mesh rebuilt only when its key changes, so GPU buffers keyed by mesh
/// id survive across frames.
#[derive(Debug)]
pub(crate) struct CachedMesh<K> {
    entry: Option<(K, Arc<MeshData>)>,
}

impl<K: PartialEq> CachedMesh<K> {
    pub(crate) fn new() -> Self {
        Self { entry: None }
    }

    pub(crate) fn get_or_build<F>(&mut self, key: K, build: F) -> Arc<MeshData>
    where
        F: FnOnce(&K) -> MeshData,
    {
        match &self.entry {
            Some((cached, mesh)) if *cached == key => mesh.clone(),
            _ => {
                let mesh = Arc::new(build(&key));
                self.entry = Some((key, mesh.clone()));
                mesh
            }
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.entry = None;
    }
}

/// Rotation with the XYZ euler convention used for every animated shape.
pub(crate) fn rotation_xyz(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_euler(EulerRot::XYZ, x, y, z)
}

pub(crate) fn translation(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(x, y, z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives;

    #[test]
    fn cached_mesh_rebuilds_on_key_change_only() {
        let mut cache = CachedMesh::new();
        let mut builds = 0;
        let a = cache.get_or_build(8u32, |s| {
            builds += 1;
            primitives::sphere(1.0, *s, *s)
        });
        let b = cache.get_or_build(8u32, |_| unreachable!());
        assert_eq!(a.id(), b.id());
        let c = cache.get_or_build(16u32, |s| {
            builds += 1;
            primitives::sphere(1.0, *s, *s)
        });
        assert_ne!(a.id(), c.id());
        cache.invalidate();
        let d = cache.get_or_build(16u32, |s| primitives::sphere(1.0, *s, *s));
        assert_ne!(c.id(), d.id());
        assert_eq!(builds, 2);
    }

    #[test]
    fn light_edits_through_the_trait_reach_the_draw_list() {
        let mut galleries: [Box<dyn Gallery>; 3] = [
            Box::new(GeometricGallery::new()),
            Box::new(ArtisticGallery::new()),
            Box::new(AdvancedGallery::new()),
        ];
        for gallery in galleries.iter_mut() {
            gallery.lights_mut().ambient.intensity = 0.25;
            gallery.lights_mut().environment = None;
            let list = gallery.draw_list(0.0);
            assert_eq!(list.lights.ambient.intensity, 0.25, "{}", gallery.title());
            assert!(list.lights.environment.is_none());
        }
    }
}
