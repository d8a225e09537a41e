use super::lighting::LightRig;
use crate::geometry::{primitives, MeshData};
use crate::materials::ShadingParams;
use glam::Mat4;
use std::sync::{Arc, Mutex, OnceLock};

/// One mesh drawn with one material at one or more transforms.
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub mesh: Arc<MeshData>,
    pub instances: Vec<Mat4>,
    pub shading: ShadingParams,
}

/// Everything the viewport paints in a frame, minus the camera.
#[derive(Debug, Clone)]
pub struct DrawList {
    pub items: Vec<DrawItem>,
    pub lights: LightRig,
    pub background: [f32; 3],
}

impl DrawList {
    pub const DEFAULT_BACKGROUND: [f32; 3] = [0.1, 0.1, 0.12];
    pub const GRID_COLOR: [f32; 3] = [0.27, 0.27, 0.27];

    pub fn new(lights: LightRig) -> Self {
        let background = lights
            .environment
            .map(|env| env.background())
            .unwrap_or(Self::DEFAULT_BACKGROUND);
        Self {
            items: Vec::new(),
            lights,
            background,
        }
    }

    pub fn push(&mut self, mesh: Arc<MeshData>, transform: Mat4, shading: ShadingParams) {
        self.items.push(DrawItem {
            mesh,
            instances: vec![transform],
            shading,
        });
    }

    pub fn push_instanced(&mut self, mesh: Arc<MeshData>, instances: Vec<Mat4>, shading: ShadingParams) {
        if instances.is_empty() {
            return;
        }
        self.items.push(DrawItem {
            mesh,
            instances,
            shading,
        });
    }

    /// Reference grid on the floor plane.
    pub fn push_grid(&mut self, size: f32, divisions: u32, color: [f32; 3]) {
        self.push(grid_mesh(size, divisions), Mat4::IDENTITY, ShadingParams::unlit(color));
    }

    /// Red, green and blue unit lines along X, Y and Z, scaled to `length`.
    pub fn push_axes(&mut self, length: f32) {
        self.push_axes_at(Mat4::IDENTITY, length);
    }

    /// Axes in the frame of `origin`, e.g. a posed model.
    pub fn push_axes_at(&mut self, origin: Mat4, length: f32) {
        let transform = origin * Mat4::from_scale(glam::Vec3::splat(length));
        for (mesh, color) in axes_meshes().iter().zip(AXIS_COLORS) {
            self.push(mesh.clone(), transform, ShadingParams::unlit(color));
        }
    }

    pub fn instance_count(&self) -> usize {
        self.items.iter().map(|item| item.instances.len()).sum()
    }
}

const AXIS_COLORS: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

fn grid_mesh(size: f32, divisions: u32) -> Arc<MeshData> {
    static GRIDS: Mutex<Vec<(u32, u32, Arc<MeshData>)>> = Mutex::new(Vec::new());
    let key = size.to_bits();
    let mut grids = GRIDS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some((_, _, mesh)) = grids.iter().find(|(s, d, _)| *s == key && *d == divisions) {
        return mesh.clone();
    }
    let mesh = Arc::new(primitives::grid_lines(size, divisions));
    grids.push((key, divisions, mesh.clone()));
    mesh
}

fn axes_meshes() -> &'static [Arc<MeshData>; 3] {
    static AXES: OnceLock<[Arc<MeshData>; 3]> = OnceLock::new();
    AXES.get_or_init(|| {
        [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
            .map(|end| Arc::new(MeshData::lines(vec![[0.0; 3], end], vec![0, 1])))
    })
}

/// Unit box shown while a model is loading or could not be shown.
pub fn placeholder_mesh() -> Arc<MeshData> {
    static BOX: OnceLock<Arc<MeshData>> = OnceLock::new();
    BOX.get_or_init(|| Arc::new(primitives::box_mesh(1.0, 1.0, 1.0)))
        .clone()
}
