use super::{rotation_xyz, translation, CachedMesh, Gallery};
use crate::geometry::{primitives, MeshData};
use crate::materials::ShadingParams;
use crate::render::camera::{OrbitCamera, ViewPreset};
use crate::render::draw::DrawList;
use crate::render::lighting::LightRig;
use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::FRAC_PI_2;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtisticForm {
    #[default]
    LiquidMetal,
    Wireframe,
    Crystal,
    NeonGrid,
}

impl ArtisticForm {
    pub const ALL: [ArtisticForm; 4] = [
        ArtisticForm::LiquidMetal,
        ArtisticForm::Wireframe,
        ArtisticForm::Crystal,
        ArtisticForm::NeonGrid,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ArtisticForm::LiquidMetal => "Liquid Metal Blob",
            ArtisticForm::Wireframe => "Wireframe Mesh",
            ArtisticForm::Crystal => "Crystal",
            ArtisticForm::NeonGrid => "Neon Grid",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ArtisticForm::LiquidMetal => "Animated soft blob with surface distortion",
            ArtisticForm::Wireframe => "Rotating see-through lattice",
            ArtisticForm::Crystal => "Faceted gem with emissive glow and sparkles",
            ArtisticForm::NeonGrid => "Glowing grid, sphere and ring",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireframeBase {
    Sphere,
    Torus,
    TorusKnot,
    Octahedron,
    #[default]
    Icosahedron,
}

impl WireframeBase {
    pub const ALL: [WireframeBase; 5] = [
        WireframeBase::Sphere,
        WireframeBase::Torus,
        WireframeBase::TorusKnot,
        WireframeBase::Octahedron,
        WireframeBase::Icosahedron,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WireframeBase::Sphere => "Sphere",
            WireframeBase::Torus => "Torus",
            WireframeBase::TorusKnot => "Torus Knot",
            WireframeBase::Octahedron => "Octahedron",
            WireframeBase::Icosahedron => "Icosahedron",
        }
    }

    pub fn mesh(self) -> MeshData {
        match self {
            WireframeBase::Sphere => primitives::sphere(2.0, 32, 32),
            WireframeBase::Torus => primitives::torus(1.5, 0.5, 32, 64),
            WireframeBase::TorusKnot => primitives::torus_knot(1.2, 0.4, 128, 32, 2, 3),
            WireframeBase::Octahedron => primitives::octahedron(2.0),
            WireframeBase::Icosahedron => primitives::icosahedron(2.0, 1),
        }
    }
}

const LIQUID_RADIUS: f32 = 2.0;
const DISTORT: f32 = 0.4;

/// Radial wobble in `[-1, 1]` built from three travelling sine waves.
fn wobble(p: Vec3, phase: f32) -> f32 {
    ((p.x * 1.7 + p.y * 0.3 + phase).sin()
        + (p.y * 1.3 - p.z * 0.9 + phase * 1.3).sin()
        + (p.z * 1.9 + p.x * 0.7 - phase * 0.7).sin())
        / 3.0
}

/// Push every vertex of `base` along its radius by `distort^2` times the
/// wobble, then recompute normals.
pub fn distort_sphere(base: &MeshData, distort: f32, phase: f32) -> MeshData {
    let amount = distort * distort;
    let positions = base
        .positions
        .iter()
        .map(|p| {
            let p = Vec3::from(*p);
            let noise = wobble(p / 2.0 + Vec3::splat(phase), phase);
            (p * (1.0 + noise * amount)).to_array()
        })
        .collect();
    MeshData::from_triangles(positions, base.indices.clone())
}

/// Small glowing specks drifting inside a cube of side `scale`.
#[derive(Debug, Clone)]
pub struct Sparkles {
    seeds: Vec<(Vec3, f32)>,
    size: f32,
    speed: f32,
    pub opacity: f32,
}

impl Sparkles {
    pub fn new(count: usize, scale: f32, size: f32, speed: f32, opacity: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let half = scale / 2.0;
        let seeds = (0..count)
            .map(|_| {
                let p = Vec3::new(
                    rng.gen_range(-half..=half),
                    rng.gen_range(-half..=half),
                    rng.gen_range(-half..=half),
                );
                (p, rng.gen_range(0.0..std::f32::consts::TAU))
            })
            .collect();
        Self {
            seeds,
            size,
            speed,
            opacity,
        }
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn instances(&self, time: f32, parent: Mat4) -> Vec<Mat4> {
        let scale = Vec3::splat(self.size * 0.015);
        self.seeds
            .iter()
            .map(|(origin, phase)| {
                let bob = (time * self.speed * 4.0 + phase).sin() * 0.2;
                parent * Mat4::from_scale_rotation_translation(scale, glam::Quat::IDENTITY, *origin + Vec3::Y * bob)
            })
            .collect()
    }
}

fn speck_mesh() -> Arc<MeshData> {
    static SPECK: OnceLock<Arc<MeshData>> = OnceLock::new();
    SPECK
        .get_or_init(|| Arc::new(primitives::sphere(1.0, 6, 4)))
        .clone()
}

/// Animated, stylised shapes under coloured point lights.
#[derive(Debug)]
pub struct ArtisticGallery {
    pub form: ArtisticForm,
    pub color: [f32; 3],
    pub emissive_color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    pub animation_speed: f32,
    pub glow_intensity: f32,
    pub wireframe_base: WireframeBase,
    pub grid_size: f32,
    pub lights: LightRig,
    pub camera: OrbitCamera,
    liquid_base: CachedMesh<()>,
    wire: CachedMesh<WireframeBase>,
    crystal: CachedMesh<()>,
    crystal_edges: CachedMesh<()>,
    neon_grid: CachedMesh<u32>,
    neon_sphere: CachedMesh<()>,
    neon_ring: CachedMesh<()>,
    crystal_sparkles: Sparkles,
    grid_sparkles: Sparkles,
}

impl ArtisticGallery {
    pub const SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.0..=5.0;
    pub const GLOW_RANGE: std::ops::RangeInclusive<f32> = 0.0..=5.0;
    pub const GRID_RANGE: std::ops::RangeInclusive<f32> = 4.0..=16.0;

    pub fn new() -> Self {
        Self {
            form: ArtisticForm::default(),
            color: [0.0, 1.0, 1.0],
            emissive_color: [1.0, 0.0, 1.0],
            metalness: 0.9,
            roughness: 0.1,
            animation_speed: 2.0,
            glow_intensity: 2.0,
            wireframe_base: WireframeBase::default(),
            grid_size: 8.0,
            lights: LightRig::artistic_gallery(),
            camera: OrbitCamera::new(Vec3::splat(6.0), Vec3::ZERO)
                .with_fov(60.0)
                .with_distance_limits(3.0, 20.0)
                .with_preset_distance(8.0),
            liquid_base: CachedMesh::new(),
            wire: CachedMesh::new(),
            crystal: CachedMesh::new(),
            crystal_edges: CachedMesh::new(),
            neon_grid: CachedMesh::new(),
            neon_sphere: CachedMesh::new(),
            neon_ring: CachedMesh::new(),
            crystal_sparkles: Sparkles::new(50, 6.0, 3.0, 0.3, 0.6, 11),
            grid_sparkles: Sparkles::new(100, 8.0, 2.0, 0.5, 0.4, 29),
        }
    }

    fn sparkle_shading(&self, opacity: f32) -> ShadingParams {
        ShadingParams {
            transparent: true,
            opacity,
            ..ShadingParams::unlit(self.color)
        }
    }

    fn push_liquid_metal(&mut self, list: &mut DrawList, time: f32) {
        let base = self
            .liquid_base
            .get_or_build((), |_| primitives::sphere(LIQUID_RADIUS, 64, 64));
        let mesh = Arc::new(distort_sphere(&base, DISTORT, time * self.animation_speed / 10.0));
        let shading = ShadingParams {
            metalness: self.metalness,
            roughness: self.roughness,
            ..ShadingParams::baseline(self.color)
        };
        list.push(mesh, rotation_xyz(time * 0.2, time * 0.3, 0.0), shading);
    }

    fn push_wireframe(&mut self, list: &mut DrawList, time: f32) {
        let mesh = self.wire.get_or_build(self.wireframe_base, |base| base.mesh());
        let shading = ShadingParams {
            wireframe: true,
            transparent: true,
            opacity: 0.8,
            ..ShadingParams::unlit(self.color)
        };
        list.push(mesh, rotation_xyz(time * 0.3, time * 0.2, 0.0), shading);
    }

    fn push_crystal(&mut self, list: &mut DrawList, time: f32) {
        let mesh = self.crystal.get_or_build((), |_| primitives::icosahedron(2.0, 0));
        let edges = self.crystal_edges.get_or_build((), |_| {
            MeshData::lines(mesh.positions.clone(), mesh.edge_indices())
        });
        let transform = translation(0.0, (time * 0.5).sin() * 0.3, 0.0) * rotation_xyz(0.0, time * 0.5, 0.0);
        let shading = ShadingParams {
            flat_shading: true,
            emissive: self.emissive_color,
            emissive_intensity: self.glow_intensity,
            metalness: 0.8,
            roughness: 0.2,
            ..ShadingParams::baseline(self.color)
        };
        list.push(mesh, transform, shading);
        list.push(edges, transform, ShadingParams::unlit([1.0; 3]));

        let sparkles = self.crystal_sparkles.instances(time, Mat4::IDENTITY);
        let sparkle_shading = self.sparkle_shading(self.crystal_sparkles.opacity);
        list.push_instanced(speck_mesh(), sparkles, sparkle_shading);
    }

    fn push_neon_grid(&mut self, list: &mut DrawList, time: f32) {
        let group = rotation_xyz(0.0, time * 0.2, 0.0);
        let size = self.grid_size.max(1.0);
        let grid = self
            .neon_grid
            .get_or_build(size.to_bits(), |_| primitives::grid_lines(size, 10));
        let lines = ShadingParams {
            transparent: true,
            opacity: 0.6,
            ..ShadingParams::unlit(self.color)
        };
        list.push(grid, group * translation(0.0, -2.0, 0.0), lines);

        let sphere = self.neon_sphere.get_or_build((), |_| primitives::sphere(1.5, 32, 32));
        let glow = ShadingParams {
            wireframe: true,
            transparent: true,
            opacity: 0.7,
            emissive: self.color,
            emissive_intensity: self.glow_intensity,
            ..ShadingParams::baseline(self.color)
        };
        list.push(sphere, group, glow);

        let ring = self.neon_ring.get_or_build((), |_| primitives::torus(3.0, 0.05, 16, 100));
        let ring_shading = ShadingParams {
            transparent: true,
            opacity: 0.8,
            ..ShadingParams::unlit(self.color)
        };
        list.push(ring, group * rotation_xyz(FRAC_PI_2, 0.0, 0.0), ring_shading);

        let sparkles = self.grid_sparkles.instances(time, group);
        let sparkle_shading = self.sparkle_shading(self.grid_sparkles.opacity);
        list.push_instanced(speck_mesh(), sparkles, sparkle_shading);
    }
}

impl Default for ArtisticGallery {
    fn default() -> Self {
        Self::new()
    }
}

impl Gallery for ArtisticGallery {
    fn title(&self) -> &'static str {
        "Artistic Forms"
    }

    fn lights_mut(&mut self) -> &mut LightRig {
        &mut self.lights
    }

    fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    fn view_presets(&self) -> &'static [ViewPreset] {
        &ViewPreset::ARTISTIC
    }

    fn draw_list(&mut self, time: f32) -> DrawList {
        let mut list = DrawList::new(self.lights.clone());
        match self.form {
            ArtisticForm::LiquidMetal => self.push_liquid_metal(&mut list, time),
            ArtisticForm::Wireframe => self.push_wireframe(&mut list, time),
            ArtisticForm::Crystal => self.push_crystal(&mut list, time),
            ArtisticForm::NeonGrid => self.push_neon_grid(&mut list, time),
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distortion_stays_within_amplitude() {
        let base = primitives::sphere(LIQUID_RADIUS, 24, 24);
        let mesh = distort_sphere(&base, DISTORT, 1.3);
        let bound = LIQUID_RADIUS * (1.0 + DISTORT * DISTORT) + 1e-4;
        let floor = LIQUID_RADIUS * (1.0 - DISTORT * DISTORT) - 1e-4;
        let mut moved = false;
        for (p, q) in mesh.positions.iter().zip(&base.positions) {
            let r = Vec3::from(*p).length();
            assert!(r <= bound && r >= floor, "{r}");
            moved |= (Vec3::from(*p) - Vec3::from(*q)).length() > 1e-3;
        }
        assert!(moved);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
    }

    #[test]
    fn sparkles_are_deterministic_per_seed() {
        let a = Sparkles::new(50, 6.0, 3.0, 0.3, 0.6, 5);
        let b = Sparkles::new(50, 6.0, 3.0, 0.3, 0.6, 5);
        assert_eq!(a.len(), 50);
        assert_eq!(a.instances(2.0, Mat4::IDENTITY), b.instances(2.0, Mat4::IDENTITY));
    }

    #[test]
    fn each_form_draws_something() {
        let mut gallery = ArtisticGallery::new();
        for form in ArtisticForm::ALL {
            gallery.form = form;
            let list = gallery.draw_list(1.0);
            assert!(!list.items.is_empty(), "{}", form.label());
        }
    }

    #[test]
    fn neon_grid_carries_sparkles_and_ring() {
        let mut gallery = ArtisticGallery::new();
        gallery.form = ArtisticForm::NeonGrid;
        let list = gallery.draw_list(0.5);
        assert_eq!(list.items.len(), 4);
        assert_eq!(list.instance_count(), 3 + 100);
        assert!(list.items.iter().all(|item| item.shading.transparent));
    }

    #[test]
    fn crystal_bobs_and_keeps_mesh() {
        let mut gallery = ArtisticGallery::new();
        gallery.form = ArtisticForm::Crystal;
        let a = gallery.draw_list(0.0);
        let b = gallery.draw_list(std::f32::consts::PI);
        assert_eq!(a.items[0].mesh.id(), b.items[0].mesh.id());
        let y = |list: &DrawList| list.items[0].instances[0].w_axis.y;
        assert!(y(&a).abs() < 1e-6);
        assert!((y(&b) - 0.3).abs() < 1e-4);
        assert!(a.items[0].shading.flat_shading);
        assert_eq!(a.items[0].shading.emissive, [1.0, 0.0, 1.0]);
    }

    #[test]
    fn wireframe_base_switch_rebuilds() {
        let mut gallery = ArtisticGallery::new();
        gallery.form = ArtisticForm::Wireframe;
        let a = gallery.draw_list(0.0).items[0].mesh.id();
        gallery.wireframe_base = WireframeBase::TorusKnot;
        let b = gallery.draw_list(0.0).items[0].mesh.id();
        assert_ne!(a, b);
        let item = &gallery.draw_list(0.0).items[0];
        assert!(item.shading.wireframe && item.shading.unlit);
        assert_eq!(item.shading.opacity, 0.8);
    }
}
