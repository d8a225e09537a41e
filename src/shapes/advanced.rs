use super::instanced::{self, ParticleField};
use super::metaballs::{self, RESOLUTION};
use super::parametric::{self, ParametricFormula};
use super::{rotation_xyz, CachedMesh, Gallery};
use crate::geometry::{primitives, MeshData};
use crate::materials::{ShadingParams, SurfacePreset};
use crate::render::camera::{OrbitCamera, ViewPreset};
use crate::render::draw::DrawList;
use crate::render::lighting::LightRig;
use glam::Vec3;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvancedMode {
    #[default]
    Generator,
    Parametric,
    Metaballs,
    Instanced,
}

impl AdvancedMode {
    pub const ALL: [AdvancedMode; 4] = [
        AdvancedMode::Generator,
        AdvancedMode::Parametric,
        AdvancedMode::Metaballs,
        AdvancedMode::Instanced,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AdvancedMode::Generator => "Shape Generator",
            AdvancedMode::Parametric => "Parametric Surface",
            AdvancedMode::Metaballs => "Metaballs",
            AdvancedMode::Instanced => "Instanced Spheres",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AdvancedMode::Generator => "Primitive driven by radius, height and segments",
            AdvancedMode::Parametric => "Surface from x, y, z formulas over t and s",
            AdvancedMode::Metaballs => "Blobby iso-surface of five merging balls",
            AdvancedMode::Instanced => "Thousands of animated spheres in one draw",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeneratorShape {
    Cylinder,
    Cone,
    #[default]
    Sphere,
    Torus,
    TorusKnot,
    Box,
}

impl GeneratorShape {
    pub const ALL: [GeneratorShape; 6] = [
        GeneratorShape::Cylinder,
        GeneratorShape::Cone,
        GeneratorShape::Sphere,
        GeneratorShape::Torus,
        GeneratorShape::TorusKnot,
        GeneratorShape::Box,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GeneratorShape::Cylinder => "Cylinder",
            GeneratorShape::Cone => "Cone",
            GeneratorShape::Sphere => "Sphere",
            GeneratorShape::Torus => "Torus",
            GeneratorShape::TorusKnot => "Torus Knot",
            GeneratorShape::Box => "Box",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorParams {
    pub shape: GeneratorShape,
    pub height: f32,
    pub radius: f32,
    pub segments: u32,
}

impl GeneratorParams {
    pub const HEIGHT_RANGE: std::ops::RangeInclusive<f32> = 0.5..=4.0;
    pub const RADIUS_RANGE: std::ops::RangeInclusive<f32> = 0.5..=3.0;
    pub const SEGMENT_RANGE: std::ops::RangeInclusive<u32> = 8..=64;

    pub fn mesh(&self) -> MeshData {
        let (r, h) = (self.radius, self.height);
        let seg = self.segments.clamp(*Self::SEGMENT_RANGE.start(), *Self::SEGMENT_RANGE.end());
        match self.shape {
            GeneratorShape::Cylinder => primitives::cylinder(r, r, h, seg),
            GeneratorShape::Cone => primitives::cone(r, h, seg),
            GeneratorShape::Sphere => primitives::sphere(r, seg, seg),
            GeneratorShape::Torus => primitives::torus(r, r * 0.4, seg, seg),
            GeneratorShape::TorusKnot => primitives::torus_knot(r, r * 0.3, seg * 3, seg, 2, 3),
            GeneratorShape::Box => primitives::box_mesh(r * 2.0, h, r * 2.0),
        }
    }
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            shape: GeneratorShape::default(),
            height: 2.0,
            radius: 1.0,
            segments: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaballParams {
    pub strength: f32,
    pub subtract: f32,
}

impl MetaballParams {
    pub const STRENGTH_RANGE: std::ops::RangeInclusive<f32> = 0.1..=2.0;
    pub const SUBTRACT_RANGE: std::ops::RangeInclusive<f32> = 1.0..=20.0;
}

impl Default for MetaballParams {
    fn default() -> Self {
        Self {
            strength: 0.5,
            subtract: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwarmParams {
    pub count: usize,
    pub spread: f32,
}

impl SwarmParams {
    pub const SPREAD_RANGE: std::ops::RangeInclusive<f32> = 5.0..=20.0;
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            count: 1000,
            spread: 10.0,
        }
    }
}

const SWARM_SEED: u64 = 0x5eed;

fn swarm_sphere() -> Arc<MeshData> {
    static SPHERE: OnceLock<Arc<MeshData>> = OnceLock::new();
    SPHERE
        .get_or_init(|| Arc::new(primitives::sphere(0.1, 8, 8)))
        .clone()
}

/// Generated geometry: parametric primitives, user formulas, metaballs and a
/// large instanced swarm.
#[derive(Debug)]
pub struct AdvancedGallery {
    pub mode: AdvancedMode,
    pub color: [f32; 3],
    pub surface: SurfacePreset,
    pub generator: GeneratorParams,
    pub formula: ParametricFormula,
    pub parametric_segments: u32,
    pub metaballs: MetaballParams,
    pub swarm: SwarmParams,
    pub lights: LightRig,
    pub camera: OrbitCamera,
    formula_error: Option<String>,
    generated: CachedMesh<(GeneratorShape, u32, u32, u32)>,
    surface_mesh: CachedMesh<(ParametricFormula, u32)>,
    blob: CachedMesh<(u32, u32)>,
    field: Option<(SwarmParams, ParticleField)>,
}

impl AdvancedGallery {
    pub const BACKGROUND: [f32; 3] = [10.0 / 255.0, 10.0 / 255.0, 10.0 / 255.0];
    pub const GRID_COLOR: [f32; 3] = [0.2, 0.2, 0.2];
    pub const PARAMETRIC_SEGMENT_RANGE: std::ops::RangeInclusive<u32> = 16..=64;

    pub fn new() -> Self {
        Self {
            mode: AdvancedMode::default(),
            color: super::GeometricGallery::DEFAULT_COLOR,
            surface: SurfacePreset::default(),
            generator: GeneratorParams::default(),
            formula: ParametricFormula::default(),
            parametric_segments: 32,
            metaballs: MetaballParams::default(),
            swarm: SwarmParams::default(),
            lights: LightRig::advanced_gallery(),
            camera: OrbitCamera::new(Vec3::splat(5.0), Vec3::ZERO)
                .with_fov(60.0)
                .with_distance_limits(2.0, 30.0)
                .with_preset_distance(8.0),
            formula_error: None,
            generated: CachedMesh::new(),
            surface_mesh: CachedMesh::new(),
            blob: CachedMesh::new(),
            field: None,
        }
    }

    /// Why the last parametric build fell back to the torus, if it did.
    pub fn formula_error(&self) -> Option<&str> {
        self.formula_error.as_deref()
    }

    fn generated_mesh(&mut self) -> Arc<MeshData> {
        let g = self.generator;
        let key = (g.shape, g.height.to_bits(), g.radius.to_bits(), g.segments);
        self.generated.get_or_build(key, |_| g.mesh())
    }

    fn parametric_mesh(&mut self) -> Arc<MeshData> {
        let segments = self.parametric_segments.clamp(
            *Self::PARAMETRIC_SEGMENT_RANGE.start(),
            *Self::PARAMETRIC_SEGMENT_RANGE.end(),
        );
        let error = &mut self.formula_error;
        self.surface_mesh
            .get_or_build((self.formula.clone(), segments), |(formula, segments)| {
                let (mesh, failure) = parametric::build_surface(formula, *segments);
                *error = failure.map(|err| err.to_string());
                mesh
            })
    }

    fn metaball_mesh(&mut self) -> Arc<MeshData> {
        let p = self.metaballs;
        let strength = p.strength.clamp(*MetaballParams::STRENGTH_RANGE.start(), *MetaballParams::STRENGTH_RANGE.end());
        let subtract = p.subtract.clamp(*MetaballParams::SUBTRACT_RANGE.start(), *MetaballParams::SUBTRACT_RANGE.end());
        self.blob.get_or_build((strength.to_bits(), subtract.to_bits()), |_| {
            metaballs::polygonize(&metaballs::default_balls(strength, subtract), RESOLUTION)
        })
    }

    fn swarm_instances(&mut self) -> Vec<glam::Mat4> {
        let params = SwarmParams {
            count: self.swarm.count.clamp(instanced::MIN_COUNT, instanced::MAX_COUNT),
            spread: self.swarm.spread,
        };
        let stale = !matches!(&self.field, Some((built, _)) if *built == params);
        if stale {
            log::debug!("Seeding {} instanced spheres, spread {}", params.count, params.spread);
            self.field = Some((params, ParticleField::new(params.count, params.spread, SWARM_SEED)));
        }
        match self.field.as_mut() {
            Some((_, field)) => field.step(),
            None => Vec::new(),
        }
    }
}

impl Default for AdvancedGallery {
    fn default() -> Self {
        Self::new()
    }
}

impl Gallery for AdvancedGallery {
    fn title(&self) -> &'static str {
        "Advanced Shapes"
    }

    fn lights_mut(&mut self) -> &mut LightRig {
        &mut self.lights
    }

    fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    fn view_presets(&self) -> &'static [ViewPreset] {
        &ViewPreset::ADVANCED
    }

    fn draw_list(&mut self, time: f32) -> DrawList {
        let mut list = DrawList::new(self.lights.clone());
        list.background = Self::BACKGROUND;
        list.push_grid(20.0, 20, Self::GRID_COLOR);
        list.push_axes(5.0);

        let surface = self.surface.shading(self.color);
        match self.mode {
            AdvancedMode::Generator => {
                let mesh = self.generated_mesh();
                list.push(mesh, rotation_xyz(0.0, time * 0.5, 0.0), surface);
            }
            AdvancedMode::Parametric => {
                let mesh = self.parametric_mesh();
                list.push(mesh, rotation_xyz(0.0, time * 0.3, 0.0), surface);
            }
            AdvancedMode::Metaballs => {
                let mesh = self.metaball_mesh();
                let shading = ShadingParams {
                    metalness: 0.8,
                    roughness: 0.2,
                    flat_shading: true,
                    ..ShadingParams::baseline(self.color)
                };
                list.push(mesh, rotation_xyz(0.0, time * 0.2, 0.0), shading);
            }
            AdvancedMode::Instanced => {
                let instances = self.swarm_instances();
                list.push_instanced(swarm_sphere(), instances, ShadingParams::baseline(self.color));
            }
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_item(list: &DrawList) -> &crate::render::draw::DrawItem {
        // grid and three axis lines come first
        &list.items[4]
    }

    #[test]
    fn generator_shapes_follow_controls() {
        let mut params = GeneratorParams::default();
        params.shape = GeneratorShape::Box;
        params.radius = 1.5;
        params.height = 3.0;
        let size = params.mesh().bounds().unwrap().size();
        assert!((size - Vec3::new(3.0, 3.0, 3.0)).length() < 1e-4);

        params.shape = GeneratorShape::Cylinder;
        params.height = 0.5;
        let size = params.mesh().bounds().unwrap().size();
        assert!((size.y - 0.5).abs() < 1e-4);
        for shape in GeneratorShape::ALL {
            params.shape = shape;
            assert!(params.mesh().triangle_count() > 0, "{}", shape.label());
        }
    }

    #[test]
    fn every_mode_draws_grid_axes_and_model() {
        let mut gallery = AdvancedGallery::new();
        for mode in AdvancedMode::ALL {
            gallery.mode = mode;
            let list = gallery.draw_list(1.0);
            assert_eq!(list.items.len(), 5, "{}", mode.label());
            assert_eq!(list.background, AdvancedGallery::BACKGROUND);
        }
    }

    #[test]
    fn surface_preset_applies_to_generated_shapes() {
        let mut gallery = AdvancedGallery::new();
        gallery.surface = SurfacePreset::Wireframe;
        let list = gallery.draw_list(0.0);
        assert!(model_item(&list).shading.wireframe);
    }

    #[test]
    fn bad_formula_is_reported_and_cleared() {
        let mut gallery = AdvancedGallery::new();
        gallery.mode = AdvancedMode::Parametric;
        gallery.formula.x = "cos(".to_string();
        let list = gallery.draw_list(0.0);
        assert!(!model_item(&list).mesh.is_empty());
        assert!(gallery.formula_error().is_some());

        gallery.formula = ParametricFormula::default();
        gallery.draw_list(0.0);
        assert!(gallery.formula_error().is_none());
    }

    #[test]
    fn swarm_reseeds_only_on_parameter_change() {
        let mut gallery = AdvancedGallery::new();
        gallery.mode = AdvancedMode::Instanced;
        let list = gallery.draw_list(0.0);
        assert_eq!(model_item(&list).instances.len(), 1000);
        let next = gallery.draw_list(0.1);
        assert_ne!(model_item(&list).instances, model_item(&next).instances);

        gallery.swarm.count = 20_000;
        let capped = gallery.draw_list(0.2);
        assert_eq!(model_item(&capped).instances.len(), instanced::MAX_COUNT);
    }

    #[test]
    fn metaball_mesh_is_cached_per_parameters() {
        let mut gallery = AdvancedGallery::new();
        gallery.mode = AdvancedMode::Metaballs;
        let a = model_item(&gallery.draw_list(0.0)).mesh.id();
        let b = model_item(&gallery.draw_list(1.0)).mesh.id();
        assert_eq!(a, b);
        gallery.metaballs.strength = 1.0;
        let c = model_item(&gallery.draw_list(2.0)).mesh.id();
        assert_ne!(a, c);
    }
}
