use super::{CachedMesh, Gallery};
use crate::geometry::{primitives, MeshData};
use crate::materials::ShadingParams;
use crate::render::camera::{OrbitCamera, ViewPreset};
use crate::render::draw::DrawList;
use crate::render::lighting::LightRig;
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometricShape {
    #[default]
    Cube,
    Cuboid,
    Sphere,
    Cylinder,
    Cone,
    Torus,
    Pyramid,
    TriangularPrism,
    HexagonalPrism,
}

impl GeometricShape {
    pub const ALL: [GeometricShape; 9] = [
        GeometricShape::Cube,
        GeometricShape::Cuboid,
        GeometricShape::Sphere,
        GeometricShape::Cylinder,
        GeometricShape::Cone,
        GeometricShape::Torus,
        GeometricShape::Pyramid,
        GeometricShape::TriangularPrism,
        GeometricShape::HexagonalPrism,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GeometricShape::Cube => "Cube",
            GeometricShape::Cuboid => "Cuboid",
            GeometricShape::Sphere => "Sphere",
            GeometricShape::Cylinder => "Cylinder",
            GeometricShape::Cone => "Cone",
            GeometricShape::Torus => "Torus",
            GeometricShape::Pyramid => "Pyramid",
            GeometricShape::TriangularPrism => "Triangular Prism",
            GeometricShape::HexagonalPrism => "Hexagonal Prism",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            GeometricShape::Cube => "Equal length on all sides",
            GeometricShape::Cuboid => "Box shape with unequal sides",
            GeometricShape::Sphere => "Perfect round ball",
            GeometricShape::Cylinder => "Circular base, straight height",
            GeometricShape::Cone => "Circular base, pointed top",
            GeometricShape::Torus => "Donut shape",
            GeometricShape::Pyramid => "Polygon base with triangular faces",
            GeometricShape::TriangularPrism => "Elongated shape with triangle bases",
            GeometricShape::HexagonalPrism => "Elongated shape with hexagon bases",
        }
    }

    pub fn mesh(self) -> MeshData {
        match self {
            GeometricShape::Cube => primitives::box_mesh(2.0, 2.0, 2.0),
            GeometricShape::Cuboid => primitives::box_mesh(3.0, 1.5, 2.0),
            GeometricShape::Sphere => primitives::sphere(1.5, 32, 32),
            GeometricShape::Cylinder => primitives::cylinder(1.0, 1.0, 2.0, 32),
            GeometricShape::Cone => primitives::cone(1.5, 2.5, 32),
            GeometricShape::Torus => primitives::torus(1.2, 0.4, 16, 100),
            GeometricShape::Pyramid => primitives::cone(1.5, 2.5, 4),
            GeometricShape::TriangularPrism => primitives::cylinder(1.0, 1.0, 2.0, 3),
            GeometricShape::HexagonalPrism => primitives::cylinder(1.0, 1.0, 2.0, 6),
        }
    }
}

/// Static primitives with a single editable standard material.
#[derive(Debug)]
pub struct GeometricGallery {
    pub shape: GeometricShape,
    pub color: [f32; 3],
    pub wireframe: bool,
    pub metalness: f32,
    pub roughness: f32,
    pub lights: LightRig,
    pub camera: OrbitCamera,
    mesh: CachedMesh<GeometricShape>,
}

impl GeometricGallery {
    pub const DEFAULT_COLOR: [f32; 3] = [0x4a as f32 / 255.0, 0x90 as f32 / 255.0, 0xe2 as f32 / 255.0];

    pub fn new() -> Self {
        Self {
            shape: GeometricShape::default(),
            color: Self::DEFAULT_COLOR,
            wireframe: false,
            metalness: 0.5,
            roughness: 0.5,
            lights: LightRig::geometric_gallery(),
            camera: OrbitCamera::new(Vec3::splat(5.0), Vec3::ZERO),
            mesh: CachedMesh::new(),
        }
    }

    pub fn shading(&self) -> ShadingParams {
        ShadingParams {
            wireframe: self.wireframe,
            metalness: self.metalness,
            roughness: self.roughness,
            ..ShadingParams::baseline(self.color)
        }
    }
}

impl Default for GeometricGallery {
    fn default() -> Self {
        Self::new()
    }
}

impl Gallery for GeometricGallery {
    fn title(&self) -> &'static str {
        "Geometric Shapes"
    }

    fn lights_mut(&mut self) -> &mut LightRig {
        &mut self.lights
    }

    fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    fn view_presets(&self) -> &'static [ViewPreset] {
        &ViewPreset::GEOMETRIC
    }

    fn draw_list(&mut self, _time: f32) -> DrawList {
        let mut list = DrawList::new(self.lights.clone());
        list.push_grid(10.0, 10, DrawList::GRID_COLOR);
        list.push_axes(5.0);
        let mesh = self.mesh.get_or_build(self.shape, |shape| shape.mesh());
        list.push(mesh, Mat4::IDENTITY, self.shading());
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_shape_builds_triangles() {
        for shape in GeometricShape::ALL {
            let mesh = shape.mesh();
            assert!(mesh.triangle_count() > 0, "{}", shape.label());
        }
    }

    #[test]
    fn pyramid_has_square_base() {
        let bounds = GeometricShape::Pyramid.mesh().bounds().unwrap();
        assert!((bounds.size().y - 2.5).abs() < 1e-4);
        assert!((bounds.size().x - 3.0).abs() < 1e-3);
    }

    #[test]
    fn draw_list_reuses_mesh_until_shape_changes() {
        let mut gallery = GeometricGallery::new();
        let first = gallery.draw_list(0.0);
        let second = gallery.draw_list(1.0);
        let id = |list: &DrawList| list.items.last().map(|item| item.mesh.id());
        assert_eq!(id(&first), id(&second));

        gallery.shape = GeometricShape::Torus;
        gallery.wireframe = true;
        let third = gallery.draw_list(2.0);
        assert_ne!(id(&first), id(&third));
        let last = third.items.last().unwrap();
        assert!(last.shading.wireframe);
        assert_eq!(last.shading.metalness, 0.5);
    }

    #[test]
    fn controls_start_at_defaults() {
        let gallery = GeometricGallery::new();
        assert_eq!(crate::materials::rgb_to_hex(gallery.color), "4a90e2");
        assert_eq!(gallery.camera.position, Vec3::splat(5.0));
        assert_eq!(gallery.camera.fov_degrees, 50.0);
    }
}
