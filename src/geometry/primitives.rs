//! Procedural mesh builders for the shape galleries and placeholders.
//!
//! Conventions: Y is up, triangles are counter-clockwise when seen from
//! outside. Polyhedra are emitted unindexed so every face keeps a flat normal.

use super::MeshData;
use glam::Vec3;
use std::f32::consts::{PI, TAU};

pub fn box_mesh(width: f32, height: f32, depth: f32) -> MeshData {
    let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);
    // (normal, u axis, v axis) per face; u x v == normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let half = Vec3::new(hx, hy, hz);
    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in faces {
        let (n, u, v) = (Vec3::from(n), Vec3::from(u), Vec3::from(v));
        let base = positions.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (n + u * su + v * sv) * half;
            positions.push(p.to_array());
            normals.push(n.to_array());
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    MeshData::triangles(positions, normals, indices)
}

/// UV sphere with `width_segments` around Y and `height_segments` pole to pole.
pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    for iy in 0..=hs {
        let v = iy as f32 / hs as f32;
        let theta = v * PI;
        for ix in 0..=ws {
            let u = ix as f32 / ws as f32;
            let phi = u * TAU;
            let n = Vec3::new(-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
            positions.push((n * radius).to_array());
            normals.push(n.to_array());
        }
    }
    let row = ws + 1;
    let mut indices = Vec::new();
    for iy in 0..hs {
        for ix in 0..ws {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != hs - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    MeshData::triangles(positions, normals, indices)
}

/// Capped cylinder along Y. A zero top radius gives a cone; few radial
/// segments give prisms and pyramids.
pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: u32) -> MeshData {
    let segments = radial_segments.max(3);
    let half = height * 0.5;
    let slope = (radius_bottom - radius_top) / height.max(f32::EPSILON);
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();

    // side: duplicated seam so each ring closes cleanly
    for (y, r) in [(half, radius_top), (-half, radius_bottom)] {
        for i in 0..=segments {
            let angle = i as f32 / segments as f32 * TAU;
            let (sin, cos) = angle.sin_cos();
            positions.push([r * sin, y, r * cos]);
            normals.push(Vec3::new(sin, slope, cos).normalize().to_array());
        }
    }
    let row = segments + 1;
    for i in 0..segments {
        let (a, b) = (i, i + 1);
        let (c, d) = (row + i, row + i + 1);
        indices.extend_from_slice(&[a, c, d, a, d, b]);
    }

    for (y, r, ny) in [(half, radius_top, 1.0f32), (-half, radius_bottom, -1.0)] {
        if r <= 0.0 {
            continue;
        }
        let center = positions.len() as u32;
        positions.push([0.0, y, 0.0]);
        normals.push([0.0, ny, 0.0]);
        for i in 0..=segments {
            let angle = i as f32 / segments as f32 * TAU;
            let (sin, cos) = angle.sin_cos();
            positions.push([r * sin, y, r * cos]);
            normals.push([0.0, ny, 0.0]);
        }
        for i in 0..segments {
            let (a, b) = (center + 1 + i, center + 2 + i);
            if ny > 0.0 {
                indices.extend_from_slice(&[center, a, b]);
            } else {
                indices.extend_from_slice(&[center, b, a]);
            }
        }
    }
    MeshData::triangles(positions, normals, indices)
}

pub fn cone(radius: f32, height: f32, radial_segments: u32) -> MeshData {
    cylinder(0.0, radius, height, radial_segments)
}

/// Torus in the XY plane, tube around the Z axis ring.
pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> MeshData {
    let rs = radial_segments.max(3);
    let ts = tubular_segments.max(3);
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    for j in 0..=rs {
        let v = j as f32 / rs as f32 * TAU;
        for i in 0..=ts {
            let u = i as f32 / ts as f32 * TAU;
            let p = Vec3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);
            positions.push(p.to_array());
            normals.push((p - center).normalize_or_zero().to_array());
        }
    }
    MeshData::triangles(positions, normals, grid_indices(rs, ts))
}

/// (p, q) torus knot swept by a circular tube.
pub fn torus_knot(
    radius: f32,
    tube: f32,
    tubular_segments: u32,
    radial_segments: u32,
    p: u32,
    q: u32,
) -> MeshData {
    let ts = tubular_segments.max(3);
    let rs = radial_segments.max(3);
    let (p, q) = (p as f32, q as f32);
    let curve = |u: f32| {
        let qr = q / p * u;
        let cs = qr.cos();
        Vec3::new(
            radius * (2.0 + cs) * 0.5 * u.cos(),
            radius * (2.0 + cs) * 0.5 * u.sin(),
            radius * qr.sin() * 0.5,
        )
    };
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    for i in 0..=ts {
        let u = i as f32 / ts as f32 * p * TAU;
        let p1 = curve(u);
        let p2 = curve(u + 0.01);
        let tangent = p2 - p1;
        let bitangent = tangent.cross(p2 + p1).normalize_or_zero();
        let normal = bitangent.cross(tangent).normalize_or_zero();
        for j in 0..=rs {
            let v = j as f32 / rs as f32 * TAU;
            let cx = -tube * v.cos();
            let cy = tube * v.sin();
            let vertex = p1 + normal * cx + bitangent * cy;
            positions.push(vertex.to_array());
            normals.push((vertex - p1).normalize_or_zero().to_array());
        }
    }
    MeshData::triangles(positions, normals, grid_indices(ts, rs))
}

pub fn octahedron(radius: f32) -> MeshData {
    let v = [
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::Z,
        Vec3::NEG_Z,
    ];
    let faces = [
        [0, 2, 4],
        [0, 4, 3],
        [0, 3, 5],
        [0, 5, 2],
        [1, 2, 5],
        [1, 5, 3],
        [1, 3, 4],
        [1, 4, 2],
    ];
    flat_polyhedron(&v, &faces, radius, 0)
}

/// Icosahedron, optionally subdivided `detail` times and projected back onto
/// the sphere. Faces stay flat-shaded.
pub fn icosahedron(radius: f32, detail: u32) -> MeshData {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    let v = [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ];
    let faces = [
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    flat_polyhedron(&v, &faces, radius, detail)
}

fn flat_polyhedron(vertices: &[Vec3], faces: &[[usize; 3]], radius: f32, detail: u32) -> MeshData {
    let mut tris: Vec<[Vec3; 3]> = faces
        .iter()
        .map(|f| [vertices[f[0]], vertices[f[1]], vertices[f[2]]].map(|p| p.normalize()))
        .collect();
    for _ in 0..detail {
        tris = tris
            .into_iter()
            .flat_map(|[a, b, c]| {
                let ab = ((a + b) * 0.5).normalize();
                let bc = ((b + c) * 0.5).normalize();
                let ca = ((c + a) * 0.5).normalize();
                [[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]]
            })
            .collect();
    }
    let mut positions = Vec::with_capacity(tris.len() * 3);
    let mut normals = Vec::with_capacity(tris.len() * 3);
    for [a, b, c] in tris {
        let mut n = (b - a).cross(c - a).normalize_or_zero();
        if n.dot(a + b + c) < 0.0 {
            n = -n;
        }
        for p in [a, b, c] {
            positions.push((p * radius).to_array());
            normals.push(n.to_array());
        }
    }
    let indices = (0..positions.len() as u32).collect::<Vec<_>>();
    let mut mesh = MeshData::triangles(positions, normals, indices);
    mesh.fix_winding_outward();
    mesh
}

/// Square grid of lines on the XZ plane, centred on the origin.
pub fn grid_lines(size: f32, divisions: u32) -> MeshData {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let step = size / divisions as f32;
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let base = positions.len() as u32;
        positions.push([-half, 0.0, k]);
        positions.push([half, 0.0, k]);
        positions.push([k, 0.0, -half]);
        positions.push([k, 0.0, half]);
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 3]);
    }
    MeshData::lines(positions, indices)
}

/// Parametric surface sampled on a `slices x stacks` grid of (u, v) in [0, 1].
pub fn parametric<F>(slices: u32, stacks: u32, mut func: F) -> MeshData
where
    F: FnMut(f32, f32) -> Vec3,
{
    let slices = slices.max(1);
    let stacks = stacks.max(1);
    let mut positions = Vec::with_capacity(((slices + 1) * (stacks + 1)) as usize);
    for i in 0..=stacks {
        let v = i as f32 / stacks as f32;
        for j in 0..=slices {
            let u = j as f32 / slices as f32;
            positions.push(func(u, v).to_array());
        }
    }
    MeshData::from_triangles(positions, grid_indices(stacks, slices))
}

/// Indices for a `(rows + 1) x (cols + 1)` vertex grid laid out row-major.
fn grid_indices(rows: u32, cols: u32) -> Vec<u32> {
    let stride = cols + 1;
    let mut indices = Vec::with_capacity((rows * cols * 6) as usize);
    for r in 1..=rows {
        for c in 1..=cols {
            let a = stride * r + c - 1;
            let b = stride * (r - 1) + c - 1;
            let d = stride * r + c;
            let e = stride * (r - 1) + c;
            indices.extend_from_slice(&[a, b, d, b, e, d]);
        }
    }
    indices
}

impl MeshData {
    /// Flip any triangle whose winding disagrees with its stored normal.
    fn fix_winding_outward(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(self.positions[i as usize]));
            let n = Vec3::from(self.normals[tri[0] as usize]);
            if (b - a).cross(c - a).dot(n) < 0.0 {
                tri.swap(1, 2);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_radius(mesh: &MeshData) -> f32 {
        mesh.positions
            .iter()
            .map(|p| Vec3::from(*p).length())
            .fold(0.0, f32::max)
    }

    #[test]
    fn box_has_expected_extent() {
        let mesh = box_mesh(3.0, 1.5, 2.0);
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.size(), Vec3::new(3.0, 1.5, 2.0));
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn box_faces_wind_outward() {
        let mesh = box_mesh(2.0, 2.0, 2.0);
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(mesh.positions[i as usize]));
            let face = (b - a).cross(c - a);
            assert!(face.dot((a + b + c) / 3.0) > 0.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = sphere(1.5, 32, 32);
        for p in &mesh.positions {
            assert!((Vec3::from(*p).length() - 1.5).abs() < 1e-4);
        }
    }

    #[test]
    fn pyramid_is_a_four_sided_cone() {
        let mesh = cone(1.5, 2.5, 4);
        // 4 side quads (two triangles each, apex ones degenerate) + 4 base fan triangles
        assert_eq!(mesh.triangle_count(), 4 * 2 + 4);
        let bounds = mesh.bounds().unwrap();
        assert!((bounds.size().y - 2.5).abs() < 1e-5);
    }

    #[test]
    fn icosahedron_detail_multiplies_faces() {
        assert_eq!(icosahedron(1.0, 0).triangle_count(), 20);
        assert_eq!(icosahedron(1.0, 1).triangle_count(), 80);
        assert!((max_radius(&icosahedron(2.0, 1)) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn octahedron_normals_point_away_from_center() {
        let mesh = octahedron(1.0);
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!(Vec3::from(*p).dot(Vec3::from(*n)) > 0.0);
        }
    }

    #[test]
    fn torus_spans_outer_radius() {
        let mesh = torus(1.2, 0.4, 16, 100);
        let bounds = mesh.bounds().unwrap();
        assert!((bounds.max.x - 1.6).abs() < 1e-3);
        assert!((bounds.max.z - 0.4).abs() < 1e-3);
    }

    #[test]
    fn grid_lines_cover_size() {
        let grid = grid_lines(20.0, 20);
        assert_eq!(grid.indices.len(), 21 * 4);
        assert_eq!(grid.bounds().unwrap().size().x, 20.0);
        assert_eq!(grid.triangle_count(), 0);
    }

    #[test]
    fn parametric_grid_has_expected_vertex_count() {
        let mesh = parametric(10, 5, |u, v| Vec3::new(u, v, 0.0));
        assert_eq!(mesh.vertex_count(), 11 * 6);
        assert_eq!(mesh.triangle_count(), 10 * 5 * 2);
    }
}
