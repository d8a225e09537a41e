//! Metaball field and its iso-surface.
//!
//! The field lives in a unit cube of normalised coordinates mapped onto
//! world `[-1, 1]^3`. Each ball adds `strength / d^2 - subtract` where that is
//! positive; the surface is the level set at [`ISOLATION`].

use crate::geometry::MeshData;
use glam::Vec3;

pub const RESOLUTION: usize = 64;
pub const ISOLATION: f32 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metaball {
    /// World position inside `[-1, 1]^3`.
    pub center: Vec3,
    pub strength: f32,
    pub subtract: f32,
}

/// Four balls on the XY diagonals and a half-strength one toward +Z.
pub fn default_balls(strength: f32, subtract: f32) -> [Metaball; 5] {
    let ball = |x: f32, y: f32, z: f32, strength: f32| Metaball {
        center: Vec3::new(x, y, z),
        strength,
        subtract,
    };
    [
        ball(0.5, 0.5, 0.0, strength),
        ball(-0.5, -0.5, 0.0, strength),
        ball(0.5, -0.5, 0.0, strength),
        ball(-0.5, 0.5, 0.0, strength),
        ball(0.0, 0.0, 0.5, strength / 2.0),
    ]
}

pub fn field(balls: &[Metaball], world: Vec3) -> f32 {
    let p = world * 0.5 + Vec3::splat(0.5);
    balls
        .iter()
        .map(|ball| {
            let c = ball.center * 0.5 + Vec3::splat(0.5);
            let value = ball.strength / (0.000_001 + p.distance_squared(c)) - ball.subtract;
            value.max(0.0)
        })
        .sum()
}

pub fn polygonize(balls: &[Metaball], resolution: usize) -> MeshData {
    surface_nets(Vec3::splat(-1.0), Vec3::splat(1.0), resolution, ISOLATION, |p| {
        field(balls, p)
    })
}

const CORNERS: [(usize, usize, usize); 8] = [
    (0, 0, 0),
    (1, 0, 0),
    (1, 1, 0),
    (0, 1, 0),
    (0, 0, 1),
    (1, 0, 1),
    (1, 1, 1),
    (0, 1, 1),
];

const EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Scalar surface nets: one vertex per cell that straddles `iso`, placed at the
/// mean of the interpolated edge crossings, and one quad per crossing lattice
/// edge. Normals come from the field gradient and point toward lower values.
fn surface_nets<F>(min: Vec3, max: Vec3, resolution: usize, iso: f32, f: F) -> MeshData
where
    F: Fn(Vec3) -> f32,
{
    let res = resolution.max(2);
    let n = res + 1;
    let step = (max - min) / res as f32;
    let corner_pos = |x: usize, y: usize, z: usize| min + Vec3::new(x as f32, y as f32, z as f32) * step;
    let corner_idx = |x: usize, y: usize, z: usize| (z * n + y) * n + x;

    let mut samples = vec![0.0f32; n * n * n];
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                samples[corner_idx(x, y, z)] = f(corner_pos(x, y, z));
            }
        }
    }
    let inside = |x: usize, y: usize, z: usize| samples[corner_idx(x, y, z)] > iso;

    let cell_idx = |x: usize, y: usize, z: usize| (z * res + y) * res + x;
    let mut cell_vertex = vec![u32::MAX; res * res * res];
    let mut positions: Vec<[f32; 3]> = Vec::new();

    for z in 0..res {
        for y in 0..res {
            for x in 0..res {
                let values = CORNERS.map(|(dx, dy, dz)| samples[corner_idx(x + dx, y + dy, z + dz)]);
                let above = values.map(|v| v > iso);
                if above.iter().all(|&a| a) || above.iter().all(|&a| !a) {
                    continue;
                }
                let mut acc = Vec3::ZERO;
                let mut count = 0u32;
                for (a, b) in EDGES {
                    if above[a] == above[b] {
                        continue;
                    }
                    let (ax, ay, az) = CORNERS[a];
                    let (bx, by, bz) = CORNERS[b];
                    let pa = corner_pos(x + ax, y + ay, z + az);
                    let pb = corner_pos(x + bx, y + by, z + bz);
                    let t = ((iso - values[a]) / (values[b] - values[a])).clamp(0.0, 1.0);
                    acc += pa.lerp(pb, t);
                    count += 1;
                }
                cell_vertex[cell_idx(x, y, z)] = positions.len() as u32;
                positions.push((acc / count as f32).to_array());
            }
        }
    }

    let mut indices = Vec::new();
    let vertex = |x: usize, y: usize, z: usize| {
        let v = cell_vertex[cell_idx(x, y, z)];
        (v != u32::MAX).then_some(v)
    };
    let mut quad = |cells: [Option<u32>; 4], flip: bool| {
        if let [Some(a), Some(b), Some(c), Some(d)] = cells {
            if flip {
                indices.extend_from_slice(&[a, d, c, a, c, b]);
            } else {
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }
    };

    // Interior lattice edges only; each is shared by four cells.
    for z in 1..res {
        for y in 1..res {
            for x in 0..res {
                let (a, b) = (inside(x, y, z), inside(x + 1, y, z));
                if a != b {
                    quad(
                        [vertex(x, y - 1, z - 1), vertex(x, y, z - 1), vertex(x, y, z), vertex(x, y - 1, z)],
                        a,
                    );
                }
            }
        }
    }
    for z in 1..res {
        for y in 0..res {
            for x in 1..res {
                let (a, b) = (inside(x, y, z), inside(x, y + 1, z));
                if a != b {
                    quad(
                        [vertex(x - 1, y, z - 1), vertex(x - 1, y, z), vertex(x, y, z), vertex(x, y, z - 1)],
                        a,
                    );
                }
            }
        }
    }
    for z in 0..res {
        for y in 1..res {
            for x in 1..res {
                let (a, b) = (inside(x, y, z), inside(x, y, z + 1));
                if a != b {
                    quad(
                        [vertex(x - 1, y - 1, z), vertex(x, y - 1, z), vertex(x, y, z), vertex(x - 1, y, z)],
                        a,
                    );
                }
            }
        }
    }

    let h = step.min_element() * 0.5;
    let normals = positions
        .iter()
        .map(|p| {
            let p = Vec3::from(*p);
            let gradient = Vec3::new(
                f(p + Vec3::X * h) - f(p - Vec3::X * h),
                f(p + Vec3::Y * h) - f(p - Vec3::Y * h),
                f(p + Vec3::Z * h) - f(p - Vec3::Z * h),
            );
            (-gradient).normalize_or_zero().to_array()
        })
        .collect();

    log::debug!(
        "Surface nets: {} vertices, {} triangles at resolution {}",
        positions.len(),
        indices.len() / 3,
        res
    );
    MeshData::triangles(positions, normals, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_peaks_at_ball_center() {
        let balls = default_balls(0.5, 10.0);
        let center = field(&balls, balls[0].center);
        let off = field(&balls, balls[0].center + Vec3::splat(0.3));
        assert!(center > ISOLATION);
        assert!(off < center);
    }

    #[test]
    fn single_ball_surface_sits_at_expected_radius() {
        let ball = Metaball {
            center: Vec3::ZERO,
            strength: 2.0,
            subtract: 10.0,
        };
        let mesh = polygonize(&[ball], 48);
        assert!(mesh.triangle_count() > 50);

        // strength / r^2 - subtract == iso, in normalised units (half of world)
        let expected = 2.0 * (ball.strength / (ISOLATION + ball.subtract)).sqrt();
        let cell = 2.0 / 48.0;
        for p in &mesh.positions {
            let r = Vec3::from(*p).length();
            assert!((r - expected).abs() < cell * 1.5, "r = {r}, expected {expected}");
        }
    }

    #[test]
    fn normals_point_outward() {
        let ball = Metaball {
            center: Vec3::ZERO,
            strength: 2.0,
            subtract: 10.0,
        };
        let mesh = polygonize(&[ball], 32);
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!(Vec3::from(*p).dot(Vec3::from(*n)) > 0.0);
        }
    }

    #[test]
    fn weak_field_yields_no_surface() {
        let ball = Metaball {
            center: Vec3::ZERO,
            strength: 0.0,
            subtract: 10.0,
        };
        assert!(polygonize(&[ball], 16).is_empty());
    }
}
