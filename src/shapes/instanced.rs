use glam::{Mat4, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MIN_COUNT: usize = 100;
pub const MAX_COUNT: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Particle {
    t: f32,
    factor: f32,
    speed: f32,
    origin: Vec3,
}

/// Drifting sphere swarm. Each particle follows its own Lissajous-like path
/// around a random origin inside a `2 * spread` cube and pulses in size.
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    spread: f32,
}

impl ParticleField {
    pub fn new(count: usize, spread: f32, seed: u64) -> Self {
        let count = count.clamp(MIN_COUNT, MAX_COUNT);
        let mut rng = StdRng::seed_from_u64(seed);
        let particles = (0..count)
            .map(|_| Particle {
                t: rng.gen_range(0.0..100.0),
                factor: 20.0 + rng.gen_range(0.0..100.0),
                speed: 0.01 + rng.gen::<f32>() / 200.0,
                origin: Vec3::new(
                    rng.gen_range(-spread..=spread),
                    rng.gen_range(-spread..=spread),
                    rng.gen_range(-spread..=spread),
                ),
            })
            .collect();
        Self { particles, spread }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn spread(&self) -> f32 {
        self.spread
    }

    /// Advance every particle one frame and return their instance matrices.
    pub fn step(&mut self) -> Vec<Mat4> {
        self.particles
            .iter_mut()
            .map(|particle| {
                particle.t += particle.speed / 2.0;
                let (t, factor) = (particle.t, particle.factor);
                let s = t.cos() * 0.1;
                let position = particle.origin
                    + Vec3::new(
                        (t / 10.0 * factor).cos() + t.sin() * factor / 10.0,
                        (t / 10.0 * factor).sin() + (t * 2.0).cos() * factor / 10.0,
                        (t / 10.0 * factor).cos() + (t * 3.0).sin() * factor / 10.0,
                    );
                Mat4::from_scale_rotation_translation(Vec3::splat(s), Quat::IDENTITY, position)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_clamped() {
        assert_eq!(ParticleField::new(10, 10.0, 1).len(), MIN_COUNT);
        assert_eq!(ParticleField::new(9000, 10.0, 1).len(), MAX_COUNT);
        assert_eq!(ParticleField::new(1000, 10.0, 1).len(), 1000);
    }

    #[test]
    fn same_seed_gives_same_layout() {
        let mut a = ParticleField::new(200, 5.0, 7);
        let mut b = ParticleField::new(200, 5.0, 7);
        assert_eq!(a.step(), b.step());
    }

    #[test]
    fn particles_stay_near_their_cube() {
        let mut field = ParticleField::new(500, 10.0, 3);
        for _ in 0..10 {
            field.step();
        }
        // origin within spread, drift bounded by 1 + factor / 10 <= 13
        let limit = field.spread() + 13.0;
        for m in field.step() {
            let p = m.w_axis.truncate();
            assert!(p.abs().max_element() <= limit, "{p:?}");
        }
    }
}
