use crate::geometry::Aabb;
use glam::{Mat4, Vec3};

pub const DEFAULT_TARGET_SIZE: f32 = 4.0;

/// Centering offset and uniform scale that bring a model's bounds to
/// `target_size` along its longest axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub offset: Vec3,
    pub scale: f32,
}

impl FitTransform {
    pub const IDENTITY: FitTransform = FitTransform {
        offset: Vec3::ZERO,
        scale: 1.0,
    };

    pub fn from_bounds(bounds: &Aabb, target_size: f32) -> Self {
        let max_dim = bounds.max_dimension();
        let scale = if max_dim > 0.0 && max_dim.is_finite() {
            target_size / max_dim
        } else {
            1.0
        };
        Self {
            offset: -bounds.center(),
            scale,
        }
    }

    /// Translate first, then scale about the origin.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.scale)) * Mat4::from_translation(self.offset)
    }

    pub fn apply_to_bounds(&self, bounds: &Aabb) -> Aabb {
        Aabb::new(
            (bounds.min + self.offset) * self.scale,
            (bounds.max + self.offset) * self.scale,
        )
    }
}

/// Holds the fit for one loaded asset. The first call computes and stores
/// it; later calls hand back the stored value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FitGuard {
    applied: Option<FitTransform>,
}

impl FitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, bounds: Option<Aabb>, target_size: f32) -> FitTransform {
        if let Some(existing) = self.applied {
            log::trace!("Fit already applied; keeping {:?}", existing);
            return existing;
        }
        let fit = bounds
            .map(|b| FitTransform::from_bounds(&b, target_size))
            .unwrap_or(FitTransform::IDENTITY);
        log::debug!("Fit to view: offset {:?}, scale {:.4}", fit.offset, fit.scale);
        self.applied = Some(fit);
        fit
    }

    pub fn applied(&self) -> Option<FitTransform> {
        self.applied
    }

    pub fn matrix(&self) -> Mat4 {
        self.applied.map(|fit| fit.matrix()).unwrap_or(Mat4::IDENTITY)
    }
}
