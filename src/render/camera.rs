use crate::scene::CameraState;
use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

impl Projection {
    pub fn label(self) -> &'static str {
        match self {
            Projection::Perspective => "Perspective",
            Projection::Orthographic => "Orthographic",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Projection::Perspective => Projection::Orthographic,
            Projection::Orthographic => Projection::Perspective,
        }
    }
}

/// Canned camera placements, all looking at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPreset {
    Reset,
    Front,
    Back,
    Left,
    Right,
    Top,
    Bottom,
    Isometric,
    Side,
    Angle,
}

impl ViewPreset {
    pub const VIEWER: [ViewPreset; 8] = [
        ViewPreset::Reset,
        ViewPreset::Front,
        ViewPreset::Back,
        ViewPreset::Left,
        ViewPreset::Right,
        ViewPreset::Top,
        ViewPreset::Bottom,
        ViewPreset::Isometric,
    ];
    pub const GEOMETRIC: [ViewPreset; 8] = Self::VIEWER;
    pub const ARTISTIC: [ViewPreset; 5] = [
        ViewPreset::Reset,
        ViewPreset::Front,
        ViewPreset::Back,
        ViewPreset::Top,
        ViewPreset::Angle,
    ];
    pub const ADVANCED: [ViewPreset; 4] = [
        ViewPreset::Reset,
        ViewPreset::Front,
        ViewPreset::Top,
        ViewPreset::Side,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ViewPreset::Reset => "Reset",
            ViewPreset::Front => "Front",
            ViewPreset::Back => "Back",
            ViewPreset::Left => "Left",
            ViewPreset::Right => "Right",
            ViewPreset::Top => "Top",
            ViewPreset::Bottom => "Bottom",
            ViewPreset::Isometric => "Isometric",
            ViewPreset::Side => "Side",
            ViewPreset::Angle => "Angle",
        }
    }

    /// Eye position for this preset, `None` for [`ViewPreset::Reset`] which
    /// restores the saved pose instead.
    pub fn position(self, distance: f32) -> Option<Vec3> {
        let d = distance;
        match self {
            ViewPreset::Reset => None,
            ViewPreset::Front => Some(Vec3::new(0.0, 0.0, d)),
            ViewPreset::Back => Some(Vec3::new(0.0, 0.0, -d)),
            ViewPreset::Left => Some(Vec3::new(-d, 0.0, 0.0)),
            ViewPreset::Right | ViewPreset::Side => Some(Vec3::new(d, 0.0, 0.0)),
            ViewPreset::Top => Some(Vec3::new(0.0, d, 0.0)),
            ViewPreset::Bottom => Some(Vec3::new(0.0, -d, 0.0)),
            // [5, 5, 5] at the default distance of 6, scaled like the others
            ViewPreset::Isometric => Some(Vec3::splat(d * 5.0 / 6.0)),
            ViewPreset::Angle => Some(Vec3::new(d, d / 2.0, d)),
        }
    }
}

/// Arrow-key and zoom-key state held between key events.
#[derive(Debug, Default, Clone, Copy)]
pub struct CameraKeys {
    pub orbit_left: bool,
    pub orbit_right: bool,
    pub orbit_up: bool,
    pub orbit_down: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
}

/// Orbit camera around a target point with distance limits.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
    pub projection: Projection,
    pub min_distance: f32,
    pub max_distance: f32,
    pub preset_distance: f32,
    saved: (Vec3, Vec3),
}

const NEAR: f32 = 0.1;
const FAR: f32 = 500.0;
const ORBIT_SPEED: f32 = 0.008;
const KEY_ORBIT_SPEED: f32 = 1.8;
const MIN_POLAR: f32 = 0.001;

impl OrbitCamera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            fov_degrees: 50.0,
            projection: Projection::Perspective,
            min_distance: 0.5,
            max_distance: 100.0,
            preset_distance: 6.0,
            saved: (position, target),
        }
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov_degrees = fov_degrees;
        self
    }

    pub fn with_distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    pub fn with_preset_distance(mut self, distance: f32) -> Self {
        self.preset_distance = distance;
        self
    }

    pub fn reset(&mut self) {
        (self.position, self.target) = self.saved;
    }

    pub fn set_view(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    pub fn apply_preset(&mut self, preset: ViewPreset) {
        match preset.position(self.preset_distance) {
            Some(position) => self.set_view(position, Vec3::ZERO),
            None => self.reset(),
        }
        log::debug!("View preset {} -> {:?}", preset.label(), self.position);
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }

    /// Rotate around the target; `yaw` spins about world Y, `pitch` tilts
    /// toward the poles. Stops just short of the poles.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let offset = self.position - self.target;
        let radius = offset.length().max(1e-4);
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        theta -= yaw;
        phi = (phi - pitch).clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);
        let offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        self.position = self.target + offset;
    }

    /// Orbit by a pointer drag in screen points.
    pub fn orbit_drag(&mut self, delta: [f32; 2]) {
        self.orbit(delta[0] * ORBIT_SPEED, delta[1] * ORBIT_SPEED);
    }

    /// Translate target and eye together by a pointer drag, scaled so the
    /// point under the cursor follows it.
    pub fn pan(&mut self, delta: [f32; 2], viewport_height: f32) {
        let (_, right, up) = self.basis();
        let world_per_point = 2.0 * self.half_height() / viewport_height.max(1.0);
        let shift = (-right * delta[0] + up * delta[1]) * world_per_point;
        self.position += shift;
        self.target += shift;
    }

    /// Scale the eye distance by `factor` (< 1 moves closer).
    pub fn zoom(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let offset = self.position - self.target;
        let distance = (offset.length() * factor).clamp(self.min_distance, self.max_distance);
        self.position = self.target + offset.normalize_or(Vec3::Z) * distance;
    }

    pub fn update_keys(&mut self, keys: &CameraKeys, frame_dt: f32) -> bool {
        let step = KEY_ORBIT_SPEED * frame_dt;
        let mut yaw = 0.0;
        let mut pitch = 0.0;
        if keys.orbit_left {
            yaw -= step;
        }
        if keys.orbit_right {
            yaw += step;
        }
        if keys.orbit_up {
            pitch += step;
        }
        if keys.orbit_down {
            pitch -= step;
        }
        let mut changed = false;
        if yaw != 0.0 || pitch != 0.0 {
            self.orbit(yaw, pitch);
            changed = true;
        }
        if keys.zoom_in != keys.zoom_out {
            let rate = if keys.zoom_in { -1.5 } else { 1.5 };
            self.zoom((rate * frame_dt).exp());
            changed = true;
        }
        changed
    }

    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.position).normalize_or(Vec3::NEG_Z);
        let right = forward.cross(self.up_hint()).normalize_or(Vec3::X);
        let up = right.cross(forward);
        (forward, right, up)
    }

    fn up_hint(&self) -> Vec3 {
        let forward = (self.target - self.position).normalize_or(Vec3::NEG_Z);
        if forward.cross(Vec3::Y).length_squared() < 1e-8 {
            Vec3::NEG_Z
        } else {
            Vec3::Y
        }
    }

    fn half_height(&self) -> f32 {
        self.distance() * (self.fov_degrees.to_radians() * 0.5).tan()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up_hint())
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        match self.projection {
            Projection::Perspective => {
                Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect, NEAR, FAR)
            }
            Projection::Orthographic => {
                // Keeps the target plane the same size as in perspective.
                let h = self.half_height().max(1e-3);
                let w = h * aspect;
                Mat4::orthographic_rh(-w, w, -h, h, -FAR, FAR)
            }
        }
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Pose as position plus XYZ euler rotation of the camera frame.
    pub fn camera_state(&self) -> CameraState {
        let (forward, right, up) = self.basis();
        let rotation = Quat::from_mat3(&Mat3::from_cols(right, up, -forward));
        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        CameraState {
            position: self.position.to_array(),
            rotation: [x, y, z],
        }
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(Vec3::splat(5.0), Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn reset_restores_initial_pose() {
        let mut camera = OrbitCamera::default();
        camera.orbit(0.7, 0.3);
        camera.pan([40.0, -12.0], 600.0);
        camera.zoom(0.5);
        camera.reset();
        assert!(close(camera.position, Vec3::splat(5.0)));
        assert!(close(camera.target, Vec3::ZERO));
    }

    #[test]
    fn isometric_scales_with_preset_distance() {
        assert!(close(ViewPreset::Isometric.position(6.0).unwrap(), Vec3::splat(5.0)));
        let mut camera = OrbitCamera::new(Vec3::splat(5.0), Vec3::ZERO).with_preset_distance(12.0);
        camera.apply_preset(ViewPreset::Isometric);
        assert!(close(camera.position, Vec3::splat(10.0)));
    }

    #[test]
    fn presets_sit_at_preset_distance() {
        let mut camera = OrbitCamera::default();
        for preset in ViewPreset::VIEWER {
            camera.apply_preset(preset);
            if let Some(expected) = preset.position(6.0) {
                assert!(close(camera.position, expected), "{}", preset.label());
                assert_eq!(camera.target, Vec3::ZERO);
            }
        }
        camera.apply_preset(ViewPreset::Top);
        assert!(close(camera.position, Vec3::new(0.0, 6.0, 0.0)));
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn orbit_keeps_distance_and_avoids_poles() {
        let mut camera = OrbitCamera::default();
        let distance = camera.distance();
        camera.orbit(1.2, 10.0);
        assert!((camera.distance() - distance).abs() < 1e-3);
        let horizontal = Vec3::new(camera.position.x, 0.0, camera.position.z).length();
        assert!(horizontal > 0.0);
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn zoom_respects_limits() {
        let mut camera = OrbitCamera::default().with_distance_limits(2.0, 30.0);
        camera.zoom(0.001);
        assert!((camera.distance() - 2.0).abs() < 1e-4);
        camera.zoom(1000.0);
        assert!((camera.distance() - 30.0).abs() < 1e-3);
        camera.zoom(f32::NAN);
        assert!((camera.distance() - 30.0).abs() < 1e-3);
    }

    #[test]
    fn pan_moves_target_with_eye() {
        let mut camera = OrbitCamera::default();
        let offset = camera.position - camera.target;
        camera.pan([25.0, 10.0], 500.0);
        assert!(camera.target != Vec3::ZERO);
        assert!(close(camera.position - camera.target, offset));
    }

    #[test]
    fn camera_state_matches_look_direction() {
        let mut camera = OrbitCamera::default();
        camera.apply_preset(ViewPreset::Front);
        let state = camera.camera_state();
        assert_eq!(state.position, [0.0, 0.0, 6.0]);
        assert!(state.rotation.iter().all(|r| r.abs() < 1e-4));

        camera.apply_preset(ViewPreset::Right);
        let state = camera.camera_state();
        assert!((state.rotation[1] - std::f32::consts::FRAC_PI_2).abs() < 1e-2);
    }

    #[test]
    fn both_projections_are_finite() {
        let mut camera = OrbitCamera::default();
        assert!(camera.view_projection(16.0 / 9.0).is_finite());
        camera.projection = camera.projection.toggled();
        assert_eq!(camera.projection, Projection::Orthographic);
        assert!(camera.view_projection(0.0).is_finite());
    }

    #[test]
    fn keys_orbit_and_zoom() {
        let mut camera = OrbitCamera::default();
        let keys = CameraKeys {
            orbit_left: true,
            zoom_in: true,
            ..CameraKeys::default()
        };
        let before = camera.distance();
        assert!(camera.update_keys(&keys, 1.0 / 60.0));
        assert!(camera.distance() < before);
        assert!(!camera.update_keys(&CameraKeys::default(), 1.0 / 60.0));
    }
}
