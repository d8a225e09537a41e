use crate::render::camera::CameraKeys;
use winit::keyboard::{KeyCode, PhysicalKey};

/// One-shot shortcuts triggered on key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    ResetView,
    ToggleProjection,
    ToggleFullscreen,
    /// A held camera key was let go.
    CameraKeyReleased,
}

#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    pub camera: CameraKeys,
}

impl InputState {
    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) -> InputAction {
        let PhysicalKey::Code(code) = key else {
            return InputAction::None;
        };
        let held = match code {
            KeyCode::ArrowLeft => Some(&mut self.camera.orbit_left),
            KeyCode::ArrowRight => Some(&mut self.camera.orbit_right),
            KeyCode::ArrowUp => Some(&mut self.camera.orbit_up),
            KeyCode::ArrowDown => Some(&mut self.camera.orbit_down),
            KeyCode::Equal | KeyCode::NumpadAdd | KeyCode::PageUp => Some(&mut self.camera.zoom_in),
            KeyCode::Minus | KeyCode::NumpadSubtract | KeyCode::PageDown => Some(&mut self.camera.zoom_out),
            _ => None,
        };
        if let Some(flag) = held {
            let was_held = std::mem::replace(flag, pressed);
            return if was_held && !pressed {
                InputAction::CameraKeyReleased
            } else {
                InputAction::None
            };
        }
        if !pressed {
            return InputAction::None;
        }
        match code {
            KeyCode::KeyR | KeyCode::Home => InputAction::ResetView,
            KeyCode::KeyP => InputAction::ToggleProjection,
            KeyCode::F11 => InputAction::ToggleFullscreen,
            _ => InputAction::None,
        }
    }

    /// Forget held keys, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.camera = CameraKeys::default();
    }
}
