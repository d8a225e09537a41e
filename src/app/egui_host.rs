use winit::event::WindowEvent;
use winit::window::Window;

/// Tessellated egui output for one frame, ready for the renderer.
pub struct EguiFrameOutput {
    pub clipped_primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Bridges winit events into egui and runs the UI closure once per frame.
pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
    wants_keyboard: bool,
}

impl EguiHost {
    pub fn new(window: &Window, max_texture_side: usize) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            window.theme(),
            Some(max_texture_side),
        );
        Self {
            context,
            winit_state,
            wants_keyboard: false,
        }
    }

    /// Feed a window event to egui. Returns true when egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    /// Whether a text field had focus during the last frame.
    pub fn wants_keyboard(&self) -> bool {
        self.wants_keyboard
    }

    pub fn run_ui<F>(&mut self, window: &Window, run_ui: F) -> EguiFrameOutput
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);
        self.wants_keyboard = self.context.wants_keyboard_input();
        let pixels_per_point = full_output.pixels_per_point;
        EguiFrameOutput {
            clipped_primitives: self.context.tessellate(full_output.shapes, pixels_per_point),
            textures_delta: full_output.textures_delta,
            pixels_per_point,
        }
    }
}
