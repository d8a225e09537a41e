pub mod egui_host;
mod input;
mod session;
mod timing;

use crate::assets::{pick_model_file, DropBatch};
use crate::config::ViewerConfig;
use crate::render::camera::OrbitCamera;
use crate::render::RenderContext;
use crate::shapes::{AdvancedGallery, ArtisticGallery, GeometricGallery};
use crate::ui::{Tab, UiAction, UiState, Workspace};
use egui_host::EguiHost;
use input::{InputAction, InputState};
use session::Session;
use timing::FrameTiming;

use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::error::EventLoopError;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

pub struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    render: Option<RenderContext>,
    egui: Option<EguiHost>,
    session: Session,
    ui: UiState,
    geometric: GeometricGallery,
    artistic: ArtisticGallery,
    advanced: AdvancedGallery,
    input: InputState,
    drops: DropBatch,
    timing: FrameTiming,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    fullscreen: bool,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            session: Session::new(&config),
            ui: UiState::new(),
            geometric: GeometricGallery::new(),
            artistic: ArtisticGallery::new(),
            advanced: AdvancedGallery::new(),
            input: InputState::default(),
            drops: DropBatch::new(),
            timing: FrameTiming::new(config.title.clone()),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
            fullscreen: false,
            window: None,
            render: None,
            egui: None,
            config,
        }
    }

    fn init_graphics(&mut self, window: Arc<Window>) -> Result<(), crate::render::RenderError> {
        let render = RenderContext::new(window.clone())?;
        self.egui = Some(EguiHost::new(&window, render.max_texture_side()));
        self.render = Some(render);
        self.window = Some(window);
        Ok(())
    }

    /// Frame cap from the config, else the monitor refresh rate.
    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(millihz) = window.current_monitor().and_then(|m| m.refresh_rate_millihertz()) {
            let hz = millihz as f32 / 1000.0;
            if hz > 1.0 {
                target = Duration::from_secs_f32(1.0 / hz);
            }
        }
        if let Some(capped) = self.config.frame_interval() {
            target = target.max(capped);
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn active_camera(&mut self) -> &mut OrbitCamera {
        match self.ui.tab {
            Tab::Models => &mut self.session.viewer.camera,
            Tab::Shapes => &mut self.geometric.camera,
            Tab::Artistic => &mut self.artistic.camera,
            Tab::Advanced => &mut self.advanced.camera,
        }
    }

    fn toggle_fullscreen(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        self.fullscreen = !self.fullscreen;
        window.set_fullscreen(self.fullscreen.then_some(Fullscreen::Borderless(None)));
        self.ui.set_fullscreen(self.fullscreen);
        log::debug!("Fullscreen {}", if self.fullscreen { "on" } else { "off" });
    }

    fn handle_input_action(&mut self, action: InputAction) {
        match action {
            InputAction::None => {}
            InputAction::ResetView => self.active_camera().reset(),
            InputAction::ToggleProjection => {
                let camera = self.active_camera();
                camera.projection = camera.projection.toggled();
            }
            InputAction::ToggleFullscreen => self.toggle_fullscreen(),
            InputAction::CameraKeyReleased => {
                if self.ui.tab == Tab::Models {
                    self.session.apply(UiAction::CameraInteractionEnded);
                }
            }
        }
    }

    fn handle_ui_action(&mut self, action: UiAction) {
        match action {
            UiAction::OpenFilePicker => {
                let Some(path) = pick_model_file() else {
                    return;
                };
                if let Err(err) = self.session.open_path(&path) {
                    log::error!("Rejected {}: {}", path.display(), err);
                }
            }
            UiAction::ToggleFullscreen => self.toggle_fullscreen(),
            other => self.session.apply(other),
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        self.timing.update(self.window.as_deref(), now);
        let time = self.timing.elapsed(now);
        let dt = self.timing.frame_dt;
        let keys = self.input.camera;
        self.active_camera().update_keys(&keys, dt);
        self.session.update();

        let (Some(window), Some(egui)) = (self.window.clone(), self.egui.as_mut()) else {
            return;
        };
        let mut actions = Vec::new();
        let frame = egui.run_ui(&window, |ctx| {
            actions = self.ui.show(
                ctx,
                Workspace {
                    store: &self.session.store,
                    viewer: &mut self.session.viewer,
                    upload_mode: &mut self.session.upload_mode,
                    geometric: &mut self.geometric,
                    artistic: &mut self.artistic,
                    advanced: &mut self.advanced,
                    time,
                },
            );
        });

        for action in actions {
            self.handle_ui_action(action);
        }

        if let Some(render) = &mut self.render {
            match render.render(frame) {
                Ok(render_ms) => self.timing.set_render_ms(render_ms),
                Err(err) => log::error!("Frame failed: {}", err),
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let [width, height] = self.config.window_size;
        let window_attrs = WindowAttributes::default()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };
        self.update_target_frame_duration(&window);
        if let Err(err) = self.init_graphics(window) {
            log::error!("Failed to initialise rendering: {}", err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let consumed = match (&self.window, &mut self.egui) {
            (Some(window), Some(egui)) => egui.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                event_loop.exit();
            }
            WindowEvent::Focused(false) => self.input.release_all(),
            WindowEvent::KeyboardInput { event, .. } => {
                if consumed && self.egui.as_ref().is_some_and(EguiHost::wants_keyboard) {
                    return;
                }
                let pressed = event.state == ElementState::Pressed;
                let action = self.input.handle_key(event.physical_key, pressed);
                self.handle_input_action(action);
            }
            WindowEvent::Resized(new_size) => {
                if let Some(render) = &mut self.render {
                    render.resize(new_size);
                }
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::HoveredFile(path) => {
                log::debug!("File hovering: {}", path.display());
            }
            WindowEvent::DroppedFile(path) => {
                log::info!("File dropped: {}", path.display());
                self.drops.push(path);
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // winit delivers one DroppedFile per file, so the batch is complete here
        if !self.drops.is_empty() {
            self.ui.tab = Tab::Models;
            self.session.open_dropped(&mut self.drops);
        }

        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run(config: ViewerConfig) -> Result<(), EventLoopError> {
    log::info!("Starting {}", config.title);
    log::info!("   Drop a .glb, .gltf or .obj file onto the window to view it");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    log::info!("Goodbye");
    Ok(())
}
