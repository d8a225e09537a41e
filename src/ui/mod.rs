//! Sidebar, tabs and dialogs. The UI only reads the scene store; every
//! change is returned as a [`UiAction`] for the app to apply.

use crate::assets::loader::ModelStats;
use crate::materials::{parse_hex, rgb_to_hex, ArtisticStyle, MaterialOverride, SurfacePreset};
use crate::render::camera::{OrbitCamera, ViewPreset};
use crate::render::lighting::{EnvironmentPreset, Light, LightRig};
use crate::render::viewport::show_viewport;
use crate::scene::{ModelTransform, Scene, SceneId, SceneStore, UploadMode};
use crate::shapes::advanced::{GeneratorParams, MetaballParams, SwarmParams};
use crate::shapes::instanced;
use crate::shapes::{
    AdvancedGallery, AdvancedMode, ArtisticForm, ArtisticGallery, Gallery, GeneratorShape,
    GeometricGallery, GeometricShape, WireframeBase,
};
use crate::viewer::{Gizmo, GizmoMode, Viewer, ViewerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Models,
    Shapes,
    Artistic,
    Advanced,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Models, Tab::Shapes, Tab::Artistic, Tab::Advanced];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Models => "Models",
            Tab::Shapes => "Shapes",
            Tab::Artistic => "Artistic",
            Tab::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    OpenFilePicker,
    SelectScene(SceneId),
    DeleteScene(SceneId),
    /// Drop every scene and reset the model camera.
    ResetScene,
    SetStyle(SceneId, ArtisticStyle),
    SetTransform(SceneId, ModelTransform),
    SetMaterial {
        scene: SceneId,
        name: String,
        value: MaterialOverride,
    },
    CameraInteractionEnded,
    ToggleFullscreen,
}

/// Everything the UI draws from or edits in place for one frame.
pub struct Workspace<'a> {
    pub store: &'a SceneStore,
    pub viewer: &'a mut Viewer,
    pub upload_mode: &'a mut UploadMode,
    pub geometric: &'a mut GeometricGallery,
    pub artistic: &'a mut ArtisticGallery,
    pub advanced: &'a mut AdvancedGallery,
    /// Seconds since start-up, drives gallery animation.
    pub time: f32,
}

pub struct UiState {
    pub tab: Tab,
    pending_delete: Option<SceneId>,
    selected_material: Option<String>,
    show_model_info: bool,
    fullscreen: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            tab: Tab::default(),
            pending_delete: None,
            selected_material: None,
            show_model_info: true,
            fullscreen: false,
        }
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn show(&mut self, ctx: &egui::Context, ws: Workspace<'_>) -> Vec<UiAction> {
        let mut actions = Vec::new();

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for tab in Tab::ALL {
                    ui.selectable_value(&mut self.tab, tab, tab.label());
                }
                ui.separator();
                let label = if self.fullscreen { "Exit fullscreen" } else { "Fullscreen" };
                if ui.button(label).clicked() {
                    actions.push(UiAction::ToggleFullscreen);
                }
            });
        });

        match self.tab {
            Tab::Models => self.models_tab(ctx, ws.store, ws.viewer, ws.upload_mode, &mut actions),
            Tab::Shapes => {
                sidebar(ctx, "shapes_sidebar", |ui| geometric_controls(ui, ws.geometric));
                gallery_viewport(ctx, ws.geometric, ws.time);
            }
            Tab::Artistic => {
                sidebar(ctx, "artistic_sidebar", |ui| artistic_controls(ui, ws.artistic));
                gallery_viewport(ctx, ws.artistic, ws.time);
            }
            Tab::Advanced => {
                sidebar(ctx, "advanced_sidebar", |ui| advanced_controls(ui, ws.advanced));
                gallery_viewport(ctx, ws.advanced, ws.time);
            }
        }

        self.delete_dialog(ctx, ws.store, &mut actions);
        actions
    }

    fn models_tab(
        &mut self,
        ctx: &egui::Context,
        store: &SceneStore,
        viewer: &mut Viewer,
        upload_mode: &mut UploadMode,
        actions: &mut Vec<UiAction>,
    ) {
        sidebar(ctx, "models_sidebar", |ui| {
            ui.heading("Models");
            ui.horizontal(|ui| {
                if ui.button("Open model…").clicked() {
                    actions.push(UiAction::OpenFilePicker);
                }
                ui.label("Mode:");
                for mode in [UploadMode::Replace, UploadMode::Add] {
                    ui.selectable_value(upload_mode, mode, mode.label());
                }
            });
            ui.small("Drop a .glb, .gltf or .obj file onto the window.");
            ui.separator();

            self.scene_list(ui, store, actions);
            if !store.is_empty() && ui.button("Reset scene").clicked() {
                actions.push(UiAction::ResetScene);
            }

            if let Some(scene) = store.current() {
                ui.separator();
                style_picker(ui, scene, actions);
                ui.separator();
                self.material_editor(ui, scene, actions);
                ui.separator();
                transform_editor(ui, scene, &mut viewer.gizmo, actions);
                ui.separator();
                ui.checkbox(&mut self.show_model_info, "Model information");
                if self.show_model_info {
                    model_info(ui, scene, viewer.status(), viewer.stats().as_ref());
                }
            }

            ui.separator();
            camera_bar(ui, &mut viewer.camera, &ViewPreset::VIEWER);
            ui.checkbox(&mut viewer.show_grid, "Grid");
            egui::CollapsingHeader::new("Lighting").show(ui, |ui| lights_panel(ui, &mut viewer.lights));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let rect = ui.available_rect_before_wrap();
            let list = viewer.draw_list(store);
            let interaction = show_viewport(ui, &mut viewer.camera, list);
            if interaction.ended {
                actions.push(UiAction::CameraInteractionEnded);
            }
            let hint = match viewer.status() {
                ViewerStatus::Empty => Some("Drop a 3D model here or use Open model…".to_string()),
                ViewerStatus::Loading => Some("Loading…".to_string()),
                ViewerStatus::Unavailable { message, .. } => Some(message.to_string()),
                ViewerStatus::Ready => None,
            };
            if let Some(hint) = hint {
                ui.painter().text(
                    rect.center_bottom() - egui::vec2(0.0, 24.0),
                    egui::Align2::CENTER_CENTER,
                    hint,
                    egui::FontId::proportional(16.0),
                    egui::Color32::from_gray(200),
                );
            }
        });
    }

    fn scene_list(&mut self, ui: &mut egui::Ui, store: &SceneStore, actions: &mut Vec<UiAction>) {
        if store.is_empty() {
            ui.label("No models loaded.");
            return;
        }
        let current = store.current_id();
        for scene in store.scenes() {
            ui.horizontal(|ui| {
                let selected = current == Some(scene.id);
                if ui.selectable_label(selected, &scene.name).clicked() && !selected {
                    actions.push(UiAction::SelectScene(scene.id));
                }
                if ui.small_button("🗑").on_hover_text("Delete").clicked() {
                    self.pending_delete = Some(scene.id);
                }
            });
        }
    }

    fn material_editor(&mut self, ui: &mut egui::Ui, scene: &Scene, actions: &mut Vec<UiAction>) {
        ui.label("Materials");
        if scene.materials.is_empty() {
            ui.small("No materials yet.");
            return;
        }
        let selected = self
            .selected_material
            .as_ref()
            .filter(|name| scene.materials.contains_key(*name))
            .cloned()
            .or_else(|| scene.materials.keys().next().cloned());
        let Some(name) = selected else {
            return;
        };
        egui::ComboBox::from_id_salt("material_select")
            .selected_text(name.as_str())
            .show_ui(ui, |ui| {
                for key in scene.materials.keys() {
                    if ui.selectable_label(*key == name, key).clicked() {
                        self.selected_material = Some(key.clone());
                    }
                }
            });
        let Some(current) = scene.materials.get(&name) else {
            return;
        };
        if scene.artistic_style != ArtisticStyle::Standard {
            ui.small("Overrides apply with the Standard style.");
        }

        let mut value = current.clone();
        let mut changed = false;
        let mut rgb = value.rgb();
        ui.horizontal(|ui| {
            ui.label("Color");
            if color_picker(ui, &mut rgb) {
                value.color = rgb_to_hex(rgb);
                changed = true;
            }
            ui.monospace(format!("#{}", value.color));
        });
        changed |= ui
            .add(egui::Slider::new(&mut value.metalness, 0.0..=1.0).text("Metalness"))
            .changed();
        changed |= ui
            .add(egui::Slider::new(&mut value.roughness, 0.0..=1.0).text("Roughness"))
            .changed();
        changed |= ui.checkbox(&mut value.wireframe, "Wireframe").changed();
        if changed {
            actions.push(UiAction::SetMaterial {
                scene: scene.id,
                name,
                value,
            });
        }
    }

    fn delete_dialog(&mut self, ctx: &egui::Context, store: &SceneStore, actions: &mut Vec<UiAction>) {
        let Some(id) = self.pending_delete else {
            return;
        };
        let Some(scene) = store.get(id) else {
            self.pending_delete = None;
            return;
        };
        egui::Window::new("Delete model?")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!("Remove '{}' from this session?", scene.name));
                ui.horizontal(|ui| {
                    if ui.button("Delete").clicked() {
                        actions.push(UiAction::DeleteScene(id));
                        self.pending_delete = None;
                    }
                    if ui.button("Cancel").clicked() {
                        self.pending_delete = None;
                    }
                });
            });
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

fn sidebar(ctx: &egui::Context, id: &'static str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::SidePanel::left(id)
        .resizable(true)
        .default_width(300.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, add_contents);
        });
}

fn gallery_viewport(ctx: &egui::Context, gallery: &mut dyn Gallery, time: f32) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.strong(gallery.title());
            ui.separator();
            let presets = gallery.view_presets();
            camera_bar(ui, gallery.camera_mut(), presets);
        });
        let list = gallery.draw_list(time);
        show_viewport(ui, gallery.camera_mut(), list);
    });
}

/// Preset buttons plus the projection toggle.
fn camera_bar(ui: &mut egui::Ui, camera: &mut OrbitCamera, presets: &[ViewPreset]) {
    ui.horizontal_wrapped(|ui| {
        for preset in presets {
            if ui.small_button(preset.label()).clicked() {
                camera.apply_preset(*preset);
            }
        }
        let next = camera.projection.toggled();
        if ui
            .small_button(next.label())
            .on_hover_text("Switch projection")
            .clicked()
        {
            camera.projection = next;
        }
    });
}

fn style_picker(ui: &mut egui::Ui, scene: &Scene, actions: &mut Vec<UiAction>) {
    let mut style = scene.artistic_style;
    egui::ComboBox::from_label("Style")
        .selected_text(style.label())
        .show_ui(ui, |ui| {
            for candidate in ArtisticStyle::ALL {
                ui.selectable_value(&mut style, candidate, candidate.label());
            }
        });
    if style != scene.artistic_style {
        actions.push(UiAction::SetStyle(scene.id, style));
    }
}

fn transform_editor(ui: &mut egui::Ui, scene: &Scene, gizmo: &mut Gizmo, actions: &mut Vec<UiAction>) {
    ui.checkbox(&mut gizmo.enabled, "Enable transform gizmo");
    if !gizmo.enabled {
        return;
    }
    ui.horizontal(|ui| {
        for mode in GizmoMode::ALL {
            ui.selectable_value(&mut gizmo.mode, mode, mode.label());
        }
    });
    let mut transform = scene.transform;
    let speed = match gizmo.mode {
        GizmoMode::Translate => 0.05,
        GizmoMode::Rotate => 1.0,
        GizmoMode::Scale => 0.01,
    };
    let mut changed = false;
    ui.horizontal(|ui| {
        for (axis, value) in ["X", "Y", "Z"].into_iter().zip(gizmo.mode.component(&mut transform)) {
            ui.label(axis);
            let mut drag = egui::DragValue::new(value).speed(speed);
            if gizmo.mode == GizmoMode::Scale {
                drag = drag.range(0.01..=100.0);
            }
            changed |= ui.add(drag).changed();
        }
    });
    if ui
        .add_enabled(!transform.is_identity(), egui::Button::new("Reset transform"))
        .clicked()
    {
        transform = ModelTransform::IDENTITY;
        changed = true;
    }
    if changed {
        actions.push(UiAction::SetTransform(scene.id, transform));
    }
}

fn model_info(ui: &mut egui::Ui, scene: &Scene, status: ViewerStatus<'_>, stats: Option<&ModelStats>) {
    egui::Grid::new("model_info").num_columns(2).show(ui, |ui| {
        ui.label("File");
        ui.label(&scene.name);
        ui.end_row();
        ui.label("Type");
        ui.label(&scene.mime_type);
        ui.end_row();
        ui.label("Size");
        ui.label(format_size(scene.size));
        ui.end_row();
        ui.label("SHA-256");
        ui.monospace(&scene.digest);
        ui.end_row();
        if let Some(stats) = stats {
            ui.label("Format");
            ui.label(stats.format.label());
            ui.end_row();
            ui.label("Meshes");
            ui.label(stats.mesh_count.to_string());
            ui.end_row();
            ui.label("Vertices");
            ui.label(stats.vertex_count.to_string());
            ui.end_row();
            ui.label("Triangles");
            ui.label(stats.triangle_count.to_string());
            ui.end_row();
            ui.label("Materials");
            ui.label(stats.material_count.to_string());
            ui.end_row();
            let [x, y, z] = stats.dimensions;
            ui.label("Dimensions");
            ui.label(format!("{:.2} × {:.2} × {:.2}", x, y, z));
            ui.end_row();
        }
    });
    match status {
        ViewerStatus::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading…");
            });
        }
        ViewerStatus::Unavailable { message, .. } => {
            ui.colored_label(egui::Color32::LIGHT_RED, message);
        }
        ViewerStatus::Empty | ViewerStatus::Ready => {}
    }
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// sRGB colour button. Returns true when the colour changed.
fn color_picker(ui: &mut egui::Ui, rgb: &mut [f32; 3]) -> bool {
    let mut srgb = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    let changed = ui.color_edit_button_srgb(&mut srgb).changed();
    if changed {
        *rgb = srgb.map(|c| c as f32 / 255.0);
    }
    changed
}

fn hex_color_row(ui: &mut egui::Ui, label: &str, rgb: &mut [f32; 3]) {
    ui.horizontal(|ui| {
        ui.label(label);
        color_picker(ui, rgb);
        let mut hex = rgb_to_hex(*rgb);
        if ui
            .add(egui::TextEdit::singleline(&mut hex).desired_width(64.0))
            .changed()
        {
            if let Some(parsed) = parse_hex(&hex) {
                *rgb = parsed;
            }
        }
    });
}

fn light_row(ui: &mut egui::Ui, label: &str, light: &mut Light, max_intensity: f32, positioned: bool) {
    ui.horizontal(|ui| {
        ui.checkbox(&mut light.enabled, label);
        color_picker(ui, &mut light.color);
    });
    ui.add_enabled(
        light.enabled,
        egui::Slider::new(&mut light.intensity, 0.0..=max_intensity).text("Intensity"),
    );
    if positioned {
        ui.horizontal(|ui| {
            ui.label("Position");
            for axis in light.position.iter_mut() {
                ui.add_enabled(light.enabled, egui::DragValue::new(axis).speed(0.1));
            }
        });
    }
}

pub fn lights_panel(ui: &mut egui::Ui, rig: &mut LightRig) {
    light_row(ui, "Ambient", &mut rig.ambient, 2.0, false);
    light_row(ui, "Directional", &mut rig.directional, 3.0, true);
    for (index, point) in rig.points.iter_mut().enumerate() {
        light_row(ui, &format!("Point {}", index + 1), point, 5.0, true);
    }
    let selected = rig.environment.map(EnvironmentPreset::label).unwrap_or("None");
    egui::ComboBox::from_label("Environment")
        .selected_text(selected)
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut rig.environment, None, "None");
            for preset in EnvironmentPreset::ALL {
                ui.selectable_value(&mut rig.environment, Some(preset), preset.label());
            }
        });
}

fn geometric_controls(ui: &mut egui::Ui, gallery: &mut GeometricGallery) {
    ui.heading("Geometric Shapes");
    for shape in GeometricShape::ALL {
        ui.selectable_value(&mut gallery.shape, shape, shape.label())
            .on_hover_text(shape.description());
    }
    ui.separator();
    hex_color_row(ui, "Color", &mut gallery.color);
    ui.checkbox(&mut gallery.wireframe, "Wireframe");
    ui.add(egui::Slider::new(&mut gallery.metalness, 0.0..=1.0).text("Metalness"));
    ui.add(egui::Slider::new(&mut gallery.roughness, 0.0..=1.0).text("Roughness"));
    ui.separator();
    egui::CollapsingHeader::new("Lighting").show(ui, |ui| lights_panel(ui, gallery.lights_mut()));
}

fn artistic_controls(ui: &mut egui::Ui, gallery: &mut ArtisticGallery) {
    ui.heading("Artistic Shapes");
    for form in ArtisticForm::ALL {
        ui.selectable_value(&mut gallery.form, form, form.label())
            .on_hover_text(form.description());
    }
    ui.separator();
    hex_color_row(ui, "Color", &mut gallery.color);
    hex_color_row(ui, "Emissive", &mut gallery.emissive_color);
    ui.add(egui::Slider::new(&mut gallery.metalness, 0.0..=1.0).text("Metalness"));
    ui.add(egui::Slider::new(&mut gallery.roughness, 0.0..=1.0).text("Roughness"));
    ui.add(egui::Slider::new(&mut gallery.animation_speed, ArtisticGallery::SPEED_RANGE).text("Animation speed"));
    ui.add(egui::Slider::new(&mut gallery.glow_intensity, ArtisticGallery::GLOW_RANGE).text("Glow"));
    match gallery.form {
        ArtisticForm::Wireframe => {
            egui::ComboBox::from_label("Base shape")
                .selected_text(gallery.wireframe_base.label())
                .show_ui(ui, |ui| {
                    for base in WireframeBase::ALL {
                        ui.selectable_value(&mut gallery.wireframe_base, base, base.label());
                    }
                });
        }
        ArtisticForm::NeonGrid => {
            ui.add(egui::Slider::new(&mut gallery.grid_size, ArtisticGallery::GRID_RANGE).text("Grid size"));
        }
        ArtisticForm::LiquidMetal | ArtisticForm::Crystal => {}
    }
    ui.separator();
    egui::CollapsingHeader::new("Lighting").show(ui, |ui| lights_panel(ui, gallery.lights_mut()));
}

fn advanced_controls(ui: &mut egui::Ui, gallery: &mut AdvancedGallery) {
    ui.heading("Advanced Shapes");
    for mode in AdvancedMode::ALL {
        ui.selectable_value(&mut gallery.mode, mode, mode.label())
            .on_hover_text(mode.description());
    }
    ui.separator();
    hex_color_row(ui, "Color", &mut gallery.color);
    egui::ComboBox::from_label("Surface")
        .selected_text(gallery.surface.label())
        .show_ui(ui, |ui| {
            for preset in SurfacePreset::ALL {
                ui.selectable_value(&mut gallery.surface, preset, preset.label());
            }
        });
    ui.separator();

    match gallery.mode {
        AdvancedMode::Generator => {
            let params = &mut gallery.generator;
            egui::ComboBox::from_label("Shape")
                .selected_text(params.shape.label())
                .show_ui(ui, |ui| {
                    for shape in GeneratorShape::ALL {
                        ui.selectable_value(&mut params.shape, shape, shape.label());
                    }
                });
            ui.add(egui::Slider::new(&mut params.radius, GeneratorParams::RADIUS_RANGE).text("Radius"));
            ui.add(egui::Slider::new(&mut params.height, GeneratorParams::HEIGHT_RANGE).text("Height"));
            ui.add(egui::Slider::new(&mut params.segments, GeneratorParams::SEGMENT_RANGE).text("Segments"));
        }
        AdvancedMode::Parametric => {
            let formula = &mut gallery.formula;
            for (label, text) in [("x(t, s)", &mut formula.x), ("y(t, s)", &mut formula.y), ("z(t, s)", &mut formula.z)] {
                ui.label(label);
                ui.add(egui::TextEdit::singleline(text).code_editor());
            }
            ui.small("t ∈ [0, 2π], s ∈ [0, π]; sin, cos, tan, sqrt, abs, pow");
            ui.add(
                egui::Slider::new(&mut gallery.parametric_segments, AdvancedGallery::PARAMETRIC_SEGMENT_RANGE)
                    .text("Segments"),
            );
            if let Some(error) = gallery.formula_error() {
                ui.colored_label(egui::Color32::LIGHT_RED, format!("{} (showing default torus)", error));
            }
        }
        AdvancedMode::Metaballs => {
            let params = &mut gallery.metaballs;
            ui.add(egui::Slider::new(&mut params.strength, MetaballParams::STRENGTH_RANGE).text("Strength"));
            ui.add(egui::Slider::new(&mut params.subtract, MetaballParams::SUBTRACT_RANGE).text("Subtract"));
        }
        AdvancedMode::Instanced => {
            let params = &mut gallery.swarm;
            ui.add(
                egui::Slider::new(&mut params.count, instanced::MIN_COUNT..=instanced::MAX_COUNT)
                    .text("Instances")
                    .logarithmic(true),
            );
            ui.add(egui::Slider::new(&mut params.spread, SwarmParams::SPREAD_RANGE).text("Spread"));
        }
    }
    ui.separator();
    egui::CollapsingHeader::new("Lighting").show(ui, |ui| lights_panel(ui, gallery.lights_mut()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }

    #[test]
    fn tabs_have_distinct_labels() {
        let mut labels: Vec<_> = Tab::ALL.iter().map(|tab| tab.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Tab::ALL.len());
        assert_eq!(UiState::new().tab, Tab::Models);
    }
}
