//! modelview - desktop 3D model viewer
//!
//! Opens glTF/GLB/OBJ files by picker or drag-and-drop, renders them with an
//! orbit camera and artistic material styles, and hosts three procedural
//! shape galleries. Rendering is wgpu behind an egui interface on winit 0.30.

mod app;
mod assets;
mod config;
mod geometry;
mod materials;
mod render;
mod scene;
mod shapes;
mod ui;
mod viewer;

use config::ViewerConfig;

fn main() {
    let loaded = ViewerConfig::load();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(loaded.config.log_filter.clone()),
    )
    .format_timestamp_millis()
    .init();

    match &loaded.source {
        Some(path) => log::info!("Config loaded from {}", path.display()),
        None => log::debug!("No config file, using defaults"),
    }
    if let Some(err) = &loaded.error {
        log::warn!("{}; using defaults", err);
    }

    if let Err(err) = app::run(loaded.config) {
        log::error!("Event loop error: {}", err);
        std::process::exit(1);
    }
}
