use crate::scene::UploadMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "MODELVIEW_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "modelview.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting in {path}: {message}")]
    Invalid { path: String, message: String },
}

/// Start-up settings. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub title: String,
    pub window_size: [u32; 2],
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub upload_mode: UploadMode,
    /// Largest dimension of a model after fit-to-view.
    pub fit_target: f32,
    pub camera_position: [f32; 3],
    /// Upper bound on redraws per second; `None` redraws as fast as vsync allows.
    pub fps_cap: Option<u32>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "modelview".to_string(),
            window_size: [1400, 900],
            log_filter: "info".to_string(),
            upload_mode: UploadMode::Replace,
            fit_target: crate::assets::fit::DEFAULT_TARGET_SIZE,
            camera_position: [5.0, 5.0, 5.0],
            fps_cap: None,
        }
    }
}

/// Result of looking for a config file at start-up. Logging is not running
/// yet at that point, so problems are reported by the caller afterwards.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ViewerConfig,
    pub source: Option<PathBuf>,
    pub error: Option<ConfigError>,
}

impl ViewerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config: ViewerConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: display.clone(),
            source,
        })?;
        config.validate().map_err(|message| ConfigError::Invalid {
            path: display,
            message,
        })?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.window_size.contains(&0) {
            return Err(format!("window_size {:?} must be non-zero", self.window_size));
        }
        if !self.fit_target.is_finite() || self.fit_target <= 0.0 {
            return Err(format!("fit_target {} must be a positive number", self.fit_target));
        }
        if self.camera_position.iter().any(|v| !v.is_finite()) || self.camera_position == [0.0; 3] {
            return Err("camera_position must be finite and away from the origin".to_string());
        }
        if self.fps_cap == Some(0) {
            return Err("fps_cap must be at least 1".to_string());
        }
        Ok(())
    }

    /// Load from `$MODELVIEW_CONFIG`, else `./modelview.json` when present,
    /// else defaults. A broken file falls back to defaults.
    pub fn load() -> LoadedConfig {
        let explicit = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        Self::load_from(explicit, Path::new(DEFAULT_CONFIG_FILE))
    }

    fn load_from(explicit: Option<PathBuf>, fallback: &Path) -> LoadedConfig {
        let source = explicit.or_else(|| fallback.is_file().then(|| fallback.to_path_buf()));
        let Some(path) = source else {
            return LoadedConfig {
                config: Self::default(),
                source: None,
                error: None,
            };
        };
        match Self::from_file(&path) {
            Ok(config) => LoadedConfig {
                config,
                source: Some(path),
                error: None,
            },
            Err(err) => LoadedConfig {
                config: Self::default(),
                source: None,
                error: Some(err),
            },
        }
    }

    pub fn frame_interval(&self) -> Option<std::time::Duration> {
        self.fps_cap
            .map(|fps| std::time::Duration::from_secs_f64(1.0 / f64::from(fps.max(1))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("modelview_cfg_{}_{}_{}", std::process::id(), nanos, name))
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = temp_path("partial.json");
        std::fs::write(&path, r#"{ "title": "Inspector", "upload_mode": "add", "fps_cap": 30 }"#).unwrap();
        let config = ViewerConfig::from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.title, "Inspector");
        assert_eq!(config.upload_mode, UploadMode::Add);
        assert_eq!(config.window_size, ViewerConfig::default().window_size);
        assert_eq!(config.frame_interval(), Some(std::time::Duration::from_secs_f64(1.0 / 30.0)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let path = temp_path("unknown.json");
        std::fs::write(&path, r#"{ "tittle": "typo" }"#).unwrap();
        let result = ViewerConfig::from_file(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let path = temp_path("range.json");
        std::fs::write(&path, r#"{ "fit_target": -1.0 }"#).unwrap();
        let result = ViewerConfig::from_file(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let absent = temp_path("absent.json");
        let loaded = ViewerConfig::load_from(None, &absent);
        assert_eq!(loaded.config, ViewerConfig::default());
        assert!(loaded.source.is_none() && loaded.error.is_none());

        // An explicitly named file that is missing is reported.
        let loaded = ViewerConfig::load_from(Some(absent.clone()), &absent);
        assert_eq!(loaded.config, ViewerConfig::default());
        assert!(matches!(loaded.error, Some(ConfigError::Io { .. })));
    }

    #[test]
    fn fallback_file_is_used_when_present() {
        let path = temp_path("fallback.json");
        std::fs::write(&path, r#"{ "camera_position": [0.0, 2.0, 8.0] }"#).unwrap();
        let loaded = ViewerConfig::load_from(None, &path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.config.camera_position, [0.0, 2.0, 8.0]);
    }
}
