//! Persisted settings for the takeoff tool.
//! Stored in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::calibration::{
    CalibrationEngine, CalibrationState, DEFAULT_PRECISION_DIGITS, DEFAULT_UNIT_LABEL,
};
use crate::client::{BackendConfig, DEFAULT_BASE_URL};
use crate::session::{SessionConfig, DEFAULT_PAGE_LOAD_TIMEOUT, DEFAULT_RENDER_ZOOM};

/// Settings errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot determine config directory")]
    NoConfigDir,
    #[error("Settings file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Render/extraction backend base URL
    pub backend_url: String,
    /// Page rasterization zoom
    pub render_zoom: f64,
    /// Page-load timeout in seconds
    pub page_load_timeout_secs: u64,
    /// Unit label for new sessions
    pub unit_label: String,
    /// Display precision for new sessions
    pub precision_digits: u8,
    /// Last calibration, restored on startup
    pub calibration: Option<CalibrationState>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BASE_URL.to_string(),
            render_zoom: DEFAULT_RENDER_ZOOM,
            page_load_timeout_secs: DEFAULT_PAGE_LOAD_TIMEOUT.as_secs(),
            unit_label: DEFAULT_UNIT_LABEL.to_string(),
            precision_digits: DEFAULT_PRECISION_DIGITS,
            calibration: None,
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "structural", "structural-takeoff")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults.
    pub fn load() -> Self {
        Self::settings_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load settings from `path`. Missing or unreadable files give defaults.
    pub fn load_from(path: &Path) -> Self {
        let loaded: Self = fs::read_to_string(path)
            .ok()
            .and_then(|content| match serde_json::from_str(&content) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    tracing::warn!("Ignoring unreadable settings {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();
        loaded.sanitized()
    }

    /// Replace out-of-range values with defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.backend_url.trim().is_empty() {
            self.backend_url = defaults.backend_url;
        }
        if !(self.render_zoom.is_finite() && self.render_zoom > 0.0) {
            self.render_zoom = defaults.render_zoom;
        }
        if self.page_load_timeout_secs == 0 {
            self.page_load_timeout_secs = defaults.page_load_timeout_secs;
        }
        if self.unit_label.trim().is_empty() {
            self.unit_label = defaults.unit_label;
        }
        if self.precision_digits > crate::transform::MAX_PRECISION_DIGITS {
            self.precision_digits = defaults.precision_digits;
        }
        self
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::default().with_base_url(self.backend_url.clone())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_render_zoom(self.render_zoom)
            .with_page_load_timeout(Duration::from_secs(self.page_load_timeout_secs))
    }

    /// Calibration engine for a new session: the saved calibration when it
    /// is still valid, otherwise an uncalibrated one with the saved unit.
    pub fn calibration_engine(&self) -> CalibrationEngine {
        if let Some(state) = &self.calibration {
            match CalibrationEngine::with_state(state.clone()) {
                Ok(engine) => return engine,
                Err(e) => tracing::warn!("Discarding saved calibration: {}", e),
            }
        }
        let state = CalibrationState::default()
            .with_unit_label(self.unit_label.clone())
            .with_precision_digits(self.precision_digits);
        CalibrationEngine::with_state(state).unwrap_or_default()
    }

    /// Remember the calibration of a finished session.
    pub fn remember_calibration(&mut self, state: &CalibrationState) {
        self.unit_label = state.unit_label.clone();
        self.precision_digits = state.precision_digits;
        self.calibration = state.is_calibrated().then(|| state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{Axis, CalibrationMode};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("structural-takeoff-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = AppSettings::load_from(&temp_path("does-not-exist.json"));
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn test_save_and_load_calibration() {
        let path = temp_path("roundtrip.json");
        let mut engine = CalibrationEngine::new();
        engine.apply_preset(6).unwrap();

        let mut settings = AppSettings::default();
        settings.remember_calibration(engine.state());
        settings.save_to(&path).unwrap();

        let loaded = AppSettings::load_from(&path);
        let restored = loaded.calibration_engine();
        assert_eq!(restored.state().mode, CalibrationMode::Preset);
        assert_eq!(restored.state(), engine.state());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_saved_factor_keeps_every_bit() {
        let path = temp_path("factor-bits.json");
        let mut engine = CalibrationEngine::new();
        engine.apply_manual("7", Axis::X).unwrap();
        let factor = engine.state().pixels_per_unit.unwrap();

        let mut settings = AppSettings::default();
        settings.remember_calibration(engine.state());
        settings.save_to(&path).unwrap();

        let restored = AppSettings::load_from(&path)
            .calibration
            .and_then(|state| state.pixels_per_unit)
            .unwrap();
        assert_eq!(restored.x.to_bits(), factor.x.to_bits());
        assert_eq!(restored.y.to_bits(), factor.y.to_bits());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_out_of_range_values_are_backfilled() {
        let path = temp_path("partial.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"backend_url": "", "render_zoom": -1.0, "page_load_timeout_secs": 0, "precision_digits": 9}"#,
        )
        .unwrap();

        let loaded = AppSettings::load_from(&path);
        assert_eq!(loaded, AppSettings::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_session_config() {
        let settings = AppSettings {
            render_zoom: 1.5,
            page_load_timeout_secs: 5,
            ..Default::default()
        };
        let config = settings.session_config();
        assert_eq!(config.render_zoom, 1.5);
        assert_eq!(config.page_load_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_uncalibrated_engine_uses_saved_unit() {
        let settings = AppSettings {
            unit_label: "m".to_string(),
            precision_digits: 3,
            ..Default::default()
        };
        let engine = settings.calibration_engine();
        assert!(!engine.state().is_calibrated());
        assert_eq!(engine.state().unit_label, "m");
        assert_eq!(engine.state().precision_digits, 3);
    }
}
