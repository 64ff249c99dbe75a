//! Toolkit configuration
//!
//! Settings load from `forms.toml` and can be overridden by environment
//! variables. Every field has a default, so a partial file is fine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::Size;
use crate::input::DOUBLE_CLICK_TIME;
use crate::window::StartPosition;

/// Default configuration file, looked up in the current directory
pub const CONFIG_FILE: &str = "forms.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    pub input: InputConfig,
    pub window: WindowConfig,
}

/// Input translation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Maximum gap between two clicks that still counts as a double click
    pub double_click_ms: u64,
}

/// Initial window geometry and title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Client width in device-independent units
    pub width: i32,
    pub height: i32,
    pub title: String,
    pub start_position: StartPosition,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { double_click_ms: DOUBLE_CLICK_TIME.as_millis() as u64 }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 720,
            title: String::new(),
            start_position: StartPosition::CenterScreen,
        }
    }
}

impl InputConfig {
    pub fn double_click_time(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}

impl WindowConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height).clamped()
    }
}

impl FormsConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `forms.toml` from the current directory, or defaults if it is missing or invalid
    pub fn load_or_default() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_default()
    }

    /// Environment variables take precedence over file values
    pub fn merge_with_env(&mut self) {
        self.merge_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`; unparsable values are ignored
    pub fn merge_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup("FORMS_DOUBLE_CLICK_MS").and_then(|v| v.parse().ok()) {
            self.input.double_click_ms = ms;
        }
        if let Some(width) = lookup("FORMS_WINDOW_WIDTH").and_then(|v| v.parse().ok()) {
            self.window.width = width;
        }
        if let Some(height) = lookup("FORMS_WINDOW_HEIGHT").and_then(|v| v.parse().ok()) {
            self.window.height = height;
        }
        if let Some(position) = lookup("FORMS_START_POSITION").and_then(|v| v.parse().ok()) {
            self.window.start_position = position;
        }
    }

    /// `forms.toml` (or defaults) with environment overrides applied
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
