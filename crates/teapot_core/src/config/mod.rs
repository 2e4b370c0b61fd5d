//! # Viewer Configuration
//!
//! Serializable settings for rendering, spatial indexing and camera control,
//! loadable from TOML or RON. Every section defaults to the stock viewer
//! behavior, so an empty file is a valid configuration.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::scene::Color;
use crate::spatial::AabbTreeConfig;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    ///
    /// # Errors
    /// Fails on I/O errors, parse errors and unknown file extensions.
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        match Format::of(path)? {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    ///
    /// # Errors
    /// Fails on I/O errors, serialization errors and unknown file extensions.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but make no sense
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Initial display modes and pass materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Draw everything as wireframe
    pub wireframe: bool,
    /// Enable lighting
    pub lighting: bool,
    /// Draw planar shadows under the scene
    pub shadows: bool,
    /// Clear to the background color each frame
    pub background: bool,
    /// Orthographic instead of perspective projection
    pub orthographic: bool,
    /// Sort and blend translucent batches
    pub translucency: bool,
    /// Draw the axis gizmo overlay
    pub axis_overlay: bool,
    /// Depth range shrink per translucent layer
    pub depth_bias_step: f32,
    /// Clear color
    pub background_color: Color,
    /// Flat color of the shadow pass
    pub shadow_color: Color,
    /// Wireframe color drawn over selected nodes
    pub selection_color: Color,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            wireframe: false,
            lighting: true,
            shadows: true,
            background: true,
            orthographic: false,
            translucency: true,
            axis_overlay: true,
            depth_bias_step: 0.0005,
            background_color: Color::rgb(0.8, 0.8, 0.85),
            shadow_color: Color::rgb(0.9, 0.9, 0.9),
            selection_color: Color::rgb(1.0, 0.6, 0.0),
        }
    }
}

/// Mouse and keyboard response of the orbit controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Pixels of drag per degree of rotation
    pub drag_divisor: f32,
    /// Zoom factor for a wheel step towards the user
    pub zoom_in_factor: f32,
    /// Zoom factor for a wheel step away from the user
    pub zoom_out_factor: f32,
    /// Key step as a fraction of the eye-to-center distance
    pub key_step_fraction: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            drag_divisor: 3.0,
            zoom_in_factor: 1.2,
            zoom_out_factor: 0.8,
            key_step_fraction: 0.01,
        }
    }
}

/// Top-level viewer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Display modes and pass materials
    pub render: RenderSettings,
    /// AABB tree tuning
    pub spatial: AabbTreeConfig,
    /// Camera controller response
    pub controller: ControllerConfig,
}

impl Config for ViewerConfig {}

impl ViewerConfig {
    /// Reject values the viewer cannot work with
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.drag_divisor <= 0.0 {
            return Err(ConfigError::Invalid("controller.drag_divisor must be positive".into()));
        }
        if self.controller.zoom_in_factor <= 0.0 || self.controller.zoom_out_factor <= 0.0 {
            return Err(ConfigError::Invalid("zoom factors must be positive".into()));
        }
        if self.spatial.split_threshold == 0 {
            return Err(ConfigError::Invalid("spatial.split_threshold must be at least 1".into()));
        }
        if self.render.depth_bias_step < 0.0 {
            return Err(ConfigError::Invalid("render.depth_bias_step must not be negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config: ViewerConfig = toml::from_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.spatial.split_threshold, 7);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ViewerConfig = toml::from_str(
            "[render]\nshadows = false\n\n[controller]\nzoom_in_factor = 1.5\n",
        )
        .unwrap();
        assert!(!config.render.shadows);
        assert!(config.render.lighting);
        assert!((config.controller.zoom_in_factor - 1.5).abs() < f32::EPSILON);
        assert!((config.controller.zoom_out_factor - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn save_and_load_both_formats() {
        let dir = std::env::temp_dir();
        let mut config = ViewerConfig::default();
        config.spatial.split_threshold = 3;
        config.render.orthographic = true;

        for name in ["teapot_viewer_test.toml", "teapot_viewer_test.ron"] {
            let path = dir.join(name);
            config.save_to_file(&path).unwrap();
            let loaded = ViewerConfig::load_from_file(&path).unwrap();
            assert_eq!(loaded, config);
            let _ = std::fs::remove_file(&path);
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = ViewerConfig::default().save_to_file("viewer.json").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn validation() {
        assert!(ViewerConfig::default().validate().is_ok());
        let mut bad = ViewerConfig::default();
        bad.spatial.split_threshold = 0;
        assert!(matches!(bad.validate(), Err(ConfigError::Invalid(_))));
    }
}
