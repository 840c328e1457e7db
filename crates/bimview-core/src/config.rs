//! Viewer configuration
//!
//! Everything tunable about how a model is framed and styled. The viewer ships a
//! `viewer.toml` with these defaults; every field may be omitted.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Rgb;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse viewer config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid viewer config: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub framing: FramingConfig,
    #[serde(default)]
    pub palette: PaletteConfig,
    #[serde(default)]
    pub batching: BatchingConfig,
    /// Categories with a fixed color/opacity
    #[serde(default = "default_categories", rename = "category")]
    pub categories: Vec<CategoryDefault>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            framing: FramingConfig::default(),
            palette: PaletteConfig::default(),
            batching: BatchingConfig::default(),
            categories: default_categories(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Post-load framing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramingConfig {
    /// Largest model dimension after rescaling
    #[serde(default = "default_target_size")]
    pub target_size: f32,
    /// Height of the model's lowest point above the ground plane
    #[serde(default = "default_ground_offset")]
    pub ground_offset: f32,
    /// Camera distance as a multiple of the bounding sphere radius
    #[serde(default = "default_camera_distance_factor")]
    pub camera_distance_factor: f32,
    /// Direction (x, y, z) of the camera from the model center
    #[serde(default = "default_camera_bias")]
    pub camera_bias: [f32; 3],
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            ground_offset: default_ground_offset(),
            camera_distance_factor: default_camera_distance_factor(),
            camera_bias: default_camera_bias(),
        }
    }
}

fn default_target_size() -> f32 {
    10.0
}

fn default_ground_offset() -> f32 {
    0.01
}

fn default_camera_distance_factor() -> f32 {
    2.2
}

fn default_camera_bias() -> [f32; 3] {
    [0.7, 0.5, 1.0]
}

/// Styling of categories that have no fixed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "default_half")]
    pub saturation: f32,
    #[serde(default = "default_half")]
    pub lightness: f32,
    /// Opacity given to generated categories
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Opacity restored when a category that started at 0 is switched on
    #[serde(default = "default_opacity")]
    pub restore_opacity: f32,
    #[serde(default)]
    pub fallback_color: Rgb,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            saturation: default_half(),
            lightness: default_half(),
            opacity: default_opacity(),
            restore_opacity: default_opacity(),
            fallback_color: Rgb::WHITE,
        }
    }
}

fn default_half() -> f32 {
    0.5
}

fn default_opacity() -> f32 {
    0.8
}

/// How element meshes are grouped into fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Elements above this vertex count get their own mesh
    #[serde(default = "default_max_item_vertices")]
    pub max_item_vertices: usize,
    /// Upper bound for a merged batch
    #[serde(default = "default_max_batch_vertices")]
    pub max_batch_vertices: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_item_vertices: default_max_item_vertices(),
            max_batch_vertices: default_max_batch_vertices(),
        }
    }
}

fn default_max_item_vertices() -> usize {
    2_048
}

fn default_max_batch_vertices() -> usize {
    65_536
}

/// A category with a fixed color and opacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDefault {
    pub name: String,
    pub color: Rgb,
    pub opacity: f32,
}

impl CategoryDefault {
    pub fn new(name: &str, color: Rgb, opacity: f32) -> Self {
        Self {
            name: name.to_string(),
            color,
            opacity,
        }
    }
}

fn default_categories() -> Vec<CategoryDefault> {
    vec![
        CategoryDefault::new("IFCSPACE", Rgb::new(0xaa, 0xaa, 0xaa), 0.1),
        CategoryDefault::new("IFCSLAB", Rgb::new(0xff, 0xa5, 0x00), 0.2),
        CategoryDefault::new("IFCWALL", Rgb::new(0xff, 0x69, 0xb4), 0.4),
        CategoryDefault::new("IFCBUILDINGELEMENTPROXY", Rgb::new(0xaa, 0xaa, 0xaa), 0.0),
    ]
}

impl ViewerConfig {
    /// Load and validate a configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let framing = &self.framing;
        if !(framing.target_size.is_finite() && framing.target_size > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "framing.target_size must be positive, got {}",
                framing.target_size
            )));
        }
        if !framing.ground_offset.is_finite() || !framing.camera_distance_factor.is_finite() {
            return Err(ConfigError::ValidationError(
                "framing values must be finite".to_string(),
            ));
        }
        if framing.camera_bias.iter().all(|c| *c == 0.0) {
            return Err(ConfigError::ValidationError(
                "framing.camera_bias must not be zero".to_string(),
            ));
        }

        check_opacity("palette.opacity", self.palette.opacity)?;
        check_opacity("palette.restore_opacity", self.palette.restore_opacity)?;
        if self.palette.restore_opacity == 0.0 {
            return Err(ConfigError::ValidationError(
                "palette.restore_opacity must be above zero".to_string(),
            ));
        }

        if self.batching.max_batch_vertices < self.batching.max_item_vertices {
            return Err(ConfigError::ValidationError(
                "batching.max_batch_vertices must be at least max_item_vertices".to_string(),
            ));
        }

        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "category name must not be empty".to_string(),
                ));
            }
            check_opacity(&format!("category {} opacity", category.name), category.opacity)?;
        }

        Ok(())
    }

    /// Fixed entry for a category, if any
    pub fn category(&self, name: &str) -> Option<&CategoryDefault> {
        self.categories.iter().find(|c| c.name == name)
    }
}

fn check_opacity(field: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(format!(
            "{} must be within 0..=1, got {}",
            field, value
        )))
    }
}
