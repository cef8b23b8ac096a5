//! Viewer configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub asset: AssetConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    /// Optional TOML part catalog replacing the built-in one
    #[serde(default)]
    pub catalog: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Model URL or path relative to the asset root
    #[serde(default = "default_asset_url")]
    pub url: String,
    /// Append a `v=<token>` query to the existence probe
    #[serde(default = "default_true")]
    pub cache_bust: bool,
    /// Run the HEAD-style existence probe before loading
    #[serde(default = "default_true")]
    pub probe: bool,
    /// Hard timeout on the full load, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f32,
    /// Largest bounding-box extent after normalization
    #[serde(default = "default_target_size")]
    pub target_size: f32,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            url: default_asset_url(),
            cache_bust: true,
            probe: true,
            timeout_secs: default_timeout_secs(),
            target_size: default_target_size(),
        }
    }
}

fn default_asset_url() -> String {
    "models/quadcopter.glb".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> f32 {
    20.0
}

fn default_target_size() -> f32 {
    2.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Maximum camera distance at which a marker may show
    #[serde(default = "default_proximity")]
    pub proximity_threshold: f32,
    /// Minimum dot(camera forward, direction to anchor)
    #[serde(default = "default_facing")]
    pub facing_threshold: f32,
    #[serde(default = "default_label_scale")]
    pub label_scale: f32,
    #[serde(default = "default_affordance_scale")]
    pub affordance_scale: f32,
    /// Vertical offset of the name marker above its anchor
    #[serde(default = "default_label_offset")]
    pub label_offset: f32,
    /// Vertical offset of the affordance marker (negative = below)
    #[serde(default = "default_affordance_offset")]
    pub affordance_offset: f32,
    /// Marker recomputations per second
    #[serde(default = "default_marker_rate")]
    pub update_hz: f32,
    /// Start with every name marker forced visible
    #[serde(default)]
    pub show_all: bool,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: default_proximity(),
            facing_threshold: default_facing(),
            label_scale: default_label_scale(),
            affordance_scale: default_affordance_scale(),
            label_offset: default_label_offset(),
            affordance_offset: default_affordance_offset(),
            update_hz: default_marker_rate(),
            show_all: false,
        }
    }
}

fn default_proximity() -> f32 {
    3.0
}

fn default_facing() -> f32 {
    0.3
}

fn default_label_scale() -> f32 {
    0.6
}

fn default_affordance_scale() -> f32 {
    0.45
}

fn default_label_offset() -> f32 {
    0.4
}

fn default_affordance_offset() -> f32 {
    -0.2
}

fn default_marker_rate() -> f32 {
    30.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Ray casts per second
    #[serde(default = "default_raycast_rate")]
    pub raycast_hz: f32,
    /// Max distance between a ray hit and the matched anchor
    #[serde(default = "default_hit_tolerance")]
    pub hit_tolerance: f32,
    /// Screen radius around an affordance marker, in logical pixels
    #[serde(default = "default_affordance_radius")]
    pub affordance_radius_px: f32,
    /// Pointer travel that turns a press into an orbit drag
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold_px: f32,
    /// Longest touch that still counts as a tap
    #[serde(default = "default_tap_ms")]
    pub tap_max_ms: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            raycast_hz: default_raycast_rate(),
            hit_tolerance: default_hit_tolerance(),
            affordance_radius_px: default_affordance_radius(),
            drag_threshold_px: default_drag_threshold(),
            tap_max_ms: default_tap_ms(),
        }
    }
}

fn default_raycast_rate() -> f32 {
    60.0
}

fn default_hit_tolerance() -> f32 {
    1.2
}

fn default_affordance_radius() -> f32 {
    40.0
}

fn default_drag_threshold() -> f32 {
    10.0
}

fn default_tap_ms() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_overview_position")]
    pub overview_position: [f32; 3],
    #[serde(default)]
    pub overview_target: [f32; 3],
    #[serde(default = "default_transition_secs")]
    pub transition_secs: f32,
    /// Auto-rotate rate in Overview, radians per second
    #[serde(default = "default_auto_rotate_speed")]
    pub auto_rotate_speed: f32,
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    /// Largest angle between +Y and the view offset, in radians
    #[serde(default = "default_max_polar")]
    pub max_polar_angle: f32,
    #[serde(default = "default_fov")]
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            overview_position: default_overview_position(),
            overview_target: [0.0; 3],
            transition_secs: default_transition_secs(),
            auto_rotate_speed: default_auto_rotate_speed(),
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            max_polar_angle: default_max_polar(),
            fov_degrees: default_fov(),
        }
    }
}

fn default_overview_position() -> [f32; 3] {
    [0.0, 1.0, 5.0]
}

fn default_transition_secs() -> f32 {
    1.0
}

fn default_auto_rotate_speed() -> f32 {
    // Half of a full turn per minute
    0.5 * std::f32::consts::TAU / 60.0
}

fn default_min_distance() -> f32 {
    2.0
}

fn default_max_distance() -> f32 {
    10.0
}

fn default_max_polar() -> f32 {
    std::f32::consts::PI / 1.5
}

fn default_fov() -> f32 {
    45.0
}

impl ViewerConfig {
    /// Parse from a TOML string and validate
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ViewerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {}", value),
                })
            }
        }

        if self.asset.url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "asset.url",
                reason: "must not be empty".to_string(),
            });
        }
        positive("asset.timeout_secs", self.asset.timeout_secs)?;
        positive("asset.target_size", self.asset.target_size)?;
        positive("markers.proximity_threshold", self.markers.proximity_threshold)?;
        positive("markers.update_hz", self.markers.update_hz)?;
        positive("interaction.raycast_hz", self.interaction.raycast_hz)?;
        positive("interaction.hit_tolerance", self.interaction.hit_tolerance)?;
        positive("camera.transition_secs", self.camera.transition_secs)?;
        positive("camera.min_distance", self.camera.min_distance)?;

        if self.camera.max_distance <= self.camera.min_distance {
            return Err(ConfigError::Invalid {
                field: "camera.max_distance",
                reason: format!(
                    "must exceed min_distance ({} <= {})",
                    self.camera.max_distance, self.camera.min_distance
                ),
            });
        }

        if !(-1.0..1.0).contains(&self.markers.facing_threshold) {
            return Err(ConfigError::Invalid {
                field: "markers.facing_threshold",
                reason: "must lie in [-1, 1)".to_string(),
            });
        }

        Ok(())
    }
}

/// Load configuration from file, falling back to defaults when absent
pub fn load_config(path: &Path) -> Result<ViewerConfig, ConfigError> {
    if !path.exists() {
        info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(ViewerConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = ViewerConfig::from_toml(&content)?;

    info!(path = %path.display(), model = %config.asset.url, "Loaded viewer configuration");
    Ok(config)
}
