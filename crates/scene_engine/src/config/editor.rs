//! # Editor Configuration
//!
//! Settings for an editing session: frame clearing and aspect handling for the
//! rendering engine, pick sizing, the default camera and the log filter.
//!
//! Every section uses `#[serde(default)]`, so a file only needs to name the
//! values it changes:
//!
//! ```toml
//! log_level = "debug"
//!
//! [rendering]
//! preferred_renderer = "simple"
//! viewport_width = 1024
//! viewport_height = 768
//! ```

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::render::primitives::{Colour, ProjectionMode};

/// Rendering engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Colour the frame is cleared to
    pub clear_colour: Colour,
    /// Clear colour and depth at the start of every frame
    pub clears_buffers: bool,
    /// Keep the camera aspect ratio equal to the viewport's on resize
    pub synchronize_aspect_ratio: bool,
    /// Skip nodes whose bounds fall outside the camera frustum
    pub frustum_culling: bool,
    /// Initial viewport width in pixels
    pub viewport_width: u32,
    /// Initial viewport height in pixels
    pub viewport_height: u32,
    /// Registry key of the renderer used for the main scene pass
    pub preferred_renderer: Option<String>,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            clear_colour: Colour::BLACK,
            clears_buffers: true,
            synchronize_aspect_ratio: true,
            frustum_culling: true,
            viewport_width: 800,
            viewport_height: 600,
            preferred_renderer: None,
        }
    }
}

impl RenderingConfig {
    /// Set the clear colour
    pub fn with_clear_colour(mut self, colour: Colour) -> Self {
        self.clear_colour = colour;
        self
    }

    /// Enable or disable buffer clearing
    pub fn with_clears_buffers(mut self, enabled: bool) -> Self {
        self.clears_buffers = enabled;
        self
    }

    /// Enable or disable aspect ratio synchronisation
    pub fn with_synchronize_aspect_ratio(mut self, enabled: bool) -> Self {
        self.synchronize_aspect_ratio = enabled;
        self
    }

    /// Enable or disable frustum culling
    pub fn with_frustum_culling(mut self, enabled: bool) -> Self {
        self.frustum_culling = enabled;
        self
    }
}

/// Picking settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingConfig {
    /// Registry key of the picker used for scene and widget picking
    pub preferred_picker: Option<String>,
    /// Edge length in pixels of the area sampled by a click
    pub pick_size: u32,
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            preferred_picker: None,
            pick_size: 2,
        }
    }
}

/// Settings for cameras created by the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Width of the frame on the near plane
    pub frame_width: f32,
    /// Frame height divided by frame width
    pub frame_aspect_ratio: f32,
    /// Distance to the near clipping plane
    pub near_clipping_distance: f32,
    /// Distance to the far clipping plane
    pub far_clipping_distance: f32,
    /// Perspective or orthogonal projection
    pub projection: ProjectionMode,
    /// Distance along +Z at which a default camera is placed
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            frame_width: 0.1,
            frame_aspect_ratio: 0.75,
            near_clipping_distance: 0.1,
            far_clipping_distance: 1000.0,
            projection: ProjectionMode::Perspective,
            distance: 10.0,
        }
    }
}

/// Top-level editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Rendering engine settings
    pub rendering: RenderingConfig,
    /// Picking settings
    pub picking: PickingConfig,
    /// Default camera settings
    pub camera: CameraConfig,
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            rendering: RenderingConfig::default(),
            picking: PickingConfig::default(),
            camera: CameraConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Config for EditorConfig {}

impl EditorConfig {
    /// Load and validate a configuration file
    ///
    /// # Arguments
    /// * `path` - Path to a `.toml` or `.ron` file
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate().map_err(ConfigError::Invalid)?;
        log::info!("Loaded editor configuration from {}", path);
        Ok(config)
    }

    /// Replace the rendering section
    pub fn with_rendering(mut self, rendering: RenderingConfig) -> Self {
        self.rendering = rendering;
        self
    }

    /// Set the preferred scene renderer key
    pub fn with_preferred_renderer(mut self, key: impl Into<String>) -> Self {
        self.rendering.preferred_renderer = Some(key.into());
        self
    }

    /// Set the default log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let camera = &self.camera;
        if !(camera.frame_width > 0.0) {
            return Err(format!("camera.frame_width must be positive, got {}", camera.frame_width));
        }
        if !(camera.frame_aspect_ratio > 0.0) {
            return Err(format!(
                "camera.frame_aspect_ratio must be positive, got {}",
                camera.frame_aspect_ratio
            ));
        }
        if !(camera.near_clipping_distance > 0.0) {
            return Err("camera.near_clipping_distance must be positive".to_string());
        }
        if camera.near_clipping_distance >= camera.far_clipping_distance {
            return Err(format!(
                "camera near distance {} must be less than far distance {}",
                camera.near_clipping_distance, camera.far_clipping_distance
            ));
        }
        if self.rendering.viewport_width == 0 || self.rendering.viewport_height == 0 {
            return Err("rendering viewport must have a non-zero size".to_string());
        }
        if self.picking.pick_size == 0 {
            return Err("picking.pick_size must be at least 1".to_string());
        }
        Ok(())
    }
}
