use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunables for one board engine.
///
/// Deserialising is lenient: any field missing from the input keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Upper bound on paints per second.
    pub target_fps: f64,
    /// Maximum number of undo snapshots kept; the oldest is dropped first.
    pub history_limit: usize,
    /// Decoded images kept in the renderer cache.
    pub image_cache_capacity: usize,
    /// Colour of synthesised background layers.
    pub background_color: String,
    pub stroke_color: String,
    pub brush_size: f32,
    /// Minimum spacing between recorded stroke samples, in device pixels.
    pub min_sample_distance: f32,
    /// Arrow-key nudge, in device pixels; Shift uses the large step.
    pub nudge_step: f32,
    pub nudge_step_large: f32,
    /// Longest edge of uploaded thumbnails, in pixels.
    pub thumbnail_edge: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            target_fps: 30.0,
            history_limit: 100,
            image_cache_capacity: 64,
            background_color: crate::layer::DEFAULT_BACKGROUND_COLOR.to_string(),
            stroke_color: crate::color::DEFAULT_STROKE_COLOR.to_string(),
            brush_size: 4.0,
            min_sample_distance: 1.0,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
            thumbnail_edge: 256,
        }
    }
}

impl BoardConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()
    }

    /// Minimum time between two paints, in seconds.
    pub fn min_frame_interval(&self) -> f64 {
        1.0 / self.target_fps
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "target_fps must be positive, got {}",
                self.target_fps
            )));
        }
        if !(self.min_sample_distance.is_finite() && self.min_sample_distance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_sample_distance must be non-negative, got {}",
                self.min_sample_distance
            )));
        }
        if self.thumbnail_edge == 0 {
            return Err(ConfigError::Invalid("thumbnail_edge must be non-zero".into()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BoardConfig::from_json_str(r#"{"history_limit": 5}"#).unwrap();
        assert_eq!(config.history_limit, 5);
        assert_eq!(config.target_fps, 30.0);
        assert!((config.min_frame_interval() - 1.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(BoardConfig::from_json_str(r#"{"target_fps": 0}"#).is_err());
        assert!(BoardConfig::from_json_str("not json").is_err());
    }
}
