//! Viewer configuration.
//!
//! Configuration can be built programmatically, read from environment
//! variables, or loaded from a JSON file. Missing fields take their defaults.

use crate::layout::DEFAULT_PAGE_GAP;
use crate::scale::{DEFAULT_SCALE, DEFAULT_TICK_FACTOR, MAX_SCALE, MIN_SCALE};
use crate::window::DEFAULT_OVERSCAN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_OVERSCAN: &str = "PDFMASK_OVERSCAN";
pub const ENV_MIN_SCALE: &str = "PDFMASK_MIN_SCALE";
pub const ENV_MAX_SCALE: &str = "PDFMASK_MAX_SCALE";
pub const ENV_DEFAULT_SCALE: &str = "PDFMASK_DEFAULT_SCALE";
pub const ENV_ZOOM_DEBOUNCE_MS: &str = "PDFMASK_ZOOM_DEBOUNCE_MS";
pub const ENV_FRAME_INTERVAL_MS: &str = "PDFMASK_FRAME_INTERVAL_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Pages kept mounted on each side of the current page.
    pub overscan: u32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub default_scale: f32,
    /// Multiplier per zoom tick; must be greater than 1.
    pub tick_factor: f32,
    /// Quiet window before a zoom-triggered re-render starts.
    pub zoom_debounce_ms: u64,
    /// Minimum spacing of scroll processing ticks.
    pub frame_interval_ms: u64,
    /// Pixel gap between pages.
    pub page_gap: f32,
    /// Accept continuous zoom factors from pinch gestures.
    pub pinch_zoom: bool,
    /// Keep the point under the pointer still while zooming.
    pub anchor_to_pointer: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            overscan: DEFAULT_OVERSCAN,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            default_scale: DEFAULT_SCALE,
            tick_factor: DEFAULT_TICK_FACTOR,
            zoom_debounce_ms: 400,
            frame_interval_ms: 16,
            page_gap: DEFAULT_PAGE_GAP,
            pinch_zoom: true,
            anchor_to_pointer: true,
        }
    }
}

impl ViewerConfig {
    pub fn with_overscan(mut self, overscan: u32) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_scale_bounds(mut self, min: f32, max: f32) -> Self {
        self.min_scale = min;
        self.max_scale = max;
        self
    }

    pub fn with_default_scale(mut self, scale: f32) -> Self {
        self.default_scale = scale;
        self
    }

    pub fn with_tick_factor(mut self, factor: f32) -> Self {
        self.tick_factor = factor;
        self
    }

    pub fn with_zoom_debounce(mut self, debounce: Duration) -> Self {
        self.zoom_debounce_ms = debounce.as_millis() as u64;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_page_gap(mut self, gap: f32) -> Self {
        self.page_gap = gap;
        self
    }

    pub fn with_pinch_zoom(mut self, enabled: bool) -> Self {
        self.pinch_zoom = enabled;
        self
    }

    pub fn with_anchor_to_pointer(mut self, enabled: bool) -> Self {
        self.anchor_to_pointer = enabled;
        self
    }

    pub fn zoom_debounce(&self) -> Duration {
        Duration::from_millis(self.zoom_debounce_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Defaults overridden by environment variables.
    ///
    /// - `PDFMASK_OVERSCAN`
    /// - `PDFMASK_MIN_SCALE`, `PDFMASK_MAX_SCALE`, `PDFMASK_DEFAULT_SCALE`
    /// - `PDFMASK_ZOOM_DEBOUNCE_MS`, `PDFMASK_FRAME_INTERVAL_MS`
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the first variable that fails to parse,
    /// or [`ConfigError::Invalid`] if the result does not validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply the `PDFMASK_*` variables that are set on top of `self`, then validate.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        read_env(ENV_OVERSCAN, &mut self.overscan)?;
        read_env(ENV_MIN_SCALE, &mut self.min_scale)?;
        read_env(ENV_MAX_SCALE, &mut self.max_scale)?;
        read_env(ENV_DEFAULT_SCALE, &mut self.default_scale)?;
        read_env(ENV_ZOOM_DEBOUNCE_MS, &mut self.zoom_debounce_ms)?;
        read_env(ENV_FRAME_INTERVAL_MS, &mut self.frame_interval_ms)?;
        self.validate()?;
        Ok(self)
    }

    /// Load from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scales = [self.min_scale, self.max_scale, self.default_scale, self.tick_factor, self.page_gap];
        if scales.iter().any(|value| !value.is_finite()) {
            return Err(ConfigError::Invalid("scale settings must be finite".to_string()));
        }
        if self.min_scale <= 0.0 {
            return Err(ConfigError::Invalid(format!("min_scale must be positive, got {}", self.min_scale)));
        }
        if self.min_scale > self.max_scale {
            return Err(ConfigError::Invalid(format!(
                "min_scale {} exceeds max_scale {}",
                self.min_scale, self.max_scale
            )));
        }
        if self.tick_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "tick_factor must be greater than 1, got {}",
                self.tick_factor
            )));
        }
        if self.page_gap < 0.0 {
            return Err(ConfigError::Invalid(format!("page_gap must not be negative, got {}", self.page_gap)));
        }
        Ok(())
    }
}

fn read_env<T: FromStr>(name: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var(name) {
        *target = value.trim().parse().map_err(|_| ConfigError::InvalidValue(name.to_string()))?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
