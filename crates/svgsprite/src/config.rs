//! Cache configuration
//!
//! [`CacheConfig`] is the full snapshot; [`ConfigUpdate`] carries a partial
//! change where every absent field leaves the current value untouched.

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of cached textures
pub const DEFAULT_MAX_CACHE_SIZE: usize = 100;

/// Default tint applied when a request names no color
pub const DEFAULT_COLOR: &str = "#ffffff";

/// Default aspect-ratio mode
pub const DEFAULT_ASPECT_MODE: &str = "xMidYMid meet";

/// Settings consumed by every cache operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached textures
    pub max_cache_size: usize,
    /// Color used when a request does not override it
    pub default_color: String,
    /// Render scale used when a request does not override it
    pub default_scale: f32,
    /// Antialiasing used when a request does not override it
    pub default_antialias: bool,
    /// Aspect-ratio mode used when a request does not override it
    pub default_aspect_mode: String,
    /// Evict least recently used entries at capacity
    ///
    /// With LRU disabled the capacity is advisory and nothing is evicted.
    pub enable_lru: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            default_color: DEFAULT_COLOR.to_string(),
            default_scale: 1.0,
            default_antialias: true,
            default_aspect_mode: DEFAULT_ASPECT_MODE.to_string(),
            enable_lru: true,
        }
    }
}

impl CacheConfig {
    /// Parse a configuration from JSON, filling absent fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check every field for a usable value
    pub fn validate(&self) -> Result<()> {
        if self.max_cache_size == 0 {
            return Err(Error::InvalidConfig(
                "max_cache_size must be greater than 0".to_string(),
            ));
        }
        if !(self.default_scale.is_finite() && self.default_scale > 0.0) {
            return Err(Error::InvalidScale(self.default_scale));
        }
        if self.default_color.trim().is_empty() {
            return Err(Error::InvalidConfig("default_color is empty".to_string()));
        }
        if self.default_aspect_mode.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "default_aspect_mode is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return a copy with `update` applied, validated as a whole
    ///
    /// `self` is left untouched when the result is invalid.
    pub fn merged(&self, update: &ConfigUpdate) -> Result<Self> {
        let mut next = self.clone();
        if let Some(size) = update.max_cache_size {
            next.max_cache_size = size;
        }
        if let Some(color) = &update.default_color {
            next.default_color = color.clone();
        }
        if let Some(scale) = update.default_scale {
            next.default_scale = scale;
        }
        if let Some(antialias) = update.default_antialias {
            next.default_antialias = antialias;
        }
        if let Some(mode) = &update.default_aspect_mode {
            next.default_aspect_mode = mode.clone();
        }
        if let Some(enable) = update.enable_lru {
            next.enable_lru = enable;
        }
        next.validate()?;
        Ok(next)
    }
}

/// Partial configuration change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    /// New capacity
    pub max_cache_size: Option<usize>,
    /// New default color
    pub default_color: Option<String>,
    /// New default scale
    pub default_scale: Option<f32>,
    /// New default antialiasing
    pub default_antialias: Option<bool>,
    /// New default aspect-ratio mode
    pub default_aspect_mode: Option<String>,
    /// Turn LRU eviction on or off
    pub enable_lru: Option<bool>,
}

impl ConfigUpdate {
    /// Create an update that changes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a partial update from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the capacity
    #[must_use]
    pub fn max_cache_size(mut self, size: usize) -> Self {
        self.max_cache_size = Some(size);
        self
    }

    /// Set the default color
    #[must_use]
    pub fn default_color(mut self, color: impl Into<String>) -> Self {
        self.default_color = Some(color.into());
        self
    }

    /// Set the default scale
    #[must_use]
    pub fn default_scale(mut self, scale: f32) -> Self {
        self.default_scale = Some(scale);
        self
    }

    /// Set the default antialiasing
    #[must_use]
    pub fn default_antialias(mut self, antialias: bool) -> Self {
        self.default_antialias = Some(antialias);
        self
    }

    /// Set the default aspect-ratio mode
    #[must_use]
    pub fn default_aspect_mode(mut self, mode: impl Into<String>) -> Self {
        self.default_aspect_mode = Some(mode.into());
        self
    }

    /// Turn LRU eviction on or off
    #[must_use]
    pub fn enable_lru(mut self, enable: bool) -> Self {
        self.enable_lru = Some(enable);
        self
    }
}
