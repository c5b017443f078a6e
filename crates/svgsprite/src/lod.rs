//! Level-of-detail scale selection
//!
//! Sprites far from the viewer are rasterized at a lower scale so they
//! share smaller textures. Each level maps a distance band to a scale;
//! the chosen scale becomes part of the cache key like any other override.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One distance band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Inclusive upper bound of the band
    pub max_distance: f32,
    /// Render scale used inside the band
    pub scale: f32,
}

/// Ordered set of distance bands
#[derive(Debug, Clone, PartialEq)]
pub struct LodPolicy {
    levels: Vec<LodLevel>,
}

impl Default for LodPolicy {
    fn default() -> Self {
        Self {
            levels: vec![
                LodLevel { max_distance: 256.0, scale: 1.0 },
                LodLevel { max_distance: 512.0, scale: 0.5 },
                LodLevel { max_distance: 1024.0, scale: 0.25 },
            ],
        }
    }
}

impl LodPolicy {
    /// Build a policy; levels are sorted by distance
    pub fn new(mut levels: Vec<LodLevel>) -> Result<Self> {
        if levels.is_empty() {
            return Err(Error::InvalidConfig("LOD policy has no levels".to_string()));
        }
        if let Some(level) = levels
            .iter()
            .find(|level| !(level.scale.is_finite() && level.scale > 0.0))
        {
            return Err(Error::InvalidScale(level.scale));
        }
        if levels.iter().any(|level| level.max_distance.is_nan()) {
            return Err(Error::InvalidConfig(
                "LOD distance must be a number".to_string(),
            ));
        }
        levels.sort_by(|a, b| a.max_distance.total_cmp(&b.max_distance));
        Ok(Self { levels })
    }

    /// Levels ordered from nearest to farthest
    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    /// Scale for a sprite at `distance`
    ///
    /// Beyond the last band the farthest level applies; a NaN distance is
    /// treated as nearest.
    pub fn select_scale(&self, distance: f32) -> f32 {
        if distance.is_nan() {
            return self.levels[0].scale;
        }
        self.levels
            .iter()
            .find(|level| distance <= level.max_distance)
            .or_else(|| self.levels.last())
            .map_or(1.0, |level| level.scale)
    }
}
