//! Rasterizer boundary and render request types
//!
//! Turning SVG markup into pixels is done by an external [`Rasterizer`];
//! the cache only decides when to call it and what to keep.

use std::future::Future;
use std::sync::Arc;

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::key::CacheKeyBuilder;

/// Converts SVG markup into texture handles
pub trait Rasterizer: Send + Sync + 'static {
    /// Handle to a rasterized texture, shared between the cache and callers
    type Texture: Clone + Send + Sync + 'static;

    /// Rasterize one request
    ///
    /// Fails with [`Error::Rasterization`] when the markup cannot be decoded
    /// or no drawing surface is available.
    fn rasterize(
        &self,
        request: &RenderRequest,
    ) -> impl Future<Output = Result<Self::Texture>> + Send;

    /// Release the resources behind a texture the cache no longer holds
    fn destroy(&self, texture: Self::Texture);
}

/// Fully resolved render parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// SVG source text
    pub content: Arc<str>,
    /// Logical width in pixels
    pub width: u32,
    /// Logical height in pixels
    pub height: u32,
    /// Tint color
    pub color: String,
    /// Resolution multiplier
    pub scale: f32,
    /// Whether edges are antialiased
    pub antialias: bool,
    /// How content is fitted to the target size, e.g. `xMidYMid meet`
    pub aspect_mode: String,
}

impl RenderRequest {
    /// Cache key for this request
    pub fn cache_key(&self) -> String {
        CacheKeyBuilder::build(
            &self.content,
            self.width,
            self.height,
            &self.color,
            self.scale,
            self.antialias,
            &self.aspect_mode,
        )
    }

    /// Pixel size of the bitmap once `scale` is applied (at least 1x1)
    pub fn target_size(&self) -> (u32, u32) {
        let scaled = |side: u32| ((side as f32 * self.scale).round() as u32).max(1);
        (scaled(self.width), scaled(self.height))
    }
}

/// Optional per-request overrides of the configured defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    /// Tint color
    pub color: Option<String>,
    /// Resolution multiplier
    pub scale: Option<f32>,
    /// Antialiasing
    pub antialias: Option<bool>,
    /// Aspect-ratio mode
    pub aspect_mode: Option<String>,
}

impl RenderOptions {
    /// Use every configured default
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the color
    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Override the scale
    #[must_use]
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Override antialiasing
    #[must_use]
    pub fn antialias(mut self, antialias: bool) -> Self {
        self.antialias = Some(antialias);
        self
    }

    /// Override the aspect-ratio mode
    #[must_use]
    pub fn aspect_mode(mut self, mode: impl Into<String>) -> Self {
        self.aspect_mode = Some(mode.into());
        self
    }

    /// Fill unset fields from `config` and validate the result
    pub fn resolve(
        self,
        content: &str,
        width: u32,
        height: u32,
        config: &CacheConfig,
    ) -> Result<RenderRequest> {
        if content.trim().is_empty() {
            return Err(Error::EmptyContent);
        }
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        let scale = self.scale.unwrap_or(config.default_scale);
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::InvalidScale(scale));
        }

        Ok(RenderRequest {
            content: Arc::from(content),
            width,
            height,
            color: self.color.unwrap_or_else(|| config.default_color.clone()),
            scale,
            antialias: self.antialias.unwrap_or(config.default_antialias),
            aspect_mode: self
                .aspect_mode
                .unwrap_or_else(|| config.default_aspect_mode.clone()),
        })
    }
}

/// One entry of a batch preload
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteRequest {
    /// SVG source text
    pub content: String,
    /// Logical width in pixels
    pub width: u32,
    /// Logical height in pixels
    pub height: u32,
    /// Overrides of the configured defaults
    pub options: RenderOptions,
}

impl SpriteRequest {
    /// Request with default options
    pub fn new(content: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            content: content.into(),
            width,
            height,
            options: RenderOptions::default(),
        }
    }

    /// Replace the overrides
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }
}
