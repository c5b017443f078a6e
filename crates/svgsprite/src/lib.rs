//! # svgsprite
//!
//! Texture cache for sprites rasterized from SVG markup.
//!
//! ## Architecture
//! - **Keys**: FNV-1a content hash + render parameters, deterministic
//! - **Store**: AHash map + index-linked recency list, O(1) LRU eviction
//! - **Service**: one shared [`SpriteCache`], coalescing concurrent misses
//!   so each key is rasterized at most once at a time
//! - **Rasterizer**: external backend behind the [`Rasterizer`] trait
//!
//! ## Example
//!
//! ```ignore
//! let cache = SpriteCache::init(CacheConfig::default(), MyRasterizer::new())?;
//! let texture = cache
//!     .get_sprite_frame(svg, 32, 32, RenderOptions::new().color("#ff0000"))
//!     .await?;
//! println!("hit rate: {:.1}%", cache.stats().hit_rate);
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod key;
mod lod;
mod lru;
mod raster;
mod service;
mod stats;
mod store;

pub use config::{CacheConfig, ConfigUpdate, DEFAULT_ASPECT_MODE, DEFAULT_COLOR, DEFAULT_MAX_CACHE_SIZE};
pub use error::{Error, Result};
pub use key::CacheKeyBuilder;
pub use lod::{LodLevel, LodPolicy};
pub use raster::{Rasterizer, RenderOptions, RenderRequest, SpriteRequest};
pub use service::SpriteCache;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{estimate_bytes, TextureCache};
