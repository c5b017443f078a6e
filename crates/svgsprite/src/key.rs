//! Cache key derivation
//!
//! Key layout: `{hash}_{W}x{H}_{color}_{scale}_{antialias}_{aspect_mode}`
//! where `{hash}` is `{byte_len:x}-{fnv1a64:016x}` of the SVG source.

use std::fmt::Write;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Derives stable cache keys from render parameters
///
/// Pure: identical inputs always produce identical keys. Different SVG
/// sources can still collide on the 64-bit hash; the byte length in the
/// key makes that less likely but does not rule it out.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Build the cache key for one render request
    pub fn build(
        content: &str,
        width: u32,
        height: u32,
        color: &str,
        scale: f32,
        antialias: bool,
        aspect_mode: &str,
    ) -> String {
        let mut key = Self::content_hash(content);
        // Writing into a String cannot fail.
        let _ = write!(
            key,
            "_{}x{}_{}_{}_{}_{}",
            width, height, color, scale, antialias, aspect_mode
        );
        key
    }

    /// Hash of the SVG source as it appears in keys
    pub fn content_hash(content: &str) -> String {
        format!("{:x}-{:016x}", content.len(), fnv1a64(content.as_bytes()))
    }

    /// Rolling hash used by keys minted before the FNV scheme
    ///
    /// `h = h * 31 + unit` over UTF-16 code units with 32-bit signed
    /// wrap-around, then the absolute value in lower-case hex.
    pub fn legacy_hash(content: &str) -> String {
        let hash = content
            .encode_utf16()
            .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)));
        format!("{:x}", i64::from(hash).unsigned_abs())
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}
