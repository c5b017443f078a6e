//! Cache statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use serde::Serialize;

/// Counters for cache performance tracking
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    evictions: AtomicU64,
    inserts: AtomicU64,
    render_nanos: AtomicU64,
}

impl CacheStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a miss that joined a rasterization already in flight
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    /// Record evicted entries
    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record an insert
    pub fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Add time spent rasterizing
    pub fn record_render_time(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.render_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Get total hits
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get total misses
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Get total coalesced misses
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Get total evictions
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Get total inserts
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Get cumulative rasterization time
    pub fn render_time(&self) -> Duration {
        Duration::from_nanos(self.render_nanos.load(Ordering::Relaxed))
    }

    /// Calculate hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.coalesced.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.inserts.store(0, Ordering::Relaxed);
        self.render_nanos.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of the cache, as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Number of cached textures
    pub size: usize,
    /// Hit percentage (0.0 to 100.0), 0 before any request
    pub hit_rate: f64,
    /// Cumulative time spent rasterizing misses
    pub total_render_time: Duration,
    /// Estimated texture memory in bytes (RGBA, 4 bytes per pixel)
    pub memory_usage: u64,
    /// Lookups answered from the cache
    pub hit_count: u64,
    /// Lookups that were not
    pub miss_count: u64,
    /// Misses served by a rasterization another request started
    pub coalesced_count: u64,
    /// Entries dropped to stay within capacity
    pub eviction_count: u64,
    /// Textures stored after a successful rasterization
    pub insert_count: u64,
}

impl StatsSnapshot {
    /// Combine counters with the store's current size and memory estimate
    pub fn capture(stats: &CacheStats, size: usize, memory_usage: u64) -> Self {
        Self {
            size,
            hit_rate: stats.hit_ratio() * 100.0,
            total_render_time: stats.render_time(),
            memory_usage,
            hit_count: stats.hits(),
            miss_count: stats.misses(),
            coalesced_count: stats.coalesced(),
            eviction_count: stats.evictions(),
            insert_count: stats.inserts(),
        }
    }
}
