//! TextureCache: capacity-bounded map from cache key to texture handle
//!
//! The store never destroys textures itself. Every operation that drops an
//! entry hands the texture back so the owner of the rasterizer can release
//! the GPU resource outside of any lock.

use crate::lru::LruList;

/// A cached texture and its estimated footprint
struct CacheEntry<T> {
    texture: T,
    bytes: u64,
}

/// Estimated bytes for an RGBA texture of the given size
pub fn estimate_bytes(width: u32, height: u32) -> u64 {
    u64::from(width) * u64::from(height) * 4
}

/// LRU-bounded texture store
pub struct TextureCache<T> {
    entries: LruList<String, CacheEntry<T>>,
    capacity: usize,
    lru_enabled: bool,
    memory_usage: u64,
}

impl<T: Clone> TextureCache<T> {
    /// Create a new store
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of textures while LRU is enabled
    /// * `lru_enabled` - Whether reaching capacity evicts entries
    pub fn new(capacity: usize, lru_enabled: bool) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            entries: LruList::with_capacity(capacity),
            capacity,
            lru_enabled,
            memory_usage: 0,
        }
    }

    /// Look up a texture, marking it most recently used when LRU is on
    pub fn get(&mut self, key: &str) -> Option<T> {
        if self.lru_enabled {
            self.entries.get(key).map(|entry| entry.texture.clone())
        } else {
            self.peek(key)
        }
    }

    /// Look up a texture without touching recency
    pub fn peek(&self, key: &str) -> Option<T> {
        self.entries.peek(key).map(|entry| entry.texture.clone())
    }

    /// Check whether a key is cached
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Store a texture at the most recently used position
    ///
    /// # Returns
    /// * Textures the caller must destroy: entries evicted to make room and
    ///   any texture previously stored under the same key
    pub fn insert(&mut self, key: String, texture: T, width: u32, height: u32) -> Vec<T> {
        let mut released = Vec::new();
        let bytes = estimate_bytes(width, height);

        if let Some(old) = self.entries.remove(key.as_str()) {
            self.memory_usage = self.memory_usage.saturating_sub(old.bytes);
            released.push(old.texture);
        } else if self.lru_enabled {
            // Make room for exactly one more entry
            released.extend(self.evict_to(self.capacity - 1));
        }

        self.memory_usage += bytes;
        self.entries.insert(key, CacheEntry { texture, bytes });
        released
    }

    /// Remove one entry; absent keys are a no-op
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let entry = self.entries.remove(key)?;
        self.memory_usage = self.memory_usage.saturating_sub(entry.bytes);
        Some(entry.texture)
    }

    /// Remove every entry
    pub fn clear(&mut self) -> Vec<T> {
        self.memory_usage = 0;
        self.entries
            .drain()
            .into_iter()
            .map(|(_, entry)| entry.texture)
            .collect()
    }

    /// Change the capacity, evicting down to it when LRU is on
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<T> {
        assert!(capacity > 0, "Capacity must be greater than 0");
        self.capacity = capacity;
        if self.lru_enabled {
            self.evict_to(capacity)
        } else {
            Vec::new()
        }
    }

    /// Turn LRU eviction on or off
    ///
    /// Turning it on while over capacity evicts down to capacity.
    pub fn set_lru_enabled(&mut self, enabled: bool) -> Vec<T> {
        self.lru_enabled = enabled;
        if enabled {
            self.evict_to(self.capacity)
        } else {
            Vec::new()
        }
    }

    /// Get the number of cached textures
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether LRU eviction is on
    pub fn lru_enabled(&self) -> bool {
        self.lru_enabled
    }

    /// Estimated texture memory in bytes
    pub fn memory_usage(&self) -> u64 {
        self.memory_usage
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    fn evict_to(&mut self, target: usize) -> Vec<T> {
        let mut evicted = Vec::new();
        while self.entries.len() > target {
            match self.entries.pop_lru() {
                Some((key, entry)) => {
                    tracing::trace!(key = %key, bytes = entry.bytes, "evicting texture");
                    self.memory_usage = self.memory_usage.saturating_sub(entry.bytes);
                    evicted.push(entry.texture);
                }
                None => break,
            }
        }
        evicted
    }
}
