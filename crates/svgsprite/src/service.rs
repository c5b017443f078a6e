//! SpriteCache: process-wide SVG texture cache
//!
//! Request flow:
//! 1. Resolve overrides against the current [`CacheConfig`] and derive the key
//! 2. Hit: refresh recency and hand out the cached texture
//! 3. Miss with a rasterization already running for the key: wait for it
//! 4. Miss otherwise: rasterize, store (evicting if needed), wake waiters
//!
//! No lock is held across an `.await`. Textures leaving the store are
//! destroyed through the rasterizer after the store lock is released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use ahash::RandomState;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{CacheConfig, ConfigUpdate};
use crate::error::{Error, Result};
use crate::lod::LodPolicy;
use crate::raster::{Rasterizer, RenderOptions, RenderRequest, SpriteRequest};
use crate::stats::{CacheStats, StatsSnapshot};
use crate::store::TextureCache;

/// Outcome published to requests waiting on the same key; `None` until done
type Outcome<T> = Option<Result<T>>;

struct Inner<R: Rasterizer> {
    rasterizer: R,
    config: RwLock<CacheConfig>,
    store: Mutex<TextureCache<R::Texture>>,
    in_flight: Mutex<HashMap<String, watch::Sender<Outcome<R::Texture>>, RandomState>>,
    stats: CacheStats,
    closed: AtomicBool,
}

/// Shared handle to the sprite cache
///
/// Cloning is cheap and every clone sees the same cache. A host creates one
/// with [`SpriteCache::init`] and tears it down with [`SpriteCache::shutdown`].
pub struct SpriteCache<R: Rasterizer> {
    inner: Arc<Inner<R>>,
}

impl<R: Rasterizer> Clone for SpriteCache<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

enum Lookup<'a, R: Rasterizer> {
    Hit(R::Texture),
    Wait(watch::Receiver<Outcome<R::Texture>>),
    Render(FlightGuard<'a, R>),
}

/// Ownership of the single rasterization running for one key
///
/// Dropping it without completing (the owning future was cancelled) frees
/// the slot; waiters then see a closed channel and retry.
struct FlightGuard<'a, R: Rasterizer> {
    inner: &'a Inner<R>,
    key: String,
    completed: bool,
}

impl<R: Rasterizer> FlightGuard<'_, R> {
    fn complete(mut self, result: Result<R::Texture>) {
        self.completed = true;
        let sender = self.inner.in_flight.lock().remove(&self.key);
        if let Some(sender) = sender {
            sender.send_replace(Some(result));
        }
    }
}

impl<R: Rasterizer> Drop for FlightGuard<'_, R> {
    fn drop(&mut self) {
        if !self.completed {
            self.inner.in_flight.lock().remove(&self.key);
        }
    }
}

impl<R: Rasterizer> SpriteCache<R> {
    /// Create the cache
    ///
    /// # Arguments
    /// * `config` - Initial settings, validated up front
    /// * `rasterizer` - Backend producing and destroying textures
    pub fn init(config: CacheConfig, rasterizer: R) -> Result<Self> {
        config.validate()?;
        info!(
            max_cache_size = config.max_cache_size,
            enable_lru = config.enable_lru,
            "sprite cache initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                rasterizer,
                store: Mutex::new(TextureCache::new(config.max_cache_size, config.enable_lru)),
                config: RwLock::new(config),
                in_flight: Mutex::new(HashMap::default()),
                stats: CacheStats::new(),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Destroy every cached texture and refuse further requests
    ///
    /// Rasterizations still running are destroyed as soon as they finish and
    /// their callers get [`Error::Closed`].
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.clear_all();
        info!("sprite cache shut down");
    }

    /// Whether [`SpriteCache::shutdown`] has been called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// The rasterizer backing this cache
    pub fn rasterizer(&self) -> &R {
        &self.inner.rasterizer
    }

    /// Get the texture for an SVG, rasterizing it on a miss
    ///
    /// # Arguments
    /// * `content` - SVG source text
    /// * `width`, `height` - Logical size in pixels
    /// * `options` - Overrides of the configured defaults
    ///
    /// # Returns
    /// * The cached or freshly rasterized texture. Rasterization errors are
    ///   returned unchanged and nothing is cached for them.
    pub async fn get_sprite_frame(
        &self,
        content: &str,
        width: u32,
        height: u32,
        options: RenderOptions,
    ) -> Result<R::Texture> {
        self.ensure_open()?;
        let request = {
            let config = self.inner.config.read();
            options.resolve(content, width, height, &config)?
        };
        self.fetch(request).await
    }

    /// Get a texture whose scale is reduced according to viewing distance
    ///
    /// The band's scale multiplies the requested (or default) scale.
    pub async fn get_sprite_frame_lod(
        &self,
        content: &str,
        width: u32,
        height: u32,
        distance: f32,
        policy: &LodPolicy,
        options: RenderOptions,
    ) -> Result<R::Texture> {
        self.ensure_open()?;
        let request = {
            let config = self.inner.config.read();
            let base = options.scale.unwrap_or(config.default_scale);
            options
                .scale(base * policy.select_scale(distance))
                .resolve(content, width, height, &config)?
        };
        self.fetch(request).await
    }

    /// Fetch many sprites concurrently
    ///
    /// Results come back in request order. Requests sharing a key trigger a
    /// single rasterization.
    pub async fn preload(&self, requests: Vec<SpriteRequest>) -> Vec<Result<R::Texture>> {
        let count = requests.len();
        let mut tasks = JoinSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            let cache = self.clone();
            tasks.spawn(async move {
                let result = cache
                    .get_sprite_frame(
                        &request.content,
                        request.width,
                        request.height,
                        request.options,
                    )
                    .await;
                (index, result)
            });
        }

        let mut results: Vec<Option<Result<R::Texture>>> = (0..count).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(err) => warn!(error = %err, "preload task failed"),
            }
        }

        debug!(count, "preload finished");
        results
            .into_iter()
            .map(|result| {
                result.unwrap_or_else(|| Err(Error::rasterization("preload task did not complete")))
            })
            .collect()
    }

    /// Cache key a request would use under the current configuration
    pub fn cache_key(
        &self,
        content: &str,
        width: u32,
        height: u32,
        options: &RenderOptions,
    ) -> Result<String> {
        let config = self.inner.config.read();
        let request = options.clone().resolve(content, width, height, &config)?;
        Ok(request.cache_key())
    }

    /// Destroy every cached texture and reset all statistics
    pub fn clear_all(&self) {
        let released = self.inner.store.lock().clear();
        self.inner.stats.reset();
        info!(count = released.len(), "sprite cache cleared");
        self.destroy_all(released);
    }

    /// Destroy one cached texture
    ///
    /// # Returns
    /// * `true` if the key was cached; absent keys are a no-op
    pub fn clear_by_key(&self, key: &str) -> bool {
        let removed = self.inner.store.lock().remove(key);
        match removed {
            Some(texture) => {
                debug!(key, "sprite cache entry cleared");
                self.inner.rasterizer.destroy(texture);
                true
            }
            None => false,
        }
    }

    /// Snapshot of size, memory and counters
    pub fn stats(&self) -> StatsSnapshot {
        let (size, memory_usage) = {
            let store = self.inner.store.lock();
            (store.len(), store.memory_usage())
        };
        StatsSnapshot::capture(&self.inner.stats, size, memory_usage)
    }

    /// Apply a partial configuration change
    ///
    /// Shrinking the capacity evicts immediately while LRU is enabled. With
    /// LRU disabled the capacity is advisory and nothing is evicted.
    pub fn set_config(&self, update: ConfigUpdate) -> Result<()> {
        let released = {
            let mut config = self.inner.config.write();
            let next = config.merged(&update)?;
            let mut store = self.inner.store.lock();
            // Order matters: turning LRU off must happen before a shrink.
            let mut released = store.set_lru_enabled(next.enable_lru);
            released.extend(store.set_capacity(next.max_cache_size));
            *config = next;
            released
        };

        if !released.is_empty() {
            info!(evicted = released.len(), "capacity reduced");
            self.inner.stats.record_evictions(released.len());
        }
        self.destroy_all(released);
        Ok(())
    }

    /// Copy of the current configuration
    pub fn config(&self) -> CacheConfig {
        self.inner.config.read().clone()
    }

    async fn fetch(&self, request: RenderRequest) -> Result<R::Texture> {
        let key = request.cache_key();
        loop {
            match self.lookup(&key) {
                Lookup::Hit(texture) => {
                    debug!(key = %key, "sprite cache hit");
                    return Ok(texture);
                }
                Lookup::Wait(mut receiver) => {
                    debug!(key = %key, "joining in-flight rasterization");
                    let outcome = match receiver.wait_for(Option::is_some).await {
                        Ok(outcome) => (*outcome).clone(),
                        Err(_) => None,
                    };
                    match outcome {
                        Some(result) => return result,
                        // Owner was cancelled before finishing
                        None => continue,
                    }
                }
                Lookup::Render(flight) => return self.render(&request, flight).await,
            }
        }
    }

    fn lookup(&self, key: &str) -> Lookup<'_, R> {
        // Holding the in-flight lock across the store check means a finished
        // rasterization is always visible either in the store or as a flight.
        let mut in_flight = self.inner.in_flight.lock();

        let cached = self.inner.store.lock().get(key);
        if let Some(texture) = cached {
            self.inner.stats.record_hit();
            return Lookup::Hit(texture);
        }
        self.inner.stats.record_miss();

        if let Some(sender) = in_flight.get(key) {
            self.inner.stats.record_coalesced();
            return Lookup::Wait(sender.subscribe());
        }

        let (sender, _) = watch::channel(None);
        in_flight.insert(key.to_string(), sender);
        Lookup::Render(FlightGuard {
            inner: &*self.inner,
            key: key.to_string(),
            completed: false,
        })
    }

    async fn render(&self, request: &RenderRequest, flight: FlightGuard<'_, R>) -> Result<R::Texture> {
        debug!(key = %flight.key, width = request.width, height = request.height, "sprite cache miss, rasterizing");

        let started = Instant::now();
        let result = self.inner.rasterizer.rasterize(request).await;
        self.inner.stats.record_render_time(started.elapsed());

        let result = match result {
            Ok(texture) => self
                .store_texture(flight.key.clone(), texture.clone(), request.width, request.height)
                .map(|()| texture),
            Err(err) => {
                warn!(key = %flight.key, error = %err, "rasterization failed");
                Err(err)
            }
        };

        flight.complete(result.clone());
        result
    }

    /// Cache a fresh texture, or destroy it if the cache shut down meanwhile
    fn store_texture(&self, key: String, texture: R::Texture, width: u32, height: u32) -> Result<()> {
        let (released, replaced) = {
            let mut store = self.inner.store.lock();
            // Checked under the store lock: shutdown sets the flag before it
            // takes this lock to clear, so nothing is inserted after the clear.
            if self.is_closed() {
                drop(store);
                debug!(key = %key, "cache closed during rasterization, discarding texture");
                self.inner.rasterizer.destroy(texture);
                return Err(Error::Closed);
            }
            let replaced = store.contains(&key);
            (store.insert(key, texture, width, height), replaced)
        };
        self.inner.stats.record_insert();

        let evicted = released.len() - usize::from(replaced);
        if evicted > 0 {
            self.inner.stats.record_evictions(evicted);
        }
        self.destroy_all(released);
        Ok(())
    }

    fn destroy_all(&self, textures: Vec<R::Texture>) {
        for texture in textures {
            self.inner.rasterizer.destroy(texture);
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::lod::LodLevel;
    use crate::raster::mock::MockRasterizer;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><circle r="4"/></svg>"#;

    fn svg(n: usize) -> String {
        format!(r#"<svg xmlns="http://www.w3.org/2000/svg"><rect width="{}"/></svg>"#, n)
    }

    fn cache_with(config: CacheConfig, rasterizer: MockRasterizer) -> SpriteCache<MockRasterizer> {
        SpriteCache::init(config, rasterizer).unwrap()
    }

    fn cache(capacity: usize) -> SpriteCache<MockRasterizer> {
        let config = CacheConfig {
            max_cache_size: capacity,
            ..CacheConfig::default()
        };
        cache_with(config, MockRasterizer::new())
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = cache(10);

        let first = cache.get_sprite_frame(SVG, 32, 32, RenderOptions::new()).await.unwrap();
        let second = cache.get_sprite_frame(SVG, 32, 32, RenderOptions::new()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(cache.rasterizer().calls(), 1);

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_rate, 50.0);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.memory_usage, 32 * 32 * 4);
    }

    #[tokio::test]
    async fn test_default_color_matches_explicit() {
        let cache = cache(10);
        cache
            .set_config(ConfigUpdate::new().default_color("#ff0000"))
            .unwrap();

        let implicit = cache.cache_key(SVG, 10, 10, &RenderOptions::new()).unwrap();
        let explicit = cache
            .cache_key(SVG, 10, 10, &RenderOptions::new().color("#ff0000"))
            .unwrap();
        assert_eq!(implicit, explicit);

        cache.get_sprite_frame(SVG, 10, 10, RenderOptions::new()).await.unwrap();
        cache
            .get_sprite_frame(SVG, 10, 10, RenderOptions::new().color("#ff0000"))
            .await
            .unwrap();
        assert_eq!(cache.rasterizer().calls(), 1);
    }

    #[tokio::test]
    async fn test_capacity_evicts_first_inserted() {
        let cache = cache(2);

        let first = cache.get_sprite_frame(&svg(0), 8, 8, RenderOptions::new()).await.unwrap();
        cache.get_sprite_frame(&svg(1), 8, 8, RenderOptions::new()).await.unwrap();
        cache.get_sprite_frame(&svg(2), 8, 8, RenderOptions::new()).await.unwrap();

        assert_eq!(cache.rasterizer().destroyed(), vec![first.id]);
        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.eviction_count, 1);
        assert_eq!(stats.memory_usage, 2 * 8 * 8 * 4);

        // Evicted entry has to be rasterized again
        cache.get_sprite_frame(&svg(0), 8, 8, RenderOptions::new()).await.unwrap();
        assert_eq!(cache.rasterizer().calls(), 4);
    }

    #[tokio::test]
    async fn test_access_refreshes_recency() {
        let cache = cache(2);

        let a = cache.get_sprite_frame(&svg(0), 8, 8, RenderOptions::new()).await.unwrap();
        let b = cache.get_sprite_frame(&svg(1), 8, 8, RenderOptions::new()).await.unwrap();
        cache.get_sprite_frame(&svg(0), 8, 8, RenderOptions::new()).await.unwrap();
        cache.get_sprite_frame(&svg(2), 8, 8, RenderOptions::new()).await.unwrap();

        assert_eq!(cache.rasterizer().destroyed(), vec![b.id]);
        let again = cache.get_sprite_frame(&svg(0), 8, 8, RenderOptions::new()).await.unwrap();
        assert_eq!(again.id, a.id);
    }

    #[tokio::test]
    async fn test_size_never_exceeds_capacity() {
        let cache = cache(3);

        for i in 0..20 {
            cache.get_sprite_frame(&svg(i % 5), 4, 4, RenderOptions::new()).await.unwrap();
            assert!(cache.stats().size <= 3);
        }
    }

    #[tokio::test]
    async fn test_rasterization_failure_not_cached() {
        let cache = cache(10);

        let err = cache
            .get_sprite_frame("<bad svg", 8, 8, RenderOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rasterization(_)));
        assert_eq!(cache.stats().size, 0);

        // No negative caching: the next request tries again
        assert!(cache.get_sprite_frame("<bad svg", 8, 8, RenderOptions::new()).await.is_err());
        assert_eq!(cache.rasterizer().calls(), 2);
        assert_eq!(cache.stats().miss_count, 2);
    }

    #[tokio::test]
    async fn test_invalid_requests_rejected_early() {
        let cache = cache(10);

        assert!(matches!(
            cache.get_sprite_frame("   ", 8, 8, RenderOptions::new()).await,
            Err(Error::EmptyContent)
        ));
        assert!(matches!(
            cache.get_sprite_frame(SVG, 0, 8, RenderOptions::new()).await,
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            cache.get_sprite_frame(SVG, 8, 8, RenderOptions::new().scale(-1.0)).await,
            Err(Error::InvalidScale(_))
        ));
        assert_eq!(cache.rasterizer().calls(), 0);
        assert_eq!(cache.stats().miss_count, 0);
    }

    #[tokio::test]
    async fn test_clear_by_key_idempotent() {
        let cache = cache(10);
        let texture = cache.get_sprite_frame(SVG, 16, 16, RenderOptions::new()).await.unwrap();
        let key = cache.cache_key(SVG, 16, 16, &RenderOptions::new()).unwrap();
        assert_eq!(texture.key, key);

        assert!(cache.clear_by_key(&key));
        assert!(!cache.clear_by_key(&key));
        assert!(!cache.clear_by_key("never-cached"));

        assert_eq!(cache.rasterizer().destroyed(), vec![texture.id]);
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.stats().memory_usage, 0);
    }

    #[tokio::test]
    async fn test_clear_all_resets_everything() {
        let cache = cache(10);
        for i in 0..3 {
            cache.get_sprite_frame(&svg(i), 8, 8, RenderOptions::new()).await.unwrap();
        }
        cache.get_sprite_frame(&svg(0), 8, 8, RenderOptions::new()).await.unwrap();

        cache.clear_all();

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hit_count, 0);
        assert_eq!(stats.miss_count, 0);
        assert_eq!(stats.memory_usage, 0);
        assert_eq!(stats.total_render_time, Duration::ZERO);
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(cache.rasterizer().destroyed().len(), 3);
    }

    #[tokio::test]
    async fn test_shrink_evicts_with_lru() {
        let cache = cache(4);
        for i in 0..4 {
            cache.get_sprite_frame(&svg(i), 8, 8, RenderOptions::new()).await.unwrap();
        }

        cache.set_config(ConfigUpdate::new().max_cache_size(2)).unwrap();

        assert_eq!(cache.stats().size, 2);
        assert_eq!(cache.rasterizer().destroyed(), vec![0, 1]);
        assert_eq!(cache.config().max_cache_size, 2);
    }

    #[tokio::test]
    async fn test_capacity_advisory_without_lru() {
        let config = CacheConfig {
            max_cache_size: 2,
            enable_lru: false,
            ..CacheConfig::default()
        };
        let cache = cache_with(config, MockRasterizer::new());

        for i in 0..4 {
            cache.get_sprite_frame(&svg(i), 8, 8, RenderOptions::new()).await.unwrap();
        }
        assert_eq!(cache.stats().size, 4);

        cache.set_config(ConfigUpdate::new().max_cache_size(1)).unwrap();
        assert_eq!(cache.stats().size, 4);
        assert!(cache.rasterizer().destroyed().is_empty());

        cache.set_config(ConfigUpdate::new().enable_lru(true)).unwrap();
        assert_eq!(cache.stats().size, 1);
    }

    #[tokio::test]
    async fn test_invalid_config_update_leaves_config() {
        let cache = cache(4);
        let before = cache.config();

        assert!(cache
            .set_config(ConfigUpdate::new().default_color("#000").max_cache_size(0))
            .is_err());
        assert_eq!(cache.config(), before);
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce() {
        let cache = cache_with(
            CacheConfig::default(),
            MockRasterizer::slow(Duration::from_millis(50)),
        );

        let (a, b) = tokio::join!(
            cache.get_sprite_frame(SVG, 8, 8, RenderOptions::new()),
            cache.get_sprite_frame(SVG, 8, 8, RenderOptions::new()),
        );

        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(cache.rasterizer().calls(), 1);
        let stats = cache.stats();
        assert_eq!(stats.miss_count, 2);
        assert_eq!(stats.coalesced_count, 1);
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_concurrent_failure_shared() {
        let cache = cache_with(
            CacheConfig::default(),
            MockRasterizer::slow(Duration::from_millis(20)),
        );

        let (a, b) = tokio::join!(
            cache.get_sprite_frame("<bad/>", 8, 8, RenderOptions::new()),
            cache.get_sprite_frame("<bad/>", 8, 8, RenderOptions::new()),
        );

        assert!(matches!(a, Err(Error::Rasterization(_))));
        assert!(matches!(b, Err(Error::Rasterization(_))));
        assert_eq!(cache.rasterizer().calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_owner_releases_flight() {
        let cache = cache_with(
            CacheConfig::default(),
            MockRasterizer::slow(Duration::from_millis(100)),
        );

        let owner = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_sprite_frame(SVG, 8, 8, RenderOptions::new()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_sprite_frame(SVG, 8, 8, RenderOptions::new()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        owner.abort();
        assert!(owner.await.unwrap_err().is_cancelled());

        assert!(waiter.await.unwrap().is_ok());
        assert_eq!(cache.rasterizer().calls(), 2);
        assert_eq!(cache.stats().size, 1);
    }

    #[tokio::test]
    async fn test_preload_keeps_order() {
        let cache = cache(10);

        let results = cache
            .preload(vec![
                SpriteRequest::new(svg(0), 8, 8),
                SpriteRequest::new("<bad/>", 8, 8),
                SpriteRequest::new(svg(1), 8, 8)
                    .with_options(RenderOptions::new().color("#00ff00")),
            ])
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Rasterization(_))));
        let third = results[2].as_ref().unwrap();
        assert!(third.key.contains("_#00ff00_"));
        assert_eq!(cache.stats().size, 2);

        // Preloaded sprites are hits afterwards
        cache.get_sprite_frame(&svg(0), 8, 8, RenderOptions::new()).await.unwrap();
        assert_eq!(cache.rasterizer().calls(), 3);
    }

    #[tokio::test]
    async fn test_lod_scales_request() {
        let cache = cache(10);
        let policy = LodPolicy::new(vec![
            LodLevel { max_distance: 10.0, scale: 1.0 },
            LodLevel { max_distance: 100.0, scale: 0.5 },
        ])
        .unwrap();

        let near = cache
            .get_sprite_frame_lod(SVG, 8, 8, 5.0, &policy, RenderOptions::new())
            .await
            .unwrap();
        let far = cache
            .get_sprite_frame_lod(SVG, 8, 8, 50.0, &policy, RenderOptions::new().scale(2.0))
            .await
            .unwrap();

        assert!(near.key.contains("_1_"));
        assert!(far.key.contains("_1_"));
        assert_eq!(near.id, far.id);
        assert_eq!(cache.rasterizer().calls(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_destroys_and_closes() {
        let cache = cache(10);
        cache.get_sprite_frame(SVG, 8, 8, RenderOptions::new()).await.unwrap();

        cache.shutdown();
        cache.shutdown();

        assert!(cache.is_closed());
        assert_eq!(cache.rasterizer().destroyed().len(), 1);
        assert!(matches!(
            cache.get_sprite_frame(SVG, 8, 8, RenderOptions::new()).await,
            Err(Error::Closed)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_during_rasterization() {
        let cache = cache_with(
            CacheConfig::default(),
            MockRasterizer::slow(Duration::from_millis(50)),
        );

        let owner = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_sprite_frame(SVG, 8, 8, RenderOptions::new()).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let waiter = tokio::spawn({
            let cache = cache.clone();
            async move { cache.get_sprite_frame(SVG, 8, 8, RenderOptions::new()).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        cache.shutdown();

        assert!(matches!(owner.await.unwrap(), Err(Error::Closed)));
        assert!(matches!(waiter.await.unwrap(), Err(Error::Closed)));
        assert_eq!(cache.rasterizer().calls(), 1);
        assert_eq!(cache.rasterizer().destroyed(), vec![0]);
        assert_eq!(cache.stats().size, 0);
        assert_eq!(cache.stats().memory_usage, 0);
    }

    #[tokio::test]
    async fn test_insert_count() {
        let cache = cache(2);

        for i in 0..3 {
            cache.get_sprite_frame(&svg(i), 8, 8, RenderOptions::new()).await.unwrap();
        }
        cache.get_sprite_frame(&svg(2), 8, 8, RenderOptions::new()).await.unwrap();
        assert!(cache.get_sprite_frame("<bad/>", 8, 8, RenderOptions::new()).await.is_err());

        let stats = cache.stats();
        assert_eq!(stats.insert_count, 3);
        assert_eq!(stats.eviction_count, 1);
    }

    #[tokio::test]
    async fn test_hit_rate_arithmetic() {
        let cache = cache(10);
        assert_eq!(cache.stats().hit_rate, 0.0);

        for i in 0..4 {
            cache.get_sprite_frame(&svg(i), 4, 4, RenderOptions::new()).await.unwrap();
        }
        for _ in 0..12 {
            cache.get_sprite_frame(&svg(0), 4, 4, RenderOptions::new()).await.unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 12);
        assert_eq!(stats.miss_count, 4);
        assert_eq!(stats.hit_rate, 12.0 / 16.0 * 100.0);
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let config = CacheConfig {
            max_cache_size: 0,
            ..CacheConfig::default()
        };
        assert!(SpriteCache::init(config, MockRasterizer::new()).is_err());
    }
}
