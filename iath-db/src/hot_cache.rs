//! Bounded LRU cache placed in front of the tile store.
//!
//! All operations take a single mutex: `get` reorders recency, so even reads
//! mutate. Nothing blocking happens under the lock.
//!
//! [`CachedTileLookup`] is the service-layer pattern: round the query
//! coordinate to a [`CoordKey`], check the cache, fall back to
//! `TileStore::fetch`, and remember hits. Misses are not cached.

use crate::config::CacheConfig;
use crate::error::{Result, TileDbError};
use crate::store::{CoordKey, TileStore};
use crate::tile::{Point3, Tile};
use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Capacity-bounded LRU map.
pub struct HotCache<K: Hash + Eq, V: Clone> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> HotCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| TileDbError::Config("cache capacity must be positive".into()))?;
        Ok(Self {
            inner: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.capacity)
    }

    /// Value for `key`, marking it most recently used. A miss leaves the
    /// order untouched.
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    /// Membership test that does not touch recency.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    /// Insert or update `key` as most recently used, evicting the least
    /// recently used entry if the cache is over capacity.
    pub fn set(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().pop(key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }
}

impl<K: Hash + Eq, V: Clone> fmt::Debug for HotCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("HotCache")
            .field("len", &inner.len())
            .field("capacity", &inner.cap())
            .finish()
    }
}

/// Coordinate lookups against one store, memoized by rounded coordinate.
///
/// The cache is owned here and dies with the lookup; after a store reload,
/// build a new lookup so stale tiles are never served.
#[derive(Debug)]
pub struct CachedTileLookup {
    store: Arc<TileStore>,
    cache: HotCache<CoordKey, Arc<Tile>>,
}

impl CachedTileLookup {
    pub fn new(store: Arc<TileStore>, config: &CacheConfig) -> Result<Self> {
        Ok(Self {
            store,
            cache: HotCache::from_config(config)?,
        })
    }

    /// Fetch via the cache. The key ignores `tolerance`: a cached tile is
    /// returned for any later query that rounds to the same cell.
    pub fn fetch(&self, coordinate: Point3, tolerance: f32) -> Option<Arc<Tile>> {
        let key = CoordKey::from_point(coordinate);
        if let Some(tile) = self.cache.get(&key) {
            tracing::trace!(cell = ?key.0, tile_id = %tile.id(), "hot cache hit");
            return Some(tile);
        }
        tracing::trace!(cell = ?key.0, "hot cache miss");

        let tile = self.store.fetch(coordinate, tolerance)?.clone();
        self.cache.set(key, tile.clone());
        Some(tile)
    }

    /// [`fetch`](Self::fetch) with the store's default tolerance.
    pub fn fetch_default(&self, coordinate: Point3) -> Option<Arc<Tile>> {
        self.fetch(coordinate, self.store.config().default_tolerance)
    }

    pub fn store(&self) -> &Arc<TileStore> {
        &self.store
    }

    pub fn cache(&self) -> &HotCache<CoordKey, Arc<Tile>> {
        &self.cache
    }
}
